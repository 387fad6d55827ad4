//! Acquisition session: shared store, poll loop, and lifecycle
//!
//! One session covers one acquisition run. The session owns the shared
//! sample store (a single mutex over both sequences and the wrap
//! correction), the trigger engine, and a poll thread that wakes at a
//! fixed cadence (default 100 ms) to scan for trigger edges and cut the
//! display slice. Finished frames are handed to the renderer over a
//! bounded channel; a slow renderer drops frames instead of stalling the
//! poll loop.
//!
//! Producers (transports or the built-in generator) run on their own
//! threads and append through the store lock, never touching trigger or
//! window state. Trigger state is mutated only from the poll thread and
//! from the user-facing facade calls here, under its own lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;

use crate::channel::DataChannel;
use crate::config::ScopeConfig;
use crate::graph::block::latest_values;
use crate::graph::store::{SharedSeries, TimeSeriesStore};
use crate::graph::trigger::{PostTriggerAction, TriggerEngine, TriggerMode};
use crate::graph::window::WindowExtractor;
use crate::stats::store::SessionStats;

/// Frames buffered towards the renderer before ticks are dropped.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Errors from the session lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("acquisition session is already running")]
    AlreadyRunning,
}

/// One tick's worth of render input.
#[derive(Debug, Clone)]
pub struct FrameUpdate {
    /// Corrected timestamps of the display slice
    pub x: Vec<f64>,
    /// Interleaved channel values of the display slice
    pub y: Vec<f64>,
    /// Trigger position relative to the slice, if one is visible
    pub trigger_index: Option<usize>,
    /// Latest value per channel, for the block display
    pub latest: Vec<f64>,
    /// True while a single-shot capture is frozen; the renderer stops
    /// following the live edge and disables trigger-level dragging
    pub locked_view: bool,
}

/// Owns everything one acquisition run needs.
pub struct AcquisitionSession {
    config: ScopeConfig,
    series: SharedSeries,
    trigger: Arc<Mutex<TriggerEngine>>,
    extractor: Arc<Mutex<WindowExtractor>>,
    stats: Arc<Mutex<SessionStats>>,
    channel: Arc<Mutex<Option<Box<dyn DataChannel>>>>,
    frame_tx: Sender<FrameUpdate>,
    frame_rx: Receiver<FrameUpdate>,
    running: Arc<AtomicBool>,
    poll_handle: Option<JoinHandle<()>>,
}

impl AcquisitionSession {
    pub fn new(mut config: ScopeConfig) -> Self {
        config.num_channels = config.num_channels.max(1);

        let series = TimeSeriesStore::with_bit_width(config.timestamp_bits).into_shared();

        let mut engine = TriggerEngine::new();
        engine.set_mode(config.trigger.mode);
        engine.set_level(config.trigger.level);
        if config.trigger.enabled {
            engine.enable_trigger(0);
        }

        let mut extractor = WindowExtractor::new();
        extractor.set_window_width(config.window_width);
        extractor.set_num_channels(config.num_channels);
        extractor.set_full_history(config.full_history);

        let (frame_tx, frame_rx) = bounded(FRAME_CHANNEL_CAPACITY);

        Self {
            config,
            series,
            trigger: Arc::new(Mutex::new(engine)),
            extractor: Arc::new(Mutex::new(extractor)),
            stats: Arc::new(Mutex::new(SessionStats::new())),
            channel: Arc::new(Mutex::new(None)),
            frame_tx,
            frame_rx,
            running: Arc::new(AtomicBool::new(false)),
            poll_handle: None,
        }
    }

    /// Handle to the shared store, for producers appending samples.
    pub fn series(&self) -> SharedSeries {
        Arc::clone(&self.series)
    }

    /// Receiver side of the frame channel, for the renderer.
    pub fn frames(&self) -> Receiver<FrameUpdate> {
        self.frame_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Attach the data channel to drive; connected on `start`,
    /// disconnected on `stop` or when a single-shot capture settles.
    pub fn attach_channel(&mut self, channel: Box<dyn DataChannel>) {
        if let Ok(mut slot) = self.channel.lock() {
            *slot = Some(channel);
        }
    }

    /// Connect the attached channel and start the poll loop.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() || self.poll_handle.is_some() {
            return Err(SessionError::AlreadyRunning.into());
        }

        if let Ok(mut slot) = self.channel.lock() {
            if let Some(channel) = slot.as_mut() {
                channel.connect()?;
            }
        }

        self.running.store(true, Ordering::Relaxed);

        let series = Arc::clone(&self.series);
        let trigger = Arc::clone(&self.trigger);
        let extractor = Arc::clone(&self.extractor);
        let stats = Arc::clone(&self.stats);
        let channel = Arc::clone(&self.channel);
        let frame_tx = self.frame_tx.clone();
        let running = Arc::clone(&self.running);
        let flags = self.config.triggerable_flags();
        let num_channels = self.config.num_channels;
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));

        self.poll_handle = Some(thread::spawn(move || {
            let mut settle_deadline: Option<Instant> = None;

            while running.load(Ordering::Relaxed) {
                let tick_started = Instant::now();
                let mut frame = None;

                if let (Ok(store), Ok(mut engine), Ok(mut extractor)) =
                    (series.lock(), trigger.lock(), extractor.lock())
                {
                    let fired = engine.check_for_trigger(&store, &flags, num_channels);
                    if fired.is_some() {
                        match engine.handle_trigger(&store) {
                            PostTriggerAction::Continue => {}
                            PostTriggerAction::StopAfterSettle(delay) => {
                                settle_deadline = Some(Instant::now() + delay);
                            }
                        }
                        if let Ok(mut stats) = stats.lock() {
                            stats.record_trigger();
                        }
                    }

                    frame = Some(compute_frame(
                        &store,
                        &engine,
                        &mut extractor,
                        num_channels,
                        fired,
                    ));

                    if let Ok(mut stats) = stats.lock() {
                        stats.sync_store(&store);
                    }
                }

                if let Some(frame) = frame {
                    if frame_tx.try_send(frame).is_ok() {
                        if let Ok(mut stats) = stats.lock() {
                            stats.record_frame();
                        }
                    }
                }

                if let Some(deadline) = settle_deadline {
                    if Instant::now() >= deadline {
                        running.store(false, Ordering::Relaxed);
                        if let Ok(mut slot) = channel.lock() {
                            if let Some(channel) = slot.as_mut() {
                                channel.disconnect();
                            }
                        }
                        tracing::info!("single-shot capture settled; acquisition stopped");
                        break;
                    }
                }

                let elapsed = tick_started.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            }
        }));

        tracing::info!(
            channels = self.config.num_channels,
            interval_ms = self.config.poll_interval_ms,
            "acquisition session started"
        );
        Ok(())
    }

    /// Stop polling and disconnect the channel. Idempotent.
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.poll_handle.take() {
            let _ = handle.join();
        }
        if let Ok(mut slot) = self.channel.lock() {
            if let Some(channel) = slot.as_mut() {
                channel.disconnect();
            }
        }
        tracing::info!("acquisition session stopped");
        Ok(())
    }

    /// Drop all samples and reset trigger state and diagnostics, ready
    /// for a fresh run. Required before reconfiguring the channel count.
    pub fn clear(&self) {
        if let Ok(mut store) = self.series.lock() {
            store.clear();
        }
        if let Ok(mut engine) = self.trigger.lock() {
            engine.reset();
        }
        if let Ok(mut stats) = self.stats.lock() {
            stats.clear();
        }
    }

    /// Arm the trigger from the current sample count forward.
    pub fn enable_trigger(&self, level: f64) {
        let count = self.sample_count();
        if let Ok(mut engine) = self.trigger.lock() {
            engine.set_level(level);
            engine.enable_trigger(count);
        }
    }

    /// The user dragged the trigger level.
    pub fn move_trigger_level(&self, level: f64) {
        let count = self.sample_count();
        if let Ok(mut engine) = self.trigger.lock() {
            engine.move_level(level, count);
        }
    }

    /// Disarm the trigger and unlock a frozen view.
    pub fn reset_trigger(&self) {
        if let Ok(mut engine) = self.trigger.lock() {
            engine.reset();
        }
    }

    pub fn set_trigger_mode(&self, mode: TriggerMode) {
        if let Ok(mut engine) = self.trigger.lock() {
            engine.set_mode(mode);
        }
    }

    /// Override the single-shot settle delay (default 2 s).
    pub fn set_trigger_settle(&self, settle: Duration) {
        if let Ok(mut engine) = self.trigger.lock() {
            engine.set_settle_delay(settle);
        }
    }

    pub fn set_full_history(&self, full_history: bool) {
        if let Ok(mut extractor) = self.extractor.lock() {
            extractor.set_full_history(full_history);
        }
    }

    pub fn set_window_width(&self, width: f64) {
        if let Ok(mut extractor) = self.extractor.lock() {
            extractor.set_window_width(width);
        }
    }

    /// Compute a frame on demand, outside the poll cadence.
    ///
    /// Uses the remembered trigger state but does not scan for new edges;
    /// scanning stays with the poll loop so every edge is handled exactly
    /// once.
    pub fn current_frame(&self) -> FrameUpdate {
        if let (Ok(store), Ok(engine), Ok(mut extractor)) =
            (self.series.lock(), self.trigger.lock(), self.extractor.lock())
        {
            compute_frame(&store, &engine, &mut extractor, self.config.num_channels, None)
        } else {
            FrameUpdate {
                x: Vec::new(),
                y: Vec::new(),
                trigger_index: None,
                latest: vec![0.0; self.config.num_channels],
                locked_view: false,
            }
        }
    }

    /// Snapshot of the session diagnostics.
    pub fn stats(&self) -> Option<SessionStats> {
        self.stats.lock().ok().map(|s| s.clone())
    }

    fn sample_count(&self) -> usize {
        self.series.lock().map(|store| store.len()).unwrap_or(0)
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Cut one frame from the locked store.
fn compute_frame(
    store: &TimeSeriesStore,
    engine: &TriggerEngine,
    extractor: &mut WindowExtractor,
    num_channels: usize,
    fired: Option<usize>,
) -> FrameUpdate {
    let sub = extractor.sub_data(store, fired, engine.last_trigger_index(), engine.mode());
    FrameUpdate {
        x: sub.x.to_vec(),
        y: sub.y.to_vec(),
        trigger_index: sub.trigger_index,
        latest: latest_values(store, num_channels),
        locked_view: engine.locked_view(),
    }
}
