//! Hardware-free sample generator
//!
//! Produces deterministic pseudo-random telemetry through the same
//! `add_point` path a real transport would use, so the engine and its
//! tests run without a device on the other end of the wire. The raw
//! timestamp is a wrapping fixed-width counter, which exercises the
//! store's overflow correction end to end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;

use super::{ChannelError, DataChannel};
use crate::graph::store::SharedSeries;

/// Default pacing between generated frames.
const DEFAULT_TICK: Duration = Duration::from_millis(1);

/// Feedback mask for the 16-bit Galois LFSR driving the waveform
/// (x^16 + x^14 + x^13 + x^11 + 1, maximal length).
const LFSR_MASK: u16 = 0xB400;

/// Data channel that synthesizes one frame of samples per tick.
///
/// Each frame appends one value per channel sharing a single raw
/// timestamp, the way a multi-variable field-bus frame does. Values come
/// from an LFSR-scrambled sequence in `0..=255`, noisy enough to cross any
/// mid-range trigger level within a few frames.
pub struct GeneratorChannel {
    series: SharedSeries,
    num_channels: usize,
    tick: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GeneratorChannel {
    pub fn new(series: SharedSeries, num_channels: usize) -> Self {
        Self {
            series,
            num_channels: num_channels.max(1),
            tick: DEFAULT_TICK,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Override the pacing between generated frames.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl DataChannel for GeneratorChannel {
    fn connect(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(ChannelError::AlreadyConnected.into());
        }

        let series = Arc::clone(&self.series);
        let running = Arc::clone(&self.running);
        let num_channels = self.num_channels;
        let tick = self.tick;
        let timestamp_mask = {
            let bits = series
                .lock()
                .map(|store| store.bit_width())
                .unwrap_or(crate::DEFAULT_TIMESTAMP_BITS);
            ((1u64 << bits) - 1) as u32
        };
        running.store(true, Ordering::Relaxed);

        self.handle = Some(thread::spawn(move || {
            let mut lfsr: u16 = 0xACE1;
            let mut raw: u32 = 0;

            while running.load(Ordering::Relaxed) {
                thread::sleep(tick);
                if let Ok(mut store) = series.lock() {
                    for _ in 0..num_channels {
                        // Galois LFSR step: shift, feed back on output 1
                        let out = lfsr & 1;
                        lfsr >>= 1;
                        if out == 1 {
                            lfsr ^= LFSR_MASK;
                        }
                        store.add_point(raw, (lfsr & 0xFF) as u32);
                    }
                }
                raw = (raw + 1) & timestamp_mask;
            }
        }));

        tracing::info!(channels = num_channels, "generator channel connected");
        Ok(())
    }

    fn disconnect(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            tracing::info!("generator channel disconnected");
        }
    }
}

impl Drop for GeneratorChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}
