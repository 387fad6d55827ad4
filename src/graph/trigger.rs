//! Rising-edge trigger detection over the interleaved sample stream
//!
//! Scans newly appended samples for strict rising-edge crossings of a
//! configurable level, per channel, and drives the post-trigger behavior of
//! the two acquisition modes:
//! - Single: freeze the view on the first edge, then stop acquiring after a
//!   short settle delay so the capture stays on screen.
//! - Normal: re-arm after every edge and keep acquiring indefinitely.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::store::TimeSeriesStore;

/// How long a single-shot capture stays live before acquisition stops.
pub const TRIGGER_SETTLE: Duration = Duration::from_secs(2);

/// Post-trigger behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Stop on the first edge: freeze the view, then end acquisition
    #[default]
    Single,
    /// Re-arm after every edge and keep acquiring
    Normal,
}

/// Threshold the signal must cross to fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerLevel {
    /// Threshold value, compared against channel samples
    pub value: f64,
    /// False while the trigger is disarmed
    pub enabled: bool,
}

/// Trigger protocol state, derived from the engine's internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// No level armed, nothing is scanned
    Disabled,
    /// Level armed, new samples are scanned each tick
    Armed,
    /// An edge has been detected since arming
    Triggered,
}

/// What the acquisition loop should do after an edge fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostTriggerAction {
    /// Keep acquiring (Normal mode)
    Continue,
    /// Keep publishing the frozen capture for the given delay, then
    /// disconnect the data channel and stop polling (Single mode)
    StopAfterSettle(Duration),
}

/// Rising-edge trigger engine.
///
/// Owns the level, the scan cursor, and the single-shot view lock. All
/// mutation happens on the consumer side: either the acquisition poll loop
/// (scanning) or user-facing calls (arming, dragging the level, reset).
#[derive(Debug)]
pub struct TriggerEngine {
    /// Global index from which the next scan resumes
    start_index: usize,
    /// Global index of the most recent detected edge
    last_trigger: Option<usize>,
    /// True once a single-shot edge fired; freezes further scanning
    locked_view: bool,
    mode: TriggerMode,
    level: TriggerLevel,
    settle: Duration,
}

impl TriggerEngine {
    pub fn new() -> Self {
        Self {
            start_index: 0,
            last_trigger: None,
            locked_view: false,
            mode: TriggerMode::default(),
            level: TriggerLevel {
                value: 0.0,
                enabled: false,
            },
            settle: TRIGGER_SETTLE,
        }
    }

    /// Arm the trigger at the given sample count.
    ///
    /// Only samples appended after this point are eligible, so an edge that
    /// happened before the user enabled the trigger cannot fire it.
    pub fn enable_trigger(&mut self, current_count: usize) {
        self.start_index = current_count;
        self.level.enabled = true;
    }

    /// Set the threshold without touching the scan cursor.
    pub fn set_level(&mut self, value: f64) {
        self.level.value = value;
    }

    /// The user dragged the trigger level to a new value.
    ///
    /// The scan cursor is moved up to the current sample count so the edge
    /// formed at the moment of the move is not misread as a real crossing.
    /// While a single-shot capture is locked the cursor stays put; the
    /// frozen view must not re-arm under the user's hands.
    pub fn move_level(&mut self, value: f64, current_count: usize) {
        self.level.value = value;
        if self.start_index == current_count || self.locked_view {
            return;
        }
        self.start_index = current_count;
    }

    /// Disarm and forget everything: back to `Disabled`, no remembered
    /// edge, view unlocked.
    pub fn reset(&mut self) {
        self.start_index = 0;
        self.last_trigger = None;
        self.locked_view = false;
        self.level.enabled = false;
    }

    /// Scan for a strict rising edge through the armed level.
    ///
    /// Channels are scanned in ascending index order and the first channel
    /// with any qualifying edge wins; channels whose `triggerable` flag is
    /// false are skipped (missing flags default to triggerable). The scan
    /// starts one interleaved frame before the cursor so an edge whose
    /// `prev` sample lies just before the scan boundary is still seen.
    ///
    /// An edge qualifies when `prev < level && curr > level && curr > prev`.
    /// Samples equal to the level never fire, which keeps a flat signal
    /// sitting exactly on the threshold from chattering.
    ///
    /// # Returns
    /// Global index of the crossing sample, or `None`.
    pub fn check_for_trigger(
        &mut self,
        store: &TimeSeriesStore,
        triggerable: &[bool],
        num_channels: usize,
    ) -> Option<usize> {
        if !self.level.enabled || self.locked_view {
            return None;
        }

        let num_channels = num_channels.max(1);
        let level = self.level.value;
        let y = store.y();
        let scan_start = self.start_index.saturating_sub(num_channels);

        for v in 0..num_channels {
            if !triggerable.get(v).copied().unwrap_or(true) {
                continue;
            }

            // First global index >= scan_start belonging to channel v
            let mut idx = scan_start + (v + num_channels - scan_start % num_channels) % num_channels;
            let mut prev: Option<u32> = None;

            while idx < y.len() {
                let curr = y[idx];
                if let Some(p) = prev {
                    if (p as f64) < level && (curr as f64) > level && curr > p {
                        self.last_trigger = Some(idx);
                        tracing::info!(
                            channel = v,
                            index = idx,
                            value = curr,
                            level,
                            "rising edge crossed trigger level"
                        );
                        return Some(idx);
                    }
                }
                prev = Some(curr);
                idx += num_channels;
            }
        }

        None
    }

    /// Apply the mode-dependent post-trigger action for an edge that just
    /// fired.
    ///
    /// Normal mode advances the scan cursor to the current sample count;
    /// the caller holds the store lock, so no sample can slip in between
    /// the scan and the cursor update. Single mode locks the view and asks
    /// the acquisition loop to stop once the settle delay has passed.
    pub fn handle_trigger(&mut self, store: &TimeSeriesStore) -> PostTriggerAction {
        match self.mode {
            TriggerMode::Single => {
                self.locked_view = true;
                PostTriggerAction::StopAfterSettle(self.settle)
            }
            TriggerMode::Normal => {
                self.start_index = store.len();
                PostTriggerAction::Continue
            }
        }
    }

    /// Global index of the most recent detected edge.
    pub fn last_trigger_index(&self) -> Option<usize> {
        self.last_trigger
    }

    /// True once a single-shot edge has fired and until `reset`.
    pub fn locked_view(&self) -> bool {
        self.locked_view
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TriggerMode) {
        self.mode = mode;
    }

    pub fn level(&self) -> TriggerLevel {
        self.level
    }

    /// Override the single-shot settle delay (default 2 s).
    pub fn set_settle_delay(&mut self, settle: Duration) {
        self.settle = settle;
    }

    /// Current protocol state.
    pub fn state(&self) -> TriggerState {
        if !self.level.enabled {
            TriggerState::Disabled
        } else if self.last_trigger.is_some() {
            TriggerState::Triggered
        } else {
            TriggerState::Armed
        }
    }
}

impl Default for TriggerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(values: &[u32]) -> TimeSeriesStore {
        let mut store = TimeSeriesStore::new();
        for (i, &v) in values.iter().enumerate() {
            store.add_point(i as u32, v);
        }
        store
    }

    fn armed(level: f64) -> TriggerEngine {
        let mut engine = TriggerEngine::new();
        engine.set_level(level);
        engine.enable_trigger(0);
        engine
    }

    #[test]
    fn test_disabled_engine_never_fires() {
        let store = store_with(&[5, 15, 8]);
        let mut engine = TriggerEngine::new();
        engine.set_level(10.0);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);
        assert_eq!(engine.state(), TriggerState::Disabled);
    }

    #[test]
    fn test_rising_edge_reports_crossing_sample() {
        // 5 -> 15 rises through 10; the 15 is the trigger, not the 8 after it
        let store = store_with(&[5, 15, 8]);
        let mut engine = armed(10.0);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(1));
        assert_eq!(engine.last_trigger_index(), Some(1));
        assert_eq!(engine.state(), TriggerState::Triggered);
    }

    #[test]
    fn test_sample_equal_to_level_does_not_fire() {
        // Touching the threshold exactly is not a crossing
        let store = store_with(&[5, 10, 10, 9]);
        let mut engine = armed(10.0);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);
        assert_eq!(engine.state(), TriggerState::Armed);
    }

    #[test]
    fn test_falling_edge_does_not_fire() {
        let store = store_with(&[15, 5, 4]);
        let mut engine = armed(10.0);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);
    }

    #[test]
    fn test_interleaved_scenario_lowest_eligible_channel_wins() {
        // 3 channels: ch0 = [2, 3], ch1 = [7, 0], ch2 = [1, 12]
        let store = store_with(&[2, 7, 1, 3, 0, 12]);

        // Only channel 2 triggerable: the 1 -> 12 edge at global index 5
        let mut engine = armed(10.0);
        let flags = [false, false, true];
        assert_eq!(engine.check_for_trigger(&store, &flags, 3), Some(5));

        // All channels triggerable: ch0 = [2, 2, 9], ch1 = [3, 8, 0].
        // Channel 1 crosses earlier in the stream (index 4), but channel 0
        // is scanned first and its edge at index 6 wins.
        let store = store_with(&[2, 3, 0, 2, 8, 0, 9, 0, 0]);
        let mut engine = armed(5.0);
        assert_eq!(engine.check_for_trigger(&store, &[], 3), Some(6));
    }

    #[test]
    fn test_missing_flags_default_to_triggerable() {
        let store = store_with(&[2, 7, 1, 3, 0, 12]);
        let mut engine = armed(10.0);
        // Flags shorter than the channel count: channel 2 still scans
        assert_eq!(engine.check_for_trigger(&store, &[false], 3), Some(5));
    }

    #[test]
    fn test_scan_cursor_limits_eligible_samples() {
        let mut store = store_with(&[5, 15, 8]);
        let mut engine = TriggerEngine::new();
        engine.set_level(10.0);
        // Armed after the edge was already in the store
        engine.enable_trigger(store.len());
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);

        // A fresh edge after arming fires
        store.add_point(3, 4);
        store.add_point(4, 20);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(4));
    }

    #[test]
    fn test_lookback_covers_edge_spanning_scan_boundary() {
        // prev sample sits exactly one frame before the cursor
        let mut store = store_with(&[5]);
        let mut engine = TriggerEngine::new();
        engine.set_level(10.0);
        engine.enable_trigger(1);
        store.add_point(1, 15);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(1));
    }

    #[test]
    fn test_normal_mode_does_not_refire_on_same_edge() {
        let mut store = store_with(&[5, 15, 8]);
        let mut engine = armed(10.0);
        engine.set_mode(TriggerMode::Normal);

        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(1));
        assert_eq!(engine.handle_trigger(&store), PostTriggerAction::Continue);

        // Same data, cursor advanced: the old edge is out of reach
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);
        assert_eq!(engine.last_trigger_index(), Some(1));

        // A new edge after the cursor fires again
        store.add_point(3, 2);
        store.add_point(4, 30);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(4));
    }

    #[test]
    fn test_single_mode_locks_view_until_reset() {
        let mut store = store_with(&[5, 15]);
        let mut engine = armed(10.0);
        engine.set_mode(TriggerMode::Single);

        assert_eq!(engine.check_for_trigger(&store, &[], 1), Some(1));
        let action = engine.handle_trigger(&store);
        assert_eq!(action, PostTriggerAction::StopAfterSettle(TRIGGER_SETTLE));
        assert!(engine.locked_view());

        // Further samples never re-trigger while locked
        store.add_point(2, 1);
        store.add_point(3, 25);
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);
        assert!(engine.locked_view());

        engine.reset();
        assert!(!engine.locked_view());
        assert_eq!(engine.last_trigger_index(), None);
        assert_eq!(engine.state(), TriggerState::Disabled);
    }

    #[test]
    fn test_move_level_resets_cursor_unless_locked() {
        let store = store_with(&[5, 15, 8]);
        let mut engine = armed(10.0);

        // Dragging the level past old samples must not fire on them
        engine.move_level(7.0, store.len());
        assert_eq!(engine.check_for_trigger(&store, &[], 1), None);

        // While locked, the cursor stays put but the value still updates
        let mut engine = armed(10.0);
        engine.set_mode(TriggerMode::Single);
        let mut store = store_with(&[5, 15]);
        engine.check_for_trigger(&store, &[], 1);
        engine.handle_trigger(&store);
        store.add_point(2, 1);
        engine.move_level(3.0, store.len());
        assert!((engine.level().value - 3.0).abs() < f64::EPSILON);
        assert!(engine.locked_view());
    }
}
