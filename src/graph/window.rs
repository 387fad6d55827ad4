//! Display-window extraction from the sample store
//!
//! Computes which contiguous slice of the interleaved stream the renderer
//! should draw on a given tick: a sliding live window, the full history, or
//! a slice anchored around a trigger edge. Channel de-interleaving happens
//! downstream, so every slice starts on a channel boundary; otherwise
//! `global_index % num_channels` would no longer identify the channel.

use super::store::TimeSeriesStore;
use super::trigger::TriggerMode;

/// Extra channel-widths of pullback in front of a trigger edge.
///
/// Keeps the rising edge inside the slice after the start is snapped down
/// to a channel boundary and `window_width` is truncated to whole samples.
pub const TRIGGER_HEADROOM_CHANNELS: usize = 3;

/// One tick's display slice.
///
/// Borrows the extractor's scratch buffers; the view is only valid until
/// the next `sub_data` call. `trigger_index` is relative to the slice, or
/// `None` when no trigger falls inside the exposed range.
#[derive(Debug)]
pub struct SubData<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub trigger_index: Option<usize>,
}

/// Computes the index range of the store to expose to the renderer.
///
/// Keeps grow-only scratch buffers for the float conversion so a steady
/// acquisition allocates nothing per tick.
#[derive(Debug)]
pub struct WindowExtractor {
    /// View width in time units of the X axis
    window_width: f64,
    num_channels: usize,
    /// Expose the entire stream instead of a sliding window
    full_history: bool,
    x_scratch: Vec<f64>,
    y_scratch: Vec<f64>,
}

impl WindowExtractor {
    pub fn new() -> Self {
        Self {
            window_width: crate::DEFAULT_WINDOW_WIDTH,
            num_channels: 1,
            full_history: false,
            x_scratch: Vec::new(),
            y_scratch: Vec::new(),
        }
    }

    pub fn window_width(&self) -> f64 {
        self.window_width
    }

    pub fn set_window_width(&mut self, width: f64) {
        self.window_width = width;
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Changing the channel count mid-session misaligns existing data;
    /// callers must clear the store when they reconfigure.
    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.num_channels = num_channels.max(1);
    }

    pub fn is_full_history(&self) -> bool {
        self.full_history
    }

    pub fn set_full_history(&mut self, full_history: bool) {
        self.full_history = full_history;
    }

    /// Compute the slice to display for this tick.
    ///
    /// # Arguments
    /// * `store` - the locked store; the caller holds the lock so the scan
    ///   and the slice see the same data
    /// * `current_trigger` - global index of an edge detected this tick
    /// * `last_trigger` - global index of the most recent edge, if any
    /// * `mode` - the trigger mode the indexes were produced under
    pub fn sub_data(
        &mut self,
        store: &TimeSeriesStore,
        current_trigger: Option<usize>,
        last_trigger: Option<usize>,
        mode: TriggerMode,
    ) -> SubData<'_> {
        let total = store.len();
        let nc = self.num_channels;
        let width = (self.window_width as usize) * nc;
        let pullback = (self.window_width as usize) * (nc + TRIGGER_HEADROOM_CHANNELS);

        let mut trigger_local: Option<usize> = None;
        let start: usize;
        let end: usize;

        if let (Some(cur), false) = (current_trigger, self.full_history) {
            // An edge fired this tick: anchor the slice on it
            match mode {
                TriggerMode::Single => {
                    // The view freezes here; include all history up to now
                    start = 0;
                    trigger_local = Some(cur);
                }
                TriggerMode::Normal => {
                    let candidate = cur.saturating_sub(pullback);
                    start = self.snap_to_channel(candidate);
                    trigger_local = Some(cur - start);
                }
            }
            end = total;
        } else if !self.full_history {
            if let (Some(last), TriggerMode::Normal) = (last_trigger, mode) {
                // No new edge, but keep the view anchored on the previous one.
                // Cap the forward extent so a long quiet stretch after the
                // edge does not grow the slice without bound.
                let candidate = last.saturating_sub(pullback);
                start = self.snap_to_channel(candidate);
                trigger_local = Some(last - start);

                let cap = start + 2 * pullback;
                end = if cap < total {
                    self.snap_to_channel(cap)
                } else {
                    total
                };
            } else {
                // Plain sliding window over the most recent samples
                start = self.snap_to_channel(self.live_candidate(store, total, width));
                end = total;
            }
        } else {
            // Full history: everything, and a previous Normal-mode edge is
            // reported unshifted since the slice starts at zero
            start = 0;
            end = total;
            if current_trigger.is_none() && mode == TriggerMode::Normal {
                trigger_local = last_trigger;
            }
        }

        self.x_scratch.clear();
        self.y_scratch.clear();
        self.x_scratch
            .extend(store.x()[start..end].iter().map(|&t| t as f64));
        self.y_scratch
            .extend(store.y()[start..end].iter().map(|&v| v as f64));

        SubData {
            x: &self.x_scratch,
            y: &self.y_scratch,
            trigger_index: trigger_local.filter(|&t| t < end - start),
        }
    }

    /// Start-of-slice candidate for the live sliding window.
    ///
    /// The naive candidate keeps the most recent `window_width * nc`
    /// samples. When timestamps are sparse or bursty that index span can
    /// cover less than `window_width` time units, so the candidate is
    /// refined by binary-searching the monotonic `x` sequence for the last
    /// index at or before `last_timestamp - window_width`.
    fn live_candidate(&self, store: &TimeSeriesStore, total: usize, width: usize) -> usize {
        let mut candidate = if total > width { total - (width + 1) } else { 0 };

        if candidate > 0 {
            let x = store.x();
            let cutoff = x[total - 1] as f64 - self.window_width;
            if x[candidate] as f64 > cutoff {
                let below = x.partition_point(|&t| (t as f64) <= cutoff);
                candidate = below.saturating_sub(1);
            }
        }

        candidate
    }

    fn snap_to_channel(&self, index: usize) -> usize {
        index - index % self.num_channels
    }
}

impl Default for WindowExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_store(len: usize) -> TimeSeriesStore {
        let mut store = TimeSeriesStore::new();
        for i in 0..len {
            store.add_point(i as u32, (i % 100) as u32);
        }
        store
    }

    fn extractor(width: f64, channels: usize) -> WindowExtractor {
        let mut ex = WindowExtractor::new();
        ex.set_window_width(width);
        ex.set_num_channels(channels);
        ex
    }

    #[test]
    fn test_empty_store_yields_empty_slice() {
        let store = TimeSeriesStore::new();
        let mut ex = extractor(75.0, 1);
        let sub = ex.sub_data(&store, None, None, TriggerMode::Normal);
        assert!(sub.x.is_empty());
        assert!(sub.y.is_empty());
        assert_eq!(sub.trigger_index, None);
    }

    #[test]
    fn test_short_store_is_exposed_whole() {
        let store = dense_store(10);
        let mut ex = extractor(75.0, 1);
        let sub = ex.sub_data(&store, None, None, TriggerMode::Normal);
        assert_eq!(sub.x.len(), 10);
        assert_eq!(sub.x[0], 0.0);
    }

    #[test]
    fn test_live_window_keeps_most_recent_samples() {
        let store = dense_store(500);
        let mut ex = extractor(75.0, 1);
        let sub = ex.sub_data(&store, None, None, TriggerMode::Single);
        // candidate = 500 - 76, dense timestamps need no refinement
        assert_eq!(sub.x.len(), 76);
        assert_eq!(sub.x[0], 424.0);
        assert_eq!(*sub.x.last().unwrap(), 499.0);
    }

    #[test]
    fn test_slice_starts_on_channel_boundary() {
        for channels in 1..=5 {
            let store = dense_store(997);
            let mut ex = extractor(30.0, channels);
            let sub = ex.sub_data(&store, None, None, TriggerMode::Single);
            let start = 997 - sub.x.len();
            assert_eq!(
                start % channels,
                0,
                "start {} not aligned for {} channels",
                start,
                channels
            );
        }
    }

    #[test]
    fn test_bursty_timestamps_widen_the_window() {
        // 50 sparse samples two time units apart, then a 200-sample burst
        // spanning only 20 time units: the naive candidate (last 76
        // samples) sits deep inside the burst and covers far less than 75
        // time units, so the cutoff search reaches back into the sparse
        // region.
        let mut store = TimeSeriesStore::new();
        for i in 0..50u32 {
            store.add_point(i * 2, 0);
        }
        for i in 0..200u32 {
            store.add_point(100 + i / 10, 0);
        }
        let mut ex = extractor(75.0, 1);
        let sub = ex.sub_data(&store, None, None, TriggerMode::Single);

        let total = 250;
        let naive_start = total - 76;
        let start = total - sub.x.len();
        assert!(
            start < naive_start,
            "refined start {} should reach earlier than naive {}",
            start,
            naive_start
        );
        // The slice now spans the full window width in time
        let last = *sub.x.last().unwrap();
        assert!(last - sub.x[0] >= 75.0);
        assert!(sub.x[1] >= last - 75.0);
    }

    #[test]
    fn test_single_trigger_includes_all_history() {
        let store = dense_store(300);
        let mut ex = extractor(20.0, 1);
        let sub = ex.sub_data(&store, Some(250), Some(250), TriggerMode::Single);
        assert_eq!(sub.x.len(), 300, "single-shot slice keeps all history");
        assert_eq!(sub.trigger_index, Some(250), "local index equals global");
    }

    #[test]
    fn test_normal_trigger_rebases_index_to_slice() {
        let store = dense_store(300);
        let mut ex = extractor(20.0, 2);
        let trigger = 260;
        let sub = ex.sub_data(&store, Some(trigger), Some(trigger), TriggerMode::Normal);

        // pullback = 20 * (2 + 3) = 100, snapped to a channel boundary
        let start = 300 - sub.x.len();
        assert_eq!(start, 160);
        assert_eq!(sub.trigger_index, Some(trigger - start));
        // The re-based index points at the same sample
        assert_eq!(sub.x[trigger - start], trigger as f64);
    }

    #[test]
    fn test_normal_trigger_near_stream_start_clamps_to_zero() {
        let store = dense_store(50);
        let mut ex = extractor(20.0, 1);
        let sub = ex.sub_data(&store, Some(10), Some(10), TriggerMode::Normal);
        assert_eq!(sub.x.len(), 50);
        assert_eq!(sub.trigger_index, Some(10));
    }

    #[test]
    fn test_remembered_trigger_caps_forward_extent() {
        let store = dense_store(2000);
        let mut ex = extractor(20.0, 2);
        let last = 500;
        let sub = ex.sub_data(&store, None, Some(last), TriggerMode::Normal);

        // pullback 100, start 400, capped at start + 2 * 100
        let start = 400;
        assert_eq!(sub.x[0], start as f64);
        assert_eq!(sub.x.len(), 200);
        assert_eq!(sub.trigger_index, Some(last - start));
    }

    #[test]
    fn test_remembered_trigger_without_enough_data_exposes_rest() {
        let store = dense_store(520);
        let mut ex = extractor(20.0, 2);
        let sub = ex.sub_data(&store, None, Some(500), TriggerMode::Normal);
        assert_eq!(sub.x[0], 400.0);
        assert_eq!(sub.x.len(), 120, "cap beyond the stream end exposes the rest");
    }

    #[test]
    fn test_remembered_trigger_ignored_in_single_mode() {
        let store = dense_store(300);
        let mut ex = extractor(20.0, 1);
        let sub = ex.sub_data(&store, None, Some(100), TriggerMode::Single);
        // Plain sliding window; no anchor, no index
        assert_eq!(sub.trigger_index, None);
        assert_eq!(sub.x.len(), 21);
    }

    #[test]
    fn test_full_history_reports_last_normal_trigger_unshifted() {
        let store = dense_store(300);
        let mut ex = extractor(20.0, 1);
        ex.set_full_history(true);

        let sub = ex.sub_data(&store, None, Some(123), TriggerMode::Normal);
        assert_eq!(sub.x.len(), 300);
        assert_eq!(sub.trigger_index, Some(123));

        // A trigger firing this very tick is reported on the next one
        let sub = ex.sub_data(&store, Some(200), Some(200), TriggerMode::Normal);
        assert_eq!(sub.trigger_index, None);
    }

    #[test]
    fn test_out_of_slice_trigger_index_is_none() {
        let store = dense_store(10);
        let mut ex = extractor(20.0, 1);
        ex.set_full_history(true);
        // Stale index beyond the stream (store was cleared and refilled)
        let sub = ex.sub_data(&store, None, Some(50), TriggerMode::Normal);
        assert_eq!(sub.trigger_index, None);
    }

    #[test]
    fn test_zero_channel_count_is_clamped() {
        let mut ex = WindowExtractor::new();
        ex.set_num_channels(0);
        assert_eq!(ex.num_channels(), 1);
    }
}
