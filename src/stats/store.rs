//! Diagnostic counters for an acquisition session

use chrono::{DateTime, Utc};

use crate::graph::store::TimeSeriesStore;

/// Running counters for one acquisition session.
///
/// Updated by the acquisition poll loop; read as a cloned snapshot.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// When this session (or the last clear) started
    started_at: DateTime<Utc>,
    /// Samples currently held in the store
    samples_ingested: u64,
    /// Timestamp counter wraps corrected so far
    wraps_observed: u64,
    /// Trigger edges detected so far
    triggers_fired: u64,
    /// Frame updates delivered to the renderer
    frames_published: u64,
    /// Most recent corrected timestamp
    last_timestamp: Option<u64>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            samples_ingested: 0,
            wraps_observed: 0,
            triggers_fired: 0,
            frames_published: 0,
            last_timestamp: None,
        }
    }

    /// Refresh the store-derived counters from the locked store.
    pub fn sync_store(&mut self, store: &TimeSeriesStore) {
        self.samples_ingested = store.len() as u64;
        self.wraps_observed = store.wrap_count();
        self.last_timestamp = store.last_timestamp();
    }

    pub fn record_trigger(&mut self) {
        self.triggers_fired += 1;
    }

    pub fn record_frame(&mut self) {
        self.frames_published += 1;
    }

    /// Reset all counters and restart the session clock.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested
    }

    pub fn wraps_observed(&self) -> u64 {
        self.wraps_observed
    }

    pub fn triggers_fired(&self) -> u64 {
        self.triggers_fired
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zeroed() {
        let stats = SessionStats::new();
        assert_eq!(stats.samples_ingested(), 0);
        assert_eq!(stats.triggers_fired(), 0);
        assert_eq!(stats.frames_published(), 0);
        assert_eq!(stats.last_timestamp(), None);
    }

    #[test]
    fn test_sync_from_store() {
        let mut store = TimeSeriesStore::new();
        store.add_point(65000, 1);
        store.add_point(10, 2);

        let mut stats = SessionStats::new();
        stats.sync_store(&store);
        assert_eq!(stats.samples_ingested(), 2);
        assert_eq!(stats.wraps_observed(), 1);
        assert_eq!(stats.last_timestamp(), Some(10 + 65536));
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut stats = SessionStats::new();
        stats.record_trigger();
        stats.record_frame();
        stats.record_frame();
        assert_eq!(stats.triggers_fired(), 1);
        assert_eq!(stats.frames_published(), 2);

        stats.clear();
        assert_eq!(stats.triggers_fired(), 0);
        assert_eq!(stats.frames_published(), 0);
    }
}
