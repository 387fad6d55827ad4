//! Time-series sample storage with hardware timestamp correction
//!
//! Holds the raw acquisition history as two parallel sequences: corrected
//! timestamps (`x`) and channel values (`y`). Logical channels are interleaved
//! round-robin, so the sample at global index `i` belongs to channel
//! `i % num_channels`.
//!
//! Embedded devices report time from a fixed-width free-running counter that
//! wraps back to zero after `2^bit_width` ticks. The store detects each wrap
//! and adds the accumulated offset to every appended timestamp, keeping the
//! stored `x` sequence non-decreasing.

use std::sync::{Arc, Mutex};

/// Shared handle to the store.
///
/// One mutex guards both sequences and the correction state as a unit.
/// Readers that span `x` and `y` (windowing, trigger scans) hold the same
/// lock as writers, so they never observe mismatched lengths or a
/// half-applied wrap correction.
pub type SharedSeries = Arc<Mutex<TimeSeriesStore>>;

/// Append-only dual sequence of corrected time and value samples.
#[derive(Debug)]
pub struct TimeSeriesStore {
    /// Corrected timestamps, non-decreasing
    x: Vec<u64>,
    /// Channel values, interleaved round-robin
    y: Vec<u32>,
    /// Width of the hardware timestamp counter in bits
    bit_width: u32,
    /// Last uncorrected timestamp seen
    last_raw: u32,
    /// Total offset added so far to compensate for counter wraps
    accumulated_offset: u64,
    /// Number of wraps observed since the last clear
    wrap_count: u64,
}

impl TimeSeriesStore {
    /// Create an empty store with the default 16-bit timestamp counter.
    pub fn new() -> Self {
        Self::with_bit_width(crate::DEFAULT_TIMESTAMP_BITS)
    }

    /// Create an empty store for a counter of the given width in bits.
    pub fn with_bit_width(bit_width: u32) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            bit_width,
            last_raw: 0,
            accumulated_offset: 0,
            wrap_count: 0,
        }
    }

    /// Wrap the store in the shared handle used by producers and the
    /// acquisition session.
    pub fn into_shared(self) -> SharedSeries {
        Arc::new(Mutex::new(self))
    }

    /// Append one sample, correcting the timestamp for counter wraparound.
    ///
    /// A raw timestamp smaller than its predecessor is taken as exactly one
    /// wrap of the `bit_width`-wide counter. At most one wrap between
    /// consecutive samples is assumed; if the producer stalls for longer
    /// than a full counter period, the missed wraps are under-counted.
    pub fn add_point(&mut self, raw_time: u32, value: u32) {
        if !self.x.is_empty() && raw_time < self.last_raw {
            self.accumulated_offset += 1u64 << self.bit_width;
            self.wrap_count += 1;
            tracing::debug!(
                raw = raw_time,
                previous = self.last_raw,
                offset = self.accumulated_offset,
                "timestamp counter wrapped"
            );
        }
        self.last_raw = raw_time;
        self.x.push(raw_time as u64 + self.accumulated_offset);
        self.y.push(value);
    }

    /// Empty both sequences and reset the wrap-correction state.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.last_raw = 0;
        self.accumulated_offset = 0;
        self.wrap_count = 0;
    }

    /// Set the timestamp counter width.
    ///
    /// Must happen before the first sample of a session; changing it with
    /// data present leaves already-corrected timestamps inconsistent.
    pub fn set_bit_width(&mut self, bit_width: u32) {
        if !self.x.is_empty() {
            tracing::warn!(
                bit_width,
                samples = self.x.len(),
                "timestamp width changed mid-session; clear the store before reconfiguring"
            );
        }
        self.bit_width = bit_width;
    }

    /// Timestamp counter width in bits.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Number of samples stored.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Corrected timestamps.
    pub fn x(&self) -> &[u64] {
        &self.x
    }

    /// Channel values.
    pub fn y(&self) -> &[u32] {
        &self.y
    }

    /// Most recent corrected timestamp, if any.
    pub fn last_timestamp(&self) -> Option<u64> {
        self.x.last().copied()
    }

    /// Number of counter wraps observed since the last clear.
    pub fn wrap_count(&self) -> u64 {
        self.wrap_count
    }
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}
