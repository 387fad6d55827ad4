//! Most-recent value per channel, for the non-scrolling block display

use super::store::{SharedSeries, TimeSeriesStore};

/// Latest value of every channel in the interleaved stream.
///
/// Scans backward from the newest sample and stops as soon as each channel
/// has been seen once, so a healthy round-robin stream costs one frame of
/// lookback. Channels with no samples yet report zero.
pub fn latest_values(store: &TimeSeriesStore, num_channels: usize) -> Vec<f64> {
    let num_channels = num_channels.max(1);
    let mut values = vec![0.0; num_channels];
    let mut found = vec![false; num_channels];
    let mut remaining = num_channels;

    let y = store.y();
    for i in (0..y.len()).rev() {
        if remaining == 0 {
            break;
        }
        let channel = i % num_channels;
        if found[channel] {
            continue;
        }
        values[channel] = y[i] as f64;
        found[channel] = true;
        remaining -= 1;
    }

    values
}

/// Pull-based reader for the block display.
///
/// Holds its own handle to the shared store and takes the store lock per
/// query, mirroring the locking discipline of the producers.
#[derive(Debug)]
pub struct LatestValueExtractor {
    series: SharedSeries,
    num_channels: usize,
}

impl LatestValueExtractor {
    pub fn new(series: SharedSeries, num_channels: usize) -> Self {
        Self {
            series,
            num_channels: num_channels.max(1),
        }
    }

    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.num_channels = num_channels.max(1);
    }

    /// Latest value per channel; zero-filled when the store is empty or
    /// the lock is unavailable.
    pub fn extract_variable_values(&self) -> Vec<f64> {
        if let Ok(store) = self.series.lock() {
            latest_values(&store, self.num_channels)
        } else {
            vec![0.0; self.num_channels]
        }
    }

    /// Drop all stored samples.
    pub fn clear_data(&self) {
        if let Ok(mut store) = self.series.lock() {
            store.clear();
        }
    }
}
