//! Scope configuration
//!
//! The knobs the embedding application sets before (or between)
//! acquisition sessions, stored as a JSON file. Unknown fields are
//! ignored and missing fields fall back to defaults, so configs written
//! by older builds keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::trigger::TriggerMode;

fn default_num_channels() -> usize {
    1
}

fn default_window_width() -> f64 {
    crate::DEFAULT_WINDOW_WIDTH
}

fn default_timestamp_bits() -> u32 {
    crate::DEFAULT_TIMESTAMP_BITS
}

fn default_poll_interval_ms() -> u64 {
    crate::DEFAULT_POLL_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

/// Per-channel display/trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Display name of the variable carried on this channel
    pub name: String,
    /// Whether edges on this channel may fire the trigger
    #[serde(default = "default_true")]
    pub triggerable: bool,
}

/// Trigger setup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerConfig {
    /// Arm the trigger as soon as the session starts
    #[serde(default)]
    pub enabled: bool,
    /// Threshold value
    #[serde(default)]
    pub level: f64,
    #[serde(default)]
    pub mode: TriggerMode,
}

/// Full configuration of one acquisition session.
///
/// Changing `num_channels` or `timestamp_bits` between sessions requires
/// clearing the store; existing samples were interleaved and corrected
/// under the old values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Number of interleaved channels (>= 1)
    #[serde(default = "default_num_channels")]
    pub num_channels: usize,
    /// View width in X-axis time units
    #[serde(default = "default_window_width")]
    pub window_width: f64,
    /// Show the entire history instead of a sliding window
    #[serde(default)]
    pub full_history: bool,
    /// Width of the device's timestamp counter in bits
    #[serde(default = "default_timestamp_bits")]
    pub timestamp_bits: u32,
    /// Renderer update cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub trigger: TriggerConfig,
    /// Per-channel settings; channels beyond this list use defaults
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            num_channels: default_num_channels(),
            window_width: default_window_width(),
            full_history: false,
            timestamp_bits: default_timestamp_bits(),
            poll_interval_ms: default_poll_interval_ms(),
            trigger: TriggerConfig::default(),
            channels: Vec::new(),
        }
    }
}

impl ScopeConfig {
    /// Load a config from disk, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded scope config");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse scope config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No scope config found, using defaults");
                Self::default()
            }
        }
    }

    /// Save the config to disk, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Scope config saved");
        Ok(())
    }

    /// Per-channel triggerable flags in channel order.
    pub fn triggerable_flags(&self) -> Vec<bool> {
        self.channels.iter().map(|c| c.triggerable).collect()
    }
}
