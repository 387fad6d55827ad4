//! Wavescope - real-time telemetry capture, windowing, and trigger engine
//!
//! This library is the data core of an oscilloscope-style telemetry viewer:
//! producer threads append multiplexed `(timestamp, value)` samples as they
//! arrive from an embedded device, and a fixed-cadence poll loop answers
//! "what slice should be shown now, and did a trigger fire".
//!
//! - Overflow-corrected sample storage, windowing, and trigger detection
//!   live in [`graph`]
//! - [`session`] owns the store lock, the poll loop, and the lifecycle
//! - [`channel`] is the seam to transports, with a built-in generator
//! - [`config`] and [`stats`] carry the configuration surface and session
//!   diagnostics
//!
//! Transports, rendering, and UI composition are external collaborators;
//! this crate never parses wire protocols and never draws pixels.

pub mod channel;
pub mod config;
pub mod graph;
pub mod session;
pub mod stats;

pub use channel::generator::GeneratorChannel;
pub use channel::DataChannel;
pub use config::{ChannelConfig, ScopeConfig, TriggerConfig};
pub use graph::block::LatestValueExtractor;
pub use graph::store::{SharedSeries, TimeSeriesStore};
pub use graph::trigger::{TriggerEngine, TriggerMode};
pub use graph::window::{SubData, WindowExtractor};
pub use session::{AcquisitionSession, FrameUpdate};
pub use stats::store::SessionStats;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default width of the hardware timestamp counter in bits
pub const DEFAULT_TIMESTAMP_BITS: u32 = 16;

/// Default renderer update cadence in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default view width in X-axis time units
pub const DEFAULT_WINDOW_WIDTH: f64 = 75.0;
