//! Data channel seam between transports and the sample store
//!
//! Transports (serial framing, field-bus sockets) live outside this crate;
//! they are handed a [`SharedSeries`](crate::graph::store::SharedSeries) and
//! append `(timestamp, value)` samples under the store lock as frames
//! arrive. [`DataChannel`] is the lifecycle seam the acquisition session
//! drives: connect when acquisition starts, disconnect when it stops or a
//! single-shot capture settles.

pub mod generator;

use anyhow::Result;
use thiserror::Error;

/// Errors from the channel lifecycle seam.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("data channel is already connected")]
    AlreadyConnected,
}

/// A source of samples with an explicit connect/disconnect lifecycle.
///
/// Implementations own their producer thread (or I/O callbacks) and the
/// handle to the shared store they feed. `disconnect` must stop the
/// producer and wait for it to finish; no sample may be appended after it
/// returns. Both calls are invoked from the acquisition session only.
pub trait DataChannel: Send {
    /// Start producing samples into the shared store.
    fn connect(&mut self) -> Result<()>;

    /// Stop producing and join the producer. Idempotent.
    fn disconnect(&mut self);
}
