//! Session diagnostics
//!
//! Internal counters describing the current acquisition session
//! ([`store`]). Purely diagnostic; nothing here is exported anywhere.

pub mod store;
