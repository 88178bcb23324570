//! Logging setup for the `recordshape` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary.

mod logger;

pub use logger::{build_filter, init_logging};
