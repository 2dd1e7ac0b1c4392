//! Built-in sinks
//!
//! The columnar storage sink lives in the `storage` crate; only the trivial
//! logging sink is defined here.

mod log;

pub use log::LogEventSink;
