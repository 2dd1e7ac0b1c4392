//! Pruning query engine
//!
//! Answers range scans over compacted buckets. The engine walks the bucket
//! grid covering the requested window, consults each bucket's index sidecar
//! to skip segments that cannot contribute rows, and only decodes the
//! segments that survive pruning.

mod engine;
mod error;

pub use engine::{QueryEngine, QueryRequest, QueryRow};
pub use error::QueryError;
