//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures and
//! traits. All business crates can only depend on this crate, reverse
//! dependencies are prohibited.
//!
//! ## Time Model
//! - `occurred_at` is producer event time, `ingested_at` is server receipt time
//! - Both are UTC; staging buckets are keyed by `ingested_at`, index pruning
//!   by `occurred_at`

mod actor;
mod bucket;
mod config;
mod envelope;
mod error;
mod index;
mod partition;
mod point;
mod sink;

pub use actor::*;
pub use bucket::*;
pub use config::*;
pub use envelope::*;
pub use error::*;
pub use index::*;
pub use partition::*;
pub use point::*;
pub use sink::*;
