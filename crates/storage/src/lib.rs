//! Bucketed storage for telemetry events
//!
//! The write side is two-phased. Batches land first in append-only JSONL
//! staging logs partitioned by `(tenant, device, bucket)`. A background
//! compactor then rewrites each staged bucket into an immutable columnar
//! segment plus an index sidecar, and deletes the staging log.
//!
//! Readers go through the `query` crate, which consumes the index sidecars
//! and segment files written here.

mod compactor;
mod error;
mod index;
mod segment;
mod sink;
mod staging;

pub use compactor::{CompactionReport, Compactor};
pub use error::StorageError;
pub use index::{build_index_entry, read_index_entry, write_index_entry};
pub use segment::{read_segment, write_segment, SegmentColumns, SEGMENT_MAGIC, SEGMENT_VERSION};
pub use sink::ColumnarStorageSink;
pub use staging::StagingWriter;
