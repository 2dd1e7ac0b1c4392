//! Pipeline metric helpers and in-memory aggregation
//!
//! The free functions emit into the globally installed metrics recorder;
//! [`PipelineAggregator`] keeps a parallel in-memory view used for the
//! shutdown summary.

use metrics::{counter, gauge, histogram};

/// Record a coordinator batch flush.
pub fn record_batch_flushed(batch_size: usize) {
    counter!("pointlake_batches_total").increment(1);
    histogram!("pointlake_batch_size").record(batch_size as f64);
}

/// Record one compaction sweep.
pub fn record_compaction_sweep(files: usize, records: usize, failures: usize) {
    counter!("pointlake_compaction_sweeps_total").increment(1);
    gauge!("pointlake_compaction_last_files").set(files as f64);
    gauge!("pointlake_compaction_last_records").set(records as f64);
    if failures > 0 {
        counter!("pointlake_compaction_sweep_failures_total").increment(failures as u64);
    }
}

/// Record a completed query.
pub fn record_query_rows(rows: usize) {
    histogram!("pointlake_query_rows").record(rows as f64);
}

/// In-memory pipeline statistics.
///
/// Updated by the run loop alongside the recorder metrics; rendered once at
/// shutdown.
#[derive(Debug, Clone, Default)]
pub struct PipelineAggregator {
    /// Batches flushed by the coordinator
    pub total_batches: u64,

    /// Records across all flushed batches
    pub total_records: u64,

    /// Compaction sweeps observed
    pub total_sweeps: u64,

    /// Records moved into segments
    pub records_compacted: u64,

    /// Batch size statistics
    pub batch_stats: RunningStats,
}

impl PipelineAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one flushed batch.
    pub fn update_batch(&mut self, batch_size: usize) {
        self.total_batches += 1;
        self.total_records += batch_size as u64;
        self.batch_stats.push(batch_size as f64);
    }

    /// Fold in one compaction sweep.
    pub fn update_sweep(&mut self, records_compacted: usize) {
        self.total_sweeps += 1;
        self.records_compacted += records_compacted as u64;
    }

    /// Render the shutdown summary.
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_batches: self.total_batches,
            total_records: self.total_records,
            total_sweeps: self.total_sweeps,
            records_compacted: self.records_compacted,
            batch_size: StatsSummary::from(&self.batch_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shutdown summary
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub total_batches: u64,
    pub total_records: u64,
    pub total_sweeps: u64,
    pub records_compacted: u64,
    pub batch_size: StatsSummary,
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Summary ===")?;
        writeln!(f, "Batches flushed: {}", self.total_batches)?;
        writeln!(f, "Records ingested: {}", self.total_records)?;
        writeln!(f, "Compaction sweeps: {}", self.total_sweeps)?;
        writeln!(f, "Records compacted: {}", self.records_compacted)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        Ok(())
    }
}

/// Value statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
