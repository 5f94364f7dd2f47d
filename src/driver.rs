//! Runs partitioning over a range of candidate group sizes and hands each result to a sink.

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::{
    features::FeatureSet,
    kmeans::Clusterer,
    partition::{partition, Partition},
    Error, Result,
};

/// Candidate maximum group sizes.
///
/// By default every size from 2 up to, but excluding, the number of classes is tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeRange {
    /// Smallest size to try. Defaults to 2.
    pub min: Option<usize>,
    /// Exclusive upper bound. Defaults to the number of classes.
    pub max: Option<usize>,
}

impl SizeRange {
    /// Resolve the candidate sizes for a set of `classes` classes.
    pub fn sizes(&self, classes: usize) -> Result<Range<usize>> {
        let min = self.min.unwrap_or(2);
        if min == 0 {
            return Err(Error::input("minimum group size must be at least 1"));
        }
        Ok(min..self.max.unwrap_or(classes))
    }
}

/// What to do when partitioning fails for one group size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Record the error and move on to the next size.
    Continue,
}

/// Configuration for `PartitionDriver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Seed passed to the clusterer for every group size.
    pub seed: u64,
    pub sizes: SizeRange,
    pub on_error: OnError,
    /// Partition different group sizes concurrently.
    pub parallel: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sizes: SizeRange::default(),
            on_error: OnError::Abort,
            parallel: false,
        }
    }
}

/// Receives each finished partition, e.g. to persist it.
pub trait PartitionSink: Send + Sync {
    /// Consume `partition`, whose identifiers index into `features`.
    fn write(&self, features: &FeatureSet, partition: &Partition) -> Result<()>;
}

/// Outcome of a driver run.
#[derive(Debug, Default)]
pub struct DriverReport {
    /// Group sizes whose partition was written, in ascending order.
    pub written: Vec<usize>,
    /// Group sizes that failed along with the error, in ascending order. Only populated when
    /// running with `OnError::Continue`.
    pub failed: Vec<(usize, Error)>,
}

/// Partitions a feature set once per candidate group size.
pub struct PartitionDriver<'a> {
    config: DriverConfig,
    clusterer: &'a dyn Clusterer,
}

impl<'a> PartitionDriver<'a> {
    pub fn new(config: DriverConfig, clusterer: &'a dyn Clusterer) -> Self {
        Self { config, clusterer }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Candidate sizes for `features`.
    pub fn sizes(&self, features: &FeatureSet) -> Result<Range<usize>> {
        self.config.sizes.sizes(features.len())
    }

    /// Partition `features` for each candidate size and write each result to `sink`.
    ///
    /// `progress` is invoked once for every size that finishes, successfully or not. Each size is
    /// independent; when running in parallel with `OnError::Abort` sizes other than the failing
    /// one may already have been written when the error is returned.
    pub fn run<S, P>(&self, features: &FeatureSet, sink: &S, progress: P) -> Result<DriverReport>
    where
        S: PartitionSink + ?Sized,
        P: Fn(u64) + Send + Sync,
    {
        if features.is_empty() {
            return Err(Error::input("no classes to partition"));
        }
        let sizes = self.sizes(features)?;
        if sizes.is_empty() {
            warn!(
                classes = features.len(),
                ?sizes,
                "no candidate group sizes; nothing to partition"
            );
            return Ok(DriverReport::default());
        }

        let run_size = |size: usize| -> Result<()> {
            let _span = info_span!("partition", size).entered();
            let result = partition(features, size, self.clusterer, self.config.seed)
                .and_then(|p| {
                    info!(groups = p.len(), "writing partition");
                    sink.write(features, &p)
                });
            progress(1);
            result
        };

        let mut report = DriverReport::default();
        let mut record = |size: usize, result: Result<()>| -> Result<()> {
            match result {
                Ok(()) => report.written.push(size),
                Err(e) => match self.config.on_error {
                    OnError::Abort => return Err(e),
                    OnError::Continue => {
                        warn!(size, error = %e, "partitioning failed; continuing");
                        report.failed.push((size, e));
                    }
                },
            }
            Ok(())
        };

        if self.config.parallel {
            let results = sizes
                .into_par_iter()
                .map(|size| (size, run_size(size)))
                .collect::<Vec<_>>();
            for (size, result) in results {
                record(size, result)?;
            }
        } else {
            for size in sizes {
                record(size, run_size(size))?;
            }
        }
        Ok(report)
    }
}
