//! BalancedGroups partitions a set of per-class feature vectors into groups of bounded size.
//!
//! Centroids are estimated with k-means over the class vectors and then each centroid, in
//! turn, greedily claims the closest classes that have not yet been claimed. The resulting
//! groups keep similar classes together while never exceeding the requested group size, which
//! makes each group a reasonable unit of work for a dedicated sub-model.

pub mod config;
pub mod dataset;
pub mod distance;
pub mod driver;
pub mod features;
pub mod input;
pub mod kmeans;
pub mod output;
pub mod partition;

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors produced while building or partitioning a feature set.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty or invalid input set, or invalid size/count parameters.
    #[error("invalid input: {0}")]
    Input(String),
    /// A vector did not have the expected number of dimensions.
    #[error("{context}: expected {expected} dimensions but found {actual}")]
    Shape {
        context: String,
        expected: usize,
        actual: usize,
    },
    /// An expected file or directory does not exist.
    #[error("missing resource: {}", .0.display())]
    MissingResource(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Shape {
            context: context.into(),
            expected,
            actual,
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        let kind = match &value {
            Error::Io(e) => e.kind(),
            Error::MissingResource(_) => io::ErrorKind::NotFound,
            _ => io::ErrorKind::InvalidInput,
        };
        match value {
            Error::Io(e) => e,
            e => io::Error::new(kind, e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
