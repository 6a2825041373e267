// src/error.rs

use crate::model::{CommitNo, ComparisonResult};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, LagError>;

#[derive(Error, Debug)]
pub enum LagError {
    #[error("empty history: {0}")]
    EmptyHistory(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("probe of commit {index} failed after {} successful probes", .partial.len())]
    ProbeFailure {
        index: CommitNo,
        /// Results memoized before the failure, in probe order
        partial: Vec<ComparisonResult>,
        #[source]
        source: BoxError,
    },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}
