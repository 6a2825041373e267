// src/lib.rs

//! Estimates which upstream commit a downstream source snapshot (a release
//! tarball, a distribution package) was derived from, by searching the
//! branch history for the tree with the smallest line divergence.

pub mod distance;
pub mod error;
pub mod history;
pub mod lag;
pub mod model;
pub mod oracle;
pub mod report;
pub mod search;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use distance::Metric;
pub use error::{LagError, Result};
pub use model::{CommitIndex, CommitRef, ComparisonResult, SearchOutcome};
pub use search::{find_best, find_best_parallel, SearchConfig};
