// src/distance.rs

use crate::model::{CommitNo, ComparisonResult};
use std::cmp::Ordering;

/// Which comparison counter ranks the commits
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Metric {
    /// Lines added plus lines removed (fewer is closer)
    #[default]
    Lines,
    /// Files that differ or exist on one side only (fewer is closer)
    Files,
    /// Lines shared with the snapshot (more is closer)
    CommonLines,
}

impl Metric {
    /// The counter this metric reads, as reported
    pub fn value(self, result: &ComparisonResult) -> u64 {
        match self {
            Metric::Lines => result.changed_lines(),
            Metric::Files => result.different_files,
            Metric::CommonLines => result.common_lines,
        }
    }

    /// Scalar where lower is closer. Similarity counters are flipped.
    pub fn distance(self, result: &ComparisonResult) -> u64 {
        match self {
            Metric::Lines | Metric::Files => self.value(result),
            Metric::CommonLines => u64::MAX - self.value(result),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Lines => "changed lines",
            Metric::Files => "different files",
            Metric::CommonLines => "common lines",
        }
    }

    /// Total order used to pick a best commit. Equal distances go to the
    /// earlier commit, on the assumption that a downstream release derives
    /// from the oldest commit reaching minimal divergence.
    pub fn compare(self, a: &ComparisonResult, b: &ComparisonResult) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    fn key(self, result: &ComparisonResult) -> (u64, CommitNo) {
        (self.distance(result), result.commit_index)
    }

    /// Best of `results` under [`Metric::compare`], or `None` if empty
    pub fn best<'a, I>(self, results: I) -> Option<&'a ComparisonResult>
    where
        I: IntoIterator<Item = &'a ComparisonResult>,
    {
        results.into_iter().min_by(|a, b| self.compare(a, b))
    }
}
