// src/model.rs

use chrono::{DateTime, Utc};
use git2::Oid;

/// Position of a commit in the filtered, oldest-first branch history
pub type CommitNo = usize;

/// A commit on the searched branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sequence_index: CommitNo,
    pub commit_id: Oid,
    pub author_date: DateTime<Utc>,
}

impl CommitRef {
    pub fn short_id(&self) -> String {
        let id = self.commit_id.to_string();
        id[..7.min(id.len())].to_string()
    }
}

/// Ordered commits of the branch, oldest first. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CommitIndex {
    commits: Vec<CommitRef>,
}

impl CommitIndex {
    /// Builds an index from commits already in chronological order,
    /// renumbering `sequence_index` from zero.
    pub fn from_refs(refs: impl IntoIterator<Item = CommitRef>) -> Self {
        let commits = refs
            .into_iter()
            .enumerate()
            .map(|(i, c)| CommitRef { sequence_index: i, ..c })
            .collect();
        Self { commits }
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn get(&self, index: CommitNo) -> Option<&CommitRef> {
        self.commits.get(index)
    }

    /// The newest commit of the branch
    pub fn head(&self) -> Option<&CommitRef> {
        self.commits.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommitRef> {
        self.commits.iter()
    }
}

/// Divergence between one commit's tree and the downstream snapshot.
///
/// `total_lines` and `total_files` describe the commit's tree. Lines present
/// only in the snapshot are `added_lines`, lines present only in the commit
/// are `removed_lines`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    pub commit_index: CommitNo,
    pub total_lines: u64,
    pub total_files: u64,
    pub added_lines: u64,
    pub removed_lines: u64,
    /// Files on one side only, or on both sides with different content
    pub different_files: u64,
    /// Files identical on both sides
    pub common_files: u64,
    /// Lines of identical files plus unchanged lines of differing files
    pub common_lines: u64,
}

impl ComparisonResult {
    pub fn changed_lines(&self) -> u64 {
        self.added_lines + self.removed_lines
    }
}

/// Window and winner after one convergence round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrace {
    pub step: usize,
    pub lower_bound: CommitNo,
    pub upper_bound: CommitNo,
    pub best: CommitNo,
}

/// Result of a search run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best: CommitNo,
    pub result: ComparisonResult,
    /// Every probed result, in probe order
    pub probes: Vec<ComparisonResult>,
    pub rounds: Vec<RoundTrace>,
    /// False when a time budget stopped the run before step 1 completed
    pub converged: bool,
}

/// How far the best match is behind the branch head
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TechLag {
    pub commits_behind: usize,
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl TechLag {
    pub fn changed_lines(&self) -> usize {
        self.insertions + self.deletions
    }
}
