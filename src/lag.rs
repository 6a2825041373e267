// src/lag.rs

use crate::error::{LagError, Result};
use crate::model::{CommitIndex, CommitNo, TechLag};
use git2::{DiffOptions, Repository};
use tracing::debug;

/// How far commit `best` is behind the newest commit of the index: the
/// number of commits in between and the tree diff from `best` to the head.
pub fn technical_lag(repo: &Repository, index: &CommitIndex, best: CommitNo) -> Result<TechLag> {
    let (Some(from), Some(head)) = (index.get(best), index.head()) else {
        return Err(LagError::InvalidConfiguration(format!(
            "commit {best} is outside an index of {} commits",
            index.len()
        )));
    };

    let from_tree = repo.find_commit(from.commit_id)?.tree()?;
    let head_tree = repo.find_commit(head.commit_id)?.tree()?;

    let mut diff_opts = DiffOptions::new();
    diff_opts.ignore_filemode(true);

    let diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&head_tree), Some(&mut diff_opts))?;
    let stats = diff.stats()?;
    let lag = TechLag {
        commits_behind: head.sequence_index - from.sequence_index,
        files_changed: stats.files_changed(),
        insertions: stats.insertions(),
        deletions: stats.deletions(),
    };
    debug!(from = %from.commit_id, head = %head.commit_id, ?lag, "technical lag computed");
    Ok(lag)
}
