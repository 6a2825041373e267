// src/history.rs

use crate::error::{LagError, Result};
use crate::model::{CommitIndex, CommitRef};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use git2::{BranchType, Commit, Oid, Repository, Sort};
use tracing::{debug, info};

/// Builds the oldest-first index of commits on `branch` (or `HEAD`),
/// keeping only commits authored strictly after `after` (midnight UTC).
pub fn build_index(repo: &Repository, branch: Option<&str>, after: Option<NaiveDate>) -> Result<CommitIndex> {
    let tip = resolve_tip(repo, branch)?;
    let cutoff = after.map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));

    let mut revwalk = repo.revwalk()?;
    revwalk.push(tip)?;
    revwalk.simplify_first_parent()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;

    let mut commits = Vec::new();
    let mut skipped = 0usize;
    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let author_date = author_date(&commit)?;
        if cutoff.is_some_and(|cutoff| author_date <= cutoff) {
            skipped += 1;
            continue;
        }
        commits.push(CommitRef { sequence_index: commits.len(), commit_id: oid, author_date });
    }

    let branch_name = branch.unwrap_or("HEAD");
    if commits.is_empty() {
        let reason = match after {
            Some(date) => format!("no commits on {branch_name} authored after {date}"),
            None => format!("no commits on {branch_name}"),
        };
        return Err(LagError::EmptyHistory(reason));
    }

    info!(branch = branch_name, commits = commits.len(), skipped, "commit index built");
    Ok(CommitIndex::from_refs(commits))
}

/// Resolves a local branch, then `origin/<name>`, then any revspec.
fn resolve_tip(repo: &Repository, branch: Option<&str>) -> Result<Oid> {
    let Some(name) = branch else {
        return Ok(repo.head()?.peel_to_commit()?.id());
    };
    if let Ok(local) = repo.find_branch(name, BranchType::Local) {
        return Ok(local.get().peel_to_commit()?.id());
    }
    if let Ok(remote) = repo.find_branch(&format!("origin/{name}"), BranchType::Remote) {
        debug!(branch = name, "using remote-tracking branch");
        return Ok(remote.get().peel_to_commit()?.id());
    }
    Ok(repo.revparse_single(name)?.peel_to_commit()?.id())
}

fn author_date(commit: &Commit) -> Result<DateTime<Utc>> {
    let seconds = commit.author().when().seconds();
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| LagError::Git(git2::Error::from_str(&format!("commit {} has invalid author time {seconds}", commit.id()))))
}
