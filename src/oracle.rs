// src/oracle.rs

//! Distance oracle comparing commit trees against a downstream snapshot.
//!
//! Trees are read straight from the object database, so probing never
//! touches a working copy. Each probe borrows its own [`Repository`] handle
//! from a pool, which makes concurrent probes safe.

use crate::error::Result;
use crate::model::{CommitRef, ComparisonResult};
use crate::snapshot::Snapshot;
use git2::{ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// Line count and blob id of one snapshot file
#[derive(Debug, Clone, Copy)]
struct LocalFile {
    blob_id: Oid,
    lines: u64,
}

pub struct TreeDiffOracle<'s> {
    repo_path: PathBuf,
    snapshot: &'s Snapshot,
    local: HashMap<&'s str, LocalFile>,
    handles: Mutex<Vec<Repository>>,
}

impl<'s> TreeDiffOracle<'s> {
    pub fn new(repo_path: &Path, snapshot: &'s Snapshot) -> Result<Self> {
        let mut local = HashMap::with_capacity(snapshot.len());
        for (path, content) in snapshot.iter() {
            let blob_id = Oid::hash_object(ObjectType::Blob, content)?;
            local.insert(path, LocalFile { blob_id, lines: count_lines(content) });
        }
        let first = Repository::open(repo_path)?;
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
            snapshot,
            local,
            handles: Mutex::new(vec![first]),
        })
    }

    /// Compares `commit`'s tree with the snapshot.
    pub fn compare(&self, commit: &CommitRef) -> Result<ComparisonResult> {
        self.with_repo(|repo| self.compare_in(repo, commit))
    }

    fn compare_in(&self, repo: &Repository, commit: &CommitRef) -> Result<ComparisonResult> {
        let tree = repo.find_commit(commit.commit_id)?.tree()?;

        let mut upstream = BTreeMap::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let name = String::from_utf8_lossy(entry.name_bytes());
                upstream.insert(format!("{root}{name}"), entry.id());
            }
            TreeWalkResult::Ok
        })?;

        let mut result = ComparisonResult { commit_index: commit.sequence_index, ..Default::default() };
        for (path, blob_id) in &upstream {
            result.total_files += 1;
            match self.local.get(path.as_str()) {
                Some(local) if local.blob_id == *blob_id => {
                    result.total_lines += local.lines;
                    result.common_lines += local.lines;
                    result.common_files += 1;
                }
                Some(_) => {
                    let blob = repo.find_blob(*blob_id)?;
                    let theirs = self.snapshot.get(path).unwrap_or_default();
                    let lines = diff_lines(blob.content(), theirs);
                    result.total_lines += count_lines(blob.content());
                    result.added_lines += lines.added;
                    result.removed_lines += lines.removed;
                    result.common_lines += lines.equal;
                    result.different_files += 1;
                }
                None => {
                    let lines = count_lines(repo.find_blob(*blob_id)?.content());
                    result.total_lines += lines;
                    result.removed_lines += lines;
                    result.different_files += 1;
                }
            }
        }
        for (path, local) in &self.local {
            if !upstream.contains_key(*path) {
                result.added_lines += local.lines;
                result.different_files += 1;
            }
        }

        trace!(commit = %commit.commit_id, ?result, "compared tree");
        Ok(result)
    }

    /// Runs `f` with a repository handle taken from the pool (or freshly
    /// opened), putting the handle back afterwards.
    fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let pooled = self.handles.lock().unwrap_or_else(|e| e.into_inner()).pop();
        let repo = match pooled {
            Some(repo) => repo,
            None => Repository::open(&self.repo_path)?,
        };
        let result = f(&repo);
        self.handles.lock().unwrap_or_else(|e| e.into_inner()).push(repo);
        result
    }
}

/// Lines in `content`, counting a final unterminated line
pub fn count_lines(content: &[u8]) -> u64 {
    let newlines = content.iter().filter(|&&b| b == b'\n').count() as u64;
    match content.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Check if content is binary (contains null bytes in first 8KB)
fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Line changes going from upstream to snapshot within one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LineDelta {
    added: u64,
    removed: u64,
    equal: u64,
}

/// Lines added, removed and kept going from `ours` (upstream) to `theirs` (snapshot)
fn diff_lines(ours: &[u8], theirs: &[u8]) -> LineDelta {
    if is_binary(ours) || is_binary(theirs) {
        return LineDelta { added: count_lines(theirs), removed: count_lines(ours), equal: 0 };
    }
    let ours = String::from_utf8_lossy(ours);
    let theirs = String::from_utf8_lossy(theirs);
    let diff = TextDiff::from_lines(&ours, &theirs);

    diff.iter_all_changes().fold(LineDelta::default(), |mut delta, change| {
        match change.tag() {
            ChangeTag::Insert => delta.added += 1,
            ChangeTag::Delete => delta.removed += 1,
            ChangeTag::Equal => delta.equal += 1,
        }
        delta
    })
}
