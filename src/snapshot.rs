// src/snapshot.rs

use crate::error::{LagError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Directories holding VCS or patch-queue state, never part of a release
const IGNORED_DIRS: &[&str] = &[".git", ".hg", ".svn", ".pc"];

/// Downstream source tree, held in memory.
///
/// Paths are relative to the snapshot root and use `/` separators, the
/// way git names tree entries.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    /// Loads a source directory, or extracts a Debian source package
    /// given its `.dsc` file.
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Self::from_dir(path);
        }
        if path.is_file() && path.extension().is_some_and(|ext| ext == "dsc") {
            return Self::from_dsc(path);
        }
        Err(LagError::Snapshot(format!(
            "{} is neither a directory nor a .dsc file",
            path.display()
        )))
    }

    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| !is_ignored(e));
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let file_type = entry.file_type();
            let content = if file_type.is_file() {
                fs::read(entry.path())?
            } else if file_type.is_symlink() {
                // git stores a symlink as a blob holding its target
                fs::read_link(entry.path())?.to_string_lossy().into_owned().into_bytes()
            } else {
                continue;
            };
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            files.insert(tree_path(relative), content);
        }
        info!(root = %root.display(), files = files.len(), "snapshot loaded");
        Ok(Self { files })
    }

    /// Extracts a Debian source package with `dpkg-source` into a scratch
    /// directory, then loads it. The `.orig` tarball and debian parts must sit
    /// next to the `.dsc` file.
    pub fn from_dsc(dsc: &Path) -> Result<Self> {
        let scratch = TempDir::new()?;
        let target = scratch.path().join("source");
        debug!(dsc = %dsc.display(), target = %target.display(), "extracting Debian source package");

        let output = Command::new("dpkg-source")
            .arg("--extract")
            .arg(dsc)
            .arg(&target)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| LagError::Snapshot(format!("failed to run dpkg-source: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LagError::Snapshot(format!(
                "dpkg-source could not extract {} ({}): {}",
                dsc.display(),
                output.status,
                stderr.trim()
            )));
        }
        Self::from_dir(&target)
    }

    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<Vec<u8>>,
    {
        Self { files: files.into_iter().map(|(p, c)| (p.into(), c.into())).collect() }
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(path, content)| (path.as_str(), content.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_ignored(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    match entry.file_name().to_str() {
        // worktrees and submodules carry a `.git` file pointing elsewhere
        Some(".git") => true,
        Some(name) => entry.file_type().is_dir() && IGNORED_DIRS.contains(&name),
        None => false,
    }
}

fn tree_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
