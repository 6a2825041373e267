// src/testing.rs

//! Throwaway git repositories for unit tests.

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const DAY: i64 = 86_400;

pub struct TestRepo {
    pub repo: Repository,
    pub dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("init repository");
        Self { repo, dir }
    }

    /// Commits exactly `files` as the tree on top of `HEAD`, authored at
    /// `seconds` since the epoch.
    pub fn commit(&self, files: &[(&str, &str)], seconds: i64) -> Oid {
        self.commit_with_links(files, &[], seconds)
    }

    /// Like [`TestRepo::commit`], adding `(link, target)` symlinks to the tree.
    pub fn commit_with_links(&self, files: &[(&str, &str)], links: &[(&str, &str)], seconds: i64) -> Oid {
        let tree = self.stage(files, links);
        let parents: Vec<Oid> = self.head().into_iter().collect();
        self.commit_tree(tree, seconds, &parents, Some("HEAD"))
    }

    /// Writes and stages exactly `files` and `links`, returning the tree id.
    pub fn stage(&self, files: &[(&str, &str)], links: &[(&str, &str)]) -> Oid {
        let workdir = self.dir.path();
        let mut index = self.repo.index().expect("open index");
        index.clear().expect("clear index");
        write_tree(workdir, files);
        for (link, target) in links {
            symlink(target, &workdir.join(link));
        }
        for (path, _) in files.iter().chain(links) {
            index.add_path(Path::new(path)).expect("stage file");
        }
        index.write().expect("write index");
        index.write_tree().expect("write tree")
    }

    /// Commits `tree` with explicit `parents`. With `update_ref` unset the
    /// commit is only reachable through its children.
    pub fn commit_tree(&self, tree: Oid, seconds: i64, parents: &[Oid], update_ref: Option<&str>) -> Oid {
        let tree = self.repo.find_tree(tree).expect("find tree");
        let parents: Vec<_> = parents
            .iter()
            .map(|id| self.repo.find_commit(*id).expect("find parent"))
            .collect();
        let parents: Vec<_> = parents.iter().collect();
        let signature = Signature::new("Upstream Dev", "dev@example.com", &Time::new(seconds, 0)).expect("signature");
        self.repo
            .commit(update_ref, &signature, &signature, &format!("commit at {seconds}"), &tree, &parents)
            .expect("commit")
    }

    pub fn head(&self) -> Option<Oid> {
        self.repo.head().ok().and_then(|head| head.peel_to_commit().ok()).map(|c| c.id())
    }

    pub fn branch(&self, name: &str, target: Oid) {
        let commit = self.repo.find_commit(target).expect("find commit");
        self.repo.branch(name, &commit, false).expect("create branch");
    }
}

/// Writes `files` under `root`, creating directories as needed.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(full, content).expect("write file");
    }
}

/// Creates (or replaces) a symlink at `link` pointing to `target`.
#[cfg(unix)]
pub fn symlink(target: &str, link: &Path) {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).expect("remove old link");
    }
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    std::os::unix::fs::symlink(target, link).expect("create symlink");
}

#[cfg(not(unix))]
pub fn symlink(_target: &str, _link: &Path) {
    panic!("symlink fixtures need a unix host");
}
