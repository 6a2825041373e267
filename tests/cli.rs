use assert_cmd::Command;
use git2::{ObjectType, Oid, Repository, RepositoryInitOptions, Signature, Time};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const START: i64 = 1_450_000_000;
const DAY: i64 = 86_400;

/// Upstream history where commit `i` holds a file with lines 0..=i
fn upstream(commits: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();

    for i in 0..commits {
        fs::write(dir.path().join("lines.txt"), numbered(i + 1)).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("lines.txt")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Dev", "dev@example.com", &Time::new(START + i as i64 * DAY, 0)).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, &format!("line {i}"), &tree, &parents).unwrap();
    }
    dir
}

fn numbered(count: usize) -> String {
    (0..count).map(|n| format!("line {n}\n")).collect()
}

fn snapshot_of(count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lines.txt"), numbered(count)).unwrap();
    dir
}

#[test]
fn finds_matching_commit_and_reports_lag() {
    let repo = upstream(12);
    let snapshot = snapshot_of(8);
    let out = TempDir::new().unwrap();
    let csv = out.path().join("audit.csv");

    Command::cargo_bin("git-lag")
        .unwrap()
        .arg("--repo")
        .arg(repo.path())
        .arg("--snapshot")
        .arg(snapshot.path())
        .args(["--step", "4", "--name", "demo"])
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo: most similar upstream commit is 7 ("))
        .stdout(predicate::str::contains("changed lines 0"))
        .stdout(predicate::str::contains(
            "demo: technical lag to head is 4 (commits), 4 (lines), 1 (files)",
        ));

    let audit = fs::read_to_string(&csv).unwrap();
    let rows: Vec<&str> = audit.lines().skip(1).collect();
    assert!(rows.iter().all(|row| row.starts_with("demo,")));
    assert!(rows.iter().any(|row| row.starts_with("demo,7,")));
    assert!(rows.len() < 12);
}

#[test]
fn parallel_probing_gives_the_same_answer() {
    let repo = upstream(20);
    let snapshot = snapshot_of(14);

    Command::cargo_bin("git-lag")
        .unwrap()
        .arg("--repo")
        .arg(repo.path())
        .arg("--snapshot")
        .arg(snapshot.path())
        .args(["--ratio", "3", "--jobs", "--no-lag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("most similar upstream commit is 13 ("))
        .stdout(predicate::str::contains("technical lag").not());
}

#[test]
fn failed_search_still_writes_the_audit_so_far() {
    let repo = upstream(12);
    let snapshot = snapshot_of(8);
    let out = TempDir::new().unwrap();
    let csv = out.path().join("audit.csv");

    // drop the only blob of commit 4, the second one sampled with step 4
    let blob = Oid::hash_object(ObjectType::Blob, numbered(5).as_bytes()).unwrap().to_string();
    fs::remove_file(repo.path().join(".git/objects").join(&blob[..2]).join(&blob[2..])).unwrap();

    Command::cargo_bin("git-lag")
        .unwrap()
        .arg("--repo")
        .arg(repo.path())
        .arg("--snapshot")
        .arg(snapshot.path())
        .args(["--step", "4", "--name", "demo"])
        .arg("--csv")
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("probing commit 4"))
        .stdout(predicate::str::is_empty());

    let audit = fs::read_to_string(&csv).unwrap();
    let rows: Vec<&str> = audit.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("demo,0,"));
}

#[test]
fn commits_before_cutoff_are_ignored() {
    let repo = upstream(5);
    let snapshot = snapshot_of(5);

    Command::cargo_bin("git-lag")
        .unwrap()
        .arg("--repo")
        .arg(repo.path())
        .arg("--snapshot")
        .arg(snapshot.path())
        .args(["--after", "2100-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty history"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_repository_fails() {
    let snapshot = snapshot_of(1);

    Command::cargo_bin("git-lag")
        .unwrap()
        .args(["--repo", "/nonexistent/upstream"])
        .arg("--snapshot")
        .arg(snapshot.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening upstream repository"));
}
