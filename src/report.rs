// src/report.rs

use crate::distance::Metric;
use crate::error::Result;
use crate::model::{CommitIndex, CommitRef, ComparisonResult, TechLag};
use chrono::SecondsFormat;
use std::io::Write;

const AUDIT_HEADER: &str =
    "name,sequence,hash,date,total_lines,total_files,added_lines,removed_lines,different_files,common_files,common_lines";

/// One-line summary of the winning commit
pub fn final_line(name: &str, commit: &CommitRef, result: &ComparisonResult, metric: Metric) -> String {
    format!(
        "{name}: most similar upstream commit is {} ({}, {}), {} {}: total_lines={}, total_files={}, added_lines={}, removed_lines={}",
        commit.sequence_index,
        commit.commit_id,
        commit.author_date.to_rfc3339_opts(SecondsFormat::Secs, true),
        metric.label(),
        metric.value(result),
        result.total_lines,
        result.total_files,
        result.added_lines,
        result.removed_lines,
    )
}

pub fn lag_line(name: &str, lag: &TechLag) -> String {
    format!(
        "{name}: technical lag to head is {} (commits), {} (lines), {} (files)",
        lag.commits_behind,
        lag.changed_lines(),
        lag.files_changed,
    )
}

/// CSV stream with one row per probed commit, for checking convergence offline
pub struct AuditWriter<W: Write> {
    out: W,
    name: String,
}

impl<W: Write> AuditWriter<W> {
    pub fn new(mut out: W, name: &str) -> Result<Self> {
        writeln!(out, "{AUDIT_HEADER}")?;
        Ok(Self { out, name: csv_field(name) })
    }

    pub fn write_probe(&mut self, commit: &CommitRef, result: &ComparisonResult) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.name,
            commit.sequence_index,
            commit.short_id(),
            commit.author_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            result.total_lines,
            result.total_files,
            result.added_lines,
            result.removed_lines,
            result.different_files,
            result.common_files,
            result.common_lines,
        )?;
        Ok(())
    }

    /// Writes every probe in order, resolving commits through `index`
    pub fn write_all(&mut self, index: &CommitIndex, probes: &[ComparisonResult]) -> Result<()> {
        for result in probes {
            if let Some(commit) = index.get(result.commit_index) {
                self.write_probe(commit, result)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
