// src/cli.rs

use chrono::NaiveDate;
use clap::Parser;
use git_lag::distance::Metric;
use git_lag::search::DEFAULT_RATIO;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the upstream commit a downstream source snapshot was most likely taken from", long_about = None)]
pub struct Args {
    /// Path to the upstream git repository
    #[arg(short, long)]
    pub repo: PathBuf,

    /// Downstream snapshot: a source directory or a Debian .dsc file
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Branch to search (defaults to HEAD)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Only consider commits authored after this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<NaiveDate>,

    /// Initial distance between sampled commits
    #[arg(long, conflicts_with = "ratio")]
    pub step: Option<usize>,

    /// Derive the initial step as commit count divided by this ratio
    #[arg(long, default_value_t = DEFAULT_RATIO)]
    pub ratio: usize,

    /// Divergence measure to minimize
    #[arg(long, value_enum, default_value_t = Metric::Lines)]
    pub metric: Metric,

    /// Probe the commits of each round in parallel
    #[arg(short, long)]
    pub jobs: bool,

    /// Stop refining after this many seconds, keeping the best match so far
    #[arg(long)]
    pub budget_secs: Option<u64>,

    /// Write every probed commit as a CSV row to this file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Name used in reports (defaults to the snapshot's file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Skip the comparison of the best match against the branch head
    #[arg(long)]
    pub no_lag: bool,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,
}

impl Args {
    pub fn report_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let stem = if self.snapshot.is_file() { self.snapshot.file_stem() } else { self.snapshot.file_name() };
        stem.map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| self.snapshot.display().to_string())
    }
}
