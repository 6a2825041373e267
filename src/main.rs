// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use git2::Repository;
use git_lag::error::LagError;
use git_lag::history::build_index;
use git_lag::lag::technical_lag;
use git_lag::model::{CommitIndex, ComparisonResult};
use git_lag::oracle::TreeDiffOracle;
use git_lag::report::{final_line, lag_line, AuditWriter};
use git_lag::search::{find_best, find_best_parallel, initial_step_for, ProbeResult, SearchConfig};
use git_lag::snapshot::Snapshot;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{info, warn};

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let name = args.report_name();

    let repo = Repository::open(&args.repo)
        .with_context(|| format!("opening upstream repository {}", args.repo.display()))?;
    let index = build_index(&repo, args.branch.as_deref(), args.after)?;
    let snapshot = Snapshot::load(&args.snapshot)?;
    info!(commits = index.len(), files = snapshot.len(), "inputs ready in {:.2?}", start_time.elapsed());

    let step = match args.step {
        Some(step) => step,
        None => initial_step_for(index.len(), args.ratio)?,
    };
    let mut config = SearchConfig::new(step).with_metric(args.metric);
    if let Some(secs) = args.budget_secs {
        config = config.with_budget(Duration::from_secs(secs));
    }

    let oracle = TreeDiffOracle::new(&args.repo, &snapshot)?;
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg} {pos} probed [{elapsed}]")?);
    bar.set_message("Probing commits");

    let probe = |commit_no| -> ProbeResult {
        let commit = index
            .get(commit_no)
            .ok_or_else(|| LagError::InvalidConfiguration(format!("commit {commit_no} is not in the index")))?;
        let result = oracle.compare(commit)?;
        bar.inc(1);
        Ok(result)
    };
    let outcome = if args.jobs {
        find_best_parallel(index.len(), &config, probe)
    } else {
        find_best(index.len(), &config, probe)
    };
    bar.finish_and_clear();
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            // keep the trail of an aborted search for offline inspection
            if let (Some(path), LagError::ProbeFailure { partial, .. }) = (&args.csv, &err) {
                if let Err(audit_err) = write_audit(path, &name, &index, partial) {
                    warn!("could not write the partial audit: {audit_err:#}");
                }
            }
            return Err(describe_failure(err, &index));
        }
    };

    if let Some(path) = &args.csv {
        write_audit(path, &name, &index, &outcome.probes)?;
    }
    if !outcome.converged {
        warn!("time budget ran out, the reported commit is the best found so far");
    }

    let best = index.get(outcome.best).context("best commit missing from index")?;
    println!("{}", final_line(&name, best, &outcome.result, args.metric));
    info!(
        "Probed {} of {} commits in {:.2?}.",
        outcome.probes.len(),
        index.len(),
        start_time.elapsed()
    );

    if !args.no_lag {
        let lag = technical_lag(&repo, &index, outcome.best)?;
        println!("{}", lag_line(&name, &lag));
    }
    Ok(())
}

fn write_audit(path: &Path, name: &str, index: &CommitIndex, probes: &[ComparisonResult]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut audit = AuditWriter::new(BufWriter::new(file), name)?;
    audit.write_all(index, probes)?;
    Ok(())
}

/// Names the commit whose probe aborted the search
fn describe_failure(err: LagError, index: &CommitIndex) -> anyhow::Error {
    let context = match &err {
        LagError::ProbeFailure { index: failed, partial, .. } => index.get(*failed).map(|commit| {
            format!(
                "probing commit {} ({}) failed after {} successful probes",
                commit.sequence_index,
                commit.commit_id,
                partial.len()
            )
        }),
        _ => None,
    };
    match context {
        Some(context) => anyhow::Error::new(err).context(context),
        None => err.into(),
    }
}
