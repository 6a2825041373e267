// src/search.rs

//! Coarse-to-fine search for the commit closest to a downstream snapshot.
//!
//! Each round samples the current window every `step` commits (plus the
//! window's upper edge), picks the best sample, brackets it by one step on
//! each side and halves the step. The run ends after the round at step 1.
//! Results are memoized, so no commit is probed twice in a run.
//!
//! The narrowing assumes distance is roughly unimodal around the true
//! match. Histories with several near-equal regions (reverts, re-applied
//! changes) can converge on a local minimum; callers get the full probe
//! trail in [`SearchOutcome::probes`] to spot that.

use crate::distance::Metric;
use crate::error::{BoxError, LagError, Result};
use crate::model::{CommitNo, ComparisonResult, RoundTrace, SearchOutcome};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_RATIO: usize = 10;

pub type ProbeResult = std::result::Result<ComparisonResult, BoxError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub initial_step: usize,
    pub metric: Metric,
    /// Wall-clock budget, checked before each round after the first
    pub budget: Option<Duration>,
}

impl SearchConfig {
    pub fn new(initial_step: usize) -> Self {
        Self { initial_step, metric: Metric::default(), budget: None }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_step == 0 {
            return Err(LagError::InvalidConfiguration("initial step must be at least 1".into()));
        }
        Ok(())
    }
}

/// Initial step covering `commit_count` commits in about `ratio` samples,
/// rounded up so that small histories still get a step of 1.
pub fn initial_step_for(commit_count: usize, ratio: usize) -> Result<usize> {
    if ratio == 0 {
        return Err(LagError::InvalidConfiguration("ratio must be at least 1".into()));
    }
    Ok(commit_count.div_ceil(ratio).max(1))
}

/// Runs the search probing one commit at a time.
pub fn find_best<F>(commit_count: usize, config: &SearchConfig, mut probe: F) -> Result<SearchOutcome>
where
    F: FnMut(CommitNo) -> ProbeResult,
{
    run(commit_count, config, |state, pending| {
        for index in pending {
            match probe(index) {
                Ok(result) => state.record(index, result),
                Err(source) => return Err(state.failure(index, source)),
            }
        }
        Ok(())
    })
}

/// Runs the search probing each round's commits concurrently.
///
/// `probe` must be safe to call from several threads at once: an oracle
/// backed by a single working copy has to use isolated checkouts per call.
/// Results are merged in index order, so for a deterministic `probe` the
/// outcome equals [`find_best`]'s.
pub fn find_best_parallel<F>(commit_count: usize, config: &SearchConfig, probe: F) -> Result<SearchOutcome>
where
    F: Fn(CommitNo) -> ProbeResult + Sync,
{
    run(commit_count, config, |state, pending| {
        let results: Vec<(CommitNo, ProbeResult)> =
            pending.into_par_iter().map(|index| (index, probe(index))).collect();

        let mut failure = None;
        for (index, result) in results {
            match result {
                Ok(result) => state.record(index, result),
                Err(source) if failure.is_none() => failure = Some((index, source)),
                Err(source) => debug!(index, error = %source, "additional probe failure in round"),
            }
        }
        match failure {
            Some((index, source)) => Err(state.failure(index, source)),
            None => Ok(()),
        }
    })
}

struct SearchState {
    lower_bound: CommitNo,
    upper_bound: CommitNo,
    step: usize,
    probed: BTreeMap<CommitNo, ComparisonResult>,
    probe_order: Vec<CommitNo>,
    rounds: Vec<RoundTrace>,
}

impl SearchState {
    fn new(commit_count: usize, step: usize) -> Self {
        Self {
            lower_bound: 0,
            upper_bound: commit_count - 1,
            step,
            probed: BTreeMap::new(),
            probe_order: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Sample points of the current round that are not memoized yet
    fn pending_samples(&self) -> Vec<CommitNo> {
        let mut samples: Vec<CommitNo> = (self.lower_bound..=self.upper_bound).step_by(self.step).collect();
        if samples.last() != Some(&self.upper_bound) {
            samples.push(self.upper_bound);
        }
        samples.retain(|index| !self.probed.contains_key(index));
        samples
    }

    fn record(&mut self, index: CommitNo, result: ComparisonResult) {
        debug!(
            index,
            added = result.added_lines,
            removed = result.removed_lines,
            files = result.different_files,
            "probed commit"
        );
        let result = ComparisonResult { commit_index: index, ..result };
        if self.probed.insert(index, result).is_none() {
            self.probe_order.push(index);
        }
    }

    fn probes(&self) -> Vec<ComparisonResult> {
        self.probe_order.iter().filter_map(|index| self.probed.get(index).copied()).collect()
    }

    fn failure(&self, index: CommitNo, source: BoxError) -> LagError {
        warn!(index, error = %source, "probe failed, aborting search");
        LagError::ProbeFailure { index, partial: self.probes(), source }
    }

    fn best_in_window(&self, metric: Metric) -> Result<ComparisonResult> {
        metric
            .best(self.probed.range(self.lower_bound..=self.upper_bound).map(|(_, result)| result))
            .copied()
            .ok_or_else(|| {
                LagError::EmptyHistory(format!(
                    "no commit probed in window {}..={}",
                    self.lower_bound, self.upper_bound
                ))
            })
    }

    fn narrow(&mut self, best: CommitNo) {
        self.lower_bound = self.lower_bound.max(best.saturating_sub(self.step));
        self.upper_bound = self.upper_bound.min(best.saturating_add(self.step));
        self.rounds.push(RoundTrace {
            step: self.step,
            lower_bound: self.lower_bound,
            upper_bound: self.upper_bound,
            best,
        });
    }
}

fn run<R>(commit_count: usize, config: &SearchConfig, mut execute_round: R) -> Result<SearchOutcome>
where
    R: FnMut(&mut SearchState, Vec<CommitNo>) -> Result<()>,
{
    if commit_count == 0 {
        return Err(LagError::EmptyHistory("no commits to search".into()));
    }
    config.validate()?;

    let started = Instant::now();
    let mut state = SearchState::new(commit_count, config.initial_step);
    let mut converged = false;

    let best = loop {
        if let (Some(budget), Some(last)) = (config.budget, state.rounds.last()) {
            if started.elapsed() >= budget {
                warn!(step = state.step, best = last.best, "search budget exhausted before convergence");
                break state.best_in_window(config.metric)?;
            }
        }

        let pending = state.pending_samples();
        debug!(step = state.step, lower = state.lower_bound, upper = state.upper_bound, pending = pending.len(), "starting round");
        execute_round(&mut state, pending)?;

        let best = state.best_in_window(config.metric)?;
        state.narrow(best.commit_index);
        info!(
            step = state.step,
            lower = state.lower_bound,
            upper = state.upper_bound,
            best = best.commit_index,
            value = config.metric.value(&best),
            "round complete"
        );

        if state.step == 1 {
            converged = true;
            break best;
        }
        state.step = (state.step / 2).max(1);
    };

    info!(best = best.commit_index, probes = state.probe_order.len(), commits = commit_count, "search finished");
    Ok(SearchOutcome {
        best: best.commit_index,
        result: best,
        probes: state.probes(),
        rounds: state.rounds,
        converged,
    })
}
