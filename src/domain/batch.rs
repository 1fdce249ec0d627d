//! Parallel batch runner over (strategy, instrument) jobs.
//!
//! Runs share the loaded series read-only and return their own results; no
//! state is shared between runs.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{info, warn};

use super::backtest::{BacktestEngine, BacktestResult};
use super::catalog::BacktestJob;
use super::error::TastratError;
use super::ohlcv::OhlcSeries;

#[derive(Debug)]
pub struct JobOutcome {
    pub job: BacktestJob,
    pub result: Result<BacktestResult, TastratError>,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn run_job(engine: &BacktestEngine, job: &BacktestJob, data: &HashMap<String, OhlcSeries>) -> JobOutcome {
    let result = match data.get(&job.instrument) {
        Some(series) => engine.run(series, &job.definition),
        None => Err(TastratError::NoData {
            instrument: job.instrument.clone(),
        }),
    };
    if let Err(e) = &result {
        warn!(run = %job.label(), error = %e, "backtest failed");
    }
    JobOutcome {
        job: job.clone(),
        result,
    }
}

/// Runs every job, outcomes in job order.
///
/// `threads == 0` uses rayon's global pool; otherwise a private pool of that
/// size. Failed pairs are kept as outcomes, except that an internal
/// signal-sequence violation aborts the batch.
pub fn run_batch(
    engine: &BacktestEngine,
    jobs: &[BacktestJob],
    data: &HashMap<String, OhlcSeries>,
    threads: usize,
) -> Result<Vec<JobOutcome>, TastratError> {
    info!(jobs = jobs.len(), instruments = data.len(), threads, "starting batch");

    let run_all = || -> Vec<JobOutcome> { jobs.par_iter().map(|job| run_job(engine, job, data)).collect() };

    let mut outcomes = if threads == 0 {
        run_all()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| TastratError::ConfigInvalid {
                section: "runner".into(),
                key: "threads".into(),
                reason: e.to_string(),
            })?;
        pool.install(run_all)
    };

    let fatal = outcomes
        .iter()
        .position(|o| matches!(&o.result, Err(e) if !e.is_recoverable()));
    if let Some(index) = fatal {
        if let Err(e) = outcomes.swap_remove(index).result {
            return Err(e);
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    info!(succeeded, failed = outcomes.len() - succeeded, "batch complete");
    Ok(outcomes)
}
