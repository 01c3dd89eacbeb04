//! Fan-out of independent zoom jobs.
//!
//! With one worker jobs run in order and the first failure stops the run.
//! With more, a dedicated rayon pool runs every job; a failed job does not
//! cancel its siblings.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info};
use rayon::prelude::*;

use crate::error::ConfigError;

/// Outcome of dispatching a set of zoom jobs
#[derive(Debug)]
pub struct DispatchSummary<T, E> {
    /// Successful jobs in completion order
    pub completed: Vec<(u8, T)>,
    /// Failed jobs in completion order
    pub failed: Vec<(u8, E)>,
    /// Zooms never started because a sequential run stopped early
    pub skipped: Vec<u8>,
}

impl<T, E> DispatchSummary<T, E> {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Run `job` once per zoom on up to `workers` threads.
///
/// `report` is called as each job finishes with its 1-based completion
/// count and the total, mirroring a `(i/n)` progress line.
pub fn run_jobs<T, E, F, R>(
    zooms: &[u8],
    workers: usize,
    job: F,
    report: R,
) -> Result<DispatchSummary<T, E>, ConfigError>
where
    T: Send,
    E: Send + std::fmt::Display,
    F: Fn(u8) -> Result<T, E> + Sync,
    R: Fn(usize, usize, u8, &Result<T, E>) + Sync,
{
    if workers == 0 {
        return Err(ConfigError::InvalidWorkerCount);
    }

    let total = zooms.len();
    let mut summary = DispatchSummary::new();

    if workers == 1 {
        info!("Processing {} zoom levels sequentially", total);
        for (i, &zoom) in zooms.iter().enumerate() {
            let result = job(zoom);
            report(i + 1, total, zoom, &result);
            match result {
                Ok(value) => summary.completed.push((zoom, value)),
                Err(err) => {
                    error!("z{}: {}; stopping run", zoom, err);
                    summary.failed.push((zoom, err));
                    summary.skipped.extend_from_slice(&zooms[i + 1..]);
                    break;
                }
            }
        }
        return Ok(summary);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("zoom-worker-{}", i))
        .build()
        .map_err(ConfigError::WorkerPool)?;
    info!("Processing {} zoom levels on {} workers", total, workers);

    let finished = AtomicUsize::new(0);
    let mut outcomes: Vec<(usize, u8, Result<T, E>)> = pool.install(|| {
        zooms
            .par_iter()
            .with_max_len(1)
            .map(|&zoom| {
                let result = job(zoom);
                let order = finished.fetch_add(1, Ordering::SeqCst) + 1;
                report(order, total, zoom, &result);
                if let Err(err) = &result {
                    error!("z{}: {}", zoom, err);
                }
                (order, zoom, result)
            })
            .collect()
    });

    outcomes.sort_by_key(|(order, _, _)| *order);
    for (_, zoom, result) in outcomes {
        match result {
            Ok(value) => summary.completed.push((zoom, value)),
            Err(err) => summary.failed.push((zoom, err)),
        }
    }

    Ok(summary)
}
