use std::sync::Arc;

use log::{info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use sim_config::ResolvedConfig;
use sim_core::Pool;
use sim_net::NetConfig;
use sim_servers::{Round, RoundOutcome};
use sim_util::StopState;

use crate::error::ApiError;

/// One permutation of `(round_id, overlay)` a worker runs to completion
/// (§4.10).
pub struct RoundJob {
    pub round_id: u32,
    pub config: ResolvedConfig,
    pub overlay: Vec<(String, String)>,
}

/// Dispatches a `RoundJob` to a `Round` and drives it to one of the three
/// `RoundOutcome`s. Implemented once here (`EngineWorker`); the trait
/// boundary exists so an alternate worker (e.g. one that shells out to a
/// subprocess per round) can be substituted without touching the pool.
pub trait RoundWorker: Send + Sync {
    fn run(&self, job: &RoundJob, stop: &StopState) -> Result<RoundOutcome, ApiError>;
}

/// The reference worker: builds a `Round` from the job's `ResolvedConfig`
/// and drives it with `Round::run_supervised` (§3, §4.1, §4.10).
pub struct EngineWorker;

impl RoundWorker for EngineWorker {
    fn run(&self, job: &RoundJob, stop: &StopState) -> Result<RoundOutcome, ApiError> {
        let diff_config = job.config.difficulty_config()?;
        let root = job.config.root_block(&diff_config);
        let initial_window = job.config.initial_window(&diff_config);
        let pools: Vec<Pool> = job.config.build_pools()?;
        let net_config: NetConfig = job.config.net_config();
        let seed = u64::from(job.config.round.seed) ^ u64::from(job.round_id);
        let sim_depth = job.config.round.sim_depth_seconds();
        let ram_cap = job.config.round.worker_ram_mb.saturating_mul(1024 * 1024);

        let round = Round::new(pools, root, initial_window, diff_config, net_config, seed, sim_depth);
        Ok(round.run_supervised(stop, Some(ram_cap))?)
    }
}

/// Runs every job in `jobs` across a bounded rayon thread pool honoring
/// `WORKERS`, installing a `ctrlc` handler that flips `stop` so in-flight
/// rounds wind down with a best-effort partial result rather than being
/// killed outright (§4.10, §5 "Cancellation").
pub fn run_jobs(
    jobs: Vec<RoundJob>,
    workers: u32,
    worker: &(dyn RoundWorker),
) -> Result<Vec<(u32, Vec<(String, String)>, RoundOutcome)>, ApiError> {
    let stop = Arc::new(StopState::new());
    {
        let stop = Arc::clone(&stop);
        // Only the first handler installed for the process wins; a caller
        // driving several `run_jobs` calls in one process should install
        // its own handler instead and pass an already-wired `StopState` in
        // a future revision of this entry point.
        let _ = ctrlc::set_handler(move || {
            warn!("received interrupt, flipping cancellation flag for in-flight rounds");
            stop.stop();
        });
    }

    let pool: ThreadPool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1) as usize)
        .build()
        .expect("thread pool configuration is static and always valid");

    let results = pool.install(|| {
        use rayon::prelude::*;
        jobs.into_par_iter()
            .map(|job| {
                info!("round {} starting", job.round_id);
                let outcome = worker.run(&job, &stop)?;
                Ok((job.round_id, job.overlay, outcome))
            })
            .collect::<Result<Vec<_>, ApiError>>()
    });

    results
}
