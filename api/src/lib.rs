//! External interface layer for minesim (§4.9, §4.10): result/snapshot/log
//! writers and the bounded worker pool that runs rounds across OS threads.
//! A reference implementation of the contract `sim_servers`/`sim_config`
//! define, not the focus of the simulator's engineering investment.

#[macro_use]
extern crate serde_derive;

mod error;
mod worker;
mod writers;

pub use error::ApiError;
pub use worker::{run_jobs, EngineWorker, RoundJob, RoundWorker};
pub use writers::{write_config_snapshot, write_historical_blocks, ResultWriter};
