//! The event engine for minesim (§3, §4.1, §4.5): a priority-queued
//! discrete-event loop that drives every pool's [`sim_pool`] decisions and
//! the [`sim_chain`] difficulty engine to a configured simulation depth,
//! then reduces the result to per-pool chain-health metrics (§4.7).

#[macro_use]
extern crate serde_derive;

mod engine;
mod error;
mod metrics;
mod physics;
mod queue;

pub use engine::{Round, RoundResult, RoundOutcome};
pub use error::ServerError;
pub use metrics::{compute_metrics, PoolMetrics, RoundSummary, SummaryStat};
pub use queue::EventQueue;
