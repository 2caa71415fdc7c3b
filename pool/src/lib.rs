//! The unified pool agent (§4.4): one pure decision function covering the
//! honest chain-selection rule and the whole selfish-mining family behind
//! two integer knobs. Never mutates a `sim_core::Pool` directly — every
//! invocation returns a `Decision` for the engine to apply.

mod agent;
mod common;
mod error;
mod honest;
mod resolve;
mod scoring;
mod selfish;

pub use agent::decide;
pub use error::PoolError;
pub use scoring::evaluate as evaluate_scoring;
