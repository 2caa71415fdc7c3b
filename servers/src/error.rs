use failure::Fail;
use sim_core::BlockId;

/// Runtime-invariant failures the engine itself can raise (§7 "Runtime
/// invariant"). Staleness and missing-block cases are not errors (§7) and
/// never reach this type; a round hitting one of these exits with a
/// diagnostic rather than continuing on corrupted state.
#[derive(Debug, Fail)]
pub enum ServerError {
    #[fail(display = "pool agent returned chaintip {} with no nxt_difficulty set", _0)]
    UnresolvedDifficulty(BlockId),

    #[fail(display = "pool agent error: {}", _0)]
    Agent(#[fail(cause)] sim_pool::PoolError),
}

impl From<sim_pool::PoolError> for ServerError {
    fn from(e: sim_pool::PoolError) -> Self {
        ServerError::Agent(e)
    }
}
