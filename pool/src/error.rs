use failure::Fail;
use sim_core::BlockId;

/// Runtime-invariant violations the agent itself can detect (§7 "Runtime
/// invariant"). Distinct from the ordinary, non-fatal missing-block path
/// (§7 "Missing block"), which is handled entirely through
/// `Decision::request_ids` and never surfaces as an error.
#[derive(Debug, Fail)]
pub enum PoolError {
    #[fail(display = "chosen chaintip {} is not present in the block table", _0)]
    UnknownChaintip(BlockId),

    #[fail(
        display = "block {} has no prev_id but is not the bootstrap root seeded in pool.scores",
        _0
    )]
    DanglingRoot(BlockId),
}
