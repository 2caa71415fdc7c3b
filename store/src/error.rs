use failure::Fail;
use sim_core::BlockId;

#[derive(Debug, Fail)]
pub enum StoreError {
    #[fail(display = "block {} already present in the block table", _0)]
    DuplicateBlock(BlockId),

    #[fail(display = "parent {} of block {} is missing from the block table", _0, _1)]
    MissingParent(BlockId, BlockId),

    #[fail(
        display = "block {} has height {} but its parent {} has height {} (expected {})",
        _0, _1, _2, _3, _4
    )]
    HeightMismatch(BlockId, u64, BlockId, u64, u64),
}
