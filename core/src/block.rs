use crate::bignum::Difficulty;
use crate::id::{BlockId, PoolId};

/// Tri-state broadcast flag: a block starts `unset` (its miner hasn't decided
/// yet), then becomes `Private` (withheld) or `Public` (broadcast to peers).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Broadcast {
    Private,
    Public,
}

/// A mined block. Immutable once `nxt_difficulty` is set by the difficulty
/// engine; `timestamp` and `broadcast` are filled in afterwards by the
/// engine as it integrates the mining pool's `Decision` (§4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub height: u64,
    pub pool_id: PoolId,
    pub prev_id: Option<BlockId>,
    pub sim_clock: f64,
    pub timestamp: Option<i64>,
    pub difficulty: Difficulty,
    pub cum_difficulty: Difficulty,
    pub nxt_difficulty: Option<Difficulty>,
    pub broadcast: Option<Broadcast>,
}

impl Block {
    /// Synthesizes the bootstrap root from the last row of the difficulty
    /// bootstrap CSV (§6). The root has no `prev_id` and is mined by the
    /// synthetic `HH0` pool.
    pub fn bootstrap_root(
        height: u64,
        timestamp: i64,
        difficulty: Difficulty,
        cum_difficulty: Difficulty,
        nxt_difficulty: Difficulty,
    ) -> Block {
        Block {
            id: BlockId::bootstrap_root(height),
            height,
            pool_id: PoolId::from("HH0"),
            prev_id: None,
            sim_clock: 0.0,
            timestamp: Some(timestamp),
            difficulty,
            cum_difficulty,
            nxt_difficulty: Some(nxt_difficulty),
            broadcast: Some(Broadcast::Public),
        }
    }

    /// Mints the child of `prev` found by `pool_id` at `sim_clock`. Mirrors
    /// `generateBlock` (§4.2): height/difficulty/cumDifficulty are derived
    /// from the parent; timestamp, nxt_difficulty and broadcast are left
    /// unset for the agent/engine to fill in during integration.
    pub fn mint_child(prev: &Block, pool_id: PoolId, sim_clock: f64) -> Block {
        let height = prev.height + 1;
        let difficulty = prev
            .nxt_difficulty
            .clone()
            .expect("parent must have nxt_difficulty set before it can be extended");
        let cum_difficulty = prev.cum_difficulty.clone() + difficulty.clone();
        let id = BlockId::new(height, &pool_id);
        Block {
            id,
            height,
            pool_id,
            prev_id: Some(prev.id.clone()),
            sim_clock,
            timestamp: None,
            difficulty,
            cum_difficulty,
            nxt_difficulty: None,
            broadcast: None,
        }
    }
}
