use indexmap::IndexMap;

use crate::id::BlockId;
use crate::score::Score;

/// The value a pool agent returns for every event it processes (§4.4).
/// Every field is optional and means "no change" when absent — the engine
/// never infers intent, it only applies what is explicitly present.
#[derive(Clone, Debug, Default)]
pub struct Decision {
    pub chaintip: Option<BlockId>,
    pub hon_tip: Option<BlockId>,
    pub timestamp: Option<i64>,
    /// Freshly created or updated scores, keyed by block id, in the order
    /// they should be merged (ascending height per §4.5 step 3).
    pub scores: IndexMap<BlockId, Score>,
    pub broadcast_ids: Vec<BlockId>,
    pub request_ids: Vec<BlockId>,
}

impl Decision {
    pub fn unchanged() -> Decision {
        Decision::default()
    }
}
