use indexmap::{IndexMap, IndexSet};

use crate::bignum::ScoreValue;
use crate::block::Block;
use crate::id::{BlockId, PoolId};
use crate::score::Score;

/// A mining pool's strategy configuration knobs (§4.4), modeled as a tagged
/// variant rather than a class hierarchy per the design notes (§9): there is
/// exactly one agent function, dispatching on which variant it is handed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Strategy {
    /// The honest baseline, optionally augmented with difficulty-scoring
    /// countermeasures (§4.4.2). `scoring` is empty for plain honest mining.
    Honest { scoring: Vec<ScoringFn> },
    /// The selfish-mining family (§4.4.1), parameterized by the claim/abandon
    /// threshold and the retort policy.
    Selfish {
        k_thresh: i8,
        retort_policy: u8,
        scoring: Vec<ScoringFn>,
    },
}

impl Strategy {
    pub fn is_honest(&self) -> bool {
        matches!(self, Strategy::Honest { .. })
    }

    pub fn scoring(&self) -> &[ScoringFn] {
        match self {
            Strategy::Honest { scoring } => scoring,
            Strategy::Selfish { scoring, .. } => scoring,
        }
    }
}

/// A single named scoring-function plug-in with its parameters (§4.4.2).
/// Pure data; evaluation lives in `sim_pool::scoring`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ScoringFn {
    UncleBonus { reward: i64 },
    TimePenalty { threshold: i64, penalty: i64 },
    DepthBonus { per_level: i64, cap: i64 },
}

/// A mining pool (§3). Lives for the whole round; the agent never mutates a
/// `Pool` directly, it only ever returns a [`crate::decision::Decision`] for
/// the engine to apply.
#[derive(Clone, Debug)]
pub struct Pool {
    pub id: PoolId,
    pub hpp: f64,
    pub hashrate: f64,
    pub ntp_drift: f64,
    pub chaintip: BlockId,
    pub hon_tip: Option<BlockId>,
    pub scores: IndexMap<BlockId, Score>,
    pub request_ids: IndexSet<BlockId>,
    /// Blocks seen whose ancestor chain is not yet fully scored, mapped to
    /// their height (§3, §4.4 step 4).
    pub unscored: IndexMap<BlockId, u64>,
    pub strategy: Strategy,
}

impl Pool {
    pub fn new(id: PoolId, hpp: f64, network_hashrate: f64, ntp_drift: f64, strategy: Strategy) -> Pool {
        Pool {
            id,
            hpp,
            hashrate: hpp * network_hashrate,
            ntp_drift,
            chaintip: BlockId::from(""),
            hon_tip: None,
            scores: IndexMap::new(),
            request_ids: IndexSet::new(),
            unscored: IndexMap::new(),
            strategy,
        }
    }

    pub fn is_honest(&self) -> bool {
        self.strategy.is_honest()
    }

    /// The best chaintip for a selfish pool's own purposes: the honest tip
    /// while it has no private lead, otherwise its own chaintip (§4.4.1).
    pub fn self_tip(&self) -> &BlockId {
        &self.chaintip
    }

    /// Seeds every pool's view with the bootstrap root as a resolved,
    /// head-path score (§3 invariants: the root is universally known and
    /// trusted at round start). Called once per pool by the round
    /// orchestrator before the event loop starts.
    pub fn seed_bootstrap(&mut self, root: &Block) {
        let cum_diff_score = ScoreValue::from_difficulty(&root.cum_difficulty);
        let diff_score = ScoreValue::from_difficulty(&root.difficulty);
        self.scores.insert(
            root.id.clone(),
            Score {
                sim_clock: root.sim_clock,
                local_time: root.timestamp.unwrap_or(0),
                diff_score: Some(diff_score),
                cum_diff_score: Some(cum_diff_score),
                is_head_path: true,
                chaintip: Some(root.id.clone()),
            },
        );
        self.chaintip = root.id.clone();
        self.hon_tip = Some(root.id.clone());
    }
}
