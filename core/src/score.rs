use crate::bignum::ScoreValue;
use crate::id::BlockId;

/// A pool's subjective record of a block it has seen (§3). Distinct from
/// the shared, objective [`crate::block::Block`] — two pools can (and in
/// selfish scenarios, routinely do) disagree about a block's score and
/// whether it lies on the head path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Score {
    pub sim_clock: f64,
    pub local_time: i64,
    pub diff_score: Option<ScoreValue>,
    pub cum_diff_score: Option<ScoreValue>,
    pub is_head_path: bool,
    pub chaintip: Option<BlockId>,
}

impl Score {
    /// A tentative score created while walking back an unresolved branch
    /// (`resolveBranch`, §4.4 step 2): everything but the timing fields is
    /// still unknown.
    pub fn tentative(sim_clock: f64, ntp_drift: f64) -> Score {
        Score {
            sim_clock,
            local_time: (sim_clock + ntp_drift).floor() as i64,
            diff_score: None,
            cum_diff_score: None,
            is_head_path: false,
            chaintip: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.cum_diff_score.is_some()
    }
}
