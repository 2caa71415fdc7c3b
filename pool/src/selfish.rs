use sim_core::{Action, BlockId, Broadcast, Event, Pool, Score, Strategy};
use sim_store::BlockTable;

use crate::common::max_by_cum_diff_score;

/// Everything the selfish decision (§4.4.1) hands back to the agent beyond
/// the scores it already produced.
pub struct SelfishOutcome {
    pub chaintip: Option<BlockId>,
    pub hon_tip: Option<BlockId>,
    pub broadcast_ids: Vec<BlockId>,
}

/// Looks a block id's score up in the freshly-scored batch first, falling
/// back to the pool's already-merged history.
struct ScoreLookup<'a> {
    fresh: &'a [(BlockId, Score)],
    pool: &'a Pool,
}

impl<'a> ScoreLookup<'a> {
    fn get(&self, id: &BlockId) -> Option<&'a Score> {
        self.fresh
            .iter()
            .find(|(i, _)| i == id)
            .map(|(_, s)| s)
            .or_else(|| self.pool.scores.get(id))
    }
}

/// The selfish-mining decision (§4.4.1): one equation-driven rule that
/// reproduces the whole Eyal-Sirer / Stubborn / Very-Stubborn family via
/// `k_thresh` and `retort_policy`.
pub fn decide(event: &Event, pool: &Pool, blocks: &BlockTable, fresh: &[(BlockId, Score)]) -> SelfishOutcome {
    let (k_thresh, retort_policy) = match &pool.strategy {
        Strategy::Selfish {
            k_thresh,
            retort_policy,
            ..
        } => (*k_thresh as i64, *retort_policy as i64),
        Strategy::Honest { .. } => {
            return SelfishOutcome {
                chaintip: None,
                hon_tip: None,
                broadcast_ids: vec![],
            }
        }
    };

    let lookup = ScoreLookup { fresh, pool };
    let old_hon_tip = pool.hon_tip.clone().expect("hon_tip seeded at round start");

    let mut hon_tip = old_hon_tip.clone();
    if event.action == Action::RecvOther {
        if let Some(best) = max_by_cum_diff_score(fresh) {
            let best_score = lookup.get(best).and_then(|s| s.cum_diff_score.as_ref());
            let current_score = lookup.get(&hon_tip).and_then(|s| s.cum_diff_score.as_ref());
            if let (Some(b), Some(c)) = (best_score, current_score) {
                if b > c {
                    hon_tip = best.clone();
                }
            }
        }
    }
    let hon_added = (hon_tip.height() as i64 - old_hon_tip.height() as i64).max(0);

    let self_tip = if event.action == Action::RecvOwn {
        event.new_ids.last().cloned().expect("RECV_OWN always carries the minted block")
    } else {
        pool.chaintip.clone()
    };

    let ancestor = common_ancestor(&hon_tip, &self_tip, pool, blocks);
    let ancestor_height = ancestor.height() as i64;
    let hon_length = hon_tip.height() as i64 - ancestor_height;
    let self_length = self_tip.height() as i64 - ancestor_height;
    let k_new = self_length - hon_length;
    let zero_prime_bump = if self_length > 1 && k_new == 1 && event.action == Action::RecvOwn {
        2
    } else {
        1
    };

    let abandon_thresh = hon_length * (k_thresh.min(0) - k_new);
    let claim_thresh = hon_length * (k_thresh.max(0) - k_new + zero_prime_bump);
    let retort_count = (retort_policy * hon_added).min(hon_added + 1);

    let mut broadcast_ids = Vec::new();
    let mut chaintip = None;

    if abandon_thresh > 0 || self_length == 0 {
        if hon_tip != pool.chaintip {
            chaintip = Some(hon_tip.clone());
        }
    } else {
        let private_chain = collect_private_chain(&self_tip, blocks);
        if claim_thresh > 0 {
            broadcast_ids = private_chain;
        } else if retort_count > 0 {
            broadcast_ids = private_chain.into_iter().take(retort_count as usize).collect();
        }
        if self_tip != pool.chaintip {
            chaintip = Some(self_tip.clone());
        }
    }

    if let Some(broadcast_tip) = broadcast_ids.last() {
        let broadcast_score = lookup.get(broadcast_tip).and_then(|s| s.cum_diff_score.as_ref());
        let hon_score = lookup.get(&hon_tip).and_then(|s| s.cum_diff_score.as_ref());
        if let (Some(b), Some(h)) = (broadcast_score, hon_score) {
            if b > h {
                hon_tip = broadcast_tip.clone();
            }
        }
    }

    SelfishOutcome {
        chaintip,
        hon_tip: if hon_tip != old_hon_tip { Some(hon_tip) } else { None },
        broadcast_ids,
    }
}

/// Walks back from `hon_tip` to the nearest ancestor already on this
/// pool's head path (§4.4.1). In the concurrent-find corner case — the
/// pool's own tip sits at the same height as `hon_tip` and `hon_tip`
/// itself is head-path — starts from `hon_tip`'s parent instead, since
/// `hon_tip` can't be its own common ancestor with a tip at its own height.
fn common_ancestor(hon_tip: &BlockId, self_tip: &BlockId, pool: &Pool, blocks: &BlockTable) -> BlockId {
    let concurrent = self_tip.height() == hon_tip.height()
        && pool.scores.get(hon_tip).map_or(false, |s| s.is_head_path);

    let mut cursor = if concurrent {
        blocks.get(hon_tip).and_then(|b| b.prev_id.clone())
    } else {
        Some(hon_tip.clone())
    };
    while let Some(id) = cursor {
        if pool.scores.get(&id).map_or(false, |s| s.is_head_path) {
            return id;
        }
        cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
    }
    hon_tip.clone()
}

/// The consecutive run of not-yet-public blocks from `tip` back to the
/// first already-broadcast ancestor, ascending by height (§4.4.1).
fn collect_private_chain(tip: &BlockId, blocks: &BlockTable) -> Vec<BlockId> {
    let mut chain = Vec::new();
    let mut cursor = Some(tip.clone());
    while let Some(id) = cursor {
        match blocks.get(&id) {
            Some(b) if !matches!(b.broadcast, Some(Broadcast::Public)) => {
                chain.push(id.clone());
                cursor = b.prev_id.clone();
            }
            _ => break,
        }
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Difficulty, PoolId};

    fn strategy(k_thresh: i8, retort_policy: u8) -> Strategy {
        Strategy::Selfish {
            k_thresh,
            retort_policy,
            scoring: vec![],
        }
    }

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        )
    }

    fn mine(blocks: &mut BlockTable, prev: &Block, pool_id: &str, clock: f64) -> Block {
        let mut b = Block::mint_child(prev, PoolId::from(pool_id), clock);
        b.nxt_difficulty = Some(Difficulty::from_u64(10));
        b.timestamp = Some(1000 + clock as i64);
        blocks.insert(b.clone()).unwrap();
        b
    }

    #[test]
    fn zero_lead_adopts_honest() {
        let mut blocks = BlockTable::new();
        let r = root();
        blocks.insert_root(r.clone()).unwrap();
        let mut pool = Pool::new(PoolId::from("SP"), 0.3, 100.0, 0.0, strategy(1, 1));
        pool.seed_bootstrap(&r);

        let hon = mine(&mut blocks, &r, "HONEST", 1.0);
        let event = Event {
            sim_clock: 1.0,
            pool_id: PoolId::from("SP"),
            action: Action::RecvOther,
            chaintip: r.id.clone(),
            new_ids: vec![hon.id.clone()],
        };
        let fresh = vec![(
            hon.id.clone(),
            Score {
                sim_clock: 1.0,
                local_time: 1,
                diff_score: Some(sim_core::ScoreValue::from_i64(10)),
                cum_diff_score: Some(sim_core::ScoreValue::from_i64(20)),
                is_head_path: false,
                chaintip: None,
            },
        )];
        let outcome = decide(&event, &pool, &blocks, &fresh);
        // selfLength == 0 with no private branch of its own: adopt honest.
        assert_eq!(outcome.chaintip, Some(hon.id));
        assert!(outcome.broadcast_ids.is_empty());
    }
}
