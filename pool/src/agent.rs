use indexmap::IndexMap;
use sim_core::{Action, Decision, Event, Pool};
use sim_store::BlockTable;

use crate::common;
use crate::error::PoolError;
use crate::honest;
use crate::resolve;
use crate::selfish;

/// The unified pool agent (§4.4): one pure function from `(event, pool,
/// blocks)` to a [`Decision`], covering the honest baseline and the whole
/// selfish-mining family behind the same eight-step flow. Never mutates
/// `pool` — the engine applies the returned `Decision` itself (§4.5).
pub fn decide(event: &Event, pool: &Pool, blocks: &BlockTable) -> Result<Decision, PoolError> {
    let tip = match event.new_ids.last() {
        Some(id) => id,
        None => return Ok(Decision::unchanged()),
    };

    // Step 1: an id already resolved in this pool's history means the event
    // is a stale duplicate delivery; nothing to do.
    if pool.scores.get(tip).map_or(false, |s| s.is_resolved()) {
        return Ok(Decision::unchanged());
    }

    // Step 2.
    let resolved = resolve::resolve_branch(tip, &event.new_ids, event.sim_clock, pool, blocks);

    // Steps 3-4.
    let scoring_fns = pool.strategy.scoring();
    let branch_scores = common::score_branch(&resolved, blocks, pool, scoring_fns);
    let dangling_scores = common::score_dangling(pool, blocks, scoring_fns, &branch_scores, tip.height());

    let mut fresh = branch_scores;
    fresh.extend(dangling_scores);

    // Step 5-7: dispatch to the honest or selfish decision family. Both
    // branches already return `hon_tip: None` when unchanged.
    let (chosen_chaintip, hon_tip, mut broadcast_ids) = if pool.is_honest() {
        (honest::decide(event, pool, &fresh), None, Vec::new())
    } else {
        let outcome = selfish::decide(event, pool, blocks, &fresh);
        (outcome.chaintip, outcome.hon_tip, outcome.broadcast_ids)
    };

    let mut timestamp = None;
    if event.action == Action::RecvOwn {
        if let Some(own_id) = event.new_ids.last() {
            if let Some((_, score)) = fresh.iter().find(|(id, _)| id == own_id) {
                timestamp = Some(score.local_time);
            }
            if pool.is_honest() {
                broadcast_ids.push(own_id.clone());
            }
        }
    }

    let mut scores_out: IndexMap<_, _> = IndexMap::new();
    for (id, score) in fresh {
        scores_out.insert(id, score);
    }

    // Step 8: propagate is_head_path along whichever chain actually changed.
    if let Some(chosen) = &chosen_chaintip {
        if chosen != &pool.chaintip {
            if !blocks.contains(chosen) {
                return Err(PoolError::UnknownChaintip(chosen.clone()));
            }
            let ancestor = common::nearest_head_path_ancestor(chosen, pool, blocks);
            common::propagate_head_path(chosen, &ancestor, &pool.chaintip, pool, blocks, &mut scores_out);
        }
    }

    Ok(Decision {
        chaintip: chosen_chaintip,
        hon_tip,
        timestamp,
        scores: scores_out,
        broadcast_ids,
        request_ids: resolved.to_request,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Difficulty, PoolId, Strategy};

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        )
    }

    fn mk_pool(strategy: Strategy) -> (Pool, BlockTable, Block) {
        let mut table = BlockTable::new();
        let r = root();
        table.insert_root(r.clone()).unwrap();
        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 100.0, 0.0, strategy);
        pool.seed_bootstrap(&r);
        (pool, table, r)
    }

    #[test]
    fn honest_pool_adopts_a_better_block_and_requests_nothing() {
        let (pool, mut blocks, r) = mk_pool(Strategy::Honest { scoring: vec![] });
        let mut child = Block::mint_child(&r, PoolId::from("P1"), 1.0);
        child.nxt_difficulty = Some(Difficulty::from_u64(10));
        child.timestamp = Some(1001);
        blocks.insert(child.clone()).unwrap();

        let event = Event {
            sim_clock: 1.0,
            pool_id: PoolId::from("P0"),
            action: Action::RecvOther,
            chaintip: r.id.clone(),
            new_ids: vec![child.id.clone()],
        };
        let decision = decide(&event, &pool, &blocks).unwrap();
        assert_eq!(decision.chaintip, Some(child.id.clone()));
        assert!(decision.request_ids.is_empty());
        let score = decision.scores.get(&child.id).unwrap();
        assert!(score.is_head_path);
    }

    #[test]
    fn duplicate_delivery_of_a_resolved_block_is_a_no_op() {
        let (mut pool, blocks, r) = mk_pool(Strategy::Honest { scoring: vec![] });
        let event = Event {
            sim_clock: 1.0,
            pool_id: PoolId::from("P0"),
            action: Action::RecvOther,
            chaintip: r.id.clone(),
            new_ids: vec![r.id.clone()],
        };
        // The root is already resolved by `seed_bootstrap`.
        pool.scores.get_mut(&r.id).unwrap().is_head_path = true;
        let decision = decide(&event, &pool, &blocks).unwrap();
        assert_eq!(decision.chaintip, None);
        assert!(decision.scores.is_empty());
    }

    #[test]
    fn missing_ancestor_is_requested_and_nothing_is_adopted() {
        let (pool, mut blocks, r) = mk_pool(Strategy::Honest { scoring: vec![] });
        let mut parent = Block::mint_child(&r, PoolId::from("P1"), 1.0);
        parent.nxt_difficulty = Some(Difficulty::from_u64(10));
        blocks.insert(parent.clone()).unwrap();
        let mut child = Block::mint_child(&parent, PoolId::from("P1"), 2.0);
        child.nxt_difficulty = Some(Difficulty::from_u64(10));
        blocks.insert(child.clone()).unwrap();

        let event = Event {
            sim_clock: 2.0,
            pool_id: PoolId::from("P0"),
            action: Action::RecvOther,
            chaintip: r.id.clone(),
            new_ids: vec![child.id.clone()],
        };
        let decision = decide(&event, &pool, &blocks).unwrap();
        assert_eq!(decision.chaintip, None);
        assert_eq!(decision.request_ids, vec![parent.id.clone()]);
    }
}
