use sim_core::{BlockId, Pool, Score};
use sim_store::BlockTable;

/// The result of walking a pool's view of a newly-announced branch back
/// towards its own head path (§4.4 step 2 `resolveBranch`).
pub struct ResolvedBranch {
    /// Newly-seen blocks this pool must score, ascending by height.
    pub to_score: Vec<BlockId>,
    /// Tentative scores for every id in `to_score`, same order.
    pub tentative: Vec<Score>,
    /// Blocks referenced by the walk that this pool has never been handed
    /// (not in `pool.scores`, not part of this event's delivery) — these
    /// must be explicitly fetched (§4.5 step 6, §7 "Missing block").
    pub to_request: Vec<BlockId>,
    /// The nearest ancestor already on this pool's head path, i.e. the
    /// point scoring resumes from and reorg bookkeeping pivots on. `None`
    /// only if the walk ran off the end of `delivered` without reaching
    /// one — in practice this means the whole branch needs fetching.
    pub common_ancestor: Option<BlockId>,
}

/// Walks `prev` from `tip` back towards a block this pool already trusts
/// (§4.4 step 2). `delivered` is the set of ids this event handed the pool
/// directly (`event.new_ids`) — an id outside that set which the pool has
/// never scored is a block it was never told about, so the walk stops and
/// requests it rather than assuming knowledge the pool doesn't have.
pub fn resolve_branch(
    tip: &BlockId,
    delivered: &[BlockId],
    event_sim_clock: f64,
    pool: &Pool,
    blocks: &BlockTable,
) -> ResolvedBranch {
    let mut to_score = Vec::new();
    let mut tentative = Vec::new();
    let mut to_request = Vec::new();
    let mut common_ancestor = None;

    let mut cursor = Some(tip.clone());
    while let Some(id) = cursor {
        if let Some(score) = pool.scores.get(&id) {
            if score.is_head_path {
                common_ancestor = Some(id);
                break;
            }
            // Already known to this pool (a previously-seen orphan): no
            // new tentative entry, but keep walking to find the ancestor
            // this side branch eventually rejoins.
            cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
            continue;
        }

        if &id == tip || delivered.contains(&id) {
            to_score.push(id.clone());
            tentative.push(Score::tentative(event_sim_clock, pool.ntp_drift));
            cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
        } else {
            to_request.push(id);
            cursor = None;
        }
    }

    to_score.reverse();
    tentative.reverse();

    ResolvedBranch {
        to_score,
        tentative,
        to_request,
        common_ancestor,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Broadcast, Difficulty, PoolId, Strategy};
    use sim_store::BlockTable;

    fn mk_pool(id: &str) -> Pool {
        Pool::new(PoolId::from(id), 0.5, 100.0, 0.0, Strategy::Honest { scoring: vec![] })
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

    #[test]
    fn stops_at_seeded_root() {
        let mut table = BlockTable::new();
        let r = root();
        table.insert_root(r.clone()).unwrap();
        let mut pool = mk_pool("P0");
        pool.seed_bootstrap(&r);

        let mut child = Block::mint_child(&r, PoolId::from("P0"), 1.0);
        child.nxt_difficulty = Some(Difficulty::from_u64(10));
        child.broadcast = Some(Broadcast::Private);
        table.insert(child.clone()).unwrap();

        let resolved = resolve_branch(&child.id, &[child.id.clone()], 1.0, &pool, &table);
        assert_eq!(resolved.to_score, vec![child.id.clone()]);
        assert!(resolved.to_request.is_empty());
        assert_eq!(resolved.common_ancestor, Some(r.id));
    }

    #[test]
    fn undelivered_ancestor_is_requested() {
        let mut table = BlockTable::new();
        let r = root();
        table.insert_root(r.clone()).unwrap();
        let mut pool = mk_pool("P0");
        pool.seed_bootstrap(&r);

        let mut parent = Block::mint_child(&r, PoolId::from("P1"), 1.0);
        parent.nxt_difficulty = Some(Difficulty::from_u64(10));
        table.insert(parent.clone()).unwrap();
        let mut child = Block::mint_child(&parent, PoolId::from("P1"), 2.0);
        child.nxt_difficulty = Some(Difficulty::from_u64(10));
        table.insert(child.clone()).unwrap();

        // Only the child is delivered this event: the parent arrives late.
        let resolved = resolve_branch(&child.id, &[child.id.clone()], 2.0, &pool, &table);
        assert_eq!(resolved.to_score, vec![child.id.clone()]);
        assert_eq!(resolved.to_request, vec![parent.id.clone()]);
        assert_eq!(resolved.common_ancestor, None);
    }
}
