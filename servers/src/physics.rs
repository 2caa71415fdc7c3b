use num_traits::ToPrimitive;
use sim_core::{Action, Block, Event, Pool};
use sim_net::NoiseEngine;
use sim_store::BlockTable;

/// Schedules a pool's next `HASHER_FIND` (§4.2 `simulateBlockTime`):
/// `now + owdP2H() + Exponential(hashrate / nxtDifficulty(chaintip))`.
pub fn simulate_block_time(pool: &Pool, now: f64, blocks: &BlockTable, noise: &mut NoiseEngine) -> Event {
    let nxt_difficulty = blocks
        .get(&pool.chaintip)
        .and_then(|b| b.nxt_difficulty.as_ref())
        .expect("a pool's chaintip always has nxt_difficulty set once scored");
    let difficulty = nxt_difficulty.as_biguint().to_f64().unwrap_or(f64::MAX).max(1.0);
    let lambda = pool.hashrate / difficulty;
    Event {
        sim_clock: now + noise.owd_p2h() + noise.block_time(lambda),
        pool_id: pool.id.clone(),
        action: Action::HasherFind,
        chaintip: pool.chaintip.clone(),
        new_ids: vec![],
    }
}

/// Whether a stale-template race still lands the miner on a block the pool
/// would accept (§4.2, shared by `hasherFindsBlock` and `generateBlock`):
/// either the event's recorded chaintip still matches the pool's current
/// one, or it matches the immediate parent and the miner's find predates
/// the window in which a fresh template could have reached it.
fn accept_for_tip(pool: &Pool, event: &Event, blocks: &BlockTable, noise: &mut NoiseEngine) -> bool {
    if event.chaintip == pool.chaintip {
        return true;
    }
    let parent_of_current = blocks.get(&pool.chaintip).and_then(|b| b.prev_id.clone());
    if parent_of_current.as_ref() == Some(&event.chaintip) {
        if let Some(tip_score) = pool.scores.get(&pool.chaintip) {
            return event.sim_clock <= tip_score.sim_clock + noise.owd_p2h();
        }
    }
    false
}

/// Validates a `HASHER_FIND` against template staleness and, on accept,
/// schedules the `RECV_OWN` announcing the find back to the pool (§4.2).
pub fn hasher_finds_block(pool: &Pool, event: &Event, blocks: &BlockTable, noise: &mut NoiseEngine) -> Option<Event> {
    if !accept_for_tip(pool, event, blocks, noise) {
        return None;
    }
    Some(Event {
        sim_clock: event.sim_clock + noise.owd_p2h(),
        pool_id: pool.id.clone(),
        action: Action::RecvOwn,
        chaintip: event.chaintip.clone(),
        new_ids: vec![],
    })
}

/// Repeats the staleness check and, if still valid, mints the child block
/// into `blocks` and returns its id (§4.2 `generateBlock`). The block is
/// left with `timestamp`, `nxt_difficulty` and `broadcast` unset for the
/// agent/engine to fill in during decision integration.
pub fn generate_block(pool: &Pool, event: &Event, blocks: &mut BlockTable, noise: &mut NoiseEngine) -> Option<Block> {
    if !accept_for_tip(pool, event, blocks, noise) {
        return None;
    }
    let parent = blocks.get(&event.chaintip)?.clone();
    let child = Block::mint_child(&parent, pool.id.clone(), event.sim_clock);
    blocks.insert(child.clone()).expect("parent just looked up, height derived from it");
    Some(child)
}

/// Schedules `RECV_OTHER` for every pool other than the source, carrying
/// `new_ids` (already ascending by height), and flags each as broadcast
/// (§4.2 `broadcastBlock`).
pub fn broadcast_block(
    new_ids: &[sim_core::BlockId],
    source: &sim_core::PoolId,
    sim_clock: f64,
    pool_ids: impl Iterator<Item = sim_core::PoolId>,
    blocks: &mut BlockTable,
    noise: &mut NoiseEngine,
) -> Vec<Event> {
    for id in new_ids {
        if let Some(b) = blocks.get_mut(id) {
            b.broadcast = Some(sim_core::Broadcast::Public);
        }
    }
    let tip = new_ids
        .last()
        .cloned()
        .expect("broadcast_block is only called with a non-empty id list");
    pool_ids
        .filter(|id| id != source)
        .map(|id| Event {
            sim_clock: sim_clock + noise.owd_p2p(),
            pool_id: id,
            action: Action::RecvOther,
            chaintip: tip.clone(),
            new_ids: new_ids.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Difficulty, PoolId, Strategy};
    use sim_net::NetConfig;

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        )
    }

    fn net() -> NetConfig {
        NetConfig {
            ping_secs: 0.05,
            cv: 0.3,
            mbps: 10.0,
            block_size_kb: 50.0,
            ntp_stdev: 0.0,
        }
    }

    #[test]
    fn simulate_block_time_is_strictly_after_now() {
        let mut blocks = BlockTable::new();
        let r = root();
        blocks.insert_root(r.clone()).unwrap();
        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 1000.0, 0.0, Strategy::Honest { scoring: vec![] });
        pool.seed_bootstrap(&r);
        let mut noise = NoiseEngine::new(1, net());
        let event = simulate_block_time(&pool, 10.0, &blocks, &mut noise);
        assert!(event.sim_clock > 10.0);
        assert_eq!(event.action, Action::HasherFind);
    }

    #[test]
    fn hasher_find_accepted_on_matching_chaintip() {
        let mut blocks = BlockTable::new();
        let r = root();
        blocks.insert_root(r.clone()).unwrap();
        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 1000.0, 0.0, Strategy::Honest { scoring: vec![] });
        pool.seed_bootstrap(&r);
        let mut noise = NoiseEngine::new(1, net());
        let event = Event {
            sim_clock: 5.0,
            pool_id: PoolId::from("P0"),
            action: Action::HasherFind,
            chaintip: r.id.clone(),
            new_ids: vec![],
        };
        let recv_own = hasher_finds_block(&pool, &event, &blocks, &mut noise).unwrap();
        assert_eq!(recv_own.action, Action::RecvOwn);
        assert!(recv_own.sim_clock > event.sim_clock);
    }

    #[test]
    fn hasher_find_discarded_on_unrelated_tip() {
        let mut blocks = BlockTable::new();
        let r = root();
        blocks.insert_root(r.clone()).unwrap();
        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 1000.0, 0.0, Strategy::Honest { scoring: vec![] });
        pool.seed_bootstrap(&r);
        let mut noise = NoiseEngine::new(1, net());
        let event = Event {
            sim_clock: 5.0,
            pool_id: PoolId::from("P0"),
            action: Action::HasherFind,
            chaintip: sim_core::BlockId::from("999_PX"),
            new_ids: vec![],
        };
        assert!(hasher_finds_block(&pool, &event, &blocks, &mut noise).is_none());
    }
}
