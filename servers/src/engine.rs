use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, trace};

use sim_chain::{calculate_next_difficulty, DifficultyConfig};
use sim_core::{Action, Block, Event, Pool, PoolId};
use sim_net::{NetConfig, NoiseEngine};
use sim_pool::decide;
use sim_store::{BlockTable, DiffWindowCache, DifficultyWindow, WindowEntry};
use sim_util::StopState;

use crate::error::ServerError;
use crate::metrics::{compute_metrics, PoolMetrics, RoundSummary};
use crate::physics;
use crate::queue::EventQueue;

/// How a supervised round ended (§4.10 "Worker pool"): cleanly at
/// `sim_depth`, cut short by the cooperative-cancellation flag, or cut
/// short by crossing its per-worker RAM cap. All three still carry
/// whatever the round accumulated before it stopped.
pub enum RoundOutcome {
    Completed(RoundResult),
    Cancelled(RoundResult),
    Partial(RoundResult),
}

/// Everything one completed round hands back to the caller (§4.9/§4.10):
/// the full shared block table, every pool's final view, and the derived
/// metrics for whoever wants to format them into result files.
pub struct RoundResult {
    pub blocks: BlockTable,
    pub pools: IndexMap<PoolId, Pool>,
    pub metrics: Vec<PoolMetrics>,
    pub summary: RoundSummary,
}

/// The event engine for a single round (§3, §4.1, §4.5): owns the shared
/// block table, every pool's private view, the difficulty-window cache and
/// the event queue, and drives them all to `sim_depth`.
pub struct Round {
    pools: IndexMap<PoolId, Pool>,
    blocks: BlockTable,
    diff_cache: DiffWindowCache,
    diff_config: DifficultyConfig,
    noise: NoiseEngine,
    queue: EventQueue,
    sim_depth: f64,
}

impl Round {
    /// Builds a round ready to run: seeds every pool's view with `root`,
    /// inserts it as the sole entry in the shared block table, and schedules
    /// each pool's first `HasherFind` (§3 "Round start").
    pub fn new(
        pools: Vec<Pool>,
        root: Block,
        initial_window: DifficultyWindow,
        diff_config: DifficultyConfig,
        net_config: NetConfig,
        seed: u64,
        sim_depth: f64,
    ) -> Round {
        let mut blocks = BlockTable::new();
        blocks.insert_root(root.clone()).expect("fresh block table, root cannot already be present");

        let mut noise = NoiseEngine::new(seed, net_config);
        let mut queue = EventQueue::new();
        let mut pool_map = IndexMap::new();

        for mut pool in pools {
            pool.ntp_drift = noise.ntp_drift();
            pool.seed_bootstrap(&root);
            let first_find = physics::simulate_block_time(&pool, 0.0, &blocks, &mut noise);
            queue.push(first_find);
            pool_map.insert(pool.id.clone(), pool);
        }

        let mut diff_cache = DiffWindowCache::new();
        diff_cache.seed(root.id.clone(), initial_window);

        Round {
            pools: pool_map,
            blocks,
            diff_cache,
            diff_config,
            noise,
            queue,
            sim_depth,
        }
    }

    /// Drains the event queue up to `sim_depth` sim-clock seconds, applying
    /// each pool decision per §4.5, then computes and returns the round's
    /// metrics (§4.7).
    pub fn run(mut self) -> Result<RoundResult, ServerError> {
        while let Some(next_clock) = self.queue.peek_sim_clock() {
            if next_clock > self.sim_depth {
                break;
            }
            let event = self.queue.pop().expect("peek just confirmed an entry");
            self.dispatch(event)?;
            self.queue.maybe_compact();
        }

        Ok(self.finish())
    }

    /// Like [`Round::run`], but polled for cooperative cancellation and an
    /// approximate per-round RAM cap every 256 dispatched events (§4.10
    /// "Worker pool"). Checked on a stride rather than every event so the
    /// check itself doesn't dominate a round's runtime.
    pub fn run_supervised(mut self, stop: &StopState, ram_cap_bytes: Option<u64>) -> Result<RoundOutcome, ServerError> {
        let mut events_since_check: u32 = 0;
        while let Some(next_clock) = self.queue.peek_sim_clock() {
            if next_clock > self.sim_depth {
                break;
            }
            let event = self.queue.pop().expect("peek just confirmed an entry");
            self.dispatch(event)?;
            self.queue.maybe_compact();

            events_since_check += 1;
            if events_since_check >= 256 {
                events_since_check = 0;
                if stop.is_stopped() {
                    return Ok(RoundOutcome::Cancelled(self.finish()));
                }
                if let Some(cap) = ram_cap_bytes {
                    if self.ram_estimate_bytes() > cap {
                        return Ok(RoundOutcome::Partial(self.finish()));
                    }
                }
            }
        }
        Ok(RoundOutcome::Completed(self.finish()))
    }

    fn finish(self) -> RoundResult {
        let (metrics, summary) = compute_metrics(&self.pools, &self.blocks);
        RoundResult {
            blocks: self.blocks,
            pools: self.pools,
            metrics,
            summary,
        }
    }

    /// A deliberately crude heuristic (block count and per-pool score-table
    /// size, each times a fixed per-entry weight) rather than real RSS
    /// measurement, which is platform-specific and out of scope for this
    /// reference worker pool.
    fn ram_estimate_bytes(&self) -> u64 {
        let block_bytes = self.blocks.len() as u64 * 256;
        let score_bytes: u64 = self.pools.values().map(|p| p.scores.len() as u64 * 192).sum();
        block_bytes + score_bytes
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ServerError> {
        match event.action {
            Action::HasherFind => {
                let pool = self
                    .pools
                    .get(&event.pool_id)
                    .expect("every scheduled event names a pool in this round");
                if let Some(recv_own) = physics::hasher_finds_block(pool, &event, &self.blocks, &mut self.noise) {
                    self.queue.push(recv_own);
                }
                Ok(())
            }
            Action::RecvOwn => {
                let pool = self
                    .pools
                    .get(&event.pool_id)
                    .expect("every scheduled event names a pool in this round");
                let minted = physics::generate_block(pool, &event, &mut self.blocks, &mut self.noise);
                match minted {
                    Some(block) => {
                        let mut own_event = event.clone();
                        own_event.new_ids = vec![block.id.clone()];
                        self.integrate(own_event)
                    }
                    None => Ok(()),
                }
            }
            Action::RecvOther => self.integrate(event),
        }
    }

    /// Runs the pool agent and applies its `Decision` to shared and
    /// per-pool state, the full seven steps of §4.5 ("Decision integration").
    fn integrate(&mut self, event: Event) -> Result<(), ServerError> {
        let decision = {
            let pool = self
                .pools
                .get(&event.pool_id)
                .expect("every scheduled event names a pool in this round");
            decide(&event, pool, &self.blocks)?
        };

        let pool = self
            .pools
            .get_mut(&event.pool_id)
            .expect("every scheduled event names a pool in this round");

        // Step 1: drop anything this decision just resolved from the
        // outstanding-request set.
        for id in decision.scores.keys() {
            pool.request_ids.shift_remove(id);
        }

        // Step 2: the pool's own freshly minted block gets its timestamp and
        // nxt_difficulty fixed now, from the parent's difficulty window.
        if let (Some(local_time), Action::RecvOwn) = (decision.timestamp, event.action) {
            let own_id = event
                .new_ids
                .last()
                .expect("RecvOwn carries exactly the block just minted")
                .clone();
            let parent_id = event.chaintip.clone();
            {
                let block = self.blocks.get_mut(&own_id).expect("just minted by generate_block");
                block.timestamp = Some(local_time);
            }
            let cum_difficulty = self
                .blocks
                .get(&own_id)
                .expect("just minted")
                .cum_difficulty
                .clone();
            self.diff_cache.extend(
                &self.blocks,
                &parent_id,
                own_id.clone(),
                WindowEntry {
                    timestamp: local_time,
                    cum_difficulty,
                },
                self.diff_config.total_len(),
            );
            let window = self.diff_cache.get_or_build(&self.blocks, &own_id, self.diff_config.total_len());
            let nxt = calculate_next_difficulty(window, &self.diff_config);
            self.blocks.get_mut(&own_id).expect("just minted").nxt_difficulty = Some(nxt);
        }

        // Step 3: merge freshly (re)scored entries, ascending by height, and
        // keep `unscored` in sync.
        for (id, score) in decision.scores {
            if score.is_resolved() {
                pool.unscored.shift_remove(&id);
            } else {
                pool.unscored.insert(id.clone(), id.height());
            }
            pool.scores.insert(id, score);
        }

        // Step 4: adopt a new honest-only reference tip, if the agent named one.
        if let Some(hon_tip) = decision.hon_tip {
            pool.hon_tip = Some(hon_tip);
        }

        // Step 5: adopt a new chaintip and, since its mining target just
        // changed, reschedule this pool's next HasherFind.
        let mut chaintip_changed = false;
        if let Some(chosen) = decision.chaintip {
            if chosen != pool.chaintip {
                let has_target = self
                    .blocks
                    .get(&chosen)
                    .map_or(false, |b| b.nxt_difficulty.is_some());
                if !has_target {
                    return Err(ServerError::UnresolvedDifficulty(chosen));
                }
                pool.chaintip = chosen;
                chaintip_changed = true;
                let next_find = physics::simulate_block_time(pool, event.sim_clock, &self.blocks, &mut self.noise);
                self.queue.push(next_find);
            }
        }

        // Step 6: request any still-missing ancestors, batched into one
        // delivery (§4.2, §4.5).
        if !decision.request_ids.is_empty() {
            let pool = self.pools.get_mut(&event.pool_id).expect("looked up above");
            let mut fresh_requests = Vec::new();
            for id in &decision.request_ids {
                if pool.request_ids.insert(id.clone()) {
                    fresh_requests.push(id.clone());
                }
            }
            if !fresh_requests.is_empty() {
                let delay = 2.0 * self.noise.owd_p2p() + self.noise.tx_time() * fresh_requests.len() as f64;
                let chaintip = fresh_requests.last().cloned().expect("just checked non-empty");
                self.queue.push(Event {
                    sim_clock: event.sim_clock + delay,
                    pool_id: event.pool_id.clone(),
                    action: Action::RecvOther,
                    chaintip,
                    new_ids: fresh_requests,
                });
            }
        }

        // Step 7: broadcast whatever this pool decided to make public.
        if !decision.broadcast_ids.is_empty() {
            let pool_ids: Vec<_> = self.pools.keys().cloned().collect();
            let events = physics::broadcast_block(
                &decision.broadcast_ids,
                &event.pool_id,
                event.sim_clock,
                pool_ids.into_iter(),
                &mut self.blocks,
                &mut self.noise,
            );
            for e in events {
                self.queue.push(e);
            }
        }

        // The difficulty-window cache is only ever worth pruning once a
        // chaintip actually moved (§5 "Shared resource policy").
        if chaintip_changed {
            let live_tips: HashSet<_> = self.pools.values().map(|p| p.chaintip.clone()).collect();
            self.diff_cache.prune(&self.blocks, &live_tips);
        }

        trace!("pool {} integrated {:?} at clock {}", event.pool_id, event.action, event.sim_clock);
        debug!("queue depth {} after integrating {}", self.queue.len(), event.pool_id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Difficulty, PoolId, Strategy};

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1_000,
            Difficulty::from_u64(1),
            Difficulty::from_u64(1),
            Difficulty::from_u64(1),
        )
    }

    fn net() -> NetConfig {
        NetConfig {
            ping_secs: 0.02,
            cv: 0.2,
            mbps: 100.0,
            block_size_kb: 20.0,
            ntp_stdev: 0.0,
        }
    }

    #[test]
    fn a_two_pool_round_mines_past_the_bootstrap_root() {
        let pools = vec![
            Pool::new(PoolId::from("P0"), 0.6, 1.0, 0.0, Strategy::Honest { scoring: vec![] }),
            Pool::new(PoolId::from("P1"), 0.4, 1.0, 0.0, Strategy::Honest { scoring: vec![] }),
        ];
        let diff_config = DifficultyConfig::new(6, 1, 1, 60).unwrap();
        let round = Round::new(pools, root(), DifficultyWindow::default(), diff_config, net(), 42, 500.0);
        let result = round.run().unwrap();
        assert!(result.blocks.len() > 1);
        for (_, pool) in &result.pools {
            assert!(pool.chaintip.height() >= 1);
        }
    }
}
