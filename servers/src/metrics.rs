use indexmap::IndexMap;
use sim_core::{BlockId, Difficulty, Pool, PoolId};
use sim_store::BlockTable;

/// One honest pool's chain-health readout at round end (§4.7).
#[derive(Clone, Debug, Serialize)]
pub struct PoolMetrics {
    pub pool_id: PoolId,
    pub orphan_rate: f64,
    pub reorg_max: u64,
    pub reorg_p99: f64,
    pub reorg_rate: f64,
    pub self_shares: f64,
    pub gamma: f64,
    pub difficulty_at_head: Difficulty,
}

/// Mean and standard deviation of one metric across every honest pool
/// (§4.7 "Summary across honest pools").
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SummaryStat {
    pub mean: f64,
    pub stdev: f64,
}

impl SummaryStat {
    fn of(values: &[f64]) -> SummaryStat {
        if values.is_empty() {
            return SummaryStat::default();
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        SummaryStat {
            mean,
            stdev: variance.sqrt(),
        }
    }
}

/// Round-level aggregation of every honest pool's metrics (§4.7).
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RoundSummary {
    pub orphan_rate: SummaryStat,
    pub reorg_max: SummaryStat,
    pub reorg_p99: SummaryStat,
    pub reorg_rate: SummaryStat,
    pub self_shares: SummaryStat,
    pub gamma: SummaryStat,
}

/// Computes per-pool metrics for every honest pool in `pools`, walking each
/// one's `scores` in first-seen order as the metric definitions require
/// (§4.7, §9 "Metrics walk order").
pub fn compute_metrics(pools: &IndexMap<PoolId, Pool>, blocks: &BlockTable) -> (Vec<PoolMetrics>, RoundSummary) {
    let selfish_hpp: f64 = pools
        .values()
        .filter(|p| !p.is_honest())
        .map(|p| p.hpp)
        .sum();

    let per_pool: Vec<PoolMetrics> = pools
        .values()
        .filter(|p| p.is_honest())
        .map(|p| pool_metrics(p, pools, blocks, selfish_hpp))
        .collect();

    let summary = RoundSummary {
        orphan_rate: SummaryStat::of(&collect(&per_pool, |m| m.orphan_rate)),
        reorg_max: SummaryStat::of(&collect(&per_pool, |m| m.reorg_max as f64)),
        reorg_p99: SummaryStat::of(&collect(&per_pool, |m| m.reorg_p99)),
        reorg_rate: SummaryStat::of(&collect(&per_pool, |m| m.reorg_rate)),
        self_shares: SummaryStat::of(&collect(&per_pool, |m| m.self_shares)),
        gamma: SummaryStat::of(&collect(&per_pool, |m| m.gamma)),
    };
    (per_pool, summary)
}

fn collect(metrics: &[PoolMetrics], f: impl Fn(&PoolMetrics) -> f64) -> Vec<f64> {
    metrics.iter().map(f).collect()
}

fn pool_metrics(p: &Pool, pools: &IndexMap<PoolId, Pool>, blocks: &BlockTable, selfish_hpp: f64) -> PoolMetrics {
    let canonical_count = p.scores.values().filter(|s| s.is_head_path).count() as f64;
    let denom = (canonical_count - 1.0).max(1.0);

    let orphans = p
        .scores
        .iter()
        .filter(|(id, s)| {
            !s.is_head_path
                && blocks
                    .get(id)
                    .map(|b| b.pool_id != p.id)
                    .unwrap_or(false)
        })
        .count() as f64;
    let orphan_rate = orphans / denom;

    let reorg_list = reorg_depths(p);
    let reorg_max = reorg_list.iter().copied().max().unwrap_or(0);
    let reorg_p99 = percentile_99(&reorg_list);
    let canonical_height = p.chaintip.height().max(1) as f64;
    let reorg_rate = reorg_list.iter().filter(|d| **d >= 10).count() as f64 / canonical_height;

    let selfish_canonical = p
        .scores
        .iter()
        .filter(|(id, s)| {
            s.is_head_path
                && blocks
                    .get(id)
                    .and_then(|b| pools.get(&b.pool_id))
                    .map(|owner| !owner.is_honest())
                    .unwrap_or(false)
        })
        .count() as f64;
    let self_shares = selfish_canonical / denom - selfish_hpp;

    let gamma = gamma_estimate(p, pools, blocks, selfish_hpp);

    let difficulty_at_head = blocks
        .get(&p.chaintip)
        .map(|b| b.difficulty.clone())
        .unwrap_or_else(Difficulty::one);

    PoolMetrics {
        pool_id: p.id.clone(),
        orphan_rate,
        reorg_max,
        reorg_p99,
        reorg_rate,
        self_shares,
        gamma,
        difficulty_at_head,
    }
}

/// Counts, in first-seen order, blocks the pool once believed were its own
/// chaintip (`score.chaintip == id`) but that are no longer on the head
/// path, flushing the running count as one reorg depth whenever the head
/// path resumes (§4.7 `reorgDepth`). A run still open at the end of the
/// round (the pool's current tip is itself off a since-abandoned branch)
/// is flushed too.
fn reorg_depths(p: &Pool) -> Vec<u64> {
    let mut list = Vec::new();
    let mut current: u64 = 0;
    for (id, score) in p.scores.iter() {
        if score.is_head_path {
            if current > 0 {
                list.push(current);
                current = 0;
            }
        } else if score.chaintip.as_ref() == Some(id) {
            current += 1;
        }
    }
    if current > 0 {
        list.push(current);
    }
    list
}

fn percentile_99(sorted_source: &[u64]) -> f64 {
    if sorted_source.is_empty() {
        return 0.0;
    }
    let mut values = sorted_source.to_vec();
    values.sort_unstable();
    let rank = ((0.99 * values.len() as f64).ceil() as usize).saturating_sub(1);
    values[rank.min(values.len() - 1)] as f64
}

/// γ (§4.7, GLOSSARY): among contested heights this pool has seen two
/// blocks at, the share where the first-seen entrant was selfish-mined,
/// scaled by `HPP / (1 − selfishHPP)` (§9 "Open questions": the source
/// flags this count as possibly including non-contention state-0' returns).
fn gamma_estimate(p: &Pool, pools: &IndexMap<PoolId, Pool>, blocks: &BlockTable, selfish_hpp: f64) -> f64 {
    let mut by_height: std::collections::HashMap<u64, Vec<&BlockId>> = std::collections::HashMap::new();
    for id in p.scores.keys() {
        by_height.entry(id.height()).or_default().push(id);
    }

    let is_selfish = |id: &BlockId| -> bool {
        blocks
            .get(id)
            .and_then(|b| pools.get(&b.pool_id))
            .map(|owner| !owner.is_honest())
            .unwrap_or(false)
    };

    let mut numerator = 0u64;
    let mut denominator = 0u64;
    for ids in by_height.values() {
        if ids.len() < 2 {
            continue;
        }
        let first = ids[0];
        let any_selfish = ids.iter().any(|id| is_selfish(id));
        if !any_selfish {
            continue;
        }
        denominator += 1;
        if is_selfish(first) {
            numerator += 1;
        }
    }

    if denominator == 0 || (1.0 - selfish_hpp) <= 0.0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64) * (p.hpp / (1.0 - selfish_hpp))
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Broadcast, Difficulty, Score, ScoreValue, Strategy};

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        )
    }

    fn scored(sim_clock: f64, cum: i64, head: bool, chaintip: Option<BlockId>) -> Score {
        Score {
            sim_clock,
            local_time: sim_clock as i64,
            diff_score: Some(ScoreValue::from_i64(cum)),
            cum_diff_score: Some(ScoreValue::from_i64(cum)),
            is_head_path: head,
            chaintip,
        }
    }

    #[test]
    fn reorg_depth_counts_consecutive_abandoned_former_tips() {
        let mut pool = Pool::new(PoolId::from("P0"), 1.0, 100.0, 0.0, Strategy::Honest { scoring: vec![] });
        let a = BlockId::from("1_P0");
        let b = BlockId::from("2_P0");
        let c = BlockId::from("1_P1");
        pool.scores.insert(a.clone(), scored(1.0, 10, false, Some(a.clone())));
        pool.scores.insert(b.clone(), scored(2.0, 20, false, Some(b.clone())));
        pool.scores.insert(c.clone(), scored(3.0, 15, true, Some(c.clone())));
        let depths = reorg_depths(&pool);
        assert_eq!(depths, vec![2]);
    }

    #[test]
    fn orphan_rate_excludes_self_mined_blocks() {
        let mut blocks = BlockTable::new();
        let r = root();
        blocks.insert_root(r.clone()).unwrap();
        let mut own = Block::mint_child(&r, PoolId::from("P0"), 1.0);
        own.nxt_difficulty = Some(Difficulty::from_u64(10));
        own.broadcast = Some(Broadcast::Private);
        blocks.insert(own.clone()).unwrap();
        let mut other = Block::mint_child(&r, PoolId::from("P1"), 1.0);
        other.nxt_difficulty = Some(Difficulty::from_u64(10));
        other.broadcast = Some(Broadcast::Public);
        blocks.insert(other.clone()).unwrap();

        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 100.0, 0.0, Strategy::Honest { scoring: vec![] });
        pool.seed_bootstrap(&r);
        pool.chaintip = other.id.clone();
        pool.scores.insert(own.id.clone(), scored(1.0, 20, false, Some(own.id.clone())));
        pool.scores.insert(other.id.clone(), scored(1.0, 20, true, Some(other.id.clone())));

        let mut pools = IndexMap::new();
        pools.insert(PoolId::from("P0"), pool.clone());
        let (metrics, _) = compute_metrics(&pools, &blocks);
        let m = metrics.iter().find(|m| m.pool_id == PoolId::from("P0")).unwrap();
        // own.id is this pool's own mined block, so it must not count as an orphan.
        assert_eq!(m.orphan_rate, 0.0);
    }
}
