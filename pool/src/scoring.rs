use sim_core::{BlockId, Pool, ScoreValue, ScoringFn};
use sim_store::BlockTable;

/// Sums every configured scoring-function adjustment for `id` (§4.4.2). The
/// honest baseline runs with an empty slice and always returns zero.
pub fn evaluate(fns: &[ScoringFn], blocks: &BlockTable, pool: &Pool, id: &BlockId) -> ScoreValue {
    fns.iter()
        .map(|f| adjustment(f, blocks, pool, id))
        .fold(ScoreValue::zero(), |acc, v| acc + v)
}

fn adjustment(f: &ScoringFn, blocks: &BlockTable, pool: &Pool, id: &BlockId) -> ScoreValue {
    match f {
        ScoringFn::UncleBonus { reward } => uncle_bonus(*reward, blocks, pool, id),
        ScoringFn::TimePenalty { threshold, penalty } => time_penalty(*threshold, *penalty, blocks, pool, id),
        ScoringFn::DepthBonus { per_level, cap } => depth_bonus(*per_level, *cap, blocks, pool, id),
    }
}

/// Rewards a pool for acknowledging a contested height: if a sibling of
/// `id` (same `prev_id`, different id) is already on this pool's head
/// path, `id` picks up a one-time bonus. A difficulty-scoring
/// countermeasure against selfish withholding (§4.4.2).
fn uncle_bonus(reward: i64, blocks: &BlockTable, pool: &Pool, id: &BlockId) -> ScoreValue {
    let prev_id = match blocks.get(id).and_then(|b| b.prev_id.clone()) {
        Some(p) => p,
        None => return ScoreValue::zero(),
    };
    let has_head_path_sibling = pool.scores.iter().any(|(sibling_id, score)| {
        sibling_id != id
            && score.is_head_path
            && blocks.get(sibling_id).and_then(|b| b.prev_id.clone()) == Some(prev_id.clone())
    });
    if has_head_path_sibling {
        ScoreValue::from_i64(reward)
    } else {
        ScoreValue::zero()
    }
}

/// Penalizes a block whose header timestamp is suspiciously far ahead of
/// this pool's own clock, discouraging a selfish pool from back-dating a
/// withheld block to look competitive once released (§4.4.2).
fn time_penalty(threshold: i64, penalty: i64, blocks: &BlockTable, pool: &Pool, id: &BlockId) -> ScoreValue {
    let block = match blocks.get(id) {
        Some(b) => b,
        None => return ScoreValue::zero(),
    };
    let score = match pool.scores.get(id) {
        Some(s) => s,
        None => return ScoreValue::zero(),
    };
    match block.timestamp {
        Some(ts) if ts - score.local_time > threshold => ScoreValue::from_i64(-penalty),
        _ => ScoreValue::zero(),
    }
}

/// Mild tie-breaker favoring deeper private branches: adds `per_level` for
/// each consecutive ancestor mined by the same pool as `id`, capped at
/// `cap` (§4.4.2).
fn depth_bonus(per_level: i64, cap: i64, blocks: &BlockTable, _pool: &Pool, id: &BlockId) -> ScoreValue {
    let block = match blocks.get(id) {
        Some(b) => b,
        None => return ScoreValue::zero(),
    };
    let mut depth: i64 = 0;
    let mut cursor = block.prev_id.clone();
    while let Some(prev_id) = cursor {
        match blocks.get(&prev_id) {
            Some(prev) if prev.pool_id == block.pool_id => {
                depth += 1;
                if depth * per_level >= cap {
                    break;
                }
                cursor = prev.prev_id.clone();
            }
            _ => break,
        }
    }
    ScoreValue::from_i64((depth * per_level).min(cap))
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Difficulty, PoolId, Score, Strategy};

    fn mk_pool() -> Pool {
        Pool::new(PoolId::from("P0"), 0.5, 100.0, 0.0, Strategy::Honest { scoring: vec![] })
    }

    #[test]
    fn empty_scoring_list_is_zero() {
        let blocks = BlockTable::new();
        let pool = mk_pool();
        let id = BlockId::from("1_P0");
        assert_eq!(evaluate(&[], &blocks, &pool, &id), ScoreValue::zero());
    }

    #[test]
    fn uncle_bonus_rewards_acknowledged_sibling() {
        let mut blocks = BlockTable::new();
        let root = Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        );
        blocks.insert_root(root.clone()).unwrap();
        let mut a = Block::mint_child(&root, PoolId::from("P0"), 1.0);
        a.nxt_difficulty = Some(Difficulty::from_u64(10));
        blocks.insert(a.clone()).unwrap();
        let mut b = Block::mint_child(&root, PoolId::from("P1"), 1.0);
        b.nxt_difficulty = Some(Difficulty::from_u64(10));
        blocks.insert(b.clone()).unwrap();

        let mut pool = mk_pool();
        pool.scores.insert(
            a.id.clone(),
            Score {
                sim_clock: 1.0,
                local_time: 1,
                diff_score: Some(ScoreValue::from_i64(10)),
                cum_diff_score: Some(ScoreValue::from_i64(20)),
                is_head_path: true,
                chaintip: Some(a.id.clone()),
            },
        );

        let bonus = uncle_bonus(5, &blocks, &pool, &b.id);
        assert_eq!(bonus, ScoreValue::from_i64(5));
    }
}
