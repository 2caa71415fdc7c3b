use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use sim_core::{BlockId, Difficulty, Pool, Score, ScoreValue, ScoringFn};
use sim_store::BlockTable;

use crate::resolve::ResolvedBranch;
use crate::scoring;

/// `scoreBlock` (§4.4 step 3): resolves every id in `resolved.to_score` in
/// ascending height order, chaining `cum_diff_score` off the common
/// ancestor's. If the branch has no common ancestor yet (it dead-ends at a
/// block this pool must still fetch, §4.4 step 2), every entry is left
/// exactly as the tentative, unresolved score `resolveBranch` created.
pub fn score_branch(
    resolved: &ResolvedBranch,
    blocks: &BlockTable,
    pool: &Pool,
    scoring_fns: &[ScoringFn],
) -> Vec<(BlockId, Score)> {
    let mut base_cum = resolved
        .common_ancestor
        .as_ref()
        .and_then(|a| pool.scores.get(a))
        .and_then(|s| s.cum_diff_score.clone());

    let mut out = Vec::with_capacity(resolved.to_score.len());
    for (id, tentative) in resolved.to_score.iter().zip(resolved.tentative.iter()) {
        let mut score = tentative.clone();
        if let Some(base) = base_cum.clone() {
            let difficulty = blocks
                .get(id)
                .map(|b| b.difficulty.clone())
                .unwrap_or_else(Difficulty::one);
            let diff_score = ScoreValue::from_difficulty(&difficulty) + scoring::evaluate(scoring_fns, blocks, pool, id);
            let cum_diff_score = &base + &diff_score;
            score.diff_score = Some(diff_score);
            score.cum_diff_score = Some(cum_diff_score.clone());
            base_cum = Some(cum_diff_score);
        } else {
            base_cum = None;
        }
        out.push((id.clone(), score));
    }
    out
}

/// `scoreDanglingChaintips` (§4.4 step 4): now that `fresh` may have
/// resolved a new ancestor, retry every entry in `pool.unscored` taller
/// than `min_height` whose parent has since become resolvable. Runs to a
/// fixed point since resolving one entry can unlock its own children.
pub fn score_dangling(
    pool: &Pool,
    blocks: &BlockTable,
    scoring_fns: &[ScoringFn],
    fresh: &[(BlockId, Score)],
    min_height: u64,
) -> Vec<(BlockId, Score)> {
    let mut resolved: HashMap<BlockId, ScoreValue> = pool
        .scores
        .iter()
        .filter_map(|(id, s)| s.cum_diff_score.clone().map(|v| (id.clone(), v)))
        .collect();
    for (id, s) in fresh {
        if let Some(v) = &s.cum_diff_score {
            resolved.insert(id.clone(), v.clone());
        }
    }

    let mut candidates: Vec<(BlockId, u64)> = pool
        .unscored
        .iter()
        .filter(|(_, h)| **h > min_height)
        .map(|(id, h)| (id.clone(), *h))
        .collect();
    candidates.sort_by_key(|(_, h)| *h);

    let mut out = Vec::new();
    let mut progressed = true;
    while progressed {
        progressed = false;
        for (id, _) in &candidates {
            if resolved.contains_key(id) {
                continue;
            }
            let prev_id = match blocks.get(id).and_then(|b| b.prev_id.clone()) {
                Some(p) => p,
                None => continue,
            };
            let base = match resolved.get(&prev_id).cloned() {
                Some(b) => b,
                None => continue,
            };
            let tentative = match pool.scores.get(id) {
                Some(s) => s.clone(),
                None => continue,
            };
            let diff_score =
                ScoreValue::from_difficulty(&blocks.get(id).unwrap().difficulty) + scoring::evaluate(scoring_fns, blocks, pool, id);
            let cum_diff_score = &base + &diff_score;
            let mut score = tentative;
            score.diff_score = Some(diff_score);
            score.cum_diff_score = Some(cum_diff_score.clone());
            resolved.insert(id.clone(), cum_diff_score);
            out.push((id.clone(), score));
            progressed = true;
        }
    }
    out
}

/// `propagateHeadPathToScores` (§4.4 step 8): marks the new best chain
/// `is_head_path = true` from `chosen` back to (not including) `common_ancestor`,
/// and — if this is a genuine reorg rather than a plain extension — marks
/// the abandoned old chain `is_head_path = false` back to the same point.
/// `scores_out` already holds every freshly scored entry from this
/// invocation; entries not yet present are copied in from `pool.scores`.
pub fn propagate_head_path(
    chosen: &BlockId,
    common_ancestor: &BlockId,
    old_chaintip: &BlockId,
    pool: &Pool,
    blocks: &BlockTable,
    scores_out: &mut IndexMap<BlockId, Score>,
) {
    let mut new_path: HashSet<BlockId> = HashSet::new();
    let mut cursor = Some(chosen.clone());
    while let Some(id) = cursor {
        if &id == common_ancestor {
            break;
        }
        new_path.insert(id.clone());
        mark(&id, true, pool, scores_out, Some(chosen.clone()));
        cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
    }

    if old_chaintip != common_ancestor && old_chaintip != chosen && !new_path.contains(old_chaintip) {
        let mut cursor = Some(old_chaintip.clone());
        while let Some(id) = cursor {
            if &id == common_ancestor {
                break;
            }
            mark(&id, false, pool, scores_out, None);
            cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
        }
    }
}

fn mark(
    id: &BlockId,
    is_head_path: bool,
    pool: &Pool,
    scores_out: &mut IndexMap<BlockId, Score>,
    chaintip: Option<BlockId>,
) {
    let mut score = scores_out
        .get(id)
        .cloned()
        .or_else(|| pool.scores.get(id).cloned())
        .expect("propagate walks only ids already scored this round or previously known");
    score.is_head_path = is_head_path;
    if let Some(tip) = chaintip {
        score.chaintip = Some(tip);
    }
    scores_out.insert(id.clone(), score);
}

/// Walks back from `start`'s parent to the nearest ancestor this pool
/// already has marked `is_head_path = true` in `pool.scores` — the
/// divergence point between `start` and whatever the pool currently has as
/// its chaintip, regardless of which step produced `start` (a plain
/// `resolveBranch` walk, a dangling-chaintip resolution, or a selfish
/// abandon). Used to bound `propagate_head_path` generically instead of
/// trusting the common ancestor a specific branch walk happened to find,
/// since that ancestor may not lie on `start`'s actual lineage.
pub fn nearest_head_path_ancestor(start: &BlockId, pool: &Pool, blocks: &BlockTable) -> BlockId {
    let mut cursor = blocks.get(start).and_then(|b| b.prev_id.clone());
    while let Some(id) = cursor {
        if pool.scores.get(&id).map_or(false, |s| s.is_head_path) {
            return id;
        }
        cursor = blocks.get(&id).and_then(|b| b.prev_id.clone());
    }
    start.clone()
}

/// The id with the greatest `cum_diff_score` among `fresh`, if any resolved.
pub fn max_by_cum_diff_score<'a>(fresh: &'a [(BlockId, Score)]) -> Option<&'a BlockId> {
    fresh
        .iter()
        .filter_map(|(id, s)| s.cum_diff_score.as_ref().map(|v| (id, v)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(id, _)| id)
}
