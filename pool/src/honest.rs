use std::cmp::Ordering;

use sim_core::{Action, BlockId, Event, Pool, Score};

use crate::common::max_by_cum_diff_score;

/// Honest chain selection (§4.4 step 6): the chosen chaintip is whichever
/// of "the best freshly-scored id" and "the pool's current chaintip" has
/// the greater `cum_diff_score`. On `RECV_OWN`, an exact tie is broken in
/// favor of the pool's own block rather than staying put.
pub fn decide(event: &Event, pool: &Pool, fresh: &[(BlockId, Score)]) -> Option<BlockId> {
    let max_new = max_by_cum_diff_score(fresh)?;
    let new_score = fresh
        .iter()
        .find(|(id, _)| id == max_new)
        .map(|(_, s)| s)
        .expect("max_new came from fresh");

    let current_score = pool.scores.get(&pool.chaintip);
    let current_cum = current_score.and_then(|s| s.cum_diff_score.as_ref());

    let own_block_tie_break =
        event.action == Action::RecvOwn && event.new_ids.last() == Some(max_new);

    match current_cum {
        None => Some(max_new.clone()),
        Some(current) => {
            let new_cum = new_score.cum_diff_score.as_ref().expect("fresh entries are resolved");
            match new_cum.cmp(current) {
                Ordering::Greater => Some(max_new.clone()),
                Ordering::Equal if own_block_tie_break => Some(max_new.clone()),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{PoolId, ScoreValue, Strategy};

    fn ev(action: Action, new_ids: Vec<BlockId>) -> Event {
        Event {
            sim_clock: 10.0,
            pool_id: PoolId::from("P0"),
            action,
            chaintip: BlockId::from("0_HH0"),
            new_ids,
        }
    }

    fn scored(id: &str, cum: i64) -> (BlockId, Score) {
        (
            BlockId::from(id),
            Score {
                sim_clock: 10.0,
                local_time: 10,
                diff_score: Some(ScoreValue::from_i64(cum)),
                cum_diff_score: Some(ScoreValue::from_i64(cum)),
                is_head_path: false,
                chaintip: None,
            },
        )
    }

    fn mk_pool(chaintip: &str, cum: i64) -> Pool {
        let mut pool = Pool::new(PoolId::from("P0"), 0.5, 100.0, 0.0, Strategy::Honest { scoring: vec![] });
        pool.chaintip = BlockId::from(chaintip);
        pool.scores.insert(pool.chaintip.clone(), scored(chaintip, cum).1);
        pool
    }

    #[test]
    fn higher_score_wins() {
        let pool = mk_pool("1_P0", 10);
        let fresh = vec![scored("1_P1", 20)];
        let event = ev(Action::RecvOther, vec![BlockId::from("1_P1")]);
        assert_eq!(decide(&event, &pool, &fresh), Some(BlockId::from("1_P1")));
    }

    #[test]
    fn lower_score_keeps_current() {
        let pool = mk_pool("1_P0", 20);
        let fresh = vec![scored("1_P1", 10)];
        let event = ev(Action::RecvOther, vec![BlockId::from("1_P1")]);
        assert_eq!(decide(&event, &pool, &fresh), None);
    }

    #[test]
    fn tie_on_recv_own_prefers_own_block() {
        let pool = mk_pool("1_P1", 10);
        let fresh = vec![scored("1_P0", 10)];
        let event = ev(Action::RecvOwn, vec![BlockId::from("1_P0")]);
        assert_eq!(decide(&event, &pool, &fresh), Some(BlockId::from("1_P0")));
    }

    #[test]
    fn tie_on_recv_other_keeps_current() {
        let pool = mk_pool("1_P1", 10);
        let fresh = vec![scored("1_P0", 10)];
        let event = ev(Action::RecvOther, vec![BlockId::from("1_P0")]);
        assert_eq!(decide(&event, &pool, &fresh), None);
    }
}
