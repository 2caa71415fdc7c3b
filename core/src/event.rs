use crate::id::{BlockId, PoolId};

/// The three event kinds driven through the engine (§3). Ordered here in
/// ascending tie-break rank per §4.1: at equal `sim_clock` for the same pool,
/// `RecvOwn` is dispatched before `RecvOther`, and both before `HasherFind`.
/// This is the effect of inverting the lexical order of the action tags
/// (`"HASHER_FIND" < "RECV_OTHER" < "RECV_OWN"` becomes
/// `RECV_OWN < RECV_OTHER < HASHER_FIND` once reversed).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Action {
    RecvOwn,
    RecvOther,
    HasherFind,
}

impl Action {
    /// Rank used as the third key of the event tie-break tuple (§4.1).
    pub fn tie_break_rank(self) -> u8 {
        match self {
            Action::RecvOwn => 0,
            Action::RecvOther => 1,
            Action::HasherFind => 2,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Action::RecvOwn => "RECV_OWN",
            Action::RecvOther => "RECV_OTHER",
            Action::HasherFind => "HASHER_FIND",
        }
    }
}

/// A scheduled occurrence in the event queue (§3). `new_ids` is ascending by
/// height; for `HasherFind` it is always empty, for `RecvOwn` it holds
/// exactly the freshly minted block, and for `RecvOther` it holds the batch
/// of ids a peer (or a missing-block refetch) delivered together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub sim_clock: f64,
    pub pool_id: PoolId,
    pub action: Action,
    pub chaintip: BlockId,
    pub new_ids: Vec<BlockId>,
}

impl Event {
    pub fn last_new_id(&self) -> Option<&BlockId> {
        self.new_ids.last()
    }

    /// The `(sim_clock, pool_id, action', chaintip, last_new_id)` tuple from
    /// §4.1, as a fully `Ord`-able key. `f64` has no total order in general,
    /// but simulation clocks are never NaN, so `f64::total_cmp` gives a
    /// well-defined total order without pulling in a wrapper crate.
    pub fn tie_break_key(&self) -> EventKey {
        EventKey {
            sim_clock: self.sim_clock,
            pool_id: self.pool_id.clone(),
            action_rank: self.action.tie_break_rank(),
            chaintip: self.chaintip.clone(),
            last_new_id: self.last_new_id().cloned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventKey {
    pub sim_clock: f64,
    pub pool_id: PoolId,
    pub action_rank: u8,
    pub chaintip: BlockId,
    pub last_new_id: Option<BlockId>,
}

impl Eq for EventKey {}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sim_clock
            .total_cmp(&other.sim_clock)
            .then_with(|| self.pool_id.cmp(&other.pool_id))
            .then_with(|| self.action_rank.cmp(&other.action_rank))
            .then_with(|| self.chaintip.cmp(&other.chaintip))
            .then_with(|| self.last_new_id.cmp(&other.last_new_id))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ev(sim_clock: f64, pool: &str, action: Action) -> Event {
        Event {
            sim_clock,
            pool_id: PoolId::from(pool),
            action,
            chaintip: BlockId::from("1_P0"),
            new_ids: vec![],
        }
    }

    #[test]
    fn recv_own_precedes_recv_other_at_same_clock() {
        let own = ev(10.0, "P0", Action::RecvOwn);
        let other = ev(10.0, "P0", Action::RecvOther);
        assert!(own.tie_break_key() < other.tie_break_key());
    }

    #[test]
    fn recv_other_precedes_hasher_find_at_same_clock() {
        let other = ev(10.0, "P0", Action::RecvOther);
        let find = ev(10.0, "P0", Action::HasherFind);
        assert!(other.tie_break_key() < find.tie_break_key());
    }

    #[test]
    fn lexically_smaller_pool_id_sorts_first() {
        let a = ev(10.0, "P0", Action::HasherFind);
        let b = ev(10.0, "P1", Action::HasherFind);
        assert!(a.tie_break_key() < b.tie_break_key());
    }

    #[test]
    fn earlier_sim_clock_always_sorts_first() {
        let a = ev(1.0, "P9", Action::HasherFind);
        let b = ev(2.0, "P0", Action::RecvOwn);
        assert!(a.tie_break_key() < b.tie_break_key());
    }
}
