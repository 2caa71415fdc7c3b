use std::cmp::Ordering;
use std::collections::BinaryHeap;

use sim_core::Event;

/// Wraps an `Event` so the heap orders by the 5-key tie-break tuple rather
/// than by any derived `Ord`. `BinaryHeap` is a max-heap, so `Ord` here is
/// inverted relative to `EventKey`'s natural order to make the earliest
/// event sort to the top (§4.1).
struct QueueEntry(Event);

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.tie_break_key() == other.0.tie_break_key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.tie_break_key().cmp(&self.0.tie_break_key())
    }
}

/// The engine's priority queue of pending events (§4.1). Pops always return
/// the event with the smallest 5-key tie-break tuple, which the invariant
/// in §3 requires to be non-decreasing in `simClock` across the whole run.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.heap.push(QueueEntry(event));
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|e| e.0)
    }

    pub fn peek_sim_clock(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.0.sim_clock)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Compacts the backing storage once its physical capacity outgrows its
    /// logical length by more than 3x (§4.1 step 4, §5 "bound memory").
    pub fn maybe_compact(&mut self) {
        if self.heap.capacity() > 3 * self.heap.len().max(1) {
            self.heap.shrink_to_fit();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Action, BlockId, PoolId};

    fn ev(sim_clock: f64, pool: &str) -> Event {
        Event {
            sim_clock,
            pool_id: PoolId::from(pool),
            action: Action::HasherFind,
            chaintip: BlockId::from("0_HH0"),
            new_ids: vec![],
        }
    }

    #[test]
    fn pops_in_ascending_sim_clock_order() {
        let mut q = EventQueue::new();
        q.push(ev(5.0, "P0"));
        q.push(ev(1.0, "P1"));
        q.push(ev(3.0, "P2"));
        assert_eq!(q.pop().unwrap().sim_clock, 1.0);
        assert_eq!(q.pop().unwrap().sim_clock, 3.0);
        assert_eq!(q.pop().unwrap().sim_clock, 5.0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn ties_break_by_pool_id_then_action() {
        let mut q = EventQueue::new();
        q.push(ev(1.0, "P1"));
        q.push(ev(1.0, "P0"));
        assert_eq!(q.pop().unwrap().pool_id, PoolId::from("P0"));
        assert_eq!(q.pop().unwrap().pool_id, PoolId::from("P1"));
    }
}
