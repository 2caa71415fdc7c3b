use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag, flipped by a `ctrlc` handler or the
/// orchestrator and polled by a round's event loop (§5 Cancellation). When
/// set, the round finishes its current event, emits a best-effort partial
/// result and stops rather than running to `simDepth`.
#[derive(Default)]
pub struct StopState {
    stopped: AtomicBool,
}

impl StopState {
    pub fn new() -> StopState {
        StopState {
            stopped: AtomicBool::new(false),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn starts_unstopped_and_latches() {
        let s = StopState::new();
        assert!(!s.is_stopped());
        s.stop();
        assert!(s.is_stopped());
    }
}
