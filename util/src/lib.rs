//! Shared, non-domain utilities: logging setup and cancellation plumbing.
//! Kept free of the simulator's own data model so every other crate can
//! depend on it without risking a cycle.

mod logger;
mod stop_state;

pub use logger::{init_logger, init_test_logger, LoggingConfig};
pub use stop_state::StopState;
