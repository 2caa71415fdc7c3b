//! In-memory block table and per-chaintip difficulty-window cache. Owned
//! exclusively by the event engine for the lifetime of one round; nothing
//! here persists across rounds or touches disk (§9 "no persistent store").

mod block_table;
mod diff_window;
mod error;

pub use block_table::BlockTable;
pub use diff_window::{DiffWindowCache, DifficultyWindow, WindowEntry};
pub use error::StoreError;
