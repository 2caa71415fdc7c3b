//! Shared data model for the minesim mining-network simulator: block and
//! score records, pool state, the event type and its deterministic
//! tie-break order, and the arbitrary-precision numeric types difficulty
//! and scoring arithmetic is done in. No behavior lives here — just the
//! types the event engine (`sim_servers`), the pool agent (`sim_pool`) and
//! the difficulty engine (`sim_chain`) all share.

#[macro_use]
extern crate serde_derive;

mod bignum;
mod block;
mod decision;
mod event;
mod id;
mod pool;
mod score;

pub use bignum::{Difficulty, ScoreValue};
pub use block::{Block, Broadcast};
pub use decision::Decision;
pub use event::{Action, Event, EventKey};
pub use id::{BlockId, PoolId};
pub use pool::{Pool, ScoringFn, Strategy};
pub use score::Score;
