//! Config loading and validation for minesim (§6, §4.8): the round
//! environment table, the dynamic difficulty/internet parameters, the
//! pools table, the strategy manifest, the difficulty bootstrap CSV and
//! sweep-spec expansion. Out of scope for the core three subsystems per
//! the design brief, but carried here as a working reference
//! implementation so the crate is runnable end to end (§7 "Config"/
//! "Bootstrap": fail fast, before any round starts).

#[macro_use]
extern crate serde_derive;

mod bootstrap;
mod dynamic_config;
mod env_table;
mod error;
mod pools_table;
mod resolved;
mod strategy_manifest;
mod sweep;

pub use bootstrap::{BootstrapRow, DifficultyBootstrap};
pub use dynamic_config::DynamicConfig;
pub use env_table::{DataMode, EnvTable, LogMode, RoundConfig, SimRounds};
pub use error::ConfigError;
pub use pools_table::{PoolEntry, PoolsTable};
pub use resolved::ResolvedConfig;
pub use strategy_manifest::{ManifestEntry, StrategyManifest};
pub use sweep::{RoundOverlay, SweepSpec};
