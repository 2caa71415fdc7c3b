use sim_chain::DifficultyConfig;
use sim_core::{Block, Pool};
use sim_net::NetConfig;
use sim_store::DifficultyWindow;

use crate::bootstrap::DifficultyBootstrap;
use crate::dynamic_config::DynamicConfig;
use crate::env_table::RoundConfig;
use crate::error::ConfigError;
use crate::pools_table::PoolsTable;
use crate::strategy_manifest::StrategyManifest;
use crate::sweep::RoundOverlay;

/// Everything a round needs to run, fully validated and cross-checked
/// against each other (§4.8, §7 "Config": fail fast before any round
/// starts). Built once per sweep permutation by `ResolvedConfig::resolve`.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub round: RoundConfig,
    pub dynamic: DynamicConfig,
    pub pools: PoolsTable,
    pub manifest: StrategyManifest,
    pub bootstrap: DifficultyBootstrap,
}

impl ResolvedConfig {
    /// Validates every cross-cutting invariant §4.8 lists: pool HPPs sum to
    /// 1 (already checked by `PoolsTable::from_entries`), every pool's
    /// strategy resolves through the manifest, and the bootstrap CSV has
    /// enough rows for the configured window.
    pub fn new(
        round: RoundConfig,
        dynamic: DynamicConfig,
        pools: PoolsTable,
        manifest: StrategyManifest,
        bootstrap: DifficultyBootstrap,
    ) -> Result<ResolvedConfig, ConfigError> {
        manifest.validate_against(&pools)?;
        Ok(ResolvedConfig {
            round,
            dynamic,
            pools,
            manifest,
            bootstrap,
        })
    }

    pub fn difficulty_config(&self) -> Result<DifficultyConfig, ConfigError> {
        self.dynamic.difficulty_config()
    }

    pub fn net_config(&self) -> NetConfig {
        self.dynamic.net_config()
    }

    /// Builds the round's start tip from the bootstrap CSV (§3 "Bootstrap
    /// root").
    pub fn root_block(&self, diff_config: &DifficultyConfig) -> Block {
        self.bootstrap.root_block(diff_config)
    }

    /// The difficulty window the round's engine starts from, pre-seeded
    /// under the bootstrap root's id (§3 "Bootstrap root", §4.1 "Seeding").
    pub fn initial_window(&self, diff_config: &DifficultyConfig) -> DifficultyWindow {
        let mut window = DifficultyWindow::default();
        for entry in self.bootstrap.window_entries(diff_config.total_len()) {
            window.push_trimmed(entry, diff_config.total_len());
        }
        window
    }

    /// Builds the round's pool set, `ntp_drift` still zeroed — the engine
    /// fills it in per pool from the round's noise streams on construction
    /// (§3 "Pool"; `Round::new` calls `noise.ntp_drift()` itself so every
    /// pool's drift is reproducible from the round seed).
    pub fn build_pools(&self) -> Result<Vec<Pool>, ConfigError> {
        self.pools
            .iter()
            .map(|(pool_id, entry)| {
                let strategy = self.manifest.resolve(&entry.strategy)?;
                Ok(Pool::new(pool_id.clone(), entry.hpp, self.dynamic.network_hashrate, 0.0, strategy))
            })
            .collect()
    }

    /// Applies a sweep permutation's overrides by re-parsing the round and
    /// dynamic config text with the overlay folded in (§4.8 `SweepSpec`).
    /// Pools, manifest and bootstrap are untouched — sweeps vary scalar
    /// simulation parameters, not the pool roster or strategy catalogue.
    pub fn with_overlay(
        round_text: &str,
        dynamic_text: &str,
        overlay: &RoundOverlay,
        pools: PoolsTable,
        manifest: StrategyManifest,
        bootstrap: DifficultyBootstrap,
    ) -> Result<ResolvedConfig, ConfigError> {
        let mut round_table = crate::env_table::EnvTable::parse(round_text);
        round_table.apply_overlay(&overlay.values);
        let round = round_table.to_round_config()?;

        let mut dyn_table = crate::env_table::EnvTable::parse(dynamic_text);
        dyn_table.apply_overlay(&overlay.values);
        let dynamic = DynamicConfig::parse(&dyn_table.render())?;

        ResolvedConfig::new(round, dynamic, pools, manifest, bootstrap)
    }
}
