use indexmap::IndexMap;
use serde::Deserialize;

use sim_core::{ScoringFn, Strategy};

use crate::error::ConfigError;
use crate::pools_table::PoolsTable;

/// One `{kind, ...params}` entry of a manifest strategy's `scoring` list
/// (§4.4.2). Mirrors `sim_core::ScoringFn` one-for-one; kept as a separate,
/// `serde`-friendly type so the core crate doesn't need to know about
/// manifest file shapes.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawScoringFn {
    UncleBonus { reward: i64 },
    TimePenalty { threshold: i64, penalty: i64 },
    DepthBonus { per_level: i64, cap: i64 },
}

impl From<RawScoringFn> for ScoringFn {
    fn from(raw: RawScoringFn) -> ScoringFn {
        match raw {
            RawScoringFn::UncleBonus { reward } => ScoringFn::UncleBonus { reward },
            RawScoringFn::TimePenalty { threshold, penalty } => ScoringFn::TimePenalty { threshold, penalty },
            RawScoringFn::DepthBonus { per_level, cap } => ScoringFn::DepthBonus { per_level, cap },
        }
    }
}

/// The `config` object of a manifest entry (§4.8): `k_thresh`/`retort_policy`
/// only apply to the `selfish` entry point and are validated against it.
#[derive(Clone, Debug, Deserialize, Default)]
struct RawStrategyConfig {
    k_thresh: Option<i8>,
    retort_policy: Option<u8>,
    #[serde(default)]
    scoring: Vec<RawScoringFn>,
}

/// One row of `strategy_manifest` (§6): the strategy id pools reference,
/// which built-in entry point constructs it, and that entry point's
/// parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub entry_point: String,
    config: RawStrategyConfig,
}

/// `{id -> {entryPoint, config}}` (§4.8, §6). Validated at load time so
/// every pool's `strategy` resolves to a manifest entry and every entry's
/// `entry_point` names a registered constructor with config matching its
/// shape — any mismatch is a config error caught before any round starts
/// (§7 "Config": fail fast).
#[derive(Clone, Debug)]
pub struct StrategyManifest {
    entries: IndexMap<String, ManifestEntry>,
}

impl StrategyManifest {
    pub fn parse_json(text: &str) -> Result<StrategyManifest, ConfigError> {
        let raw: Vec<ManifestEntry> = serde_json::from_str(text)
            .map_err(|e| ConfigError::MalformedStrategyConfig("<manifest>".to_string(), e.to_string()))?;
        Self::from_entries(raw)
    }

    fn from_entries(raw: Vec<ManifestEntry>) -> Result<StrategyManifest, ConfigError> {
        let mut entries = IndexMap::new();
        for entry in raw {
            entries.insert(entry.id.clone(), entry);
        }
        Ok(StrategyManifest { entries })
    }

    /// Checks every pool in `pools` names a manifest entry that exists and
    /// whose `entry_point`/`config` are internally consistent (§4.8).
    pub fn validate_against(&self, pools: &PoolsTable) -> Result<(), ConfigError> {
        for (pool_id, entry) in pools.iter() {
            let manifest_entry = self
                .entries
                .get(&entry.strategy)
                .ok_or_else(|| ConfigError::UnknownStrategy(pool_id.to_string(), entry.strategy.clone()))?;
            self.build_strategy(manifest_entry)?;
        }
        Ok(())
    }

    /// Resolves `strategy_id` into a `sim_core::Strategy`, building the
    /// tagged-variant config the unified agent dispatches on (§4.4, §9
    /// "Sum-of-variants").
    pub fn resolve(&self, strategy_id: &str) -> Result<Strategy, ConfigError> {
        let entry = self
            .entries
            .get(strategy_id)
            .ok_or_else(|| ConfigError::UnknownStrategy(strategy_id.to_string(), strategy_id.to_string()))?;
        self.build_strategy(entry)
    }

    fn build_strategy(&self, entry: &ManifestEntry) -> Result<Strategy, ConfigError> {
        let scoring: Vec<ScoringFn> = entry.config.scoring.iter().cloned().map(ScoringFn::from).collect();
        match entry.entry_point.as_str() {
            "honest" => Ok(Strategy::Honest { scoring }),
            "selfish" => {
                let k_thresh = entry.config.k_thresh.ok_or_else(|| {
                    ConfigError::MalformedStrategyConfig(entry.id.clone(), "selfish entry point requires k_thresh".to_string())
                })?;
                let retort_policy = entry.config.retort_policy.ok_or_else(|| {
                    ConfigError::MalformedStrategyConfig(entry.id.clone(), "selfish entry point requires retort_policy".to_string())
                })?;
                if ![-1, 0, 1].contains(&k_thresh) {
                    return Err(ConfigError::MalformedStrategyConfig(
                        entry.id.clone(),
                        format!("k_thresh must be in {{-1, 0, 1}}, got {}", k_thresh),
                    ));
                }
                if retort_policy > 2 {
                    return Err(ConfigError::MalformedStrategyConfig(
                        entry.id.clone(),
                        format!("retort_policy must be in {{0, 1, 2}}, got {}", retort_policy),
                    ));
                }
                Ok(Strategy::Selfish {
                    k_thresh,
                    retort_policy,
                    scoring,
                })
            }
            other => Err(ConfigError::UnknownEntryPoint(entry.id.clone(), other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pools_table::PoolEntry;

    fn manifest_json() -> &'static str {
        r#"[
            {"id": "honest-baseline", "entry_point": "honest", "config": {}},
            {"id": "eyal-sirer", "entry_point": "selfish", "config": {"k_thresh": 1, "retort_policy": 1}}
        ]"#
    }

    fn pools() -> PoolsTable {
        let mut raw = IndexMap::new();
        raw.insert(
            "P0".to_string(),
            PoolEntry {
                strategy: "honest-baseline".to_string(),
                hpp: 0.7,
            },
        );
        raw.insert(
            "P1".to_string(),
            PoolEntry {
                strategy: "eyal-sirer".to_string(),
                hpp: 0.3,
            },
        );
        PoolsTable::from_entries(raw).unwrap()
    }

    #[test]
    fn resolves_honest_and_selfish_entries() {
        let manifest = StrategyManifest::parse_json(manifest_json()).unwrap();
        assert!(manifest.resolve("honest-baseline").unwrap().is_honest());
        match manifest.resolve("eyal-sirer").unwrap() {
            Strategy::Selfish { k_thresh, retort_policy, .. } => {
                assert_eq!(k_thresh, 1);
                assert_eq!(retort_policy, 1);
            }
            _ => panic!("expected selfish strategy"),
        }
    }

    #[test]
    fn validates_every_pool_resolves() {
        let manifest = StrategyManifest::parse_json(manifest_json()).unwrap();
        assert!(manifest.validate_against(&pools()).is_ok());
    }

    #[test]
    fn unknown_strategy_id_is_rejected() {
        let manifest = StrategyManifest::parse_json(r#"[{"id": "x", "entry_point": "honest", "config": {}}]"#).unwrap();
        assert!(manifest.validate_against(&pools()).is_err());
    }

    #[test]
    fn selfish_without_k_thresh_is_malformed() {
        let manifest = StrategyManifest::parse_json(
            r#"[{"id": "bad", "entry_point": "selfish", "config": {"retort_policy": 1}}]"#,
        )
        .unwrap();
        assert!(manifest.resolve("bad").is_err());
    }
}
