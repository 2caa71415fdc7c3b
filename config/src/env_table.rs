use std::collections::HashMap;

use crate::error::ConfigError;

/// `SIM_ROUNDS` (§4.8, §6): either a fixed round count or the literal sweep
/// marker, in which case the round count comes from the expanded sweep
/// spec instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimRounds {
    Fixed(u32),
    Sweep,
}

/// `DATA_MODE` (§4.9, §6), ordered so `results_metrics.csv`/`results_blocks.csv.gz`
/// gate on "at least" this mode rather than exact equality.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum DataMode {
    Simple,
    Metrics,
    Full,
}

impl DataMode {
    fn parse(s: &str) -> Result<DataMode, ConfigError> {
        match s {
            "simple" => Ok(DataMode::Simple),
            "metrics" => Ok(DataMode::Metrics),
            "full" => Ok(DataMode::Full),
            other => Err(ConfigError::InvalidValue(other.to_string(), "DATA_MODE")),
        }
    }
}

/// One entry of `LOG_MODE` (§6), a subset of `{info, probe, stats}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LogMode {
    Info,
    Probe,
    Stats,
}

impl LogMode {
    fn parse(s: &str) -> Result<LogMode, ConfigError> {
        match s {
            "info" => Ok(LogMode::Info),
            "probe" => Ok(LogMode::Probe),
            "stats" => Ok(LogMode::Stats),
            other => Err(ConfigError::InvalidValue(other.to_string(), "LOG_MODE")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogMode::Info => "info",
            LogMode::Probe => "probe",
            LogMode::Stats => "stats",
        }
    }
}

/// The round-level knobs read from the environment table (§4.8, §6).
#[derive(Clone, Debug)]
pub struct RoundConfig {
    pub sim_depth_hours: f64,
    pub sim_rounds: SimRounds,
    pub workers: u32,
    pub worker_ram_mb: u64,
    pub data_mode: DataMode,
    pub log_mode: Vec<LogMode>,
    pub seed: u32,
}

impl RoundConfig {
    /// Simulation depth in the same sim-clock seconds the event engine runs on.
    pub fn sim_depth_seconds(&self) -> f64 {
        self.sim_depth_hours * 3600.0
    }
}

/// Raw `KEY=VALUE` environment text, one assignment per line, blank lines
/// and `#`-prefixed comments ignored. Validated into a [`RoundConfig`] by
/// [`EnvTable::to_round_config`].
#[derive(Clone, Debug, Default)]
pub struct EnvTable(HashMap<String, String>);

impl EnvTable {
    pub fn parse(text: &str) -> EnvTable {
        let mut map = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        EnvTable(map)
    }

    /// Folds an overlay (sweep-permutation overrides, §4.8 `SweepSpec`) into
    /// this table, replacing any key the overlay names.
    pub fn apply_overlay(&mut self, overlay: &std::collections::HashMap<String, String>) {
        for (k, v) in overlay {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Renders back to `KEY=VALUE` text, for config types (like
    /// `DynamicConfig`) that parse straight from text rather than from an
    /// `EnvTable` directly.
    pub fn render(&self) -> String {
        self.0.iter().map(|(k, v)| format!("{}={}\n", k, v)).collect()
    }

    pub(crate) fn get(&self, key: &str) -> Result<&str, ConfigError> {
        self.0.get(key).map(String::as_str).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub(crate) fn parse_f64(&self, key: &'static str) -> Result<f64, ConfigError> {
        self.get(key)?.parse().map_err(|_| ConfigError::InvalidValue(self.0[key].clone(), key))
    }

    pub(crate) fn parse_u32(&self, key: &'static str) -> Result<u32, ConfigError> {
        self.get(key)?.parse().map_err(|_| ConfigError::InvalidValue(self.0[key].clone(), key))
    }

    pub(crate) fn parse_u64(&self, key: &'static str) -> Result<u64, ConfigError> {
        self.get(key)?.parse().map_err(|_| ConfigError::InvalidValue(self.0[key].clone(), key))
    }

    pub(crate) fn parse_usize(&self, key: &'static str) -> Result<usize, ConfigError> {
        self.get(key)?.parse().map_err(|_| ConfigError::InvalidValue(self.0[key].clone(), key))
    }

    pub fn to_round_config(&self) -> Result<RoundConfig, ConfigError> {
        let sim_rounds_raw = self.get("SIM_ROUNDS")?;
        let sim_rounds = if sim_rounds_raw == "sweep" {
            SimRounds::Sweep
        } else {
            SimRounds::Fixed(
                sim_rounds_raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(sim_rounds_raw.to_string(), "SIM_ROUNDS"))?,
            )
        };

        let log_mode_raw = self.0.get("LOG_MODE").map(String::as_str).unwrap_or("");
        let log_mode = log_mode_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(LogMode::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RoundConfig {
            sim_depth_hours: self.parse_f64("SIM_DEPTH")?,
            sim_rounds,
            workers: self.parse_u32("WORKERS")?,
            worker_ram_mb: self.parse_u64("WORKER_RAM")?,
            data_mode: DataMode::parse(self.get("DATA_MODE")?)?,
            log_mode,
            seed: self.parse_u32("SEED")?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn valid_text() -> &'static str {
        "SIM_DEPTH=24\nSIM_ROUNDS=10\nWORKERS=4\nWORKER_RAM=2048\nDATA_MODE=metrics\nLOG_MODE=info,stats\nSEED=42\n"
    }

    #[test]
    fn parses_a_well_formed_env_table() {
        let table = EnvTable::parse(valid_text());
        let cfg = table.to_round_config().unwrap();
        assert_eq!(cfg.sim_depth_hours, 24.0);
        assert_eq!(cfg.sim_rounds, SimRounds::Fixed(10));
        assert_eq!(cfg.data_mode, DataMode::Metrics);
        assert_eq!(cfg.log_mode, vec![LogMode::Info, LogMode::Stats]);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn sim_rounds_accepts_the_sweep_literal() {
        let text = valid_text().replace("SIM_ROUNDS=10", "SIM_ROUNDS=sweep");
        let table = EnvTable::parse(&text);
        assert_eq!(table.to_round_config().unwrap().sim_rounds, SimRounds::Sweep);
    }

    #[test]
    fn unknown_data_mode_is_rejected() {
        let text = valid_text().replace("DATA_MODE=metrics", "DATA_MODE=verbose");
        let table = EnvTable::parse(&text);
        assert!(table.to_round_config().is_err());
    }

    #[test]
    fn missing_key_is_rejected() {
        let table = EnvTable::parse("SIM_DEPTH=24\n");
        assert!(table.to_round_config().is_err());
    }

    #[test]
    fn data_mode_orders_simple_below_full() {
        assert!(DataMode::Simple < DataMode::Metrics);
        assert!(DataMode::Metrics < DataMode::Full);
    }
}
