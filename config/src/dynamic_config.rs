use sim_chain::DifficultyConfig;
use sim_net::NetConfig;

use crate::env_table::EnvTable;
use crate::error::ConfigError;

/// The difficulty/internet/dynamic config table (§6): everything the
/// difficulty engine and noise samplers need that isn't part of the
/// round-level `RoundConfig`. Read from the same `KEY=VALUE` text format
/// as the environment table, just a different file.
#[derive(Clone, Copy, Debug)]
pub struct DynamicConfig {
    pub difficulty_target_v2: u64,
    pub window: usize,
    pub lag: usize,
    pub cut: usize,
    pub network_hashrate: f64,
    pub ping_ms: f64,
    pub cv: f64,
    pub mbps: f64,
    pub ntp_stdev: f64,
    pub block_size_kb: f64,
}

impl DynamicConfig {
    pub fn parse(text: &str) -> Result<DynamicConfig, ConfigError> {
        let table = EnvTable::parse(text);
        Ok(DynamicConfig {
            difficulty_target_v2: table.parse_u64("DIFFICULTY_TARGET_V2")?,
            window: table.parse_usize("W")?,
            lag: table.parse_usize("L")?,
            cut: table.parse_usize("CUT")?,
            network_hashrate: table.parse_f64("NETWORK_HASHRATE")?,
            ping_ms: table.parse_f64("PING")?,
            cv: table.parse_f64("CV")?,
            mbps: table.parse_f64("MBPS")?,
            ntp_stdev: table.parse_f64("NTP_STDEV")?,
            block_size_kb: table.parse_f64("BLOCK_SIZE")?,
        })
    }

    pub fn difficulty_config(&self) -> Result<DifficultyConfig, ConfigError> {
        DifficultyConfig::new(self.window, self.cut, self.lag, self.difficulty_target_v2)
            .map_err(|_| ConfigError::InvalidValue(format!("window={} cut={} lag={}", self.window, self.cut, self.lag), "W/CUT/L"))
    }

    pub fn net_config(&self) -> NetConfig {
        NetConfig {
            ping_secs: self.ping_ms / 1000.0,
            cv: self.cv,
            mbps: self.mbps,
            block_size_kb: self.block_size_kb,
            ntp_stdev: self.ntp_stdev,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn text() -> &'static str {
        "DIFFICULTY_TARGET_V2=120\nW=720\nL=15\nCUT=60\nNETWORK_HASHRATE=1000000\nPING=70\nCV=0.35\nMBPS=10\nNTP_STDEV=1.0\nBLOCK_SIZE=20\n"
    }

    #[test]
    fn parses_dynamic_config() {
        let cfg = DynamicConfig::parse(text()).unwrap();
        assert_eq!(cfg.window, 720);
        assert_eq!(cfg.lag, 15);
        assert_eq!(cfg.cut, 60);
        assert!((cfg.net_config().ping_secs - 0.07).abs() < 1e-9);
    }

    #[test]
    fn difficulty_config_rejects_bad_window() {
        let cfg = DynamicConfig::parse(&text().replace("CUT=60", "CUT=400")).unwrap();
        assert!(cfg.difficulty_config().is_err());
    }
}
