//! The `minesim` binary (§6): loads every config input, expands an optional
//! sweep spec into one `ResolvedConfig` per permutation, runs each
//! permutation's rounds across the worker pool, and writes the result files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{App, Arg};
use log::error;

use sim_api::{run_jobs, write_config_snapshot, write_historical_blocks, EngineWorker, ResultWriter, RoundJob};
use sim_config::{DifficultyBootstrap, EnvTable, PoolEntry, PoolsTable, ResolvedConfig, StrategyManifest, SweepSpec};
use sim_servers::RoundOutcome;
use sim_util::{init_logger, LoggingConfig};

fn main() {
    let matches = App::new("minesim")
        .version("0.3.0")
        .about("Discrete-event Monte Carlo simulator of a Monero-style proof-of-work mining network")
        .arg(Arg::with_name("config-dir").long("config-dir").takes_value(true).default_value("."))
        .arg(Arg::with_name("out-dir").long("out-dir").takes_value(true).default_value("./out"))
        .arg(Arg::with_name("env-table").long("env-table").takes_value(true).default_value("env_table.txt"))
        .arg(Arg::with_name("dynamic-config").long("dynamic-config").takes_value(true).default_value("dynamic_config.txt"))
        .arg(Arg::with_name("pools").long("pools").takes_value(true).default_value("pools.json"))
        .arg(Arg::with_name("strategy-manifest").long("strategy-manifest").takes_value(true).default_value("strategy_manifest.json"))
        .arg(Arg::with_name("bootstrap").long("bootstrap").takes_value(true).default_value("difficulty_bootstrap.csv"))
        .arg(Arg::with_name("sweep").long("sweep").takes_value(true))
        .get_matches();

    let config_dir = PathBuf::from(matches.value_of("config-dir").expect("has default"));
    let out_dir = PathBuf::from(matches.value_of("out-dir").expect("has default"));

    if let Err(e) = run(&matches, &config_dir, &out_dir) {
        error!("fatal: {}", e);
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches, config_dir: &Path, out_dir: &Path) -> Result<(), failure::Error> {
    let env_text = read_to_string(&config_dir.join(matches.value_of("env-table").expect("has default")))?;
    let dynamic_text = read_to_string(&config_dir.join(matches.value_of("dynamic-config").expect("has default")))?;
    let pools_text = read_to_string(&config_dir.join(matches.value_of("pools").expect("has default")))?;
    let manifest_text = read_to_string(&config_dir.join(matches.value_of("strategy-manifest").expect("has default")))?;

    let round_table = EnvTable::parse(&env_text);
    let round = round_table.to_round_config()?;

    let raw_pools: indexmap::IndexMap<String, PoolEntry> = serde_json::from_str(&pools_text)?;
    let pools = PoolsTable::from_entries(raw_pools)?;
    let manifest = StrategyManifest::parse_json(&manifest_text)?;

    let dynamic = sim_config::DynamicConfig::parse(&dynamic_text)?;
    let diff_config = dynamic.difficulty_config()?;
    let bootstrap_text = read_to_string(&config_dir.join(matches.value_of("bootstrap").expect("has default")))?;
    let bootstrap = DifficultyBootstrap::parse_csv(&bootstrap_text, diff_config.total_len())?;

    let log_mode: Vec<String> = round.log_mode.iter().map(|m| m.as_str().to_string()).collect();
    fs::create_dir_all(out_dir)?;
    init_logger(&LoggingConfig::from_log_mode(out_dir, &log_mode));

    let base = ResolvedConfig::new(round.clone(), dynamic, pools.clone(), manifest.clone(), bootstrap.clone())?;

    write_historical_blocks(out_dir, &bootstrap)?;
    write_config_snapshot(out_dir, &base)?;

    // A sweep spec means "one round per permutation"; without one, SIM_ROUNDS
    // independent rounds all share the base config and only differ by the
    // round-id-derived seed offset `EngineWorker` folds in.
    let jobs: Vec<RoundJob> = match matches.value_of("sweep") {
        Some(sweep_path) => {
            let sweep_text = read_to_string(&config_dir.join(sweep_path))?;
            let spec = SweepSpec::parse_json(&sweep_text)?;
            spec.permutations()
                .iter()
                .enumerate()
                .map(|(i, overlay)| {
                    let resolved = ResolvedConfig::with_overlay(
                        &env_text,
                        &dynamic_text,
                        overlay,
                        pools.clone(),
                        manifest.clone(),
                        bootstrap.clone(),
                    )?;
                    let overlay_pairs: Vec<(String, String)> = overlay.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    Ok(RoundJob {
                        round_id: i as u32,
                        config: resolved,
                        overlay: overlay_pairs,
                    })
                })
                .collect::<Result<Vec<_>, sim_config::ConfigError>>()?
        }
        None => {
            let round_count = match round.sim_rounds {
                sim_config::SimRounds::Fixed(n) => n,
                sim_config::SimRounds::Sweep => {
                    return Err(failure::format_err!("SIM_ROUNDS=sweep requires --sweep <file>"));
                }
            };
            (0..round_count.max(1))
                .map(|i| RoundJob {
                    round_id: i,
                    config: base.clone(),
                    overlay: Vec::new(),
                })
                .collect()
        }
    };

    let worker = EngineWorker;
    let outcomes = run_jobs(jobs, round.workers, &worker)?;

    let mut writer = ResultWriter::new(out_dir, round.data_mode)?;
    for (round_id, overlay, outcome) in outcomes {
        let result = match outcome {
            RoundOutcome::Completed(r) => r,
            RoundOutcome::Partial(r) => {
                error!("round {} hit its RAM cap, emitting a partial result", round_id);
                r
            }
            RoundOutcome::Cancelled(r) => {
                error!("round {} cancelled, emitting a best-effort partial result", round_id);
                r
            }
        };
        writer.record_round(round_id, &result, &overlay)?;
    }
    writer.finish()?;

    Ok(())
}

fn read_to_string(path: &Path) -> Result<String, failure::Error> {
    fs::read_to_string(path).map_err(|e| failure::format_err!("reading {}: {}", path.display(), e))
}
