use std::fs::File;
use std::path::{Path, PathBuf};

use csv::Writer;
use flate2::write::GzEncoder;
use flate2::Compression;
use sim_config::{DataMode, DifficultyBootstrap, ResolvedConfig};
use sim_core::PoolId;
use sim_servers::{PoolMetrics, RoundResult, RoundSummary};

use crate::error::ApiError;

fn csv_err(path: &Path, e: impl ToString) -> ApiError {
    ApiError::Write(path.to_path_buf(), e.to_string())
}

/// Writes every enabled output file for one completed run into `out_dir`
/// (§4.9, §6). `DATA_MODE` gates which of the per-round files are emitted;
/// `results_summary.csv` and the config/historical snapshots are always
/// written.
pub struct ResultWriter {
    out_dir: PathBuf,
    data_mode: DataMode,
    summary_rows: Vec<SummaryRow>,
    metrics_writer: Option<Writer<File>>,
}

struct SummaryRow {
    round: u32,
    summary: RoundSummary,
    overlay: Vec<(String, String)>,
}

impl ResultWriter {
    pub fn new(out_dir: impl AsRef<Path>, data_mode: DataMode) -> Result<ResultWriter, ApiError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir).map_err(|e| csv_err(&out_dir, e))?;
        Ok(ResultWriter {
            out_dir,
            data_mode,
            summary_rows: Vec::new(),
            metrics_writer: None,
        })
    }

    /// Records one round's result, appending to `results_metrics.csv` and
    /// the gzipped per-round dumps immediately and buffering the summary
    /// row for a single `results_summary.csv` write at the end of the run.
    pub fn record_round(&mut self, round: u32, result: &RoundResult, overlay: &[(String, String)]) -> Result<(), ApiError> {
        self.summary_rows.push(SummaryRow {
            round,
            summary: result.summary,
            overlay: overlay.to_vec(),
        });

        if self.data_mode >= DataMode::Metrics {
            self.append_metrics(round, &result.metrics)?;
        }
        if self.data_mode >= DataMode::Full {
            self.write_blocks_gz(round, result)?;
            self.write_scores_gz(round, result)?;
        }
        Ok(())
    }

    fn append_metrics(&mut self, round: u32, metrics: &[PoolMetrics]) -> Result<(), ApiError> {
        let path = self.out_dir.join("results_metrics.csv");
        if self.metrics_writer.is_none() {
            let existed = path.exists();
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| csv_err(&path, e))?;
            let mut writer = Writer::from_writer(file);
            if !existed {
                writer
                    .write_record(&["round", "pool_id", "orphan_rate", "reorg_max", "reorg_p99", "reorg_rate", "self_shares", "gamma", "difficulty_at_head"])
                    .map_err(|e| csv_err(&path, e))?;
            }
            self.metrics_writer = Some(writer);
        }
        let writer = self.metrics_writer.as_mut().expect("just opened");
        for m in metrics {
            writer
                .write_record(&[
                    round.to_string(),
                    m.pool_id.to_string(),
                    m.orphan_rate.to_string(),
                    m.reorg_max.to_string(),
                    m.reorg_p99.to_string(),
                    m.reorg_rate.to_string(),
                    m.self_shares.to_string(),
                    m.gamma.to_string(),
                    m.difficulty_at_head.to_string(),
                ])
                .map_err(|e| csv_err(&path, e))?;
        }
        writer.flush().map_err(|e| csv_err(&path, e))?;
        Ok(())
    }

    fn write_blocks_gz(&self, round: u32, result: &RoundResult) -> Result<(), ApiError> {
        let path = self.out_dir.join(format!("results_blocks_{:04}.csv.gz", round));
        let file = File::create(&path).map_err(|e| csv_err(&path, e))?;
        let gz = GzEncoder::new(file, Compression::default());
        let mut writer = Writer::from_writer(gz);
        writer
            .write_record(&["id", "height", "pool_id", "prev_id", "timestamp", "difficulty", "cum_difficulty", "nxt_difficulty", "broadcast"])
            .map_err(|e| csv_err(&path, e))?;
        for block in result.blocks.iter() {
            writer
                .write_record(&[
                    block.id.to_string(),
                    block.height.to_string(),
                    block.pool_id.to_string(),
                    block.prev_id.as_ref().map(ToString::to_string).unwrap_or_default(),
                    block.timestamp.map(|t| t.to_string()).unwrap_or_default(),
                    block.difficulty.to_string(),
                    block.cum_difficulty.to_string(),
                    block.nxt_difficulty.as_ref().map(ToString::to_string).unwrap_or_default(),
                    block.broadcast.map(|b| format!("{:?}", b)).unwrap_or_default(),
                ])
                .map_err(|e| csv_err(&path, e))?;
        }
        let gz = writer.into_inner().map_err(|e| csv_err(&path, e))?;
        gz.finish().map_err(|e| csv_err(&path, e))?;
        Ok(())
    }

    fn write_scores_gz(&self, round: u32, result: &RoundResult) -> Result<(), ApiError> {
        let path = self.out_dir.join(format!("results_scores_{:04}.csv.gz", round));
        let file = File::create(&path).map_err(|e| csv_err(&path, e))?;
        let gz = GzEncoder::new(file, Compression::default());
        let mut writer = Writer::from_writer(gz);
        writer
            .write_record(&["pool_id", "block_id", "sim_clock", "local_time", "cum_diff_score", "is_head_path"])
            .map_err(|e| csv_err(&path, e))?;
        for (pool_id, pool) in &result.pools {
            for (block_id, score) in &pool.scores {
                writer
                    .write_record(&[
                        pool_id.to_string(),
                        block_id.to_string(),
                        score.sim_clock.to_string(),
                        score.local_time.to_string(),
                        score.cum_diff_score.as_ref().map(ToString::to_string).unwrap_or_default(),
                        score.is_head_path.to_string(),
                    ])
                    .map_err(|e| csv_err(&path, e))?;
            }
        }
        let gz = writer.into_inner().map_err(|e| csv_err(&path, e))?;
        gz.finish().map_err(|e| csv_err(&path, e))?;
        Ok(())
    }

    /// Flushes the buffered `results_summary.csv`. Column set is fixed
    /// (`round`, then `<metric>`/`<metric>_Std` per summary metric), with
    /// any sweep-overlay keys seen across rounds appended as trailing
    /// columns, blank where a given round's overlay didn't set them (§4.9).
    pub fn finish(self) -> Result<(), ApiError> {
        let path = self.out_dir.join("results_summary.csv");
        let file = File::create(&path).map_err(|e| csv_err(&path, e))?;
        let mut writer = Writer::from_writer(file);

        let mut overlay_keys: Vec<String> = Vec::new();
        for row in &self.summary_rows {
            for (k, _) in &row.overlay {
                if !overlay_keys.contains(k) {
                    overlay_keys.push(k.clone());
                }
            }
        }

        let metric_names = ["orphan_rate", "reorg_max", "reorg_p99", "reorg_rate", "self_shares", "gamma"];
        let mut header: Vec<String> = vec!["round".to_string()];
        for name in &metric_names {
            header.push(name.to_string());
            header.push(format!("{}_Std", name));
        }
        header.extend(overlay_keys.iter().cloned());
        writer.write_record(&header).map_err(|e| csv_err(&path, e))?;

        for row in &self.summary_rows {
            let s = &row.summary;
            let mut fields = vec![
                row.round.to_string(),
                s.orphan_rate.mean.to_string(),
                s.orphan_rate.stdev.to_string(),
                s.reorg_max.mean.to_string(),
                s.reorg_max.stdev.to_string(),
                s.reorg_p99.mean.to_string(),
                s.reorg_p99.stdev.to_string(),
                s.reorg_rate.mean.to_string(),
                s.reorg_rate.stdev.to_string(),
                s.self_shares.mean.to_string(),
                s.self_shares.stdev.to_string(),
                s.gamma.mean.to_string(),
                s.gamma.stdev.to_string(),
            ];
            for key in &overlay_keys {
                let value = row.overlay.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()).unwrap_or_default();
                fields.push(value);
            }
            writer.write_record(&fields).map_err(|e| csv_err(&path, e))?;
        }
        writer.flush().map_err(|e| csv_err(&path, e))?;
        Ok(())
    }
}

/// Echoes the bootstrap CSV's rows to `historical_blocks.csv`, once per run
/// (§4.9).
pub fn write_historical_blocks(out_dir: impl AsRef<Path>, bootstrap: &DifficultyBootstrap) -> Result<(), ApiError> {
    let path = out_dir.as_ref().join("historical_blocks.csv");
    let file = File::create(&path).map_err(|e| csv_err(&path, e))?;
    let mut writer = Writer::from_writer(file);
    writer
        .write_record(&["height", "timestamp", "difficulty", "cumulative_difficulty"])
        .map_err(|e| csv_err(&path, e))?;
    for row in bootstrap.rows() {
        writer
            .write_record(&[row.height.to_string(), row.timestamp.to_string(), row.difficulty.to_string(), row.cumulative_difficulty.to_string()])
            .map_err(|e| csv_err(&path, e))?;
    }
    writer.flush().map_err(|e| csv_err(&path, e))?;
    Ok(())
}

/// Serializes the fully resolved effective config to `config_snapshot.json`
/// (§4.9). Only the parts that are themselves serializable are included —
/// the pool roster and per-round knobs, not the manifest's resolved
/// closures.
pub fn write_config_snapshot(out_dir: impl AsRef<Path>, config: &ResolvedConfig) -> Result<(), ApiError> {
    let snapshot = ConfigSnapshot::from(config);
    let path = out_dir.as_ref().join("config_snapshot.json");
    let json = serde_json::to_string_pretty(&snapshot).map_err(|e| ApiError::Snapshot(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| csv_err(&path, e))
}

#[derive(Serialize)]
struct ConfigSnapshot {
    sim_depth_hours: f64,
    workers: u32,
    worker_ram_mb: u64,
    data_mode: &'static str,
    seed: u32,
    pools: Vec<(PoolId, f64, String)>,
}

impl From<&ResolvedConfig> for ConfigSnapshot {
    fn from(config: &ResolvedConfig) -> ConfigSnapshot {
        let pools = config
            .pools
            .iter()
            .map(|(id, entry)| (id.clone(), entry.hpp, entry.strategy.clone()))
            .collect();
        ConfigSnapshot {
            sim_depth_hours: config.round.sim_depth_hours,
            workers: config.round.workers,
            worker_ram_mb: config.round.worker_ram_mb,
            data_mode: match config.round.data_mode {
                DataMode::Simple => "simple",
                DataMode::Metrics => "metrics",
                DataMode::Full => "full",
            },
            seed: config.round.seed,
            pools,
        }
    }
}
