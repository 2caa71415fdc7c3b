use sim_chain::{calculate_next_difficulty, DifficultyConfig};
use sim_core::{Block, Difficulty};
use sim_store::{DifficultyWindow, WindowEntry};

use crate::error::ConfigError;

/// One row of the `difficulty_bootstrap` CSV (§6): `(height, timestamp,
/// difficulty, cumulative_difficulty)`.
#[derive(Clone, Debug)]
pub struct BootstrapRow {
    pub height: u64,
    pub timestamp: i64,
    pub difficulty: Difficulty,
    pub cumulative_difficulty: Difficulty,
}

/// The ordered historical-block CSV that seeds a round's difficulty window
/// and start tip (§3 "Bootstrap root", §4.8). Validated at parse time:
/// heights must be strictly consecutive and there must be at least
/// `window + lag` rows, per §6.
#[derive(Clone, Debug)]
pub struct DifficultyBootstrap {
    rows: Vec<BootstrapRow>,
}

impl DifficultyBootstrap {
    /// Parses the bootstrap CSV, requiring a header row
    /// `height,timestamp,difficulty,cumulative_difficulty` and at least
    /// `min_rows` (`W + L`) data rows with strictly consecutive heights
    /// (§6, §7 "Bootstrap": fail fast, identify file and row).
    pub fn parse_csv(text: &str, min_rows: usize) -> Result<DifficultyBootstrap, ConfigError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ConfigError::MalformedBootstrapRow(i + 2, e.to_string()))?;
            let row = parse_row(i + 2, &record)?;
            if let Some(prev) = rows.last().map(|r: &BootstrapRow| r.height) {
                if row.height != prev + 1 {
                    return Err(ConfigError::BootstrapHeightGap(i + 2, row.height, prev + 1));
                }
            }
            rows.push(row);
        }
        if rows.len() < min_rows {
            return Err(ConfigError::BootstrapTooShort(rows.len(), min_rows));
        }
        Ok(DifficultyBootstrap { rows })
    }

    pub fn rows(&self) -> &[BootstrapRow] {
        &self.rows
    }

    /// The window entries a round's difficulty-window cache starts from:
    /// the last `max_len` rows, chronological ascending (§3, §4.6).
    pub fn window_entries(&self, max_len: usize) -> Vec<WindowEntry> {
        let start = self.rows.len().saturating_sub(max_len);
        self.rows[start..]
            .iter()
            .map(|r| WindowEntry {
                timestamp: r.timestamp,
                cum_difficulty: r.cumulative_difficulty.clone(),
            })
            .collect()
    }

    /// Builds the round's start tip from the last bootstrap row, with its
    /// `nxt_difficulty` computed from the bootstrap window itself (§4.1
    /// "Seeding": the engine computes `nxtDifficulty` for the bootstrap tip
    /// before scheduling any `HASHER_FIND`).
    pub fn root_block(&self, diff_config: &DifficultyConfig) -> Block {
        let last = self.rows.last().expect("parse_csv guarantees at least min_rows >= 1 rows");
        let mut window = DifficultyWindow::default();
        for entry in self.window_entries(diff_config.total_len()) {
            window.push_trimmed(entry, diff_config.total_len());
        }
        let nxt_difficulty = calculate_next_difficulty(&window, diff_config);
        Block::bootstrap_root(
            last.height,
            last.timestamp,
            last.difficulty.clone(),
            last.cumulative_difficulty.clone(),
            nxt_difficulty,
        )
    }
}

fn parse_row(line_no: usize, record: &csv::StringRecord) -> Result<BootstrapRow, ConfigError> {
    let field = |i: usize, name: &str| -> Result<&str, ConfigError> {
        record
            .get(i)
            .ok_or_else(|| ConfigError::MalformedBootstrapRow(line_no, format!("missing column {}", name)))
    };
    let height: u64 = field(0, "height")?
        .parse()
        .map_err(|_| ConfigError::MalformedBootstrapRow(line_no, "height is not an integer".to_string()))?;
    let timestamp: i64 = field(1, "timestamp")?
        .parse()
        .map_err(|_| ConfigError::MalformedBootstrapRow(line_no, "timestamp is not an integer".to_string()))?;
    let difficulty: Difficulty = field(2, "difficulty")?
        .parse()
        .map_err(|_| ConfigError::MalformedBootstrapRow(line_no, "difficulty is not an integer".to_string()))?;
    let cumulative_difficulty: Difficulty = field(3, "cumulative_difficulty")?
        .parse()
        .map_err(|_| ConfigError::MalformedBootstrapRow(line_no, "cumulative_difficulty is not an integer".to_string()))?;
    Ok(BootstrapRow {
        height,
        timestamp,
        difficulty,
        cumulative_difficulty,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn csv_text(rows: usize) -> String {
        let mut s = String::from("height,timestamp,difficulty,cumulative_difficulty\n");
        let mut cum = 0u64;
        for h in 0..rows {
            cum += 1000;
            s.push_str(&format!("{},{},{},{}\n", h, 1_600_000_000 + h as i64 * 120, 1000, cum));
        }
        s
    }

    #[test]
    fn parses_well_formed_csv() {
        let bootstrap = DifficultyBootstrap::parse_csv(&csv_text(20), 10).unwrap();
        assert_eq!(bootstrap.rows().len(), 20);
        assert_eq!(bootstrap.rows()[0].height, 0);
    }

    #[test]
    fn rejects_too_few_rows() {
        assert!(DifficultyBootstrap::parse_csv(&csv_text(5), 10).is_err());
    }

    #[test]
    fn rejects_height_gap() {
        let text = csv_text(10).replace("5,1600000600,1000,6000", "6,1600000600,1000,6000");
        assert!(DifficultyBootstrap::parse_csv(&text, 5).is_err());
    }

    #[test]
    fn root_block_has_last_row_height_and_hh0_pool() {
        let bootstrap = DifficultyBootstrap::parse_csv(&csv_text(20), 10).unwrap();
        let diff_config = DifficultyConfig::new(10, 1, 2, 120).unwrap();
        let root = bootstrap.root_block(&diff_config);
        assert_eq!(root.height, 19);
        assert_eq!(root.pool_id.as_str(), "HH0");
        assert!(root.nxt_difficulty.is_some());
    }
}
