use num_bigint::BigUint;
use sim_core::Difficulty;
use sim_store::{DifficultyWindow, WindowEntry};

use crate::error::ChainError;

/// Parameters of the cut-trimmed-window difficulty algorithm (§4.6): `window`
/// (W) and `cut` (outliers trimmed from each end) bound how many samples
/// feed the calculation, `lag` (L) holds back the most recent samples so a
/// difficulty retarget can never see its own still-settling tip, and
/// `target_seconds` is the desired mean block interval.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DifficultyConfig {
    pub window: usize,
    pub cut: usize,
    pub lag: usize,
    pub target_seconds: u64,
}

impl DifficultyConfig {
    pub fn new(window: usize, cut: usize, lag: usize, target_seconds: u64) -> Result<Self, ChainError> {
        if window <= 2 * cut {
            return Err(ChainError::InvalidWindowConfig(window, cut, lag));
        }
        Ok(DifficultyConfig {
            window,
            cut,
            lag,
            target_seconds,
        })
    }

    /// Total samples a window caches per chaintip: `W + L`.
    pub fn total_len(&self) -> usize {
        self.window + self.lag
    }

    /// Samples left once the outliers at both ends are trimmed: `W - 2*Cut`.
    pub fn accounted_len(&self) -> usize {
        self.window - 2 * self.cut
    }
}

/// Computes the next block's difficulty from the chaintip's window, per the
/// cut-trimmed-window algorithm (§4.6): drop the lag tail, trim `cut`
/// outliers from each end of what remains, and scale the trimmed window's
/// total work by the target block time over its time span.
pub fn calculate_next_difficulty(window: &DifficultyWindow, config: &DifficultyConfig) -> Difficulty {
    let mut entries: Vec<&WindowEntry> = window.entries().iter().collect();
    if entries.len() > config.lag {
        entries.truncate(entries.len() - config.lag);
    } else {
        entries.clear();
    }
    entries.sort_by_key(|e| e.timestamp);

    if entries.len() <= 1 {
        return Difficulty::one();
    }

    let (cut_begin, cut_end) = window_bounds(entries.len(), config.accounted_len(), config.window);

    let time_span = (entries[cut_end - 1].timestamp - entries[cut_begin].timestamp).max(1) as u64;
    let total_work = &entries[cut_end - 1].cum_difficulty - &entries[cut_begin].cum_difficulty;

    total_work
        .mul_div_ceil(config.target_seconds, &BigUint::from(time_span))
        .clamped()
}

/// Returns the half-open `[cutBegin, cutEnd)` index range to keep after
/// trimming outliers, given the number of samples actually available.
fn window_bounds(len: usize, accounted: usize, window: usize) -> (usize, usize) {
    let len = len.min(window);
    if len <= accounted {
        (0, len)
    } else {
        let begin = (len - accounted + 1) / 2;
        (begin, begin + accounted)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(timestamp: i64, cum: u64) -> WindowEntry {
        WindowEntry {
            timestamp,
            cum_difficulty: Difficulty::from_u64(cum),
        }
    }

    fn window_of(entries: Vec<WindowEntry>) -> DifficultyWindow {
        let mut w = DifficultyWindow::default();
        for e in entries {
            w.push_trimmed(e, usize::MAX);
        }
        w
    }

    #[test]
    fn too_few_samples_clamps_to_one() {
        let config = DifficultyConfig::new(10, 2, 1, 120).unwrap();
        let window = window_of(vec![entry(1000, 10)]);
        assert_eq!(calculate_next_difficulty(&window, &config), Difficulty::one());
    }

    #[test]
    fn zero_time_span_clamps_to_one_second() {
        let config = DifficultyConfig::new(4, 1, 0, 120).unwrap();
        let window = window_of(vec![
            entry(1000, 10),
            entry(1000, 20),
            entry(1000, 30),
            entry(1000, 40),
        ]);
        // time_span floors to 1, so difficulty equals the trimmed work times target.
        let result = calculate_next_difficulty(&window, &config);
        assert_eq!(result, Difficulty::from_u64(20 * 120));
    }

    #[test]
    fn drops_lag_entries_before_cutting() {
        let config = DifficultyConfig::new(4, 0, 2, 60).unwrap();
        let window = window_of(vec![
            entry(1000, 10),
            entry(1060, 20),
            entry(1120, 30),
            entry(1180, 40),
            entry(9999, 9999),
            entry(9999, 9999),
        ]);
        // lag=2 drops the two trailing garbage entries, leaving a clean 60s cadence.
        let result = calculate_next_difficulty(&window, &config);
        assert_eq!(result, Difficulty::from_u64(30));
    }

    #[test]
    fn ceiling_division_rounds_up() {
        let config = DifficultyConfig::new(2, 0, 0, 100).unwrap();
        let window = window_of(vec![entry(0, 0), entry(3, 10)]);
        // totalWork*target/timeSpan = 10*100/3 = 333.33 -> 334
        let result = calculate_next_difficulty(&window, &config);
        assert_eq!(result, Difficulty::from_u64(334));
    }

    #[test]
    fn invalid_config_rejected() {
        assert!(DifficultyConfig::new(4, 2, 1, 120).is_err());
    }
}
