use std::collections::{HashMap, HashSet, VecDeque};

use sim_core::{BlockId, Difficulty};

use crate::block_table::BlockTable;

/// One `{timestamp, cumDifficulty}` sample in a chaintip's difficulty
/// window (§3, §4.6).
#[derive(Clone, Debug)]
pub struct WindowEntry {
    pub timestamp: i64,
    pub cum_difficulty: Difficulty,
}

/// Per-chaintip array of window entries, chronological ascending, capped at
/// `window + lag` entries (§4.6).
#[derive(Clone, Debug, Default)]
pub struct DifficultyWindow {
    entries: VecDeque<WindowEntry>,
}

impl DifficultyWindow {
    pub fn entries(&self) -> &VecDeque<WindowEntry> {
        &self.entries
    }

    pub fn push_trimmed(&mut self, entry: WindowEntry, max_len: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > max_len {
            self.entries.pop_front();
        }
    }

    fn from_block_table(table: &BlockTable, tip: &BlockId, max_len: usize) -> DifficultyWindow {
        let mut collected: Vec<WindowEntry> = table
            .walk_back(tip)
            .take(max_len)
            .filter_map(|b| {
                b.timestamp.map(|ts| WindowEntry {
                    timestamp: ts,
                    cum_difficulty: b.cum_difficulty.clone(),
                })
            })
            .collect();
        collected.reverse();
        DifficultyWindow {
            entries: collected.into(),
        }
    }
}

/// Caches a [`DifficultyWindow`] per chaintip so the difficulty engine
/// doesn't re-walk the whole chain on every call. Allocated lazily on first
/// use and pruned once no pool references a tip (or its parent) anymore
/// (§3 Lifecycle, §5 "Shared resource policy").
#[derive(Default)]
pub struct DiffWindowCache {
    windows: HashMap<BlockId, DifficultyWindow>,
}

impl DiffWindowCache {
    pub fn new() -> DiffWindowCache {
        DiffWindowCache {
            windows: HashMap::new(),
        }
    }

    /// Seeds the cache with a pre-built window for `tip` — used once, at
    /// round start, to install the difficulty-bootstrap CSV's historical
    /// window under the bootstrap root's id, since that history never
    /// becomes part of the in-memory block table itself (§3 "Bootstrap
    /// root", §4.1 "Seeding").
    pub fn seed(&mut self, tip: BlockId, window: DifficultyWindow) {
        self.windows.insert(tip, window);
    }

    /// Returns the window for `tip`, reconstructing it from the block table
    /// by walking back up to `max_len` ancestors on a cache miss.
    pub fn get_or_build(&mut self, table: &BlockTable, tip: &BlockId, max_len: usize) -> &DifficultyWindow {
        if !self.windows.contains_key(tip) {
            let window = DifficultyWindow::from_block_table(table, tip, max_len);
            self.windows.insert(tip.clone(), window);
        }
        self.windows.get(tip).expect("just inserted")
    }

    /// Derives and caches the window for a freshly minted block by copying
    /// its parent's window and appending the new sample (§4.5 step 2).
    pub fn extend(
        &mut self,
        table: &BlockTable,
        parent_tip: &BlockId,
        new_tip: BlockId,
        new_entry: WindowEntry,
        max_len: usize,
    ) {
        let mut window = self.get_or_build(table, parent_tip, max_len).clone();
        window.push_trimmed(new_entry, max_len);
        self.windows.insert(new_tip, window);
    }

    /// Drops any cached window whose chaintip is neither a pool's current
    /// tip nor that tip's immediate parent (§5).
    pub fn prune(&mut self, table: &BlockTable, live_tips: &HashSet<BlockId>) {
        let mut keep: HashSet<BlockId> = live_tips.clone();
        for tip in live_tips {
            if let Some(parent) = table.prev_of(tip) {
                keep.insert(parent.id.clone());
            }
        }
        self.windows.retain(|id, _| keep.contains(id));
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, PoolId};

    fn root() -> Block {
        Block::bootstrap_root(
            0,
            1000,
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
            Difficulty::from_u64(10),
        )
    }

    #[test]
    fn reconstructs_window_from_table_on_miss() {
        let mut table = BlockTable::new();
        let r = root();
        let root_id = r.id.clone();
        table.insert_root(r).unwrap();
        let mut prev = table.get(&root_id).unwrap().clone();
        for i in 1..=5u64 {
            let mut b = Block::mint_child(&prev, PoolId::from("P0"), i as f64);
            b.timestamp = Some(1000 + i as i64 * 60);
            b.nxt_difficulty = Some(Difficulty::from_u64(10));
            table.insert(b.clone()).unwrap();
            prev = b;
        }
        let mut cache = DiffWindowCache::new();
        let window = cache.get_or_build(&table, &prev.id, 10);
        assert_eq!(window.entries().len(), 5);
        assert_eq!(window.entries().front().unwrap().timestamp, 1060);
        assert_eq!(window.entries().back().unwrap().timestamp, 1300);
    }

    #[test]
    fn extend_copies_parent_and_appends() {
        let mut table = BlockTable::new();
        let r = root();
        let root_id = r.id.clone();
        table.insert_root(r.clone()).unwrap();
        let mut cache = DiffWindowCache::new();
        cache.get_or_build(&table, &root_id, 3);

        let child = Block::mint_child(&r, PoolId::from("P0"), 1.0);
        let child_id = child.id.clone();
        table.insert(child).unwrap();
        cache.extend(
            &table,
            &root_id,
            child_id.clone(),
            WindowEntry {
                timestamp: 1100,
                cum_difficulty: Difficulty::from_u64(20),
            },
            3,
        );
        let window = cache.get_or_build(&table, &child_id, 3);
        assert_eq!(window.entries().back().unwrap().timestamp, 1100);
    }

    #[test]
    fn prune_drops_unreferenced_windows() {
        let mut table = BlockTable::new();
        let r = root();
        let root_id = r.id.clone();
        table.insert_root(r).unwrap();
        let mut cache = DiffWindowCache::new();
        cache.get_or_build(&table, &root_id, 3);
        assert_eq!(cache.len(), 1);

        let mut live = HashSet::new();
        live.insert(BlockId::from("999_PX"));
        cache.prune(&table, &live);
        assert_eq!(cache.len(), 0);
    }
}
