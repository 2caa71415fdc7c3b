use std::collections::HashMap;

use sim_core::{Block, BlockId};

use crate::error::StoreError;

/// The append-only, shared-by-reference record of every block mined during
/// a round (§3 "Lifecycle": blocks are created, never destroyed). Owned
/// exclusively by the event engine; the pool agent only ever sees `&`
/// references to it (§9 "Shared, read-only snapshots").
#[derive(Default)]
pub struct BlockTable {
    blocks: HashMap<BlockId, Block>,
}

impl BlockTable {
    pub fn new() -> BlockTable {
        BlockTable {
            blocks: HashMap::new(),
        }
    }

    /// Inserts the bootstrap root, which by definition has no parent to
    /// validate against.
    pub fn insert_root(&mut self, block: Block) -> Result<(), StoreError> {
        if self.blocks.contains_key(&block.id) {
            return Err(StoreError::DuplicateBlock(block.id));
        }
        self.blocks.insert(block.id.clone(), block);
        Ok(())
    }

    /// Inserts a mined block, checking the invariants from §3: the parent
    /// must already be present, the id must be unique, and height must be
    /// exactly `parent.height + 1`.
    pub fn insert(&mut self, block: Block) -> Result<(), StoreError> {
        if self.blocks.contains_key(&block.id) {
            return Err(StoreError::DuplicateBlock(block.id));
        }
        let prev_id = block
            .prev_id
            .clone()
            .expect("only the bootstrap root may omit prev_id; use insert_root for it");
        let prev_height = self
            .blocks
            .get(&prev_id)
            .ok_or_else(|| StoreError::MissingParent(prev_id.clone(), block.id.clone()))?
            .height;
        if block.height != prev_height + 1 {
            return Err(StoreError::HeightMismatch(
                block.id.clone(),
                block.height,
                prev_id,
                prev_height,
                prev_height + 1,
            ));
        }
        self.blocks.insert(block.id.clone(), block);
        Ok(())
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn prev_of(&self, id: &BlockId) -> Option<&Block> {
        let block = self.blocks.get(id)?;
        block.prev_id.as_ref().and_then(|p| self.blocks.get(p))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Walks back from `id` following `prev_id`, yielding ancestors from
    /// `id` itself up to (and including) the bootstrap root.
    pub fn walk_back<'a>(&'a self, id: &BlockId) -> impl Iterator<Item = &'a Block> + 'a {
        struct WalkBack<'a> {
            table: &'a BlockTable,
            next: Option<BlockId>,
        }
        impl<'a> Iterator for WalkBack<'a> {
            type Item = &'a Block;
            fn next(&mut self) -> Option<Self::Item> {
                let id = self.next.take()?;
                let block = self.table.blocks.get(&id)?;
                self.next = block.prev_id.clone();
                Some(block)
            }
        }
        WalkBack {
            table: self,
            next: Some(id.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sim_core::{Block, Broadcast, Difficulty, PoolId};

    fn root() -> Block {
        Block::bootstrap_root(
            100,
            1_600_000_000,
            Difficulty::from_u64(1000),
            Difficulty::from_u64(100_000),
            Difficulty::from_u64(1000),
        )
    }

    #[test]
    fn insert_root_then_child_succeeds() {
        let mut table = BlockTable::new();
        let r = root();
        let root_id = r.id.clone();
        table.insert_root(r).unwrap();

        let mut child = Block::mint_child(table.get(&root_id).unwrap(), PoolId::from("P0"), 12.0);
        child.nxt_difficulty = Some(Difficulty::from_u64(1000));
        child.broadcast = Some(Broadcast::Public);
        table.insert(child).unwrap();

        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut table = BlockTable::new();
        let r = root();
        table.insert_root(r.clone()).unwrap();
        assert!(table.insert_root(r).is_err());
    }

    #[test]
    fn insert_rejects_missing_parent() {
        let mut table = BlockTable::new();
        let r = root();
        let orphan = Block::mint_child(&r, PoolId::from("P0"), 1.0);
        assert!(table.insert(orphan).is_err());
    }

    #[test]
    fn walk_back_reaches_the_root() {
        let mut table = BlockTable::new();
        let r = root();
        let root_id = r.id.clone();
        table.insert_root(r).unwrap();
        let mut prev = table.get(&root_id).unwrap().clone();
        for _ in 0..5 {
            let mut next = Block::mint_child(&prev, PoolId::from("P0"), 1.0);
            next.nxt_difficulty = Some(Difficulty::from_u64(1000));
            table.insert(next.clone()).unwrap();
            prev = next;
        }
        let chain: Vec<_> = table.walk_back(&prev.id).collect();
        assert_eq!(chain.len(), 6);
        assert_eq!(chain.last().unwrap().id, root_id);
    }
}
