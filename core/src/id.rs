//! Interned-style identifiers for blocks and pools.
//!
//! Both ids are cheap to clone: they back onto an `Arc<str>` because block
//! ids in particular are copied into event queues, score maps and decision
//! objects many times over the life of a round.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BlockId(Arc<str>);

impl BlockId {
    /// Canonical id for a mined block: `"<height>_<poolId>"`.
    pub fn new(height: u64, pool_id: &PoolId) -> Self {
        BlockId(Arc::from(format!("{}_{}", height, pool_id.as_str())))
    }

    /// Id for the bootstrap root, conventionally mined by the synthetic `HH0` pool.
    pub fn bootstrap_root(height: u64) -> Self {
        BlockId(Arc::from(format!("{}_HH0", height)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Height encoded in the id, parsed back out of the `<height>_<poolId>` form.
    pub fn height(&self) -> u64 {
        self.0
            .split('_')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        BlockId(Arc::from(s))
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        BlockId(Arc::from(s.as_str()))
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(BlockId::from(s))
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PoolId(Arc<str>);

impl PoolId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolId({})", self.0)
    }
}

impl From<&str> for PoolId {
    fn from(s: &str) -> Self {
        PoolId(Arc::from(s))
    }
}

impl From<String> for PoolId {
    fn from(s: String) -> Self {
        PoolId(Arc::from(s.as_str()))
    }
}

impl Serialize for PoolId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PoolId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(PoolId::from(s))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_id_round_trips_height() {
        let pool = PoolId::from("P0");
        let id = BlockId::new(1234, &pool);
        assert_eq!(id.as_str(), "1234_P0");
        assert_eq!(id.height(), 1234);
    }

    #[test]
    fn bootstrap_root_uses_hh0() {
        let id = BlockId::bootstrap_root(500);
        assert_eq!(id.as_str(), "500_HH0");
    }
}
