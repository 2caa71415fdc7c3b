use indexmap::IndexMap;
use serde::Deserialize;

use sim_core::PoolId;

use crate::error::ConfigError;

/// One `pools` table row (§4.8, §6): which strategy manifest entry this
/// pool runs, and its share of network hashpower.
#[derive(Clone, Debug, Deserialize)]
pub struct PoolEntry {
    pub strategy: String,
    pub hpp: f64,
}

/// `{poolId -> {strategy, HPP}}`, validated so `sum(HPP)` is within `1e-3`
/// of `1.0` (§4.8).
#[derive(Clone, Debug)]
pub struct PoolsTable {
    entries: IndexMap<PoolId, PoolEntry>,
}

const HPP_TOLERANCE: f64 = 1e-3;

impl PoolsTable {
    pub fn from_entries(raw: IndexMap<String, PoolEntry>) -> Result<PoolsTable, ConfigError> {
        let sum: f64 = raw.values().map(|e| e.hpp).sum();
        if (sum - 1.0).abs() > HPP_TOLERANCE {
            return Err(ConfigError::HppSumInvalid(sum));
        }
        let entries = raw.into_iter().map(|(id, entry)| (PoolId::from(id), entry)).collect();
        Ok(PoolsTable { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolId, &PoolEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
