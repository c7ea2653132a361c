// src/core/cluster/topology.rs

//! The slot table and its publication handle.
//!
//! The slot table is the one piece of mutable shared state in this core. It is
//! read on every routing decision and rewritten wholesale by topology refresh:
//! a refresh builds a fresh immutable `SlotTable` and swaps it in atomically,
//! so in-flight routing decisions always read a single coherent snapshot and
//! never block on a refresh.

use super::slot::NUM_SLOTS;
use crate::core::SlotcastError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// The role of a node in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Primary,
    Replica,
}

/// One shard: a primary, its replicas, and the slot ranges it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Address of the shard primary, e.g. `"10.0.0.1:6379"`.
    pub primary: String,
    #[serde(default)]
    pub replicas: Vec<String>,
    /// Inclusive slot ranges owned by this shard.
    pub slots: Vec<(u16, u16)>,
}

/// An immutable snapshot mapping each hash slot to its owning shard.
#[derive(Debug)]
pub struct SlotTable {
    shards: Vec<ShardInfo>,
    /// Slot index -> shard index, `None` for unassigned slots.
    owners: Vec<Option<u16>>,
}

impl SlotTable {
    /// Builds a table from shard descriptions, validating slot ranges.
    pub fn new(shards: Vec<ShardInfo>) -> Result<Self, SlotcastError> {
        let mut owners: Vec<Option<u16>> = vec![None; NUM_SLOTS];
        for (index, shard) in shards.iter().enumerate() {
            for &(lo, hi) in &shard.slots {
                if lo > hi || hi as usize >= NUM_SLOTS {
                    return Err(SlotcastError::InvalidSpec(format!(
                        "invalid slot range {lo}-{hi} for shard '{}'",
                        shard.primary
                    )));
                }
                for slot in lo..=hi {
                    if owners[slot as usize].is_some() {
                        return Err(SlotcastError::InvalidSpec(format!(
                            "slot {slot} assigned to more than one shard"
                        )));
                    }
                    owners[slot as usize] = Some(index as u16);
                }
            }
        }
        Ok(Self { shards, owners })
    }

    /// An empty table: no shards, every slot unassigned.
    pub fn empty() -> Self {
        Self {
            shards: Vec::new(),
            owners: vec![None; NUM_SLOTS],
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard owning a slot, if any.
    pub fn shard_for_slot(&self, slot: u16) -> Option<&ShardInfo> {
        let index = self.owners.get(slot as usize).copied().flatten()?;
        self.shards.get(index as usize)
    }

    /// All shard primaries, in shard declaration order. Node ordering is
    /// stable so fan-out merge results are reproducible.
    pub fn all_primaries(&self) -> Vec<&str> {
        self.shards
            .iter()
            .map(|shard| shard.primary.as_str())
            .collect()
    }

    /// All primaries and replicas, in shard declaration order with each
    /// shard's primary preceding its replicas.
    pub fn all_nodes(&self) -> Vec<&str> {
        let mut nodes = Vec::new();
        for shard in &self.shards {
            nodes.push(shard.primary.as_str());
            for replica in &shard.replicas {
                nodes.push(replica.as_str());
            }
        }
        nodes
    }
}

/// Shared handle through which topology refresh publishes new slot tables.
///
/// Readers take an `Arc` snapshot under a short read lock; a refresh replaces
/// the `Arc` wholesale under the write lock. There is no in-place mutation.
#[derive(Debug)]
pub struct TopologyHandle {
    table: RwLock<Arc<SlotTable>>,
}

impl TopologyHandle {
    pub fn new(initial: SlotTable) -> Self {
        Self {
            table: RwLock::new(Arc::new(initial)),
        }
    }

    /// The current slot-table snapshot. Valid for the caller's whole dispatch
    /// even if a refresh publishes a newer table concurrently.
    pub fn snapshot(&self) -> Arc<SlotTable> {
        self.table.read().clone()
    }

    /// Atomically replaces the slot table with a freshly built one.
    pub fn publish(&self, table: SlotTable) {
        debug!(shards = table.shard_count(), "publishing new slot table");
        *self.table.write() = Arc::new(table);
    }
}

impl Default for TopologyHandle {
    fn default() -> Self {
        Self::new(SlotTable::empty())
    }
}
