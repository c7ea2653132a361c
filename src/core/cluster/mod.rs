// src/core/cluster/mod.rs

//! Hash-slot computation, the slot table, and the cluster router.

pub mod router;
pub mod slot;
pub mod topology;

pub use router::route;
pub use slot::{NUM_SLOTS, key_slot};
pub use topology::{NodeRole, ShardInfo, SlotTable, TopologyHandle};
