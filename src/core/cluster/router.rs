// src/core/cluster/router.rs

//! Resolves a command plus its extracted keys to a set of target nodes.

use super::slot::key_slot;
use super::topology::SlotTable;
use crate::config::DispatchConfig;
use crate::core::SlotcastError;
use crate::core::commands::{CommandFlags, CommandSpec, RoutingHint};
use bytes::Bytes;
use rand::Rng;

/// Computes the target node set for one dispatch, in stable order.
///
/// Explicit fan-out hints override keys entirely. Key-based routing computes
/// one hash slot per key; keys spanning multiple slots fail with `CrossSlot`
/// unless the command is declared multi-slot tolerant, in which case each
/// distinct slot's owner is targeted in first-appearance order. Keyless,
/// hintless commands fall back to the configured default node.
pub fn route(
    spec: &CommandSpec,
    keys: &[Bytes],
    table: &SlotTable,
    config: &DispatchConfig,
) -> Result<Vec<String>, SlotcastError> {
    match spec.routing {
        RoutingHint::AllShards => {
            let targets = table.all_primaries();
            if targets.is_empty() {
                return fallback(spec, config);
            }
            Ok(targets.into_iter().map(String::from).collect())
        }
        RoutingHint::AllNodes => {
            let targets = table.all_nodes();
            if targets.is_empty() {
                return fallback(spec, config);
            }
            Ok(targets.into_iter().map(String::from).collect())
        }
        RoutingHint::Random => {
            let primaries = table.all_primaries();
            if primaries.is_empty() {
                return fallback(spec, config);
            }
            let pick = rand::thread_rng().gen_range(0..primaries.len());
            Ok(vec![primaries[pick].to_string()])
        }
        RoutingHint::SlotFromKey => {
            if keys.is_empty() {
                return fallback(spec, config);
            }
            route_by_keys(spec, keys, table, config)
        }
    }
}

fn route_by_keys(
    spec: &CommandSpec,
    keys: &[Bytes],
    table: &SlotTable,
    config: &DispatchConfig,
) -> Result<Vec<String>, SlotcastError> {
    // Distinct slots in first-appearance order, so multi-slot targeting and
    // merge iteration stay deterministic for a given key sequence.
    let mut slots: Vec<u16> = Vec::with_capacity(1);
    for key in keys {
        let slot = key_slot(key);
        if !slots.contains(&slot) {
            slots.push(slot);
        }
    }

    if slots.len() > 1 && !spec.flags.contains(CommandFlags::MULTI_SLOT) {
        return Err(SlotcastError::CrossSlot);
    }

    let mut targets = Vec::with_capacity(slots.len());
    for slot in slots {
        let shard = table.shard_for_slot(slot).ok_or_else(|| {
            SlotcastError::NoRoute(format!("no shard owns slot {slot}"))
        })?;
        let node = pick_shard_node(spec, config, &shard.primary, &shard.replicas);
        if !targets.contains(&node) {
            targets.push(node);
        }
    }
    Ok(targets)
}

/// A single-slot read may be served by a replica when configured; the first
/// replica is chosen so repeated routing of the same command is reproducible.
fn pick_shard_node(
    spec: &CommandSpec,
    config: &DispatchConfig,
    primary: &str,
    replicas: &[String],
) -> String {
    if config.read_from_replicas
        && spec.flags.contains(CommandFlags::READONLY)
        && let Some(replica) = replicas.first()
    {
        return replica.clone();
    }
    primary.to_string()
}

/// Routing is undefined at this layer without keys or a hint; the configured
/// default node resolves it, otherwise the dispatch fails.
fn fallback(spec: &CommandSpec, config: &DispatchConfig) -> Result<Vec<String>, SlotcastError> {
    match &config.default_node {
        Some(node) => Ok(vec![node.clone()]),
        None => Err(SlotcastError::NoRoute(format!(
            "'{}' has no keys, no routing hint, and no default node is configured",
            spec.name
        ))),
    }
}
