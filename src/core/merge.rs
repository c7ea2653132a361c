// src/core/merge.rs

//! Combines per-node replies of a fan-out under the command's merge policy.
//!
//! The caller supplies replies in the router's stable target order, so merge
//! results are reproducible for a given set of per-node replies.

use crate::core::commands::MergePolicy;
use crate::core::errors::{NodeFailure, SlotcastError};
use crate::core::reply::DecodedReply;
use bytes::Bytes;

/// One node's decoded outcome, tagged with the node's address.
pub type NodeReply = (String, Result<DecodedReply, SlotcastError>);

/// Merges per-node replies into the final result.
///
/// With a single reply every policy degenerates to passing it (or its error)
/// through. Policies that require full success fail with `PartialFailure`
/// carrying each failed node's error; `AllSucceeded` only does so when
/// `strict` is set, otherwise a failed node folds to `false`.
pub fn merge(
    policy: MergePolicy,
    replies: Vec<NodeReply>,
    strict: bool,
) -> Result<DecodedReply, SlotcastError> {
    if replies.is_empty() {
        return Err(SlotcastError::NoRoute("fan-out produced no replies".into()));
    }

    if replies.len() == 1 && policy == MergePolicy::None {
        // Single-target dispatch; nothing to aggregate.
        let (_, reply) = replies.into_iter().next().ok_or(SlotcastError::SyntaxError)?;
        return reply;
    }

    match policy {
        MergePolicy::None => Ok(per_node_map(replies)?),
        MergePolicy::FirstSuccess => first_success(replies),
        MergePolicy::AllSucceeded => all_succeeded(replies, strict),
        MergePolicy::LogicalAnd => fold_logical(replies, true),
        MergePolicy::LogicalOr => fold_logical(replies, false),
        MergePolicy::Sum => sum(replies),
    }
}

/// Without an aggregation policy a fan-out keeps its per-node replies,
/// as an ordered map keyed by node address.
fn per_node_map(replies: Vec<NodeReply>) -> Result<DecodedReply, SlotcastError> {
    let mut pairs = Vec::with_capacity(replies.len());
    for (addr, reply) in replies {
        let value = reply?;
        pairs.push((
            DecodedReply::Bytes(Bytes::from(addr.into_bytes())),
            value,
        ));
    }
    Ok(DecodedReply::Map(pairs))
}

/// Returns the first non-error reply in node-iteration order; if every node
/// failed, the first error propagates.
fn first_success(replies: Vec<NodeReply>) -> Result<DecodedReply, SlotcastError> {
    let mut first_error = None;
    for (_, reply) in replies {
        match reply {
            Ok(value) => return Ok(value),
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }
    Err(first_error.unwrap_or(SlotcastError::SyntaxError))
}

fn all_succeeded(replies: Vec<NodeReply>, strict: bool) -> Result<DecodedReply, SlotcastError> {
    let total = replies.len();
    let mut failures = Vec::new();
    let mut all_ok = true;
    for (addr, reply) in replies {
        match reply {
            Ok(value) => {
                if value.as_bool() != Some(true) {
                    all_ok = false;
                }
            }
            Err(error) => {
                all_ok = false;
                failures.push(NodeFailure {
                    addr,
                    error: Box::new(error),
                });
            }
        }
    }
    if strict && !failures.is_empty() {
        return Err(SlotcastError::PartialFailure { failures, total });
    }
    Ok(DecodedReply::Bool(all_ok))
}

/// Folds boolean-coerced replies; `and == true` gives logical AND, otherwise
/// logical OR. The logical policies require every node to have answered.
///
/// When every node replied with an array (SCRIPT EXISTS and friends), the
/// fold is element-wise across the per-node arrays, which must agree in
/// length; the result is one array of booleans.
fn fold_logical(replies: Vec<NodeReply>, and: bool) -> Result<DecodedReply, SlotcastError> {
    let values = require_all(replies)?;
    if values
        .iter()
        .all(|value| matches!(value, DecodedReply::Array(_)))
    {
        return fold_logical_elementwise(values, and);
    }
    let mut acc = and;
    for value in &values {
        acc = apply_logical(acc, coerce_bool(value)?, and);
    }
    Ok(DecodedReply::Bool(acc))
}

fn fold_logical_elementwise(
    values: Vec<DecodedReply>,
    and: bool,
) -> Result<DecodedReply, SlotcastError> {
    let mut arrays = Vec::with_capacity(values.len());
    for value in values {
        if let DecodedReply::Array(items) = value {
            arrays.push(items);
        }
    }
    let width = arrays.first().map_or(0, Vec::len);
    if arrays.iter().any(|items| items.len() != width) {
        return Err(SlotcastError::TypeMismatch {
            expected: "equal-length arrays",
            actual: "arrays of differing length",
        });
    }
    let mut folded = Vec::with_capacity(width);
    for index in 0..width {
        let mut acc = and;
        for items in &arrays {
            acc = apply_logical(acc, coerce_bool(&items[index])?, and);
        }
        folded.push(DecodedReply::Bool(acc));
    }
    Ok(DecodedReply::Array(folded))
}

fn apply_logical(acc: bool, value: bool, and: bool) -> bool {
    if and { acc && value } else { acc || value }
}

fn coerce_bool(value: &DecodedReply) -> Result<bool, SlotcastError> {
    value.as_bool().ok_or_else(|| SlotcastError::TypeMismatch {
        expected: "boolean-coercible",
        actual: value.kind_name(),
    })
}

/// Arithmetic sum across all per-node numeric replies. Integer replies sum as
/// integers; a double anywhere promotes the result to a double.
fn sum(replies: Vec<NodeReply>) -> Result<DecodedReply, SlotcastError> {
    let values = require_all(replies)?;
    let mut int_sum: i64 = 0;
    let mut double_sum: f64 = 0.0;
    let mut saw_double = false;
    for value in &values {
        match value {
            DecodedReply::Int(i) => int_sum = int_sum.saturating_add(*i),
            DecodedReply::Double(d) => {
                saw_double = true;
                double_sum += d;
            }
            other => {
                return Err(SlotcastError::TypeMismatch {
                    expected: "numeric",
                    actual: other.kind_name(),
                });
            }
        }
    }
    if saw_double {
        Ok(DecodedReply::Double(double_sum + int_sum as f64))
    } else {
        Ok(DecodedReply::Int(int_sum))
    }
}

/// Aggregating policies require every targeted node to have succeeded; any
/// failure surfaces as `PartialFailure` with the per-node detail.
fn require_all(replies: Vec<NodeReply>) -> Result<Vec<DecodedReply>, SlotcastError> {
    let total = replies.len();
    let mut values = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (addr, reply) in replies {
        match reply {
            Ok(value) => values.push(value),
            Err(error) => failures.push(NodeFailure {
                addr,
                error: Box::new(error),
            }),
        }
    }
    if !failures.is_empty() {
        return Err(SlotcastError::PartialFailure { failures, total });
    }
    Ok(values)
}
