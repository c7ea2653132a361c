// src/core/commands/key_extractor.rs

//! Centralized key extraction for cluster routing.
//!
//! Extraction is a pure function over the already-encoded token sequence. It
//! must never look at the pre-encoding structured arguments: the literal
//! position of a key depends on encoding order (prefix tokens, omitted
//! optionals), which only the encoded request reflects.

use super::encoder::EncodedRequest;
use super::spec::KeySpec;
use crate::core::SlotcastError;
use bytes::Bytes;

/// Extracts the key tokens of an encoded request according to its key spec.
///
/// All offsets inside `KeySpec` are relative to the end of the command-name
/// tokens; `EncodedRequest::arg_tokens` already accounts for composite names.
/// A keyword spec whose keyword is absent yields an empty key set.
pub fn extract_keys(
    spec: &KeySpec,
    request: &EncodedRequest,
) -> Result<Vec<Bytes>, SlotcastError> {
    let args = request.arg_tokens();
    match spec {
        KeySpec::FixedIndex(offset) => match args.get(*offset) {
            Some(key) => Ok(vec![key.clone()]),
            None => Err(SlotcastError::SyntaxError),
        },
        KeySpec::IndexRange {
            start,
            last_key,
            step,
            limit,
        } => Ok(range_keys(args, *start, *last_key, *step, *limit, start + 1)),
        KeySpec::Keyword {
            token,
            start_from,
            last_key,
            step,
            limit,
        } => {
            let Some(position) = find_keyword(args, token, *start_from) else {
                return Ok(Vec::new());
            };
            if *last_key == 0 {
                return match args.get(position + 1) {
                    Some(key) => Ok(vec![key.clone()]),
                    None => Err(SlotcastError::SyntaxError),
                };
            }
            Ok(range_keys(
                args,
                position + 1,
                *last_key,
                *step,
                *limit,
                position + 1,
            ))
        }
        KeySpec::KeyCountPrefixed {
            count_index,
            first_key,
        } => {
            let count_token = args.get(*count_index).ok_or(SlotcastError::SyntaxError)?;
            let count: usize = std::str::from_utf8(count_token)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(SlotcastError::SyntaxError)?;
            if args.len() < first_key + count {
                return Err(SlotcastError::SyntaxError);
            }
            Ok(args[*first_key..first_key + count].to_vec())
        }
    }
}

/// Resolves a range-style key window over the argument tokens.
///
/// `last_key == -1` runs through the last token; `-2` reserves one trailing
/// non-key token; a non-negative value is the last key's offset relative to
/// `start`. When `limit > 0`, the effective end additionally excludes a
/// `(len - anchor) / limit` tail (a count-dependent trailer such as XREAD's
/// stream ids); index-anchored and keyword-anchored specs measure that tail
/// from `start + 1` and `start` respectively.
fn range_keys(
    args: &[Bytes],
    start: usize,
    last_key: i64,
    step: usize,
    limit: usize,
    anchor: usize,
) -> Vec<Bytes> {
    let len = args.len();
    let end = match last_key {
        -1 => {
            if limit > 0 && len > anchor {
                len - (len - anchor) / limit
            } else {
                len
            }
        }
        -2 => len.saturating_sub(1),
        relative => {
            let relative = relative.max(0) as usize;
            (start + relative + 1).min(len)
        }
    };
    if start >= end || start >= len {
        return Vec::new();
    }
    args[start..end.min(len)]
        .iter()
        .step_by(step.max(1))
        .cloned()
        .collect()
}

/// Locates the keyword token. A non-negative `start_from` searches forward
/// from that offset; a negative one searches backward from the end, skipping
/// `|start_from| - 1` trailing tokens.
fn find_keyword(args: &[Bytes], token: &Bytes, start_from: i64) -> Option<usize> {
    if start_from >= 0 {
        let from = start_from as usize;
        args.get(from..)?
            .iter()
            .position(|arg| arg.eq_ignore_ascii_case(token))
            .map(|pos| from + pos)
    } else {
        let skip_tail = start_from.unsigned_abs() as usize - 1;
        let upper = args.len().checked_sub(skip_tail)?;
        args[..upper]
            .iter()
            .rposition(|arg| arg.eq_ignore_ascii_case(token))
    }
}
