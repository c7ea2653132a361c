// src/core/reply/decode.rs

//! Maps raw wire replies into typed results per the command's declared shape.

use super::shape::{DecodedReply, ReplyShape};
use crate::core::SlotcastError;
use crate::core::protocol::RespFrame;
use bytes::Bytes;

/// Decodes a raw reply against a shape descriptor.
///
/// Fails with `ProtocolMismatch` when the reply's primitive kind is
/// incompatible with the descriptor. Server error frames always surface as
/// `ServerError`, regardless of the expected shape.
pub fn decode(shape: &ReplyShape, reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    if let RespFrame::Error(message) = reply {
        return Err(SlotcastError::ServerError(message.clone()));
    }

    // Nil decodes to the absent value for every shape, except the collection
    // shapes a command family explicitly flags as nil-as-empty.
    if matches!(reply, RespFrame::Null | RespFrame::NullArray) {
        return Ok(decode_nil(shape));
    }

    match shape {
        ReplyShape::Raw => Ok(decode_raw(reply)),
        ReplyShape::Optional(inner) => decode(inner, reply),
        ReplyShape::Bool => decode_bool(reply),
        ReplyShape::Int => decode_int(reply),
        ReplyShape::Double => decode_double(reply),
        ReplyShape::Bytes => decode_bytes(reply),
        ReplyShape::Text => decode_text(reply),
        ReplyShape::Array { element, .. } => match reply {
            RespFrame::Array(items) | RespFrame::Set(items) | RespFrame::Push(items) => Ok(
                DecodedReply::Array(decode_elements(element, items)?),
            ),
            other => Err(mismatch(shape, other)),
        },
        ReplyShape::Set { element, .. } => match reply {
            RespFrame::Set(items) | RespFrame::Array(items) => {
                Ok(DecodedReply::Set(decode_elements(element, items)?))
            }
            other => Err(mismatch(shape, other)),
        },
        ReplyShape::Pairs { key, value, .. } => match reply {
            RespFrame::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push((decode(key, k)?, decode(value, v)?));
                }
                Ok(DecodedReply::Map(pairs))
            }
            // RESP2 servers return flat arrays of alternating items; group
            // consecutive items by the documented arity of two.
            RespFrame::Array(items) => {
                if !items.len().is_multiple_of(2) {
                    return Err(SlotcastError::ProtocolMismatch {
                        expected: "even-length pair array",
                        actual: "odd-length array",
                    });
                }
                let mut pairs = Vec::with_capacity(items.len() / 2);
                for chunk in items.chunks_exact(2) {
                    pairs.push((decode(key, &chunk[0])?, decode(value, &chunk[1])?));
                }
                Ok(DecodedReply::Map(pairs))
            }
            other => Err(mismatch(shape, other)),
        },
    }
}

fn decode_nil(shape: &ReplyShape) -> DecodedReply {
    match shape {
        ReplyShape::Array { nil_as_empty, .. } if *nil_as_empty => DecodedReply::Array(Vec::new()),
        ReplyShape::Set { nil_as_empty, .. } if *nil_as_empty => DecodedReply::Set(Vec::new()),
        ReplyShape::Pairs { nil_as_empty, .. } if *nil_as_empty => DecodedReply::Map(Vec::new()),
        ReplyShape::Optional(inner) => decode_nil(inner),
        _ => DecodedReply::Nil,
    }
}

/// Structural pass-through used by the `Raw` shape.
fn decode_raw(reply: &RespFrame) -> DecodedReply {
    match reply {
        RespFrame::SimpleString(s) => DecodedReply::Text(s.clone()),
        RespFrame::Integer(i) => DecodedReply::Int(*i),
        RespFrame::Double(d) => DecodedReply::Double(*d),
        RespFrame::Boolean(b) => DecodedReply::Bool(*b),
        RespFrame::BulkString(b) => DecodedReply::Bytes(b.clone()),
        RespFrame::BigNumber(s) => DecodedReply::Text(s.clone()),
        RespFrame::Null | RespFrame::NullArray => DecodedReply::Nil,
        RespFrame::Array(items) | RespFrame::Push(items) => {
            DecodedReply::Array(items.iter().map(decode_raw).collect())
        }
        RespFrame::Set(items) => DecodedReply::Set(items.iter().map(decode_raw).collect()),
        RespFrame::Map(entries) => DecodedReply::Map(
            entries
                .iter()
                .map(|(k, v)| (decode_raw(k), decode_raw(v)))
                .collect(),
        ),
        // Errors are intercepted before decode_raw is reached.
        RespFrame::Error(message) => DecodedReply::Text(message.clone()),
    }
}

fn decode_bool(reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    match reply {
        RespFrame::Boolean(b) => Ok(DecodedReply::Bool(*b)),
        RespFrame::Integer(i) => Ok(DecodedReply::Bool(*i != 0)),
        RespFrame::SimpleString(s) if s == "OK" => Ok(DecodedReply::Bool(true)),
        RespFrame::BulkString(b) if b.as_ref() == b"OK" => Ok(DecodedReply::Bool(true)),
        other => Err(mismatch(&ReplyShape::Bool, other)),
    }
}

fn decode_int(reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    match reply {
        RespFrame::Integer(i) => Ok(DecodedReply::Int(*i)),
        RespFrame::BulkString(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(DecodedReply::Int)
            .ok_or_else(|| mismatch(&ReplyShape::Int, reply)),
        other => Err(mismatch(&ReplyShape::Int, other)),
    }
}

fn decode_double(reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    match reply {
        RespFrame::Double(d) => Ok(DecodedReply::Double(*d)),
        RespFrame::Integer(i) => Ok(DecodedReply::Double(*i as f64)),
        RespFrame::BulkString(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| match s {
                "inf" => Some(f64::INFINITY),
                "-inf" => Some(f64::NEG_INFINITY),
                other => other.parse::<f64>().ok(),
            })
            .map(DecodedReply::Double)
            .ok_or_else(|| mismatch(&ReplyShape::Double, reply)),
        other => Err(mismatch(&ReplyShape::Double, other)),
    }
}

fn decode_bytes(reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    match reply {
        RespFrame::BulkString(b) => Ok(DecodedReply::Bytes(b.clone())),
        RespFrame::SimpleString(s) => Ok(DecodedReply::Bytes(Bytes::copy_from_slice(s.as_bytes()))),
        other => Err(mismatch(&ReplyShape::Bytes, other)),
    }
}

fn decode_text(reply: &RespFrame) -> Result<DecodedReply, SlotcastError> {
    match reply {
        RespFrame::SimpleString(s) | RespFrame::BigNumber(s) => Ok(DecodedReply::Text(s.clone())),
        RespFrame::BulkString(b) => Ok(DecodedReply::Text(
            String::from_utf8_lossy(b).to_string(),
        )),
        other => Err(mismatch(&ReplyShape::Text, other)),
    }
}

fn decode_elements(
    element: &ReplyShape,
    items: &[RespFrame],
) -> Result<Vec<DecodedReply>, SlotcastError> {
    items.iter().map(|item| decode(element, item)).collect()
}

fn mismatch(shape: &ReplyShape, reply: &RespFrame) -> SlotcastError {
    SlotcastError::ProtocolMismatch {
        expected: shape.kind_name(),
        actual: reply.kind_name(),
    }
}
