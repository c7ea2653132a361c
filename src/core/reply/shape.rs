// src/core/reply/shape.rs

//! The decode-target descriptors and the typed value returned to callers.

use bytes::Bytes;

/// Describes the typed shape a command's raw reply decodes into.
///
/// Shapes are data, resolved once per command in the table; the decoder never
/// inspects reply structure to guess a target type. Collection shapes carry a
/// `nil_as_empty` flag for the command families whose documented semantics
/// treat a nil reply as an empty collection rather than as absence.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyShape {
    /// Structural pass-through of the raw reply.
    Raw,
    /// Boolean coercion: RESP3 booleans, integer 0/1, and the `OK` status.
    Bool,
    Int,
    /// Doubles, including bulk strings documented to carry a floating point
    /// value; those parse through string-to-double, never stay raw strings.
    Double,
    Bytes,
    Text,
    /// Nil decodes to the absent value; anything else decodes as the inner shape.
    Optional(Box<ReplyShape>),
    Array {
        element: Box<ReplyShape>,
        nil_as_empty: bool,
    },
    /// A mapping; accepts native map replies and flat arrays of alternating
    /// key/value items, grouped pairwise.
    Pairs {
        key: Box<ReplyShape>,
        value: Box<ReplyShape>,
        nil_as_empty: bool,
    },
    Set {
        element: Box<ReplyShape>,
        nil_as_empty: bool,
    },
}

impl ReplyShape {
    pub fn optional(inner: ReplyShape) -> Self {
        ReplyShape::Optional(Box::new(inner))
    }

    pub fn array_of(element: ReplyShape) -> Self {
        ReplyShape::Array {
            element: Box::new(element),
            nil_as_empty: false,
        }
    }

    pub fn pairs_of(key: ReplyShape, value: ReplyShape) -> Self {
        ReplyShape::Pairs {
            key: Box::new(key),
            value: Box::new(value),
            nil_as_empty: false,
        }
    }

    pub fn set_of(element: ReplyShape) -> Self {
        ReplyShape::Set {
            element: Box::new(element),
            nil_as_empty: false,
        }
    }

    /// Marks a collection shape as decoding nil to an empty collection.
    pub fn nil_as_empty(mut self) -> Self {
        match &mut self {
            ReplyShape::Array { nil_as_empty, .. }
            | ReplyShape::Pairs { nil_as_empty, .. }
            | ReplyShape::Set { nil_as_empty, .. } => *nil_as_empty = true,
            _ => {}
        }
        self
    }

    /// A short name for the shape, used in `ProtocolMismatch` errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ReplyShape::Raw => "raw",
            ReplyShape::Bool => "boolean",
            ReplyShape::Int => "integer",
            ReplyShape::Double => "double",
            ReplyShape::Bytes => "bulk-string",
            ReplyShape::Text => "text",
            ReplyShape::Optional(inner) => inner.kind_name(),
            ReplyShape::Array { .. } => "array",
            ReplyShape::Pairs { .. } => "map",
            ReplyShape::Set { .. } => "set",
        }
    }
}

/// The typed value a command ultimately returns to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedReply {
    /// The language-level "absent" value.
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Bytes),
    Text(String),
    Array(Vec<DecodedReply>),
    /// Ordered key/value pairs; insertion order is the wire order.
    Map(Vec<(DecodedReply, DecodedReply)>),
    Set(Vec<DecodedReply>),
}

impl DecodedReply {
    /// A short name for the value's kind, used in merge `TypeMismatch` errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedReply::Nil => "nil",
            DecodedReply::Bool(_) => "boolean",
            DecodedReply::Int(_) => "integer",
            DecodedReply::Double(_) => "double",
            DecodedReply::Bytes(_) => "bulk-string",
            DecodedReply::Text(_) => "text",
            DecodedReply::Array(_) => "array",
            DecodedReply::Map(_) => "map",
            DecodedReply::Set(_) => "set",
        }
    }

    /// Boolean coercion used by the logical merge policies.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedReply::Bool(b) => Some(*b),
            DecodedReply::Int(i) => Some(*i != 0),
            DecodedReply::Text(s) if s == "OK" => Some(true),
            _ => None,
        }
    }
}
