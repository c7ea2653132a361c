// src/core/commands/encoder.rs

//! Turns a command spec plus a structured argument set into the ordered, flat
//! wire-token sequence. Encoding walks the spec's argument tree in declaration
//! order, never the input order, and performs no I/O: the same input always
//! produces the same token sequence.

use super::spec::{ArgumentNode, ArgumentSpec, CommandSpec, ScalarKind, Version};
use crate::core::SlotcastError;
use crate::core::protocol::RespFrame;
use bytes::Bytes;
use std::collections::HashMap;

/// A structured value supplied by the caller for one argument slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bytes(Bytes),
    Int(i64),
    Double(f64),
    /// Presence flag for a pure token: `true` emits the literal, `false` nothing.
    Flag(bool),
    /// The chosen literal of a oneof group whose children are all pure tokens.
    Token(String),
    /// Selects one named child of a oneof group and carries its value.
    Choice { name: String, value: Box<ArgValue> },
    /// One block instance; values pair with the block's children positionally.
    Group(Vec<ArgValue>),
    /// Repetition for `multiple` arguments: each element is one instance.
    Many(Vec<ArgValue>),
    /// Explicitly omitted optional slot inside a block.
    Skip,
}

impl ArgValue {
    pub fn group(values: Vec<ArgValue>) -> Self {
        ArgValue::Group(values)
    }

    pub fn many(values: Vec<ArgValue>) -> Self {
        ArgValue::Many(values)
    }

    pub fn token(literal: &str) -> Self {
        ArgValue::Token(literal.to_string())
    }

    pub fn choice(name: &str, value: impl Into<ArgValue>) -> Self {
        ArgValue::Choice {
            name: name.to_string(),
            value: Box::new(value.into()),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Bytes(Bytes::from(s.into_bytes()))
    }
}

impl From<Bytes> for ArgValue {
    fn from(b: Bytes) -> Self {
        ArgValue::Bytes(b)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Int(i)
    }
}

impl From<f64> for ArgValue {
    fn from(d: f64) -> Self {
        ArgValue::Double(d)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Flag(b)
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(values: Vec<ArgValue>) -> Self {
        ArgValue::Many(values)
    }
}

/// The caller-facing structured argument set, keyed by spec argument name.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    values: HashMap<String, ArgValue>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ArgValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// The ordered, immutable wire-token sequence for one request. The leading
/// tokens are the command name; the rest are argument tokens in spec order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRequest {
    tokens: Vec<Bytes>,
    name_len: usize,
}

impl EncodedRequest {
    pub fn tokens(&self) -> &[Bytes] {
        &self.tokens
    }

    /// The command-name tokens (one per word of a composite name).
    pub fn name_tokens(&self) -> &[Bytes] {
        &self.tokens[..self.name_len]
    }

    /// The argument tokens, i.e. everything after the command name. Key
    /// extraction offsets index into this slice.
    pub fn arg_tokens(&self) -> &[Bytes] {
        &self.tokens[self.name_len..]
    }

    /// Builds the request frame a RESP transport would send: an array of
    /// bulk strings. Wire framing beyond this is the transport's concern.
    pub fn to_frame(&self) -> RespFrame {
        RespFrame::Array(
            self.tokens
                .iter()
                .map(|token| RespFrame::BulkString(token.clone()))
                .collect(),
        )
    }
}

/// Encodes `args` against `spec` with no server-version gating.
pub fn encode(spec: &CommandSpec, args: &CommandArgs) -> Result<EncodedRequest, SlotcastError> {
    encode_with_version(spec, args, None)
}

/// Encodes `args` against `spec`, rejecting arguments gated behind a server
/// version newer than `server_version` (when one is configured).
pub fn encode_with_version(
    spec: &CommandSpec,
    args: &CommandArgs,
    server_version: Option<Version>,
) -> Result<EncodedRequest, SlotcastError> {
    let mut tokens = spec.name_tokens();
    let name_len = tokens.len();
    let encoder = Encoder {
        spec,
        server_version,
    };
    for arg in &spec.arguments {
        encoder.encode_top_level(arg, args, &mut tokens)?;
    }
    Ok(EncodedRequest { tokens, name_len })
}

struct Encoder<'a> {
    spec: &'a CommandSpec,
    server_version: Option<Version>,
}

impl Encoder<'_> {
    fn encode_top_level(
        &self,
        arg: &ArgumentSpec,
        args: &CommandArgs,
        out: &mut Vec<Bytes>,
    ) -> Result<(), SlotcastError> {
        if let Some(value) = args.get(&arg.name) {
            return self.encode_argument(arg, value, out);
        }

        // A oneof group may also be addressed through its children's names.
        if let ArgumentNode::OneOf(children) = &arg.node {
            let supplied: Vec<&ArgumentSpec> = children
                .iter()
                .filter(|child| args.contains(&child.name))
                .collect();
            match supplied.len() {
                0 => {}
                1 => {
                    let child = supplied[0];
                    // The child's presence was checked above.
                    let value = args.get(&child.name).ok_or(SlotcastError::SyntaxError)?;
                    return self.encode_argument(child, value, out);
                }
                _ => {
                    return Err(SlotcastError::MutuallyExclusive {
                        command: self.spec.name.clone(),
                        group: arg.name.clone(),
                    });
                }
            }
        }

        if arg.optional {
            return Ok(());
        }
        Err(self.missing(&arg.name))
    }

    fn encode_argument(
        &self,
        arg: &ArgumentSpec,
        value: &ArgValue,
        out: &mut Vec<Bytes>,
    ) -> Result<(), SlotcastError> {
        self.check_version_gate(arg)?;

        if arg.multiple {
            let instances: &[ArgValue] = match value {
                ArgValue::Many(values) => values,
                single => std::slice::from_ref(single),
            };
            if instances.is_empty() {
                if arg.optional {
                    return Ok(());
                }
                return Err(self.missing(&arg.name));
            }
            // A prefix token on a repeated argument is emitted once, ahead of
            // all instances.
            if let Some(token) = &arg.token {
                out.push(token.clone());
            }
            for instance in instances {
                self.encode_node(arg, instance, out)?;
            }
            return Ok(());
        }

        match (&arg.node, value) {
            // Pure-token flags carry their own literal; no prefix applies.
            (ArgumentNode::PureToken(literal), ArgValue::Flag(true)) => {
                out.push(literal.clone());
                Ok(())
            }
            (ArgumentNode::PureToken(_), ArgValue::Flag(false)) => Ok(()),
            (ArgumentNode::PureToken(_), other) => Err(self.invalid(
                &arg.name,
                format!("expected a boolean flag, got {other:?}"),
            )),
            _ => {
                if let Some(token) = &arg.token {
                    out.push(token.clone());
                }
                self.encode_node(arg, value, out)
            }
        }
    }

    /// Encodes a single instance of `arg` (prefix token already handled).
    fn encode_node(
        &self,
        arg: &ArgumentSpec,
        value: &ArgValue,
        out: &mut Vec<Bytes>,
    ) -> Result<(), SlotcastError> {
        match &arg.node {
            ArgumentNode::Scalar(kind) => {
                out.push(self.scalar_token(arg, *kind, value)?);
                Ok(())
            }
            ArgumentNode::PureToken(literal) => match value {
                ArgValue::Flag(true) => {
                    out.push(literal.clone());
                    Ok(())
                }
                ArgValue::Flag(false) | ArgValue::Skip => Ok(()),
                other => Err(self.invalid(
                    &arg.name,
                    format!("expected a boolean flag, got {other:?}"),
                )),
            },
            ArgumentNode::Block(children) => {
                let ArgValue::Group(values) = value else {
                    return Err(self.invalid(
                        &arg.name,
                        format!("expected a group of values, got {value:?}"),
                    ));
                };
                self.encode_block(arg, children, values, out)
            }
            ArgumentNode::OneOf(children) => self.encode_one_of(arg, children, value, out),
        }
    }

    /// Expands one block instance: values pair with children positionally, in
    /// the block's declared child order. `Skip` marks an omitted optional slot.
    fn encode_block(
        &self,
        arg: &ArgumentSpec,
        children: &[ArgumentSpec],
        values: &[ArgValue],
        out: &mut Vec<Bytes>,
    ) -> Result<(), SlotcastError> {
        if values.len() > children.len() {
            return Err(SlotcastError::WrongArgumentCount(self.spec.name.clone()));
        }
        for (index, child) in children.iter().enumerate() {
            match values.get(index) {
                Some(ArgValue::Skip) | None => {
                    if !child.optional {
                        // A partially supplied group is a caller error; the
                        // block's children are mutually inclusive.
                        return Err(self.missing(&format!("{}.{}", arg.name, child.name)));
                    }
                }
                Some(value) => self.encode_argument(child, value, out)?,
            }
        }
        Ok(())
    }

    fn encode_one_of(
        &self,
        arg: &ArgumentSpec,
        children: &[ArgumentSpec],
        value: &ArgValue,
        out: &mut Vec<Bytes>,
    ) -> Result<(), SlotcastError> {
        match value {
            // An enum-like choice across pure-token children.
            ArgValue::Token(chosen) => {
                for child in children {
                    if let ArgumentNode::PureToken(literal) = &child.node
                        && literal.eq_ignore_ascii_case(chosen.as_bytes())
                    {
                        out.push(literal.clone());
                        return Ok(());
                    }
                }
                Err(SlotcastError::UnknownToken {
                    command: self.spec.name.clone(),
                    arg: arg.name.clone(),
                    token: chosen.clone(),
                })
            }
            // A named selection of one (possibly valued) child.
            ArgValue::Choice { name, value } => {
                for child in children {
                    if child.name == *name {
                        return self.encode_argument(child, value, out);
                    }
                }
                Err(SlotcastError::UnknownToken {
                    command: self.spec.name.clone(),
                    arg: arg.name.clone(),
                    token: name.clone(),
                })
            }
            other => Err(self.invalid(
                &arg.name,
                format!("expected a token or choice, got {other:?}"),
            )),
        }
    }

    fn scalar_token(
        &self,
        arg: &ArgumentSpec,
        kind: ScalarKind,
        value: &ArgValue,
    ) -> Result<Bytes, SlotcastError> {
        match (kind, value) {
            (ScalarKind::Key | ScalarKind::String | ScalarKind::Pattern, ArgValue::Bytes(b)) => {
                Ok(b.clone())
            }
            (ScalarKind::Integer | ScalarKind::UnixTime, ArgValue::Int(i)) => {
                let mut fmt = itoa::Buffer::new();
                Ok(Bytes::copy_from_slice(fmt.format(*i).as_bytes()))
            }
            (ScalarKind::Double, ArgValue::Double(d)) => {
                let mut fmt = ryu::Buffer::new();
                Ok(Bytes::copy_from_slice(fmt.format(*d).as_bytes()))
            }
            (ScalarKind::Double, ArgValue::Int(i)) => {
                let mut fmt = itoa::Buffer::new();
                Ok(Bytes::copy_from_slice(fmt.format(*i).as_bytes()))
            }
            (_, other) => Err(self.invalid(
                &arg.name,
                format!("expected a {kind:?} value, got {other:?}"),
            )),
        }
    }

    fn check_version_gate(&self, arg: &ArgumentSpec) -> Result<(), SlotcastError> {
        if let (Some(since), Some(server)) = (arg.since, self.server_version)
            && server < since
        {
            return Err(SlotcastError::UnsupportedArgument {
                command: self.spec.name.clone(),
                arg: arg.name.clone(),
                since: since.to_string(),
            });
        }
        Ok(())
    }

    fn missing(&self, arg: &str) -> SlotcastError {
        SlotcastError::MissingArgument {
            command: self.spec.name.clone(),
            arg: arg.to_string(),
        }
    }

    fn invalid(&self, arg: &str, reason: String) -> SlotcastError {
        SlotcastError::InvalidArgument {
            command: self.spec.name.clone(),
            arg: arg.to_string(),
            reason,
        }
    }
}
