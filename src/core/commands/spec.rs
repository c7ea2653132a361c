// src/core/commands/spec.rs

//! Static command metadata: argument shapes, key-extraction rules, routing
//! hints, and merge policies. A `CommandSpec` is built once at startup (from
//! the builtin table or a declarative JSON table) and is read-only afterwards.

use crate::core::SlotcastError;
use crate::core::reply::ReplyShape;
use bitflags::bitflags;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::EnumString;

bitflags! {
    /// Flags that describe the properties and behavior of a command.
    /// These are used by the router to handle commands appropriately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CommandFlags: u32 {
        /// The command only reads data.
        const READONLY    = 1 << 0;
        /// The command modifies the dataset.
        const WRITE       = 1 << 1;
        /// An administrative command.
        const ADMIN       = 1 << 2;
        /// The command tolerates keys spanning multiple hash slots.
        const MULTI_SLOT  = 1 << 3;
        /// The command's keys cannot be found by a static key spec alone.
        const MOVABLEKEYS = 1 << 4;
    }
}

/// A server version in `major.minor.patch` form, used for argument gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(pub u16, pub u16, pub u16);

impl FromStr for Version {
    type Err = SlotcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = |required: bool| -> Result<u16, SlotcastError> {
            match parts.next() {
                Some(p) => p
                    .parse::<u16>()
                    .map_err(|_| SlotcastError::InvalidSpec(format!("bad version '{s}'"))),
                None if required => Err(SlotcastError::InvalidSpec(format!("bad version '{s}'"))),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Version(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The scalar value kinds an argument can carry on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// A key name; participates in key extraction via the command's `KeySpec`.
    Key,
    String,
    Integer,
    Double,
    Pattern,
    UnixTime,
}

/// The closed set of argument-node variants. Nested oneof/block/multiple
/// combinations are expressed by composition rather than by special cases.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentNode {
    Scalar(ScalarKind),
    /// An ordered group of child arguments, expanded in declaration order.
    Block(Vec<ArgumentSpec>),
    /// Exactly one of the children may be supplied.
    OneOf(Vec<ArgumentSpec>),
    /// A literal token whose presence conveys a boolean flag.
    PureToken(Bytes),
}

/// One argument slot of a command, with the modifiers the declarative table
/// supports: a prefix token, optionality, repetition, and a version gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub node: ArgumentNode,
    /// Literal token emitted immediately before the value, e.g. `LIMIT`.
    pub token: Option<Bytes>,
    pub optional: bool,
    pub multiple: bool,
    /// Minimum server version that understands this argument.
    pub since: Option<Version>,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>, node: ArgumentNode) -> Self {
        Self {
            name: name.into(),
            node,
            token: None,
            optional: false,
            multiple: false,
            since: None,
        }
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentNode::Scalar(ScalarKind::Key))
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentNode::Scalar(ScalarKind::String))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentNode::Scalar(ScalarKind::Integer))
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentNode::Scalar(ScalarKind::Double))
    }

    pub fn pure_token(name: impl Into<String>, literal: &str) -> Self {
        Self::new(
            name,
            ArgumentNode::PureToken(Bytes::copy_from_slice(literal.as_bytes())),
        )
    }

    pub fn block(name: impl Into<String>, children: Vec<ArgumentSpec>) -> Self {
        Self::new(name, ArgumentNode::Block(children))
    }

    pub fn one_of(name: impl Into<String>, children: Vec<ArgumentSpec>) -> Self {
        Self::new(name, ArgumentNode::OneOf(children))
    }

    pub fn token(mut self, literal: &str) -> Self {
        self.token = Some(Bytes::copy_from_slice(literal.as_bytes()));
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn since(mut self, version: &str) -> Self {
        // Builder is only used with literal versions from the table source.
        self.since = version.parse().ok();
        self
    }
}

/// Declarative rule describing which positions of an encoded command are keys.
///
/// All offsets are relative to the end of the command-name tokens; a two-word
/// name like `CLUSTER ADDSLOTSRANGE` consumes two positions before argument
/// indexing begins. The extractor operates on the encoded token sequence only.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySpec {
    /// The single key at a fixed offset.
    FixedIndex(usize),
    /// Every `step`-th token in `[start, end)`, where `last_key == -1` means
    /// "through the last token", `-2` reserves one trailing non-key token, and
    /// a non-negative value is the last key offset relative to `start`.
    /// `limit > 0` additionally excludes a `remaining / limit` tail.
    IndexRange {
        start: usize,
        last_key: i64,
        step: usize,
        limit: usize,
    },
    /// Keys positioned after a literal keyword token. A negative `start_from`
    /// searches backwards from the end, skipping `|start_from| - 1` trailing
    /// tokens. `last_key == 0` selects the single token after the keyword.
    Keyword {
        token: Bytes,
        start_from: i64,
        last_key: i64,
        step: usize,
        limit: usize,
    },
    /// A numeric argument at `count_index` declares how many keys follow,
    /// starting at `first_key` (e.g. `EVAL script 2 k1 k2 ...`).
    KeyCountPrefixed { count_index: usize, first_key: usize },
}

/// How a command with no extractable keys (or overriding any keys) is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RoutingHint {
    /// Route by hash slot of the extracted keys; fall back to the configured
    /// default node when there are none.
    #[default]
    SlotFromKey,
    /// Fan out to every primary and every replica.
    AllNodes,
    /// Fan out to every shard primary.
    AllShards,
    /// A single arbitrarily chosen node.
    Random,
}

/// How a fan-out's per-node replies are combined into one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
pub enum MergePolicy {
    /// No aggregation; multiple replies are returned as a per-node map.
    #[default]
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "one_succeeded")]
    FirstSuccess,
    #[strum(serialize = "all_succeeded")]
    AllSucceeded,
    #[strum(serialize = "agg_logical_and")]
    LogicalAnd,
    #[strum(serialize = "agg_logical_or")]
    LogicalOr,
    #[strum(serialize = "agg_sum")]
    Sum,
}

/// The full static description of one command. Immutable after construction
/// and shared by all callers through the `CommandTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Uppercase command name; may be composite, e.g. `"CLUSTER INFO"`.
    pub name: String,
    pub group: String,
    pub since: Option<Version>,
    pub flags: CommandFlags,
    pub arguments: Vec<ArgumentSpec>,
    pub key_spec: Option<KeySpec>,
    pub routing: RoutingHint,
    pub merge: MergePolicy,
    pub reply: ReplyShape,
}

impl CommandSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            group: String::new(),
            since: None,
            flags: CommandFlags::empty(),
            arguments: Vec::new(),
            key_spec: None,
            routing: RoutingHint::SlotFromKey,
            merge: MergePolicy::None,
            reply: ReplyShape::Raw,
        }
    }

    /// The command name split into its wire tokens. A composite name consumes
    /// one leading position per word in the encoded request.
    pub fn name_tokens(&self) -> Vec<Bytes> {
        self.name
            .split_ascii_whitespace()
            .map(|word| Bytes::copy_from_slice(word.as_bytes()))
            .collect()
    }

    /// Number of leading tokens occupied by the command name.
    pub fn name_token_count(&self) -> usize {
        self.name.split_ascii_whitespace().count()
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn since(mut self, version: &str) -> Self {
        self.since = version.parse().ok();
        self
    }

    pub fn flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn arg(mut self, arg: ArgumentSpec) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn key_spec(mut self, spec: KeySpec) -> Self {
        self.key_spec = Some(spec);
        self
    }

    pub fn routing(mut self, hint: RoutingHint) -> Self {
        self.routing = hint;
        self
    }

    pub fn merge(mut self, policy: MergePolicy) -> Self {
        self.merge = policy;
        self
    }

    pub fn reply(mut self, shape: ReplyShape) -> Self {
        self.reply = shape;
        self
    }
}
