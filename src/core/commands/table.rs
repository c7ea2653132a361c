// src/core/commands/table.rs

//! The process-wide command table: built once at startup, read-only after.
//!
//! Two sources feed it: the builtin table below, and a declarative JSON table
//! matching the upstream command-spec schema (`{name, group, since,
//! arguments, key_specs, hints}`). Key-spec offsets in the JSON count the
//! command-name token(s) as position zero, as the upstream spec does; they are
//! rebased here so the extractor can index argument tokens directly.

use super::spec::{
    ArgumentNode, ArgumentSpec, CommandFlags, CommandSpec, KeySpec, MergePolicy, RoutingHint,
    ScalarKind, Version,
};
use crate::core::SlotcastError;
use crate::core::reply::ReplyShape;
use bytes::Bytes;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

/// An immutable, name-keyed registry of command specs.
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: IndexMap<String, Arc<CommandSpec>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: Vec<CommandSpec>) -> Self {
        let mut table = Self::new();
        for spec in specs {
            table.insert(spec);
        }
        table
    }

    pub fn insert(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name.clone(), Arc::new(spec));
    }

    /// Case-insensitive lookup; composite names use a single space separator.
    pub fn get(&self, name: &str) -> Option<Arc<CommandSpec>> {
        let normalized = normalize_name(name);
        self.commands.get(&normalized).cloned()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names in table declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Parses a declarative JSON command table.
    pub fn from_json(json: &str) -> Result<Self, SlotcastError> {
        let raw: IndexMap<String, RawCommand> = serde_json::from_str(json)
            .map_err(|e| SlotcastError::InvalidSpec(e.to_string()))?;
        let mut table = Self::new();
        for (name, command) in raw {
            table.insert(command.into_spec(&name)?);
        }
        Ok(table)
    }

    /// The builtin table, initialized once per process.
    pub fn builtin() -> &'static CommandTable {
        static BUILTIN: Lazy<CommandTable> = Lazy::new(builtin_table);
        &BUILTIN
    }
}

fn normalize_name(name: &str) -> String {
    name.split_ascii_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

// --- Declarative JSON schema ---

#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(default)]
    group: String,
    #[serde(default)]
    since: Option<Version>,
    #[serde(default)]
    arguments: Vec<RawArgument>,
    #[serde(default)]
    key_specs: Vec<RawKeySpec>,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    reply: Option<RawReplyShape>,
}

#[derive(Debug, Deserialize)]
struct RawArgument {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    multiple: bool,
    #[serde(default)]
    since: Option<Version>,
    #[serde(default)]
    arguments: Vec<RawArgument>,
}

#[derive(Debug, Deserialize)]
struct RawKeySpec {
    begin_search: RawSearch,
    find_keys: RawSearch,
}

/// Both `begin_search` and `find_keys` are `{type, spec}` objects whose `spec`
/// layout depends on `type`; the inner payloads are decoded per kind below.
#[derive(Debug, Deserialize)]
struct RawSearch {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    spec: serde_json::Value,
}

#[derive(Debug, Deserialize, Default)]
struct RawIndexSpec {
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct RawKeywordSpec {
    keyword: String,
    #[serde(default)]
    startfrom: i64,
}

#[derive(Debug, Deserialize)]
struct RawRangeSpec {
    #[serde(default)]
    lastkey: i64,
    #[serde(default = "default_step")]
    keystep: usize,
    #[serde(default)]
    limit: usize,
}

#[derive(Debug, Deserialize, Default)]
struct RawKeynumSpec {
    #[serde(default)]
    keynumidx: i64,
    #[serde(default)]
    firstkey: i64,
}

fn default_step() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawReplyShape {
    Raw,
    Bool,
    Int,
    Double,
    Bytes,
    Text,
    Optional {
        of: Box<RawReplyShape>,
    },
    Array {
        of: Box<RawReplyShape>,
        #[serde(default)]
        nil_as_empty: bool,
    },
    Pairs {
        key: Box<RawReplyShape>,
        value: Box<RawReplyShape>,
        #[serde(default)]
        nil_as_empty: bool,
    },
    Set {
        of: Box<RawReplyShape>,
        #[serde(default)]
        nil_as_empty: bool,
    },
}

impl From<RawReplyShape> for ReplyShape {
    fn from(raw: RawReplyShape) -> Self {
        match raw {
            RawReplyShape::Raw => ReplyShape::Raw,
            RawReplyShape::Bool => ReplyShape::Bool,
            RawReplyShape::Int => ReplyShape::Int,
            RawReplyShape::Double => ReplyShape::Double,
            RawReplyShape::Bytes => ReplyShape::Bytes,
            RawReplyShape::Text => ReplyShape::Text,
            RawReplyShape::Optional { of } => ReplyShape::Optional(Box::new((*of).into())),
            RawReplyShape::Array { of, nil_as_empty } => ReplyShape::Array {
                element: Box::new((*of).into()),
                nil_as_empty,
            },
            RawReplyShape::Pairs {
                key,
                value,
                nil_as_empty,
            } => ReplyShape::Pairs {
                key: Box::new((*key).into()),
                value: Box::new((*value).into()),
                nil_as_empty,
            },
            RawReplyShape::Set { of, nil_as_empty } => ReplyShape::Set {
                element: Box::new((*of).into()),
                nil_as_empty,
            },
        }
    }
}

impl RawCommand {
    fn into_spec(self, name: &str) -> Result<CommandSpec, SlotcastError> {
        let mut spec = CommandSpec::new(&normalize_name(name));
        spec.group = self.group;
        spec.since = self.since;
        spec.reply = self.reply.map(Into::into).unwrap_or(ReplyShape::Raw);

        for flag in &self.flags {
            spec.flags |= match flag.as_str() {
                "readonly" => CommandFlags::READONLY,
                "write" => CommandFlags::WRITE,
                "admin" => CommandFlags::ADMIN,
                "movablekeys" => CommandFlags::MOVABLEKEYS,
                _ => CommandFlags::empty(),
            };
        }

        for hint in &self.hints {
            if let Some(policy) = hint.strip_prefix("request_policy:") {
                if policy == "multi_shard" {
                    spec.flags |= CommandFlags::MULTI_SLOT;
                } else if let Ok(routing) = RoutingHint::from_str(policy) {
                    spec.routing = routing;
                }
            } else if let Some(policy) = hint.strip_prefix("response_policy:")
                && let Ok(merge) = MergePolicy::from_str(policy)
            {
                spec.merge = merge;
            }
        }

        for argument in self.arguments {
            spec.arguments.push(argument.into_spec()?);
        }

        // The upstream schema may declare several key specs; this core models
        // the primary one (the first), matching the single-spec data model.
        let name_tokens = spec.name_token_count();
        if let Some(raw) = self.key_specs.into_iter().next() {
            spec.key_spec = convert_key_spec(raw, name_tokens)?;
        }

        Ok(spec)
    }
}

impl RawArgument {
    fn into_spec(self) -> Result<ArgumentSpec, SlotcastError> {
        let node = match self.kind.as_str() {
            "key" => ArgumentNode::Scalar(ScalarKind::Key),
            "string" => ArgumentNode::Scalar(ScalarKind::String),
            "integer" => ArgumentNode::Scalar(ScalarKind::Integer),
            "double" => ArgumentNode::Scalar(ScalarKind::Double),
            "pattern" => ArgumentNode::Scalar(ScalarKind::Pattern),
            "unix-time" => ArgumentNode::Scalar(ScalarKind::UnixTime),
            "pure-token" => {
                let token = self.token.clone().ok_or_else(|| {
                    SlotcastError::InvalidSpec(format!(
                        "pure-token argument '{}' has no token",
                        self.name
                    ))
                })?;
                ArgumentNode::PureToken(Bytes::from(token.into_bytes()))
            }
            "block" => ArgumentNode::Block(
                self.arguments
                    .into_iter()
                    .map(RawArgument::into_spec)
                    .collect::<Result<_, _>>()?,
            ),
            "oneof" => ArgumentNode::OneOf(
                self.arguments
                    .into_iter()
                    .map(RawArgument::into_spec)
                    .collect::<Result<_, _>>()?,
            ),
            other => {
                return Err(SlotcastError::InvalidSpec(format!(
                    "unknown argument type '{other}'"
                )));
            }
        };

        let mut arg = ArgumentSpec::new(self.name, node);
        // Pure tokens already carry their literal; a prefix token only applies
        // to valued arguments.
        if !matches!(arg.node, ArgumentNode::PureToken(_))
            && let Some(token) = self.token
        {
            arg.token = Some(Bytes::from(token.into_bytes()));
        }
        arg.optional = self.optional;
        arg.multiple = self.multiple;
        arg.since = self.since;
        Ok(arg)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, SlotcastError> {
    serde_json::from_value(value).map_err(|e| SlotcastError::InvalidSpec(e.to_string()))
}

fn convert_key_spec(
    raw: RawKeySpec,
    name_tokens: usize,
) -> Result<Option<KeySpec>, SlotcastError> {
    match (raw.begin_search.kind.as_str(), raw.find_keys.kind.as_str()) {
        // Commands with an unknown search type are not routable by key.
        ("unknown", _) | (_, "unknown") => Ok(None),
        ("index", "range") => {
            let begin: RawIndexSpec = decode(raw.begin_search.spec)?;
            let find: RawRangeSpec = decode(raw.find_keys.spec)?;
            let start = rebase_offset(begin.index, name_tokens)?;
            if find.lastkey == 0 && find.limit == 0 {
                return Ok(Some(KeySpec::FixedIndex(start)));
            }
            Ok(Some(KeySpec::IndexRange {
                start,
                last_key: find.lastkey,
                step: find.keystep,
                limit: find.limit,
            }))
        }
        ("index", "keynum") => {
            let begin: RawIndexSpec = decode(raw.begin_search.spec)?;
            let find: RawKeynumSpec = decode(raw.find_keys.spec)?;
            let base = rebase_offset(begin.index, name_tokens)?;
            Ok(Some(KeySpec::KeyCountPrefixed {
                count_index: base + usize::try_from(find.keynumidx.max(0)).unwrap_or(0),
                first_key: base + usize::try_from(find.firstkey.max(0)).unwrap_or(0),
            }))
        }
        ("keyword", "range") => {
            let begin: RawKeywordSpec = decode(raw.begin_search.spec)?;
            let find: RawRangeSpec = decode(raw.find_keys.spec)?;
            let start_from = if begin.startfrom >= 0 {
                begin.startfrom - name_tokens as i64
            } else {
                begin.startfrom
            };
            Ok(Some(KeySpec::Keyword {
                token: Bytes::from(begin.keyword.into_bytes()),
                start_from,
                last_key: find.lastkey,
                step: find.keystep,
                limit: find.limit,
            }))
        }
        (search, find) => Err(SlotcastError::InvalidSpec(format!(
            "unsupported key spec combination '{search}'/'{find}'"
        ))),
    }
}

/// Rebases a 1-based-from-command-name offset onto the argument token slice.
fn rebase_offset(index: i64, name_tokens: usize) -> Result<usize, SlotcastError> {
    let rebased = index - name_tokens as i64;
    usize::try_from(rebased).map_err(|_| {
        SlotcastError::InvalidSpec(format!("key index {index} precedes the arguments"))
    })
}

// --- Builtin table ---

fn builtin_table() -> CommandTable {
    use ArgumentSpec as A;
    use ReplyShape as R;

    let mut specs = Vec::new();

    specs.push(
        CommandSpec::new("PING")
            .group("connection")
            .arg(A::string("message").optional())
            .routing(RoutingHint::Random)
            .reply(R::Text),
    );

    specs.push(
        CommandSpec::new("GET")
            .group("string")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key"))
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::optional(R::Bytes)),
    );

    specs.push(
        CommandSpec::new("SET")
            .group("string")
            .flags(CommandFlags::WRITE)
            .arg(A::key("key"))
            .arg(A::string("value"))
            .arg(
                A::one_of(
                    "condition",
                    vec![A::pure_token("nx", "NX"), A::pure_token("xx", "XX")],
                )
                .optional(),
            )
            .arg(A::pure_token("get", "GET").optional().since("6.2.0"))
            .arg(
                A::one_of(
                    "expiration",
                    vec![
                        A::integer("seconds").token("EX"),
                        A::integer("milliseconds").token("PX"),
                        A::integer("unix-time-seconds").token("EXAT"),
                        A::integer("unix-time-milliseconds").token("PXAT"),
                        A::pure_token("keepttl", "KEEPTTL"),
                    ],
                )
                .optional(),
            )
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::optional(R::Bool)),
    );

    specs.push(
        CommandSpec::new("MSET")
            .group("string")
            .flags(CommandFlags::WRITE)
            .arg(A::block("data", vec![A::key("key"), A::string("value")]).multiple())
            .key_spec(KeySpec::IndexRange {
                start: 0,
                last_key: -1,
                step: 2,
                limit: 0,
            })
            .reply(R::Bool),
    );

    specs.push(
        CommandSpec::new("MGET")
            .group("string")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key").multiple())
            .key_spec(KeySpec::IndexRange {
                start: 0,
                last_key: -1,
                step: 1,
                limit: 0,
            })
            .reply(R::array_of(R::optional(R::Bytes))),
    );

    specs.push(
        CommandSpec::new("DEL")
            .group("generic")
            .flags(CommandFlags::WRITE)
            .arg(A::key("key").multiple())
            .key_spec(KeySpec::IndexRange {
                start: 0,
                last_key: -1,
                step: 1,
                limit: 0,
            })
            .reply(R::Int),
    );

    specs.push(
        CommandSpec::new("EXISTS")
            .group("generic")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key").multiple())
            .key_spec(KeySpec::IndexRange {
                start: 0,
                last_key: -1,
                step: 1,
                limit: 0,
            })
            .reply(R::Int),
    );

    specs.push(
        CommandSpec::new("INCRBYFLOAT")
            .group("string")
            .flags(CommandFlags::WRITE)
            .arg(A::key("key"))
            .arg(A::double("increment"))
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::Double),
    );

    specs.push(
        CommandSpec::new("HGETALL")
            .group("hash")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key"))
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::pairs_of(R::Bytes, R::Bytes).nil_as_empty()),
    );

    specs.push(
        CommandSpec::new("SMEMBERS")
            .group("set")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key"))
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::set_of(R::Bytes).nil_as_empty()),
    );

    specs.push(
        CommandSpec::new("ZADD")
            .group("sorted-set")
            .flags(CommandFlags::WRITE)
            .arg(A::key("key"))
            .arg(
                A::one_of(
                    "condition",
                    vec![A::pure_token("nx", "NX"), A::pure_token("xx", "XX")],
                )
                .optional(),
            )
            .arg(
                A::one_of(
                    "comparison",
                    vec![A::pure_token("gt", "GT"), A::pure_token("lt", "LT")],
                )
                .optional()
                .since("6.2.0"),
            )
            .arg(A::pure_token("change", "CH").optional())
            .arg(A::pure_token("increment", "INCR").optional())
            .arg(A::block("data", vec![A::double("score"), A::string("member")]).multiple())
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::Int),
    );

    specs.push(
        CommandSpec::new("SORT")
            .group("generic")
            .flags(CommandFlags::WRITE | CommandFlags::MOVABLEKEYS)
            .arg(A::key("key"))
            .arg(A::new("by", ArgumentNode::Scalar(ScalarKind::Pattern)).token("BY").optional())
            .arg(
                A::block("limit", vec![A::integer("offset"), A::integer("count")])
                    .token("LIMIT")
                    .optional(),
            )
            .arg(
                A::new("get", ArgumentNode::Scalar(ScalarKind::Pattern))
                    .token("GET")
                    .optional()
                    .multiple(),
            )
            .arg(
                A::one_of(
                    "order",
                    vec![A::pure_token("asc", "ASC"), A::pure_token("desc", "DESC")],
                )
                .optional(),
            )
            .arg(A::pure_token("sorting", "ALPHA").optional())
            .arg(A::key("destination").token("STORE").optional())
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::Raw),
    );

    specs.push(
        CommandSpec::new("EVAL")
            .group("scripting")
            .flags(CommandFlags::MOVABLEKEYS)
            .arg(A::string("script"))
            .arg(A::integer("numkeys"))
            .arg(A::key("key").optional().multiple())
            .arg(A::string("arg").optional().multiple())
            .key_spec(KeySpec::KeyCountPrefixed {
                count_index: 1,
                first_key: 2,
            })
            .reply(R::Raw),
    );

    specs.push(
        CommandSpec::new("XREAD")
            .group("stream")
            .flags(CommandFlags::READONLY)
            .arg(A::integer("count").token("COUNT").optional())
            .arg(A::integer("milliseconds").token("BLOCK").optional())
            .arg(
                A::block(
                    "streams",
                    vec![A::key("key").multiple(), A::string("id").multiple()],
                )
                .token("STREAMS"),
            )
            .key_spec(KeySpec::Keyword {
                token: Bytes::from_static(b"STREAMS"),
                start_from: 0,
                last_key: -1,
                step: 1,
                limit: 2,
            })
            .reply(R::Raw),
    );

    specs.push(
        CommandSpec::new("DBSIZE")
            .group("server")
            .flags(CommandFlags::READONLY)
            .routing(RoutingHint::AllShards)
            .merge(MergePolicy::Sum)
            .reply(R::Int),
    );

    specs.push(
        CommandSpec::new("FLUSHALL")
            .group("server")
            .flags(CommandFlags::WRITE)
            .arg(
                A::one_of(
                    "mode",
                    vec![
                        A::pure_token("async", "ASYNC"),
                        A::pure_token("sync", "SYNC"),
                    ],
                )
                .optional(),
            )
            .routing(RoutingHint::AllShards)
            .merge(MergePolicy::AllSucceeded)
            .reply(R::Bool),
    );

    specs.push(
        CommandSpec::new("CONFIG RESETSTAT")
            .group("server")
            .flags(CommandFlags::ADMIN)
            .routing(RoutingHint::AllNodes)
            .merge(MergePolicy::AllSucceeded)
            .reply(R::Bool),
    );

    specs.push(
        CommandSpec::new("SCRIPT EXISTS")
            .group("scripting")
            .arg(A::string("sha1").multiple())
            .routing(RoutingHint::AllShards)
            .merge(MergePolicy::LogicalAnd)
            .reply(R::array_of(R::Bool)),
    );

    specs.push(
        CommandSpec::new("MEMORY USAGE")
            .group("server")
            .flags(CommandFlags::READONLY)
            .arg(A::key("key"))
            .arg(A::integer("count").token("SAMPLES").optional())
            .key_spec(KeySpec::FixedIndex(0))
            .reply(R::optional(R::Int)),
    );

    CommandTable::from_specs(specs)
}
