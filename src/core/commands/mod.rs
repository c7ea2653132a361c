// src/core/commands/mod.rs

//! The declarative command layer: specs, the command table, the argument
//! encoder, and the key extractor.

pub mod encoder;
pub mod key_extractor;
pub mod spec;
pub mod table;

pub use encoder::{ArgValue, CommandArgs, EncodedRequest, encode, encode_with_version};
pub use spec::{
    ArgumentNode, ArgumentSpec, CommandFlags, CommandSpec, KeySpec, MergePolicy, RoutingHint,
    Version,
};
pub use table::CommandTable;
