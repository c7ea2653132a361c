// src/core/reply/mod.rs

//! Typed reply shapes and the raw-reply decoder.

pub mod decode;
pub mod shape;

pub use decode::decode;
pub use shape::{DecodedReply, ReplyShape};
