// src/core/protocol/mod.rs

//! Wire-level representation of replies and the frame codec.

pub mod resp_frame;

pub use resp_frame::{RespFrame, RespFrameCodec};
