// src/core/mod.rs

//! The central module containing the core logic and data structures of Slotcast.

pub mod cluster;
pub mod commands;
pub mod dispatch;
pub mod errors;
pub mod merge;
pub mod protocol;
pub mod reply;

pub use commands::CommandTable;
pub use errors::SlotcastError;
pub use protocol::RespFrame;
