// src/lib.rs

pub mod config;
pub mod core;

// Re-export
pub use crate::core::SlotcastError;
pub use crate::core::dispatch::Dispatcher;
pub use crate::core::reply::DecodedReply;
