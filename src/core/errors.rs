// src/core/errors.rs

//! Defines `SlotcastError`, the single error taxonomy for the dispatch core.
//!
//! Every failure in this crate is a local-computation failure; transport-level
//! errors (timeouts, connection loss) are produced by the transport collaborator
//! and pass through as opaque `Transport` values feeding the merge policies.

use thiserror::Error;

/// A single node's failure inside a fan-out, carried by `PartialFailure`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    /// Address of the node that failed.
    pub addr: String,
    /// The error the node produced.
    pub error: Box<SlotcastError>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotcastError {
    // --- Encoding errors: caller/programmer mistakes, never retried. ---
    #[error("Wrong number of arguments for '{0}' command")]
    WrongArgumentCount(String),

    #[error("Missing required argument '{arg}' for '{command}'")]
    MissingArgument { command: String, arg: String },

    #[error("Arguments of '{group}' are mutually exclusive for '{command}'")]
    MutuallyExclusive { command: String, group: String },

    #[error("Unknown token '{token}' for argument '{arg}' of '{command}'")]
    UnknownToken {
        command: String,
        arg: String,
        token: String,
    },

    #[error("Invalid value for argument '{arg}' of '{command}': {reason}")]
    InvalidArgument {
        command: String,
        arg: String,
        reason: String,
    },

    #[error("Argument '{arg}' of '{command}' requires server version {since}")]
    UnsupportedArgument {
        command: String,
        arg: String,
        since: String,
    },

    // --- Command table errors. ---
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid command spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // --- Decode errors. ---
    #[error("Protocol mismatch: expected {expected}, got {actual}")]
    ProtocolMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An error frame produced by the server itself, surfaced verbatim.
    #[error("{0}")]
    ServerError(String),

    // --- Routing errors. ---
    #[error("CROSSSLOT Keys in request don't hash to the same slot")]
    CrossSlot,

    #[error("No route for command: {0}")]
    NoRoute(String),

    // --- Merge errors. ---
    #[error("Partial failure: {} of {total} nodes failed", failures.len())]
    PartialFailure {
        failures: Vec<NodeFailure>,
        total: usize,
    },

    #[error("Merge policy expected a {expected} reply, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    // --- Frame codec errors. ---
    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("Syntax error")]
    SyntaxError,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    // --- Transport passthrough (opaque to this core). ---
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for SlotcastError {
    fn from(err: std::io::Error) -> Self {
        SlotcastError::Transport(err.to_string())
    }
}
