//! Domain-specific error types for the airslide bridge.
//!
//! All fallible operations return `Result<T, BridgeError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

/// The canonical error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Validation Errors ────────────────────────────────────────
    /// The target address failed the coarse syntax check.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The target port did not parse as an integer in 0..=65535.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// The card access code is not exactly 20 decimal digits.
    #[error("invalid access code: expected 20 decimal digits")]
    InvalidAccessCode,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    // ── Frame Errors ─────────────────────────────────────────────
    /// A received frame is shorter or longer than its type requires.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    // ── Link Errors ──────────────────────────────────────────────
    /// Transport configuration was edited outside the Suspended state.
    #[error("configuration locked: link is {0}")]
    ConfigLocked(crate::link::LinkState),

    /// The engine worker has shut down and no longer accepts commands.
    #[error("engine stopped")]
    EngineStopped,

    // ── I/O Errors ───────────────────────────────────────────────
    /// The socket or file layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::Other(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BridgeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        BridgeError::ChannelClosed
    }
}
