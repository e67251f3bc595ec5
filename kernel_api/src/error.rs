//! Kernel error types

use core_types::MailboxId;
use thiserror::Error;

/// Recoverable outcomes of mailbox operations
///
/// Conditions that indicate broken kernel invariants are not represented
/// here; they halt the machine instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailboxError {
    /// No free mailbox descriptor or message slot
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Message too large, receive buffer too small, or bad creation sizes
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The id is out of range, stale, or names a released mailbox
    #[error("Mailbox not found: {0}")]
    NotFound(MailboxId),

    /// The mailbox was released while the caller was blocked on it
    ///
    /// This is a defined outcome rather than a failure: the caller's
    /// operation was cancelled by the release.
    #[error("{0} was released while the caller was blocked")]
    Released(MailboxId),

    /// A conditional operation found no immediate match
    #[error("Operation would block")]
    WouldBlock,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
