//! # Domain Errors
//!
//! Failure classes of the survey core. None of them is ever shown to a participant.

use std::path::PathBuf;
use thiserror::Error;

/// Inbound event that cannot be attributed to a chat participant.
/// The event is dropped without touching any record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportEventError {
    #[error("event has no chat id")]
    MissingChat,
    #[error("event in chat {0} has no participant handle")]
    MissingParticipant(String),
    #[error("event in chat {0} has no text")]
    MissingText(String),
}

/// Errors while reading or writing the chats file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize chats: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{} is not a valid chats file: {reason}", path.display())]
    Unparseable { path: PathBuf, reason: String },
    #[error("{} is corrupt ({reason}), moved aside to {}", path.display(), backup.display())]
    Corrupt {
        path: PathBuf,
        backup: PathBuf,
        reason: String,
    },
}
