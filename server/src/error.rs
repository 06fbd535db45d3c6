//! Error types of the server crate

use shared::{FrameError, InputError};
use thiserror::Error;

/// Ends one connection task. Never escapes the task that produced it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("client disconnected")]
    Disconnected,

    #[error("transport failure: {0}")]
    Frame(#[from] FrameError),

    #[error("protocol violation: {0}")]
    InvalidReply(#[from] InputError),
}

/// Rejections and failures of the catalog store. The display text is what
/// callers receive as the response `message`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table} '{name}' already exists")]
    AlreadyExists { table: &'static str, name: String },

    #[error("{table} '{name}' not found")]
    NotFound { table: &'static str, name: String },

    #[error("room '{name}' is full")]
    RoomFull { name: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("status of '{name}' changed concurrently")]
    StatusConflict { name: String },

    #[error("version cannot go from {current} to {requested}")]
    VersionRegression { current: u32, requested: u32 },

    #[error("failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Failures of the room coordinator while starting a match.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("No free ports available.")]
    NoFreePort,

    #[error("Could not activate room: {0}")]
    Activation(String),

    #[error("Failed to launch game server: {0}")]
    Launch(#[source] std::io::Error),
}
