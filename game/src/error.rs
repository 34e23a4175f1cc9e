//! Error types for the simulation core.

use thiserror::Error;

/// Domain-level failures surfaced to the request dispatcher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("map {0} not found")]
    MapNotFound(String),
    #[error("map with id {0} already exists")]
    DuplicateMap(String),
    #[error("duplicate office {0}")]
    DuplicateOffice(String),
    #[error("player token has not been found")]
    UnknownToken,
}

/// Failures while loading the world configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures while writing or restoring a world snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is malformed: {0}")]
    Codec(#[from] bincode::Error),
    #[error("state file references unknown map {0}")]
    UnknownMap(String),
    #[error("state file has no player for dog {0}")]
    MissingPlayer(u64),
}
