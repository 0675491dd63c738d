//! Error types for Trailcast

use thiserror::Error;

use crate::types::EntryStatus;

pub type Result<T> = std::result::Result<T, TrailcastError>;

#[derive(Error, Debug)]
pub enum TrailcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TrailcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TrailcastError::InvalidInput(_) => 3,
            TrailcastError::Store(StoreError::InvalidState { .. }) => 3,
            TrailcastError::Store(StoreError::ContentFrozen(_)) => 3,
            TrailcastError::Publish(PublishError::Authentication(_)) => 2,
            TrailcastError::Publish(_) => 1,
            TrailcastError::Config(_) => 1,
            TrailcastError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Content item not found: {0}")]
    ContentNotFound(String),

    #[error("Schedule entry not found: {0}")]
    EntryNotFound(String),

    /// A referencing schedule entry has already fired, so the item's
    /// caption and media are locked for audit.
    #[error("Content item {0} has been dispatched and can no longer be edited")]
    ContentFrozen(String),

    /// The status state machine forbids the requested edge. This is a
    /// programming or race-condition bug, not an expected runtime event.
    #[error("Invalid status transition for entry {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: EntryStatus,
        to: EntryStatus,
    },

    /// The entry is not in a status that allows the requested operation
    /// (e.g. cancelling an entry whose dispatch has already started).
    #[error("Cannot {operation} entry {id} in status {status}")]
    InvalidState {
        id: String,
        status: EntryStatus,
        operation: &'static str,
    },
}

#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote API error: {0}")]
    Remote(String),

    #[error("Publish timed out: {0}")]
    Timeout(String),

    #[error("Platform not configured: {0}")]
    NotConfigured(String),

    #[error("Content rejected: {0}")]
    Validation(String),
}
