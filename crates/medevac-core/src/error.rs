// ── Core error types ──
//
// Infrastructure failures only. A refused transition is an expected
// business outcome and travels as `TransitionOutcome::Rejected`, never
// through this channel.

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::storage::KeyValueStore).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Storage I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored timeline for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to serialize timeline for '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

impl StorageError {
    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Corrupt records and encoding failures are deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Io { .. })
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("Emergency '{id}' has not been loaded")]
    NotLoaded { id: String },

    #[error("Invalid emergency id: {reason}")]
    InvalidId { reason: String },

    #[error("Unknown emergency status '{value}'")]
    InvalidStatus { value: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Infrastructure errors ────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] StorageError),
}
