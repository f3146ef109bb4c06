//! CLI error types with miette diagnostics.
//!
//! Maps core, storage and config failures into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use medevac_config::ConfigError;
use medevac_core::{CoreError, EmergencyStatus, StorageError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const STORAGE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Emergencies ──────────────────────────────────────────────────
    #[error("No timeline stored for emergency '{id}'")]
    #[diagnostic(
        code(medevac::not_found),
        help("Start one with: medevac load {id}")
    )]
    NotFound { id: String },

    #[error("Invalid emergency id: {reason}")]
    #[diagnostic(code(medevac::invalid_id))]
    InvalidId { reason: String },

    #[error("Unknown status '{value}'")]
    #[diagnostic(
        code(medevac::invalid_status),
        help("Run: medevac allowed  to list every status")
    )]
    InvalidStatus { value: String },

    // ── Transitions ──────────────────────────────────────────────────
    #[error("Transition {from} -> {to} is not allowed")]
    #[diagnostic(code(medevac::rejected), help("Allowed from {from}: {allowed}"))]
    Rejected {
        from: EmergencyStatus,
        to: EmergencyStatus,
        allowed: String,
    },

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Timeline storage failed")]
    #[diagnostic(
        code(medevac::storage),
        help("Check that the data directory exists and is writable (--data-dir).")
    )]
    Storage(#[source] StorageError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(medevac::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error")]
    #[diagnostic(
        code(medevac::config),
        help("Inspect the file at: medevac config path")
    )]
    Config(#[source] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(medevac::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render {format} output: {reason}")]
    #[diagnostic(code(medevac::render))]
    Render { format: &'static str, reason: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Storage(_) => exit_code::STORAGE,
            Self::InvalidId { .. } | Self::InvalidStatus { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            Self::Config(_) | Self::ConfigExists { .. } | Self::Io(_) | Self::Render { .. } => {
                exit_code::GENERAL
            }
        }
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotLoaded { id } => Self::NotFound { id },
            CoreError::InvalidId { reason } => Self::InvalidId { reason },
            CoreError::InvalidStatus { value } => Self::InvalidStatus { value },
            CoreError::Config { message } => Self::Validation {
                field: "engine".into(),
                reason: message,
            },
            CoreError::Storage(e) => Self::Storage(e),
        }
    }
}
