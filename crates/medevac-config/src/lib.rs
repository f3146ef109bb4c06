//! Shared configuration for medevac front ends.
//!
//! TOML file + `MEDEVAC_*` environment layering, the canonical config and
//! data paths, and translation to `medevac_core::EngineConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medevac_core::{EngineConfig, MonitorConfig, PROXIMITY_THRESHOLD_KM, RetryPolicy};

/// Prefix for environment overrides; nested keys are separated by `__`
/// (`MEDEVAC_STORAGE__RETRY_ATTEMPTS=5`).
pub const ENV_PREFIX: &str = "MEDEVAC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub proximity: ProximitySettings,
}

/// Output defaults for the CLI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Timeline directory. Falls back to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            retry_attempts: default_retry_attempts(),
            retry_initial_backoff_ms: default_initial_backoff_ms(),
            retry_max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_max_backoff_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProximitySettings {
    /// Arrival radius in kilometres.
    #[serde(default = "default_threshold_km")]
    pub threshold_km: f64,

    /// Monitor tick, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            threshold_km: default_threshold_km(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_threshold_km() -> f64 {
    PROXIMITY_THRESHOLD_KM
}
fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Config {
    /// Configured data dir, or the platform default.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(default_data_dir)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "medevac", "medevac")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where timelines live when no `data_dir` is configured.
pub fn default_data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("timelines"),
        |dirs| dirs.data_dir().join("timelines"),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("medevac");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then `MEDEVAC_*` env vars.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load from an explicit file path (missing files are fine).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Engine translation ──────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Validate `cfg` and build the engine's runtime configuration.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    let storage = &cfg.storage;
    if storage.retry_attempts == 0 {
        return Err(invalid("storage.retry_attempts", "must be at least 1"));
    }
    if storage.retry_initial_backoff_ms > storage.retry_max_backoff_ms {
        return Err(invalid(
            "storage.retry_initial_backoff_ms",
            format!(
                "{} exceeds retry_max_backoff_ms ({})",
                storage.retry_initial_backoff_ms, storage.retry_max_backoff_ms
            ),
        ));
    }

    let proximity = &cfg.proximity;
    if !proximity.threshold_km.is_finite() || proximity.threshold_km <= 0.0 {
        return Err(invalid(
            "proximity.threshold_km",
            format!("expected a positive distance, got {}", proximity.threshold_km),
        ));
    }
    if proximity.poll_interval_ms == 0 {
        return Err(invalid("proximity.poll_interval_ms", "must be non-zero"));
    }

    Ok(EngineConfig {
        retry: RetryPolicy {
            max_attempts: storage.retry_attempts,
            initial_backoff: Duration::from_millis(storage.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(storage.retry_max_backoff_ms),
        },
        monitor: MonitorConfig {
            tick: Duration::from_millis(proximity.poll_interval_ms),
            proximity_threshold_km: proximity.threshold_km,
        },
    })
}
