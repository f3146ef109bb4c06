//! CLI-side configuration: `--config` / `--data-dir` / `--output` overrides
//! on top of the shared `medevac_config` layering.

use std::path::PathBuf;

use clap::ValueEnum;

use medevac_config::Config;
use medevac_core::{EmergencyStateEngine, JsonFileStore, RetryingStore};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub use medevac_config::{config_path as default_config_path, save_config_to};

/// Engine type every CLI command runs against.
pub type Engine = EmergencyStateEngine<RetryingStore<JsonFileStore>>;

/// Config file honoring `--config`.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(default_config_path)
}

/// Load the layered config for this invocation.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(medevac_config::load_config_from(&config_path(global))?)
}

/// Resolved per-invocation settings handed to command handlers.
pub struct Context {
    pub engine: Engine,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Context {
    pub fn new(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        let engine_config = medevac_config::to_engine_config(cfg)?;
        let data_dir = global.data_dir.clone().unwrap_or_else(|| cfg.data_dir());
        tracing::debug!(data_dir = %data_dir.display(), "using timeline store");

        Ok(Self {
            engine: EmergencyStateEngine::with_retry(JsonFileStore::new(data_dir), engine_config),
            output: output_format(global, cfg)?,
            color: output::should_color(color_mode(global, cfg)?),
            quiet: global.quiet,
        })
    }
}

/// `--output`, else `defaults.output` from config.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    match global.output {
        Some(format) => Ok(format),
        None => parse_value("defaults.output", &cfg.defaults.output),
    }
}

fn color_mode(global: &GlobalOpts, cfg: &Config) -> Result<ColorMode, CliError> {
    match global.color {
        Some(mode) => Ok(mode),
        None => parse_value("defaults.color", &cfg.defaults.color),
    }
}

fn parse_value<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
