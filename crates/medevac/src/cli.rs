//! Clap derive structures for the `medevac` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use medevac_core::{Coordinates, EmergencyId, EmergencyStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// medevac -- emergency dispatch status from the command line
#[derive(Debug, Parser)]
#[command(
    name = "medevac",
    version,
    about = "Track the status of dispatched emergencies",
    long_about = "Inspect and advance the lifecycle of emergency requests.\n\n\
        Every status change is validated against the dispatch transition table\n\
        and appended to a persisted timeline before it takes effect.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "MEDEVAC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Timeline storage directory (overrides config)
    #[arg(long, short = 'd', env = "MEDEVAC_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format (defaults to `defaults.output` in config)
    #[arg(long, short = 'o', env = "MEDEVAC_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load an emergency's timeline, creating it if absent
    Load(LoadArgs),

    /// Show the current status of an emergency
    #[command(alias = "st")]
    Status(IdArgs),

    /// Show the full status timeline
    #[command(alias = "log")]
    History(IdArgs),

    /// Request a status change
    #[command(alias = "tr")]
    Transition(TransitionArgs),

    /// Inspect the transition table
    Allowed(AllowedArgs),

    /// Time spent in the current status
    Elapsed(IdArgs),

    /// Apply the proximity policy to one distance reading
    Proximity(ProximityArgs),

    /// Follow an emergency, optionally feeding distances from stdin
    Watch(WatchArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Emergency Arguments ──────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IdArgs {
    /// Emergency id
    #[arg(value_parser = parse_id)]
    pub id: EmergencyId,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Emergency id
    #[arg(value_parser = parse_id)]
    pub id: EmergencyId,

    /// Status for a new timeline (ignored if one is stored)
    #[arg(long, value_parser = parse_status)]
    pub initial: Option<EmergencyStatus>,
}

#[derive(Debug, Args)]
pub struct TransitionArgs {
    /// Emergency id
    #[arg(value_parser = parse_id)]
    pub id: EmergencyId,

    /// Target status (e.g. accepted, in-progress, on_site)
    #[arg(value_parser = parse_status)]
    pub status: EmergencyStatus,

    /// Latitude where the change happened
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude where the change happened
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Free-form note stored with the change
    #[arg(long, short = 'n')]
    pub notes: Option<String>,
}

impl TransitionArgs {
    pub fn location(&self) -> Option<Coordinates> {
        self.lat.zip(self.lon).map(|(lat, lon)| Coordinates::new(lat, lon))
    }
}

#[derive(Debug, Args)]
pub struct AllowedArgs {
    /// Source status; omit to print the whole table
    #[arg(value_parser = parse_status)]
    pub from: Option<EmergencyStatus>,

    /// Check a single edge (exit 6 when not allowed)
    #[arg(long, requires = "from", value_parser = parse_status)]
    pub to: Option<EmergencyStatus>,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("reading")
        .required(true)
        .args(["distance", "from"])
))]
pub struct ProximityArgs {
    /// Emergency id
    #[arg(value_parser = parse_id)]
    pub id: EmergencyId,

    /// Distance to the incident in kilometres
    #[arg(long)]
    pub distance: Option<f64>,

    /// Crew position as LAT,LON
    #[arg(long, requires = "to", value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub from: Option<Coordinates>,

    /// Incident position as LAT,LON
    #[arg(long, requires = "from", value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub to: Option<Coordinates>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Emergency id
    #[arg(value_parser = parse_id)]
    pub id: EmergencyId,

    /// Read one distance (km) per line from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Stop after this long (e.g. 30s, 5m)
    #[arg(long = "for", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

// ── Config / Completions ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_id(raw: &str) -> Result<EmergencyId, String> {
    EmergencyId::new(raw).map_err(|e| e.to_string())
}

fn parse_status(raw: &str) -> Result<EmergencyStatus, String> {
    EmergencyStatus::parse(raw).map_err(|e| {
        let known: Vec<String> = EmergencyStatus::all()
            .map(|s| s.as_ref().to_owned())
            .collect();
        format!("{e} (expected one of: {})", known.join(", "))
    })
}

fn parse_coordinates(raw: &str) -> Result<Coordinates, String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{raw}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{lon}'"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinates out of range: {lat},{lon}"));
    }
    Ok(Coordinates::new(lat, lon))
}
