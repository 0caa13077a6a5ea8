//! CLI argument parsing

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Build targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Compile and link the firmware image
    Buildprog,
    /// Report ROM usage of the firmware image
    Size,
    /// Upload the firmware image to the board
    Upload,
    /// Use the existing firmware image instead of building it
    Nobuild,
}

/// Project file looked up when `--project` is not given
pub const PROJECT_FILE: &str = "mcsflash.toml";

/// Targets run when none are given
pub const DEFAULT_TARGETS: [Target; 2] = [Target::Buildprog, Target::Size];

#[derive(Parser)]
#[command(name = "mcsflash")]
#[command(
    author,
    version,
    about = "Build and upload firmware for SDCC-based MCS-51 boards",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv); -v also prints full command lines
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project file
    #[arg(short = 'c', long, default_value = PROJECT_FILE)]
    pub project: PathBuf,

    /// Board descriptor (TOML), overrides the project setting
    #[arg(short, long)]
    pub board: Option<PathBuf>,

    /// Build flags for all sources, overrides the project setting
    #[arg(long, allow_hyphen_values = true)]
    pub build_flags: Option<String>,

    /// Build flags for project sources only, overrides the project setting
    #[arg(long, allow_hyphen_values = true)]
    pub src_build_flags: Option<String>,

    /// Upload protocol (stcgal, ch55x, custom)
    #[arg(long)]
    pub protocol: Option<String>,

    /// Upload port (autodetected for ch55x when omitted)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Command line for the custom upload protocol ($SOURCE, $UPLOAD_PORT)
    #[arg(long, allow_hyphen_values = true)]
    pub upload_command: Option<String>,

    /// Targets to run [default: buildprog size]
    #[arg(short, long = "target", value_enum)]
    pub targets: Vec<Target>,
}
