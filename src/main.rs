//! mcsflash - Build and upload firmware for MCS-51 boards
//!
//! Compiles a project with SDCC using flags derived from a board descriptor,
//! reports ROM usage and uploads the image with the board's programming
//! protocol.
//!
//! # Architecture
//!
//! - `mcsflash-core` resolves board parameters and turns them, together with
//!   the user's build flags, into compiler and linker flags
//! - `mcsflash-upload` picks the upload protocol, finds the serial port and
//!   builds the plan of converter/uploader commands
//! - this binary wires both into the `buildprog`, `size`, `upload` and
//!   `nobuild` targets

mod cli;
mod commands;
mod project;

use clap::Parser;
use cli::{Cli, Target, DEFAULT_TARGETS, PROJECT_FILE};
use commands::BuildContext;
use mcsflash_core::board::BoardConfig;
use mcsflash_core::process::SystemRunner;
use mcsflash_upload::SystemSerialPorts;
use project::Project;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still wins over -v
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let project = match load_project(&cli) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Failed to load project: {}", e);
            std::process::exit(1);
        }
    };

    let board_path = project
        .board
        .clone()
        .ok_or("No board descriptor given (set project.board or pass --board)")?;
    let board = BoardConfig::from_toml_file(&board_path)?;
    log::info!(
        "Board: {} ({})",
        board.name().unwrap_or("unnamed"),
        board_path.display()
    );

    let ctx = BuildContext::new(project, board, cli.verbose > 0)?;
    commands::run_targets(
        &ctx,
        &requested_targets(&cli),
        &mut SystemRunner,
        &SystemSerialPorts,
    )
}

/// Log level for a `-v` count
fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Requested targets, or the defaults
fn requested_targets(cli: &Cli) -> Vec<Target> {
    if cli.targets.is_empty() {
        DEFAULT_TARGETS.to_vec()
    } else {
        cli.targets.clone()
    }
}

/// Whether the project file was named explicitly
fn project_required(cli: &Cli) -> bool {
    cli.project.as_os_str() != PROJECT_FILE
}

/// Load the project file and apply command line overrides
fn load_project(cli: &Cli) -> Result<Project, Box<dyn std::error::Error>> {
    let mut project = Project::load(&cli.project, project_required(cli))?;

    if let Some(board) = &cli.board {
        project.board = Some(board.clone());
    }
    if let Some(flags) = &cli.build_flags {
        project.build_flags = vec![flags.clone()];
    }
    if let Some(flags) = &cli.src_build_flags {
        project.src_build_flags = vec![flags.clone()];
    }
    if let Some(protocol) = &cli.protocol {
        project.upload_protocol = Some(protocol.clone());
    }
    if let Some(port) = &cli.port {
        project.upload_port = Some(port.clone());
    }
    if let Some(command) = &cli.upload_command {
        project.upload_command = Some(command.clone());
    }

    Ok(project)
}
