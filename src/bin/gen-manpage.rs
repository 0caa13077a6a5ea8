//! Man page generator for mcsflash
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]
//!
//! Besides the options, the page documents the build targets and the
//! project file, both taken from the CLI definitions.

use clap::{CommandFactory, ValueEnum};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

use cli::{Target, DEFAULT_TARGETS, PROJECT_FILE};

/// Text of the TARGETS and FILES part of the page
fn targets_help() -> String {
    let mut text = String::from("Targets (-t, --target), run in the order given:\n\n");
    for target in Target::value_variants() {
        if let Some(value) = target.to_possible_value() {
            let help = value.get_help().map(|h| h.to_string()).unwrap_or_default();
            let _ = writeln!(text, "  {:<10} {}", value.get_name(), help);
        }
    }

    let defaults: Vec<String> = DEFAULT_TARGETS
        .iter()
        .filter_map(|t| t.to_possible_value())
        .map(|v| v.get_name().to_string())
        .collect();
    let _ = writeln!(
        text,
        "\nWithout --target, {} run. The firmware is built at most once.",
        defaults.join(" and ")
    );

    let _ = writeln!(
        text,
        "\nFiles:\n\n  {:<10} project settings, read from the current directory \
         unless --project names another file",
        PROJECT_FILE
    );
    text
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Default to ./man directory
    let output_dir = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("man")
    };

    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command().after_long_help(targets_help());
    let man = clap_mangen::Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;

    let output_path = output_dir.join("mcsflash.1");
    fs::write(&output_path, buffer)?;

    println!("Man page generated at: {}", output_path.display());
    println!("  man -l {}", output_path.display());

    Ok(())
}
