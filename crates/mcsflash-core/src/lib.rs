//! mcsflash-core - Board configuration and SDCC toolchain setup
//!
//! This crate turns a board descriptor and a couple of free-form flag strings
//! into the flag sets handed to the SDCC toolchain.
//!
//! # Modules
//!
//! - [`flags`] - splits build flag strings into option/value pairs and
//!   passthrough tokens
//! - [`board`] - board descriptor lookup with dotted keys
//! - [`size`] - memory size parameters with per-key defaults
//! - [`toolchain`] - tool identities and the derived compiler/linker flags
//! - [`process`] - external process invocation
//! - [`report`] - ROM usage extraction from linker memory reports
//!
//! # Example
//!
//! ```no_run
//! use mcsflash_core::board::BoardConfig;
//! use mcsflash_core::toolchain::{BuildFlagInputs, Toolchain, ToolchainConfigurer};
//!
//! let board = BoardConfig::from_toml_file("boards/ch552.toml")?;
//! let toolchain = Toolchain::default();
//! let inputs = BuildFlagInputs {
//!     build_flags: vec!["--model-large -DDEBUG".into()],
//!     src_build_flags: Vec::new(),
//! };
//! let flags = ToolchainConfigurer::new(&toolchain, &board).configure(&inputs)?;
//! println!("{:?}", flags.ccflags);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod board;
pub mod error;
pub mod flags;
pub mod process;
pub mod report;
pub mod size;
pub mod toolchain;

// Re-exports
pub use board::{BoardConfig, BoardLookup};
pub use error::{Error, Result};
pub use flags::{parse_flag_list, parse_flags, ParsedFlags};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use size::{resolve_size, BoardSizeParameters, SizeKey};
pub use toolchain::{BuildFlagInputs, Scope, Toolchain, ToolchainConfigurer, ToolchainFlags};
