//! SDCC toolchain identity and flag assembly
//!
//! [`Toolchain`] names the executables and file suffixes, and is built once
//! per invocation. [`ToolchainConfigurer`] derives the flag sets for one
//! build from the board and the user's flag strings.
//!
//! Flags come in two scopes. Global build flags reach every compile unit,
//! support libraries included. Project build flags only reach the project's
//! own sources and must never end up in a library unit.

use crate::board::BoardLookup;
use crate::error::Result;
use crate::flags::{parse_flag_list, ParsedFlags};
use crate::size::BoardSizeParameters;

/// Executable names and file naming conventions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ar: String,
    pub assembler: String,
    pub cc: String,
    pub ranlib: String,
    pub objcopy: String,
    pub obj_suffix: String,
    pub lib_suffix: String,
    pub prog_name: String,
    pub prog_suffix: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            ar: "sdar".into(),
            assembler: "sdas8051".into(),
            cc: "sdcc".into(),
            ranlib: "sdranlib".into(),
            objcopy: "sdobjcopy".into(),
            obj_suffix: ".rel".into(),
            lib_suffix: ".lib".into(),
            prog_name: "firmware".into(),
            prog_suffix: ".hex".into(),
        }
    }
}

impl Toolchain {
    /// File name of the linked firmware image
    pub fn program_file(&self) -> String {
        format!("{}{}", self.prog_name, self.prog_suffix)
    }

    /// File name of the raw binary conversion of the firmware
    pub fn binary_file(&self) -> String {
        format!("{}.bin", self.prog_name)
    }

    /// File name of the linker memory report
    pub fn memory_report_file(&self) -> String {
        format!("{}.mem", self.prog_name)
    }
}

/// User supplied flags
///
/// Each side is a list of fragments that are joined with single spaces
/// before tokenizing. A plain flag string is a single fragment.
#[derive(Debug, Clone, Default)]
pub struct BuildFlagInputs {
    /// Flags for every compile unit
    pub build_flags: Vec<String>,
    /// Flags for the project's own sources only
    pub src_build_flags: Vec<String>,
}

/// Which part of the tree a compile unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The user's own source tree
    Project,
    /// Support libraries
    Library,
}

/// Complete flag environment for one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainFlags {
    /// Assembler flags
    pub asflags: Vec<String>,
    pub cflags: Vec<String>,
    /// Compiler flags for every unit
    pub ccflags: Vec<String>,
    pub cppdefines: Vec<String>,
    pub linkflags: Vec<String>,
    /// Recognized project flags, project units only
    pub project_ccflags: Vec<String>,
    /// Passthrough half of the global build flags
    pub build_flags: Vec<String>,
    /// Passthrough half of the project build flags
    pub src_build_flags: Vec<String>,
    /// Resolved memory sizes
    pub sizes: Option<BoardSizeParameters>,
}

impl ToolchainFlags {
    /// Compiler arguments for one unit, without source and output
    pub fn compile_args(&self, scope: Scope) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        args.extend(self.cflags.iter().cloned());
        args.extend(self.ccflags.iter().cloned());
        if scope == Scope::Project {
            args.extend(self.project_ccflags.iter().cloned());
        }
        args.extend(self.cppdefines.iter().map(|d| format!("-D{}", d)));
        args.extend(forwarded(&self.build_flags));
        if scope == Scope::Project {
            args.extend(forwarded(&self.src_build_flags));
        }
        args
    }

    /// Assembler arguments for one unit, without source and output
    pub fn assemble_args(&self) -> Vec<String> {
        self.asflags.clone()
    }

    /// Linker arguments, without objects and output
    pub fn link_args(&self) -> Vec<String> {
        let mut args = self.linkflags.clone();
        args.extend(forwarded(&self.build_flags));
        args
    }
}

/// Passthrough tokens that are worth handing to a process
///
/// Repeated spaces leave empty tokens behind; those are dropped here.
fn forwarded(tokens: &[String]) -> impl Iterator<Item = String> + '_ {
    tokens.iter().filter(|t| !t.is_empty()).cloned()
}

/// Builds [`ToolchainFlags`] from a board and user flags
pub struct ToolchainConfigurer<'a> {
    toolchain: &'a Toolchain,
    board: &'a dyn BoardLookup,
}

impl<'a> ToolchainConfigurer<'a> {
    pub fn new(toolchain: &'a Toolchain, board: &'a dyn BoardLookup) -> Self {
        Self { toolchain, board }
    }

    /// The toolchain this configurer was built for
    pub fn toolchain(&self) -> &Toolchain {
        self.toolchain
    }

    /// Assemble the full flag environment
    pub fn configure(&self, inputs: &BuildFlagInputs) -> Result<ToolchainFlags> {
        let cpu = self.board.require_scalar("build.cpu")?;
        let f_cpu = self.board.require_scalar("build.f_cpu")?;
        let sizes = BoardSizeParameters::resolve(self.board)?;

        let mut flags = ToolchainFlags {
            asflags: vec!["-l".into(), "-s".into()],
            cflags: vec!["--std-sdcc11".into()],
            ccflags: vec![
                "--opt-code-size".into(),
                "--peep-return".into(),
                format!("-m{}", cpu),
            ],
            cppdefines: vec![format!("F_CPU={}", f_cpu), format!("HEAP_SIZE={}", sizes.heap)],
            linkflags: vec![
                format!("-m{}", cpu),
                "--iram-size".into(),
                sizes.iram.clone(),
                "--xram-size".into(),
                sizes.xram.clone(),
                "--code-size".into(),
                sizes.code.clone(),
                "--out-fmt-ihx".into(),
            ],
            ..Default::default()
        };

        if let Some(global) = split_fragments(&inputs.build_flags)? {
            log::debug!(
                "Global build flags: compiler {:?}, passthrough {:?}",
                global.recognized,
                global.passthrough
            );
            flags.ccflags.extend(non_empty(global.recognized));
            flags.build_flags = global.passthrough;
        }

        if let Some(project) = split_fragments(&inputs.src_build_flags)? {
            log::debug!(
                "Project build flags: compiler {:?}, passthrough {:?}",
                project.recognized,
                project.passthrough
            );
            flags.project_ccflags = non_empty(project.recognized).collect();
            flags.src_build_flags = project.passthrough;
        }

        flags.sizes = Some(sizes);
        Ok(flags)
    }
}

/// Tokenize flag fragments if any hold text at all
fn split_fragments(fragments: &[String]) -> Result<Option<ParsedFlags>> {
    if fragments.iter().all(String::is_empty) {
        return Ok(None);
    }
    parse_flag_list(fragments).map(Some)
}

/// An option paired with an empty value (`--opt  x`) keeps only the option
fn non_empty(tokens: Vec<String>) -> impl Iterator<Item = String> {
    tokens.into_iter().filter(|t| !t.is_empty())
}
