//! `buildprog` target: compile, archive and link

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mcsflash_core::process::{CommandOutput, CommandRunner, CommandSpec};
use mcsflash_core::toolchain::Scope;
use mcsflash_core::Error as CoreError;

use super::progress::IndicatifProgress;
use super::BuildContext;

/// Extensions of sources handed to the assembler
const ASM_EXTENSIONS: [&str; 3] = ["s", "S", "asm"];

/// One source file and the object it compiles to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    pub source: PathBuf,
    pub object: PathBuf,
    pub scope: Scope,
    /// Library the unit belongs to (`None` for project sources)
    pub library: Option<String>,
}

impl CompileUnit {
    /// Whether the source goes through the assembler
    pub fn is_assembly(&self) -> bool {
        self.source
            .extension()
            .is_some_and(|ext| ASM_EXTENSIONS.iter().any(|a| ext == *a))
    }
}

/// Collect C and assembly sources below `dir`, sorted
fn find_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    if !dir.is_dir() {
        return Ok(sources);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            sources.extend(find_sources(&path)?);
        } else if path
            .extension()
            .is_some_and(|ext| ext == "c" || ASM_EXTENSIONS.iter().any(|a| ext == *a))
        {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Library directories: the immediate subdirectories of `lib_dir`
fn library_dirs(lib_dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut libs = Vec::new();
    if !lib_dir.is_dir() {
        return Ok(libs);
    }
    for entry in fs::read_dir(lib_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            libs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    libs.sort();
    Ok(libs)
}

/// Object path for `source` below `root`, mirrored into `out_dir`
fn object_path(ctx: &BuildContext, root: &Path, source: &Path, out_dir: &Path) -> PathBuf {
    let relative = source.strip_prefix(root).unwrap_or(source);
    out_dir
        .join(relative)
        .with_extension(ctx.toolchain.obj_suffix.trim_start_matches('.'))
}

/// All compile units of the project, project sources first
///
/// `main.c` is placed first since SDCC expects the module holding `main()`
/// at the front of the link line.
pub fn collect_units(ctx: &BuildContext) -> io::Result<Vec<CompileUnit>> {
    let project = &ctx.project;
    let build_dir = &project.build_dir;
    let mut units = Vec::new();

    for source in find_sources(&project.src_dir)? {
        units.push(CompileUnit {
            object: object_path(ctx, &project.src_dir, &source, &build_dir.join("src")),
            source,
            scope: Scope::Project,
            library: None,
        });
    }
    units.sort_by_key(|u| u.source.file_stem().map_or(true, |s| s != "main"));

    for (name, dir) in library_dirs(&project.lib_dir)? {
        let out_dir = build_dir.join("lib").join(&name);
        for source in find_sources(&dir)? {
            units.push(CompileUnit {
                object: object_path(ctx, &dir, &source, &out_dir),
                source,
                scope: Scope::Library,
                library: Some(name.clone()),
            });
        }
    }

    Ok(units)
}

/// Compiler or assembler command for one unit
pub fn compile_command(ctx: &BuildContext, unit: &CompileUnit) -> io::Result<CommandSpec> {
    if unit.is_assembly() {
        return Ok(CommandSpec::new(&ctx.toolchain.assembler)
            .args(ctx.flags.assemble_args())
            .arg("-o")
            .arg(unit.object.to_string_lossy())
            .arg(unit.source.to_string_lossy()));
    }

    let mut cmd = CommandSpec::new(&ctx.toolchain.cc).arg("-c");
    cmd = cmd.args(ctx.flags.compile_args(unit.scope));
    if unit.scope == Scope::Project {
        cmd = cmd.arg(format!("-I{}", ctx.project.src_dir.display()));
    }
    for (_, dir) in library_dirs(&ctx.project.lib_dir)? {
        cmd = cmd.arg(format!("-I{}", dir.display()));
    }
    Ok(cmd
        .arg(unit.source.to_string_lossy())
        .arg("-o")
        .arg(unit.object.to_string_lossy()))
}

/// Run one tool, reporting progress
pub fn run_tool(
    runner: &mut dyn CommandRunner,
    progress: &mut IndicatifProgress,
    label: String,
    cmd: &CommandSpec,
) -> Result<CommandOutput, CoreError> {
    let message = if progress.verbose() {
        cmd.to_string()
    } else {
        label
    };
    progress.start(message);

    let output = match runner.run(cmd) {
        Ok(output) => output,
        Err(e) => {
            progress.done(false);
            return Err(CoreError::Io(io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", cmd.program, e),
            )));
        }
    };

    progress.done(output.success);
    if output.success {
        Ok(output)
    } else {
        Err(CoreError::ExternalTool {
            tool: cmd.program.clone(),
            status: output.code,
        })
    }
}

/// Compile and link the firmware image
pub fn build_program(
    ctx: &BuildContext,
    runner: &mut dyn CommandRunner,
    progress: &mut IndicatifProgress,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let units = collect_units(ctx)?;
    if !units.iter().any(|u| u.scope == Scope::Project) {
        return Err(format!(
            "No C sources found in {}",
            ctx.project.src_dir.display()
        )
        .into());
    }

    let build_dir = &ctx.project.build_dir;
    fs::create_dir_all(build_dir)?;
    log::info!("Building {} unit(s) into {}", units.len(), build_dir.display());

    let mut project_objects = Vec::new();
    let mut library_objects: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for unit in &units {
        if let Some(parent) = unit.object.parent() {
            fs::create_dir_all(parent)?;
        }
        let cmd = compile_command(ctx, unit)?;
        let verb = if unit.is_assembly() {
            "Assembling"
        } else {
            "Compiling"
        };
        run_tool(
            runner,
            progress,
            format!("{} {}", verb, unit.source.display()),
            &cmd,
        )?;
        match &unit.library {
            Some(name) => library_objects
                .entry(name.clone())
                .or_default()
                .push(unit.object.clone()),
            None => project_objects.push(unit.object.clone()),
        }
    }

    let mut archives = Vec::new();
    for (name, objects) in &library_objects {
        let archive = format!("lib{}{}", name, ctx.toolchain.lib_suffix);
        let archive_path = build_dir.join(&archive);
        let cmd = CommandSpec::new(&ctx.toolchain.ar)
            .arg("-rc")
            .arg(archive_path.to_string_lossy())
            .args(objects.iter().map(|o| o.to_string_lossy().into_owned()));
        run_tool(runner, progress, format!("Archiving {}", archive), &cmd)?;
        let index = CommandSpec::new(&ctx.toolchain.ranlib).arg(archive_path.to_string_lossy());
        run_tool(runner, progress, format!("Indexing {}", archive), &index)?;
        archives.push(archive);
    }

    let firmware = ctx.firmware_path();
    let mut link = CommandSpec::new(&ctx.toolchain.cc)
        .args(ctx.flags.link_args())
        .arg("-o")
        .arg(firmware.to_string_lossy())
        .args(project_objects.iter().map(|o| o.to_string_lossy().into_owned()));
    if !archives.is_empty() {
        // SDCC wants an absolute library path
        let lib_path = fs::canonicalize(build_dir)?;
        link = link
            .arg("-L")
            .arg(lib_path.to_string_lossy())
            .args(archives);
    }
    run_tool(
        runner,
        progress,
        format!("Linking {}", firmware.display()),
        &link,
    )?;

    Ok(firmware)
}

/// The previously built firmware image, without building
pub fn existing_firmware(ctx: &BuildContext) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let firmware = ctx.firmware_path();
    if firmware.is_file() {
        log::info!("Using existing firmware {}", firmware.display());
        Ok(firmware)
    } else {
        Err(format!(
            "Firmware {} does not exist; build it first",
            firmware.display()
        )
        .into())
    }
}
