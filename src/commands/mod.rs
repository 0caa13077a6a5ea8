//! Build target implementations
//!
//! Targets run in the order given on the command line:
//!
//! - `buildprog` compiles and links the firmware image
//! - `size` prints ROM usage from the linker's memory report
//! - `upload` dispatches the upload protocol and runs its plan
//! - `nobuild` makes the other targets use the existing image
//!
//! The firmware is built at most once per invocation.

pub mod build;
pub mod progress;
pub mod size;
pub mod upload;

use std::path::PathBuf;

use mcsflash_core::board::BoardConfig;
use mcsflash_core::process::CommandRunner;
use mcsflash_core::toolchain::{BuildFlagInputs, Toolchain, ToolchainConfigurer, ToolchainFlags};
use mcsflash_upload::SerialPorts;

use crate::cli::Target;
use crate::project::Project;
use progress::IndicatifProgress;

/// Everything a build invocation needs, resolved once up front
pub struct BuildContext {
    pub project: Project,
    pub board: BoardConfig,
    pub toolchain: Toolchain,
    pub flags: ToolchainFlags,
    pub verbose: bool,
}

impl BuildContext {
    /// Apply the project's board overrides and resolve toolchain flags
    ///
    /// Configuration errors surface here, before any tool runs.
    pub fn new(
        project: Project,
        mut board: BoardConfig,
        verbose: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        project.apply_board_overrides(&mut board)?;
        let toolchain = Toolchain::default();
        let inputs = BuildFlagInputs {
            build_flags: project.build_flags.clone(),
            src_build_flags: project.src_build_flags.clone(),
        };
        let flags = ToolchainConfigurer::new(&toolchain, &board).configure(&inputs)?;

        Ok(Self {
            project,
            board,
            toolchain,
            flags,
            verbose,
        })
    }

    /// Path of the linked firmware image
    pub fn firmware_path(&self) -> PathBuf {
        self.project.build_dir.join(self.toolchain.program_file())
    }
}

/// Run targets in order
pub fn run_targets(
    ctx: &BuildContext,
    targets: &[Target],
    runner: &mut dyn CommandRunner,
    ports: &dyn SerialPorts,
) -> Result<(), Box<dyn std::error::Error>> {
    let skip_build = targets.contains(&Target::Nobuild);
    let mut progress = IndicatifProgress::new(ctx.verbose);
    let mut firmware: Option<PathBuf> = None;

    for target in targets {
        log::debug!("Running target {:?}", target);
        match target {
            Target::Nobuild => {
                firmware = Some(build::existing_firmware(ctx)?);
            }
            Target::Buildprog => {
                ensure_firmware(ctx, runner, &mut progress, skip_build, &mut firmware)?;
            }
            Target::Size => {
                let image = ensure_firmware(ctx, runner, &mut progress, skip_build, &mut firmware)?;
                size::run_size(ctx, &image)?;
            }
            Target::Upload => {
                let image = ensure_firmware(ctx, runner, &mut progress, skip_build, &mut firmware)?;
                upload::run_upload(ctx, &image, runner, ports, &mut progress)?;
            }
        }
    }

    Ok(())
}

/// Build the firmware unless it is already known for this invocation
fn ensure_firmware(
    ctx: &BuildContext,
    runner: &mut dyn CommandRunner,
    progress: &mut IndicatifProgress,
    skip_build: bool,
    firmware: &mut Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = firmware {
        return Ok(path.clone());
    }
    let path = if skip_build {
        build::existing_firmware(ctx)?
    } else {
        build::build_program(ctx, runner, progress)?
    };
    *firmware = Some(path.clone());
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::testing::{FakePorts, FakeRunner};
    use super::*;
    use mcsflash_upload::PortCandidate;
    use std::fs;
    use std::path::Path;

    const BOARD: &str = r#"
[build]
cpu = "mcs51"
f_cpu = "24000000L"
size_code = 16384
hwids = [["0x1209", "0xC550"]]
"#;

    fn context(root: &Path, protocol: &str) -> BuildContext {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.c"), "void main(void) {}\n").unwrap();
        let mut project = Project::with_base(root);
        project.upload_protocol = Some(protocol.into());
        let board = BoardConfig::from_toml_str(BOARD).unwrap();
        BuildContext::new(project, board, false).unwrap()
    }

    fn write_mem_report(ctx: &BuildContext) {
        fs::create_dir_all(&ctx.project.build_dir).unwrap();
        fs::write(
            ctx.project.build_dir.join("firmware.mem"),
            "ROM/EPROM/FLASH  0x0000   0x03ff      1024    16384\n",
        )
        .unwrap();
    }

    #[test]
    fn test_default_targets_build_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ch55x");
        write_mem_report(&ctx);
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        run_targets(&ctx, &[Target::Buildprog, Target::Size], &mut runner, &ports).unwrap();

        // one compile, one link
        assert_eq!(runner.programs(), vec!["sdcc", "sdcc"]);
    }

    #[test]
    fn test_upload_after_build() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ch55x");
        let mut runner = FakeRunner::default();
        let ports = FakePorts {
            candidates: vec![PortCandidate::new("/dev/ttyACM0", "USB VID:PID=1209:C550")],
            ..Default::default()
        };

        run_targets(&ctx, &[Target::Upload], &mut runner, &ports).unwrap();

        assert_eq!(
            runner.programs(),
            vec!["sdcc", "sdcc", "sdobjcopy", "vnproch55x"]
        );
        assert_eq!(*ports.touched.borrow(), vec!["/dev/ttyACM0"]);
    }

    #[test]
    fn test_nobuild_requires_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ch55x");
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        assert!(run_targets(&ctx, &[Target::Nobuild, Target::Upload], &mut runner, &ports).is_err());
        assert!(runner.commands.is_empty());

        fs::create_dir_all(&ctx.project.build_dir).unwrap();
        fs::write(ctx.firmware_path(), ":00000001FF\n").unwrap();
        run_targets(&ctx, &[Target::Upload, Target::Nobuild], &mut runner, &ports).unwrap();
        assert_eq!(runner.programs(), vec!["sdobjcopy", "vnproch55x"]);
    }

    #[test]
    fn test_unknown_protocol_does_not_fail_build() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "jtag");
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        run_targets(&ctx, &[Target::Buildprog, Target::Upload], &mut runner, &ports).unwrap();
        assert_eq!(runner.programs(), vec!["sdcc", "sdcc"]);
    }

    #[test]
    fn test_board_overrides_reach_flags() {
        let mut project = Project::with_base(Path::new("."));
        project
            .board_overrides
            .insert("build.size_code".into(), toml::Value::Integer(8192));
        project
            .board_overrides
            .insert("build.f_cpu".into(), toml::Value::String("12000000L".into()));
        let board = BoardConfig::from_toml_str(BOARD).unwrap();
        let ctx = BuildContext::new(project, board, false).unwrap();

        assert!(ctx.flags.cppdefines.contains(&"F_CPU=12000000L".to_string()));
        assert!(ctx
            .flags
            .link_args()
            .windows(2)
            .any(|w| w[0] == "--code-size" && w[1] == "8192"));
    }

    #[test]
    fn test_compile_failure_stops_targets() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ch55x");
        let mut runner = FakeRunner {
            failing: vec!["sdcc".into()],
            ..Default::default()
        };
        let ports = FakePorts::default();

        assert!(run_targets(&ctx, &[Target::Upload], &mut runner, &ports).is_err());
        assert_eq!(runner.programs(), vec!["sdcc"]);
        assert!(ports.touched.borrow().is_empty());
    }
}
