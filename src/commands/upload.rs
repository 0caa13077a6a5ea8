//! `upload` target: dispatch the upload protocol and run its plan

use std::path::Path;

use mcsflash_core::process::CommandRunner;
use mcsflash_upload::{PlanProgress, SerialPorts, UploadDispatcher, UploadProtocol, UploadRequest};

use super::BuildContext;

/// Upload request for the project's protocol and port
pub fn upload_request(ctx: &BuildContext, firmware: &Path) -> UploadRequest {
    UploadRequest {
        protocol: ctx.project.upload_protocol.clone().unwrap_or_default(),
        port: ctx.project.upload_port.clone(),
        custom_command: ctx.project.upload_command.clone(),
        firmware: firmware.to_path_buf(),
        build_dir: ctx.project.build_dir.clone(),
        verbose: ctx.verbose,
    }
}

/// Upload `firmware` to the board
///
/// An unsupported protocol only prints a warning; the build is still
/// considered successful.
pub fn run_upload(
    ctx: &BuildContext,
    firmware: &Path,
    runner: &mut dyn CommandRunner,
    ports: &dyn SerialPorts,
    progress: &mut dyn PlanProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = upload_request(ctx, firmware);
    let plan = UploadDispatcher::new(&ctx.toolchain, &ctx.board, ports)
        .with_tools(ctx.project.uploader.clone())
        .dispatch(&request)?;

    for warning in plan.warnings() {
        eprintln!("Warning! {}", warning);
    }
    if plan.is_empty() {
        eprintln!(
            "Upload unavailable. Supported protocols: {}",
            UploadProtocol::supported().join(", ")
        );
        return Ok(());
    }

    plan.execute(runner, progress)?;
    println!("Upload complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{FakePorts, FakeRunner};
    use super::*;
    use crate::project::Project;
    use mcsflash_core::board::BoardConfig;
    use mcsflash_upload::LogProgress;

    const BOARD: &str = r#"
[build]
cpu = "mcs51"
f_cpu = "11059200L"

[upload]
stcgal_protocol = "stc89"
"#;

    fn context(root: &Path, protocol: &str, port: Option<&str>) -> BuildContext {
        let mut project = Project::with_base(root);
        project.upload_protocol = Some(protocol.into());
        project.upload_port = port.map(str::to_string);
        project.upload_command = Some("flash-it $SOURCE".into());
        let board = BoardConfig::from_toml_str(BOARD).unwrap();
        BuildContext::new(project, board, false).unwrap()
    }

    #[test]
    fn test_stcgal_upload() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "stcgal", Some("/dev/ttyUSB1"));
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        run_upload(
            &ctx,
            &ctx.firmware_path(),
            &mut runner,
            &ports,
            &mut LogProgress::default(),
        )
        .unwrap();

        assert_eq!(runner.programs(), vec!["stcgal"]);
        let args = &runner.commands[0].args;
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "11059"));
        assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "/dev/ttyUSB1"));
    }

    #[test]
    fn test_verbose_reaches_uploader() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path(), "stcgal", Some("/dev/ttyUSB1"));
        assert!(!upload_request(&ctx, &ctx.firmware_path()).verbose);

        ctx.verbose = true;
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();
        run_upload(
            &ctx,
            &ctx.firmware_path(),
            &mut runner,
            &ports,
            &mut LogProgress::default(),
        )
        .unwrap();
        assert_eq!(runner.commands[0].args[0], "-v");
    }

    #[test]
    fn test_stcgal_without_port_fails_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "stcgal", None);
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        let err = run_upload(
            &ctx,
            &ctx.firmware_path(),
            &mut runner,
            &ports,
            &mut LogProgress::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Upload port not found"));
        assert!(runner.commands.is_empty());
    }

    #[test]
    fn test_custom_upload_uses_shell() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "custom", None);
        let mut runner = FakeRunner::default();
        let ports = FakePorts::default();

        run_upload(
            &ctx,
            &ctx.firmware_path(),
            &mut runner,
            &ports,
            &mut LogProgress::default(),
        )
        .unwrap();

        let line = runner.commands[0].args.last().unwrap();
        assert!(line.starts_with("flash-it "));
        assert!(line.ends_with("firmware.hex"));
    }

    #[test]
    fn test_uploader_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "stcgal", Some("COM3"));
        let mut runner = FakeRunner {
            failing: vec!["stcgal".into()],
            ..Default::default()
        };
        let ports = FakePorts::default();

        assert!(run_upload(
            &ctx,
            &ctx.firmware_path(),
            &mut runner,
            &ports,
            &mut LogProgress::default(),
        )
        .is_err());
    }
}
