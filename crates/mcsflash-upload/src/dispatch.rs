//! Upload dispatch
//!
//! Turns an upload request into an [`UploadPlan`] for the selected protocol:
//!
//! | Protocol | Port | Actions |
//! |----------|------|---------|
//! | `stcgal` | as given, never detected | check port, upload hex |
//! | `ch55x`  | as given, or detected by hardware id; touched at 1200 baud | hex to bin, upload bin |
//! | `custom` | as given | user command |
//! | other    | - | none (warning) |

use std::path::{Path, PathBuf};

use mcsflash_core::board::BoardLookup;
use mcsflash_core::process::CommandSpec;
use mcsflash_core::toolchain::Toolchain;

use crate::error::{Result, UploadError};
use crate::plan::{Action, UploadPlan};
use crate::port::{autodetect_port, HardwareId, SerialPorts, TOUCH_BAUD};
use crate::protocol::UploadProtocol;

/// Uploader executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderTools {
    pub stcgal: String,
    pub ch55x: String,
}

impl Default for UploaderTools {
    fn default() -> Self {
        Self {
            stcgal: "stcgal".into(),
            ch55x: "vnproch55x".into(),
        }
    }
}

/// One upload request
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Protocol name (`stcgal`, `ch55x`, `custom`, ...)
    pub protocol: String,
    /// Explicit upload port; disables autodetection
    pub port: Option<String>,
    /// Command line for the `custom` protocol
    pub custom_command: Option<String>,
    /// Linked firmware image (Intel hex)
    pub firmware: PathBuf,
    /// Directory receiving intermediate files
    pub build_dir: PathBuf,
    /// Pass `-v` to the uploader
    pub verbose: bool,
}

/// Builds upload plans
pub struct UploadDispatcher<'a> {
    toolchain: &'a Toolchain,
    board: &'a dyn BoardLookup,
    ports: &'a dyn SerialPorts,
    tools: UploaderTools,
}

impl<'a> UploadDispatcher<'a> {
    pub fn new(
        toolchain: &'a Toolchain,
        board: &'a dyn BoardLookup,
        ports: &'a dyn SerialPorts,
    ) -> Self {
        Self {
            toolchain,
            board,
            ports,
            tools: UploaderTools::default(),
        }
    }

    /// Use different uploader executables
    #[must_use]
    pub fn with_tools(mut self, tools: UploaderTools) -> Self {
        self.tools = tools;
        self
    }

    /// Build the plan for a request
    ///
    /// Configuration errors are returned before any port is touched. An
    /// unknown protocol yields an empty plan carrying a warning.
    pub fn dispatch(&self, request: &UploadRequest) -> Result<UploadPlan> {
        let protocol = UploadProtocol::resolve(
            &request.protocol,
            self.board,
            request.custom_command.as_deref(),
        )?;
        log::debug!("Upload protocol: {:?}", protocol);

        let plan = match protocol {
            UploadProtocol::SerialBootloader {
                protocol,
                clock_khz,
            } => self.serial_bootloader_plan(request, &protocol, clock_khz),
            UploadProtocol::UsbBootloaderTouch { hwid } => self.usb_touch_plan(request, &hwid),
            UploadProtocol::Custom { command } => self.custom_plan(request, &command),
            UploadProtocol::Unknown { name } => {
                let warning = UploadError::UnsupportedProtocol(name).to_string();
                log::warn!("Warning! {}", warning);
                UploadPlan::unavailable(warning)
            }
        };

        Ok(plan)
    }

    fn serial_bootloader_plan(
        &self,
        request: &UploadRequest,
        protocol: &str,
        clock_khz: u64,
    ) -> UploadPlan {
        let mut cmd = CommandSpec::new(&self.tools.stcgal)
            .args(uploader_flags(request))
            .args(["-P", protocol]);
        if let Some(port) = &request.port {
            cmd = cmd.args(["-p", port.as_str()]);
        }
        let cmd = cmd
            .args(["-t".to_string(), clock_khz.to_string(), "-a".to_string()])
            .arg(path_arg(&request.firmware));

        UploadPlan::new(vec![
            Action::require_port("Looking for upload port...", request.port.clone()),
            Action::run(format!("Uploading {}", request.firmware.display()), cmd),
        ])
    }

    fn usb_touch_plan(&self, request: &UploadRequest, hwid: &HardwareId) -> UploadPlan {
        let port = match &request.port {
            Some(port) => Some(port.clone()),
            None => self.detect_port(hwid),
        };

        if let Some(port) = &port {
            log::info!("Enter bootloader by opening {} at {}bps", port, TOUCH_BAUD);
            // Best effort, the device may already sit in its bootloader
            if let Err(e) = self.ports.touch(port, TOUCH_BAUD) {
                log::info!("Ignoring bootloader touch failure on {}: {}", port, e);
            }
        }

        let binary = request.build_dir.join(self.toolchain.binary_file());
        let convert = CommandSpec::new(&self.toolchain.objcopy)
            .args(["-I", "ihex", "-O", "binary"])
            .arg(path_arg(&request.firmware))
            .arg(path_arg(&binary));
        let upload = CommandSpec::new(&self.tools.ch55x)
            .args(uploader_flags(request))
            .arg("-f")
            .arg(path_arg(&binary));

        UploadPlan::new(vec![
            Action::run("Creating binary", convert),
            Action::run(
                format!("Uploading {}", self.toolchain.binary_file()),
                upload,
            ),
        ])
    }

    fn detect_port(&self, hwid: &HardwareId) -> Option<String> {
        match autodetect_port(self.ports, hwid) {
            Ok(port) => port,
            Err(e) => {
                log::warn!("Serial port enumeration failed: {}", e);
                None
            }
        }
    }

    fn custom_plan(&self, request: &UploadRequest, command: &str) -> UploadPlan {
        let line = expand_command(command, &request.firmware, request.port.as_deref());
        UploadPlan::new(vec![Action::run(
            format!("Uploading {}", request.firmware.display()),
            CommandSpec::shell(&line),
        )])
    }
}

/// Flags shared by the uploader executables
fn uploader_flags(request: &UploadRequest) -> Option<&'static str> {
    request.verbose.then_some("-v")
}

/// Substitute `$SOURCE` and `$UPLOAD_PORT` (plain or braced) in a command line
///
/// Only whole variable names are replaced; `$SOURCES` or `$UPLOAD_PORTS`
/// are left as they are, as is any other `$` text.
pub fn expand_command(command: &str, source: &Path, port: Option<&str>) -> String {
    let source = path_arg(source);
    let port = port.unwrap_or_default();
    let mut out = String::with_capacity(command.len());
    let mut rest = command;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, len) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let value = match name {
            "SOURCE" => Some(source.as_str()),
            "UPLOAD_PORT" => Some(port),
            _ => None,
        };
        match value {
            Some(value) if len > 0 => {
                out.push_str(value);
                rest = &after[len..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
