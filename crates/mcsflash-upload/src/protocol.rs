//! Upload protocols
//!
//! Each protocol carries the parameters it needs, resolved from the board
//! and project up front so that a misconfigured board fails before anything
//! touches hardware.

use mcsflash_core::board::BoardLookup;
use mcsflash_core::Error as CoreError;

use crate::port::HardwareId;

/// Upload strategy, selected by protocol name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadProtocol {
    /// stcgal serial ISP for STC parts
    SerialBootloader {
        /// stcgal protocol family (`-P`), from `upload.stcgal_protocol`
        protocol: String,
        /// Target clock in kHz (`-t`)
        clock_khz: u64,
    },
    /// CH55x USB bootloader, entered via a 1200 baud touch
    UsbBootloaderTouch {
        /// Vendor:product of the running firmware's CDC port
        hwid: HardwareId,
    },
    /// User supplied upload command
    Custom {
        /// Command line, run through the shell
        command: String,
    },
    /// Anything else; uploading is unavailable
    Unknown {
        /// Name as given by the user
        name: String,
    },
}

impl UploadProtocol {
    /// Name selecting [`UploadProtocol::SerialBootloader`]
    pub const STCGAL: &'static str = "stcgal";
    /// Name selecting [`UploadProtocol::UsbBootloaderTouch`]
    pub const CH55X: &'static str = "ch55x";
    /// Name selecting [`UploadProtocol::Custom`]
    pub const CUSTOM: &'static str = "custom";

    /// Resolve a protocol name and its parameters
    ///
    /// Unknown names are not an error; they resolve to
    /// [`UploadProtocol::Unknown`].
    pub fn resolve(
        name: &str,
        board: &dyn BoardLookup,
        custom_command: Option<&str>,
    ) -> Result<Self, CoreError> {
        match name {
            Self::STCGAL => {
                let f_cpu = board.require_scalar("build.f_cpu")?;
                let clock_khz = parse_clock_khz(&f_cpu)?;
                let protocol = board.get_str("upload.stcgal_protocol")?.ok_or_else(|| {
                    CoreError::Config("board is missing upload.stcgal_protocol".into())
                })?;
                Ok(Self::SerialBootloader {
                    protocol,
                    clock_khz,
                })
            }
            Self::CH55X => Ok(Self::UsbBootloaderTouch {
                hwid: HardwareId::from_board(board)?,
            }),
            Self::CUSTOM => match custom_command {
                Some(cmd) if !cmd.trim().is_empty() => Ok(Self::Custom {
                    command: cmd.to_string(),
                }),
                _ => Err(CoreError::Config(
                    "custom upload protocol requires an upload command".into(),
                )),
            },
            other => Ok(Self::Unknown {
                name: other.to_string(),
            }),
        }
    }

    /// Protocol name
    pub fn name(&self) -> &str {
        match self {
            Self::SerialBootloader { .. } => Self::STCGAL,
            Self::UsbBootloaderTouch { .. } => Self::CH55X,
            Self::Custom { .. } => Self::CUSTOM,
            Self::Unknown { name } => name.as_str(),
        }
    }

    /// Names of all supported protocols
    pub fn supported() -> &'static [&'static str] {
        &[Self::STCGAL, Self::CH55X, Self::CUSTOM]
    }
}

/// Convert a board clock such as `24000000L` to whole kHz
pub fn parse_clock_khz(f_cpu: &str) -> Result<u64, CoreError> {
    let digits = f_cpu.trim().trim_matches('L');
    let hz: u64 = digits
        .parse()
        .map_err(|_| CoreError::Config(format!("invalid build.f_cpu value {:?}", f_cpu)))?;
    Ok(hz / 1000)
}
