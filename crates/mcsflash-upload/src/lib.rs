//! mcsflash-upload - Upload protocol dispatch
//!
//! This crate decides how a linked firmware image gets onto the board. It
//! does not talk to bootloaders itself; it builds a plan of external
//! commands (converter, uploader) and runs it.
//!
//! # Supported protocols
//!
//! - `stcgal`: STC serial ISP. The port must be given explicitly.
//! - `ch55x`: WCH CH55x USB bootloader. The CDC port of the running firmware
//!   is found by USB hardware id and touched at 1200 baud to reboot into the
//!   bootloader, then the image is converted to raw binary and uploaded.
//! - `custom`: a user supplied command line.
//!
//! Any other protocol name produces an empty plan and a warning.
//!
//! # Example
//!
//! ```no_run
//! use mcsflash_core::board::BoardConfig;
//! use mcsflash_core::process::SystemRunner;
//! use mcsflash_core::toolchain::Toolchain;
//! use mcsflash_upload::{LogProgress, SystemSerialPorts, UploadDispatcher, UploadRequest};
//!
//! let board = BoardConfig::from_toml_file("boards/ch552.toml")?;
//! let toolchain = Toolchain::default();
//! let request = UploadRequest {
//!     protocol: "ch55x".into(),
//!     firmware: ".build/firmware.hex".into(),
//!     build_dir: ".build".into(),
//!     ..Default::default()
//! };
//! let plan = UploadDispatcher::new(&toolchain, &board, &SystemSerialPorts).dispatch(&request)?;
//! plan.execute(&mut SystemRunner, &mut LogProgress::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dispatch;
pub mod error;
pub mod plan;
pub mod port;
pub mod protocol;

// Re-exports
pub use dispatch::{UploadDispatcher, UploadRequest, UploaderTools};
pub use error::{Result, UploadError};
pub use plan::{Action, LogProgress, PlanProgress, Step, UploadPlan};
pub use port::{HardwareId, PortCandidate, SerialPorts, SystemSerialPorts, TOUCH_BAUD};
pub use protocol::UploadProtocol;
