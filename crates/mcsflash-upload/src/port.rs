//! Serial port discovery and the bootloader touch
//!
//! Boards with a USB bootloader (CH55x) expose a CDC serial port while the
//! application firmware runs. Opening that port at 1200 baud and closing it
//! again asks the firmware to reboot into the bootloader.

use core::fmt;
use std::time::Duration;

use mcsflash_core::board::BoardLookup;
use mcsflash_core::Error as CoreError;
use serialport::SerialPortType;

use crate::error::Result;

/// Baud rate that signals a reset into the bootloader
pub const TOUCH_BAUD: u32 = 1200;

/// Hardware id used when the board does not list one
pub const DEFAULT_HWID: &str = "1209:C550";

/// Marker preceding the `VVVV:PPPP` pair in hardware id strings
const VID_PID_MARKER: &str = "VID:PID=";

/// A discovered serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Port identifier (e.g. `/dev/ttyACM0`, `COM3`)
    pub port: String,
    /// Hardware id string, `USB VID:PID=XXXX:YYYY ...` for USB devices
    pub hwid: String,
}

impl PortCandidate {
    pub fn new(port: impl Into<String>, hwid: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            hwid: hwid.into(),
        }
    }

    /// The `VVVV:PPPP` pair following `VID:PID=`, if present
    pub fn vid_pid(&self) -> Option<&str> {
        let (_, rest) = self.hwid.split_once(VID_PID_MARKER)?;
        Some(rest.get(..9).unwrap_or(rest))
    }
}

/// USB vendor:product pattern, normalized to uppercase without `0x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareId(String);

impl HardwareId {
    /// Parse a `vid:pid` pattern such as `1209:C550` or `0x1209:0xc550`
    pub fn parse(pattern: &str) -> core::result::Result<Self, CoreError> {
        let normalized = pattern.replace("0x", "").replace("0X", "").to_ascii_uppercase();
        let valid = normalized
            .split_once(':')
            .is_some_and(|(vid, pid)| is_hex_id(vid) && is_hex_id(pid));
        if !valid {
            return Err(CoreError::Config(format!(
                "invalid hardware id {:?} (expected VID:PID)",
                pattern
            )));
        }
        Ok(Self(normalized))
    }

    /// Hardware id from the first `build.hwids` entry, or the default
    pub fn from_board(board: &dyn BoardLookup) -> core::result::Result<Self, CoreError> {
        match board.get_str_lists("build.hwids")? {
            Some(hwids) if !hwids.is_empty() => Self::parse(&hwids[0].join(":")),
            _ => Self::parse(DEFAULT_HWID),
        }
    }

    /// Check whether a port's hardware id carries this vendor:product
    pub fn matches(&self, candidate: &PortCandidate) -> bool {
        candidate
            .vid_pid()
            .is_some_and(|id| id.eq_ignore_ascii_case(&self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_hex_id(s: &str) -> bool {
    (1..=4).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Access to the host's serial ports
pub trait SerialPorts {
    /// List ports in a stable order
    fn enumerate(&self) -> Result<Vec<PortCandidate>>;

    /// Open `port` at `baud` and close it again without exchanging data
    fn touch(&self, port: &str, baud: u32) -> Result<()>;
}

/// Serial ports of the running system, via the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialPorts;

impl SerialPorts for SystemSerialPorts {
    fn enumerate(&self) -> Result<Vec<PortCandidate>> {
        let ports = serialport::available_ports()?;
        let candidates = ports
            .into_iter()
            .map(|info| {
                let hwid = match info.port_type {
                    SerialPortType::UsbPort(usb) => {
                        let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                        if let Some(serial) = usb.serial_number {
                            hwid.push_str(&format!(" SER={}", serial));
                        }
                        hwid
                    }
                    SerialPortType::PciPort => "PCI".to_string(),
                    SerialPortType::BluetoothPort => "BLUETOOTH".to_string(),
                    SerialPortType::Unknown => "n/a".to_string(),
                };
                PortCandidate::new(info.port_name, hwid)
            })
            .collect::<Vec<_>>();

        for c in &candidates {
            log::trace!("Serial port {} [{}]", c.port, c.hwid);
        }
        Ok(candidates)
    }

    fn touch(&self, port: &str, baud: u32) -> Result<()> {
        let handle = serialport::new(port, baud)
            .timeout(Duration::from_millis(500))
            .open()?;
        drop(handle);
        Ok(())
    }
}

/// Ports whose hardware id matches, in enumeration order
pub fn matching_ports(candidates: &[PortCandidate], hwid: &HardwareId) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| hwid.matches(c))
        .map(|c| c.port.clone())
        .collect()
}

/// Find the upload port for a hardware id
///
/// The first match in enumeration order wins. Several matches only produce
/// a warning. Returns `Ok(None)` when nothing matches.
pub fn autodetect_port(ports: &dyn SerialPorts, hwid: &HardwareId) -> Result<Option<String>> {
    let candidates = ports.enumerate()?;
    let mut matches = matching_ports(&candidates, hwid);

    match matches.len() {
        0 => {
            log::debug!(
                "No serial port with hardware id {} among {} port(s)",
                hwid,
                candidates.len()
            );
            Ok(None)
        }
        1 => Ok(matches.pop()),
        _ => {
            log::warn!(
                "Found multiple ports {:?}, using the first one as upload port!",
                matches
            );
            Ok(Some(matches.swap_remove(0)))
        }
    }
}
