//! ROM usage from SDCC memory reports
//!
//! The linker writes a `.mem` summary next to the firmware image. The line
//! of interest sits in the indented "Other memory" table:
//!
//! ```text
//!    Name             Start    End      Size     Max
//!    ---------------- -------- -------- -------- --------
//!    ROM/EPROM/FLASH  0x0000   0x05a3      1444    65536
//! ```

use regex::Regex;

use crate::error::{Error, Result};

/// Pattern matching the ROM line, capturing the used byte count
pub const ROM_USAGE_PATTERN: &str = r"(?m)^[ \t]*ROM/EPROM/FLASH\s+[a-fx\d]+\s+[a-fx\d]+\s+(\d+).*";

/// ROM usage of a linked image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomUsage {
    /// Bytes used
    pub used: u64,
    /// Bytes available (configured code size)
    pub available: Option<u64>,
}

impl RomUsage {
    /// Percentage of the available code size in use
    pub fn percent(&self) -> Option<f64> {
        self.available
            .filter(|&a| a > 0)
            .map(|a| self.used as f64 * 100.0 / a as f64)
    }
}

/// Extract the used ROM byte count from a memory report
pub fn parse_rom_usage(report: &str) -> Result<u64> {
    let re = Regex::new(ROM_USAGE_PATTERN)
        .map_err(|e| Error::InvalidArgument(format!("bad size pattern: {}", e)))?;

    let caps = re
        .captures(report)
        .ok_or_else(|| Error::InvalidArgument("no ROM/EPROM/FLASH line in size report".into()))?;

    caps[1]
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("invalid ROM size {:?}: {}", &caps[1], e)))
}

/// Parse a size string that may be decimal or `0x` hex
pub fn parse_size_value(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
