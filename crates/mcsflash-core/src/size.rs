//! Memory size parameters
//!
//! The SDCC linker needs the internal RAM, external RAM and code sizes of the
//! target, and the C runtime wants a heap size define. Boards may supply any
//! of them under `build.size_<name>`; the rest fall back to fixed defaults.

use core::fmt;

use crate::board::BoardLookup;
use crate::error::Result;

/// One of the fixed memory size keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKey {
    /// Heap size define
    Heap,
    /// Internal RAM size
    Iram,
    /// External RAM size
    Xram,
    /// Code (flash) size
    Code,
}

impl SizeKey {
    /// All keys in resolution order
    pub const ALL: [SizeKey; 4] = [SizeKey::Heap, SizeKey::Iram, SizeKey::Xram, SizeKey::Code];

    /// Board descriptor key holding this size
    pub fn board_key(self) -> &'static str {
        match self {
            SizeKey::Heap => "build.size_heap",
            SizeKey::Iram => "build.size_iram",
            SizeKey::Xram => "build.size_xram",
            SizeKey::Code => "build.size_code",
        }
    }

    /// Value used when the board does not set one
    pub fn default_value(self) -> u32 {
        match self {
            SizeKey::Heap => 1024,
            SizeKey::Iram => 256,
            SizeKey::Xram => 65536,
            SizeKey::Code => 65536,
        }
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeKey::Heap => "heap",
            SizeKey::Iram => "iram",
            SizeKey::Xram => "xram",
            SizeKey::Code => "code",
        };
        f.write_str(name)
    }
}

/// Resolve one size, stringified for use in defines and linker flags
///
/// Configured values are returned verbatim. Lookup errors, including values
/// of the wrong type, are propagated unchanged.
pub fn resolve_size(board: &dyn BoardLookup, key: SizeKey) -> Result<String> {
    match board.get_scalar(key.board_key())? {
        Some(value) => Ok(value),
        None => {
            log::trace!("{} not set by board, using {}", key.board_key(), key.default_value());
            Ok(key.default_value().to_string())
        }
    }
}

/// All four memory sizes of a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSizeParameters {
    pub heap: String,
    pub iram: String,
    pub xram: String,
    pub code: String,
}

impl BoardSizeParameters {
    /// Resolve every size key against the board
    pub fn resolve(board: &dyn BoardLookup) -> Result<Self> {
        let params = Self {
            heap: resolve_size(board, SizeKey::Heap)?,
            iram: resolve_size(board, SizeKey::Iram)?,
            xram: resolve_size(board, SizeKey::Xram)?,
            code: resolve_size(board, SizeKey::Code)?,
        };
        log::debug!(
            "Memory sizes: heap={} iram={} xram={} code={}",
            params.heap,
            params.iram,
            params.xram,
            params.code
        );
        Ok(params)
    }

    /// Get the value for a key
    pub fn get(&self, key: SizeKey) -> &str {
        match key {
            SizeKey::Heap => &self.heap,
            SizeKey::Iram => &self.iram,
            SizeKey::Xram => &self.xram,
            SizeKey::Code => &self.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let board = BoardConfig::from_toml_str("[build]\ncpu = \"mcs51\"\n").unwrap();
        assert_eq!(resolve_size(&board, SizeKey::Heap).unwrap(), "1024");
        assert_eq!(resolve_size(&board, SizeKey::Iram).unwrap(), "256");
        assert_eq!(resolve_size(&board, SizeKey::Xram).unwrap(), "65536");
        assert_eq!(resolve_size(&board, SizeKey::Code).unwrap(), "65536");
    }

    #[test]
    fn test_defaults_without_build_table() {
        let board = BoardConfig::default();
        let sizes = BoardSizeParameters::resolve(&board).unwrap();
        for key in SizeKey::ALL {
            assert_eq!(sizes.get(key), key.default_value().to_string());
        }
    }

    #[test]
    fn test_configured_values_verbatim() {
        let board = BoardConfig::from_toml_str(
            "[build]\nsize_heap = 512\nsize_xram = \"0x400\"\nsize_code = 14336\n",
        )
        .unwrap();
        let sizes = BoardSizeParameters::resolve(&board).unwrap();
        assert_eq!(sizes.heap, "512");
        assert_eq!(sizes.iram, "256");
        assert_eq!(sizes.xram, "0x400");
        assert_eq!(sizes.code, "14336");
    }

    #[test]
    fn test_malformed_value_propagates() {
        let board = BoardConfig::from_toml_str("[build]\nsize_iram = [1, 2]\n").unwrap();
        assert!(matches!(
            resolve_size(&board, SizeKey::Iram),
            Err(Error::Config(_))
        ));
        // Other keys are unaffected
        assert_eq!(resolve_size(&board, SizeKey::Heap).unwrap(), "1024");
    }
}
