//! Board descriptor lookup
//!
//! Board descriptors are TOML files with a handful of tables:
//!
//! ```toml
//! [board]
//! name = "CH552"
//!
//! [build]
//! cpu = "mcs51"
//! f_cpu = "24000000L"
//! size_iram = 256
//! size_xram = 876
//! size_code = 14336
//! hwids = [["0x1209", "0xC550"]]
//!
//! [upload]
//! stcgal_protocol = "stc15"
//! ```
//!
//! Values are addressed with dotted keys such as `build.cpu`.

use std::fs;
use std::path::Path;

use toml::{Table, Value};

use crate::error::{Error, Result};

/// Read access to board parameters by dotted key
pub trait BoardLookup {
    /// Look up a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Look up a value that must be a string when present
    fn get_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::Config(format!(
                "{} must be a string, found {}",
                key,
                other.type_str()
            ))),
        }
    }

    /// Look up a string or integer value and render it as a string
    fn get_scalar(&self, key: &str) -> Result<Option<String>> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Integer(i)) => Ok(Some(i.to_string())),
            Some(other) => Err(Error::Config(format!(
                "{} must be a string or integer, found {}",
                key,
                other.type_str()
            ))),
        }
    }

    /// Look up a required string or integer value
    fn require_scalar(&self, key: &str) -> Result<String> {
        self.get_scalar(key)?
            .ok_or_else(|| Error::Config(format!("board is missing required key {}", key)))
    }

    /// Look up a list of string lists (used for USB hardware ids)
    fn get_str_lists(&self, key: &str) -> Result<Option<Vec<Vec<String>>>> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        let malformed = || Error::Config(format!("{} must be a list of string lists", key));

        let outer = value.as_array().ok_or_else(malformed)?;
        let mut lists = Vec::with_capacity(outer.len());
        for inner in outer {
            let inner = inner.as_array().ok_or_else(malformed)?;
            let strings = inner
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(malformed))
                .collect::<Result<Vec<_>>>()?;
            lists.push(strings);
        }
        Ok(Some(lists))
    }
}

/// Board descriptor backed by a parsed TOML table
#[derive(Debug, Clone, Default)]
pub struct BoardConfig {
    root: Table,
}

impl BoardConfig {
    /// Load a board descriptor from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read board file {}: {}", path.display(), e))
        })?;
        let board = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded board {} from {}",
            board.name().unwrap_or("<unnamed>"),
            path.display()
        );
        Ok(board)
    }

    /// Parse a board descriptor from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let root: Table = toml::from_str(content)?;
        Ok(Self { root })
    }

    /// Human-readable board name (`board.name`)
    pub fn name(&self) -> Option<&str> {
        self.root
            .get("board")
            .and_then(|b| b.get("name"))
            .and_then(Value::as_str)
    }

    /// Set a value by dotted key, creating intermediate tables
    ///
    /// Used for project overrides of board parameters.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(leaf) = parts.pop() else {
            return Err(Error::InvalidArgument("empty board key".into()));
        };

        let mut table = &mut self.root;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = entry.as_table_mut().ok_or_else(|| {
                Error::Config(format!("{} in {} is not a table", part, key))
            })?;
        }
        table.insert(leaf.to_string(), value);
        Ok(())
    }
}

impl BoardLookup for BoardConfig {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut parts = key.split('.');
        let first = parts.next().unwrap_or_default();
        let mut current = match self.root.get(first) {
            Some(v) => v,
            None => return Ok(None),
        };

        for part in parts {
            current = match current {
                Value::Table(t) => match t.get(part) {
                    Some(v) => v,
                    None => return Ok(None),
                },
                other => {
                    return Err(Error::Config(format!(
                        "cannot look up {}: {} is a {}, not a table",
                        key,
                        part,
                        other.type_str()
                    )))
                }
            };
        }

        Ok(Some(current.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CH552: &str = r#"
[board]
name = "CH552"

[build]
cpu = "mcs51"
f_cpu = "24000000L"
size_code = 14336
hwids = [["0x1209", "0xC550"], ["0x4348", "0x55E0"]]

[upload]
stcgal_protocol = "stc15"
"#;

    #[test]
    fn test_dotted_lookup() {
        let board = BoardConfig::from_toml_str(CH552).unwrap();
        assert_eq!(board.name(), Some("CH552"));
        assert_eq!(board.get_str("build.cpu").unwrap().as_deref(), Some("mcs51"));
        assert_eq!(
            board.get_scalar("build.size_code").unwrap().as_deref(),
            Some("14336")
        );
        assert!(board.get("build.size_heap").unwrap().is_none());
        assert!(board.get("missing.table").unwrap().is_none());
    }

    #[test]
    fn test_lookup_through_scalar_fails() {
        let board = BoardConfig::from_toml_str(CH552).unwrap();
        assert!(matches!(
            board.get("build.cpu.variant"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_hwid_lists() {
        let board = BoardConfig::from_toml_str(CH552).unwrap();
        let hwids = board.get_str_lists("build.hwids").unwrap().unwrap();
        assert_eq!(hwids.len(), 2);
        assert_eq!(hwids[0], vec!["0x1209", "0xC550"]);

        let bad = BoardConfig::from_toml_str("[build]\nhwids = [\"0x1209\"]\n").unwrap();
        assert!(matches!(
            bad.get_str_lists("build.hwids"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_require_missing_key() {
        let board = BoardConfig::from_toml_str("[build]\n").unwrap();
        assert!(matches!(
            board.require_scalar("build.cpu"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_set_override() {
        let mut board = BoardConfig::from_toml_str(CH552).unwrap();
        board
            .set("build.f_cpu", Value::String("12000000L".into()))
            .unwrap();
        board
            .set("upload.extra.speed", Value::Integer(115200))
            .unwrap();
        assert_eq!(
            board.get_str("build.f_cpu").unwrap().as_deref(),
            Some("12000000L")
        );
        assert_eq!(
            board.get_scalar("upload.extra.speed").unwrap().as_deref(),
            Some("115200")
        );
        assert!(board.set("build.cpu.x", Value::Integer(1)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CH552.as_bytes()).unwrap();
        let board = BoardConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(board.name(), Some("CH552"));

        assert!(BoardConfig::from_toml_file("/nonexistent/board.toml").is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            BoardConfig::from_toml_str("[build\ncpu ="),
            Err(Error::Toml(_))
        ));
    }
}
