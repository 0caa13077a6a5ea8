//! Project file parsing
//!
//! Projects are described by a `mcsflash.toml` file:
//!
//! ```toml
//! [project]
//! board = "boards/ch552.toml"
//! src_dir = "src"
//! lib_dir = "lib"
//! build_dir = ".build"
//! build_flags = "--model-small -DDEBUG"
//! src_build_flags = ["--stack-auto", "-DAPP"]
//! upload_protocol = "ch55x"
//! upload_port = "/dev/ttyACM0"
//! upload_command = "my-flasher $SOURCE"
//!
//! [project.uploader]
//! stcgal = "/opt/stcgal/stcgal.py"
//!
//! [project.board_overrides]
//! build.f_cpu = "12000000L"
//! "upload.stcgal_protocol" = "stc12"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.
//! Board overrides replace single board parameters, given either as nested
//! tables or as quoted dotted keys.

use std::fs;
use std::path::{Path, PathBuf};

use mcsflash_core::board::BoardConfig;
use mcsflash_upload::UploaderTools;
use serde::Deserialize;
use toml::{Table, Value};

/// Project file errors
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Cannot read project file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid project file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Flag option given either as one string or as a list of fragments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    One(String),
    Many(Vec<String>),
}

impl FlagValue {
    /// Flag fragments; a single string is one fragment
    pub fn into_fragments(self) -> Vec<String> {
        match self {
            FlagValue::One(s) => vec![s],
            FlagValue::Many(parts) => parts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    project: ProjectSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    board: Option<PathBuf>,
    src_dir: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    build_flags: Option<FlagValue>,
    src_build_flags: Option<FlagValue>,
    upload_protocol: Option<String>,
    upload_port: Option<String>,
    upload_command: Option<String>,
    #[serde(default)]
    uploader: UploaderSection,
    #[serde(default)]
    board_overrides: Table,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UploaderSection {
    stcgal: Option<String>,
    ch55x: Option<String>,
}

/// Project settings with paths resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub board: Option<PathBuf>,
    pub src_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub build_dir: PathBuf,
    pub build_flags: Vec<String>,
    pub src_build_flags: Vec<String>,
    pub upload_protocol: Option<String>,
    pub upload_port: Option<String>,
    pub upload_command: Option<String>,
    pub uploader: UploaderTools,
    /// Board parameters replaced by the project
    pub board_overrides: Table,
}

impl Project {
    /// Defaults for a project rooted at `base`
    pub fn with_base(base: &Path) -> Self {
        Self {
            board: None,
            src_dir: base.join("src"),
            lib_dir: base.join("lib"),
            build_dir: base.join(".build"),
            build_flags: Vec::new(),
            src_build_flags: Vec::new(),
            upload_protocol: None,
            upload_port: None,
            upload_command: None,
            uploader: UploaderTools::default(),
            board_overrides: Table::new(),
        }
    }

    /// Load a project file
    ///
    /// A missing file is only accepted when `required` is false; the
    /// defaults rooted at the file's directory are used then.
    pub fn load(path: &Path, required: bool) -> Result<Self, ProjectError> {
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if !required && !path.exists() {
            log::debug!("No project file at {}, using defaults", path.display());
            return Ok(Self::with_base(base));
        }

        let content = fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let project = Self::from_toml_str(&content, base).map_err(|source| ProjectError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded project from {}", path.display());
        Ok(project)
    }

    /// Parse project settings, resolving relative paths against `base`
    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self, toml::de::Error> {
        let file: ProjectFile = toml::from_str(content)?;
        let section = file.project;
        let defaults = Self::with_base(base);
        let tools = UploaderTools::default();

        Ok(Self {
            board: section.board.map(|p| base.join(p)),
            src_dir: section.src_dir.map_or(defaults.src_dir, |p| base.join(p)),
            lib_dir: section.lib_dir.map_or(defaults.lib_dir, |p| base.join(p)),
            build_dir: section.build_dir.map_or(defaults.build_dir, |p| base.join(p)),
            build_flags: section
                .build_flags
                .map_or_else(Vec::new, FlagValue::into_fragments),
            src_build_flags: section
                .src_build_flags
                .map_or_else(Vec::new, FlagValue::into_fragments),
            upload_protocol: section.upload_protocol,
            upload_port: section.upload_port,
            upload_command: section.upload_command,
            uploader: UploaderTools {
                stcgal: section.uploader.stcgal.unwrap_or(tools.stcgal),
                ch55x: section.uploader.ch55x.unwrap_or(tools.ch55x),
            },
            board_overrides: section.board_overrides,
        })
    }

    /// Apply the project's board overrides to a board descriptor
    pub fn apply_board_overrides(&self, board: &mut BoardConfig) -> mcsflash_core::Result<()> {
        apply_overrides(board, "", &self.board_overrides)
    }
}

fn apply_overrides(
    board: &mut BoardConfig,
    prefix: &str,
    table: &Table,
) -> mcsflash_core::Result<()> {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Table(nested) => apply_overrides(board, &key, nested)?,
            value => {
                log::debug!("Board override {} = {}", key, value);
                board.set(&key, value.clone())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PROJECT_FILE;
    use std::io::Write;

    #[test]
    fn test_parse_full_project() {
        let toml = r#"
[project]
board = "boards/ch552.toml"
build_dir = "out"
build_flags = "--model-small -DDEBUG"
src_build_flags = ["--stack-loc", "0x80", "-DAPP"]
upload_protocol = "ch55x"
upload_port = "/dev/ttyACM0"

[project.uploader]
ch55x = "/usr/local/bin/vnproch55x"
"#;
        let project = Project::from_toml_str(toml, Path::new("/work")).unwrap();
        assert_eq!(project.board, Some(PathBuf::from("/work/boards/ch552.toml")));
        assert_eq!(project.src_dir, PathBuf::from("/work/src"));
        assert_eq!(project.build_dir, PathBuf::from("/work/out"));
        assert_eq!(project.build_flags, vec!["--model-small -DDEBUG"]);
        assert_eq!(project.src_build_flags, vec!["--stack-loc", "0x80", "-DAPP"]);
        assert_eq!(project.upload_protocol.as_deref(), Some("ch55x"));
        assert_eq!(project.uploader.ch55x, "/usr/local/bin/vnproch55x");
        assert_eq!(project.uploader.stcgal, "stcgal");
    }

    #[test]
    fn test_empty_project_uses_defaults() {
        let project = Project::from_toml_str("", Path::new("proj")).unwrap();
        assert_eq!(project, Project::with_base(Path::new("proj")));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Project::from_toml_str("[project]\nboardd = \"x\"\n", Path::new(".")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);

        let project = Project::load(&path, false).unwrap();
        assert_eq!(project.build_dir, dir.path().join(".build"));

        assert!(matches!(
            Project::load(&path, true),
            Err(ProjectError::Read { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[project]\nboard = \"board.toml\"").unwrap();

        let project = Project::load(&path, true).unwrap();
        assert_eq!(project.board, Some(dir.path().join("board.toml")));

        fs::write(&path, "[project\n").unwrap();
        assert!(matches!(
            Project::load(&path, true),
            Err(ProjectError::Parse { .. })
        ));
    }

    #[test]
    fn test_board_overrides() {
        use mcsflash_core::board::BoardLookup;

        let toml = r#"
[project.board_overrides]
build.f_cpu = "12000000L"
"upload.stcgal_protocol" = "stc12"
"#;
        let project = Project::from_toml_str(toml, Path::new(".")).unwrap();
        let mut board = BoardConfig::from_toml_str(
            "[build]\ncpu = \"mcs51\"\nf_cpu = \"24000000L\"\n",
        )
        .unwrap();
        project.apply_board_overrides(&mut board).unwrap();

        assert_eq!(
            board.get_str("build.f_cpu").unwrap().as_deref(),
            Some("12000000L")
        );
        assert_eq!(board.get_str("build.cpu").unwrap().as_deref(), Some("mcs51"));
        assert_eq!(
            board.get_str("upload.stcgal_protocol").unwrap().as_deref(),
            Some("stc12")
        );
    }

    #[test]
    fn test_board_override_through_scalar_fails() {
        let toml = "[project.board_overrides]\n\"build.cpu.core\" = \"x\"\n";
        let project = Project::from_toml_str(toml, Path::new(".")).unwrap();
        let mut board = BoardConfig::from_toml_str("[build]\ncpu = \"mcs51\"\n").unwrap();
        assert!(project.apply_board_overrides(&mut board).is_err());
    }
}
