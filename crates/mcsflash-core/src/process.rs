//! External process invocation
//!
//! Every tool the orchestrator drives (compiler, archiver, converter,
//! uploader) is described by a [`CommandSpec`] and run through a
//! [`CommandRunner`], so tests can substitute a recording runner.

use core::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Program and arguments of one external invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, passed without shell interpretation
    pub args: Vec<String>,
    /// Working directory (inherit when `None`)
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run a command line through the platform shell
    pub fn shell(command_line: &str) -> Self {
        if cfg!(windows) {
            Self::new("cmd").args(["/C", command_line])
        } else {
            Self::new("sh").args(["-c", command_line])
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Quote an argument for display if it contains whitespace
fn quote(s: &str) -> String {
    if s.is_empty() || s.contains(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exited with status 0
    pub success: bool,
    /// Exit code, if any
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run with the given standard output
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
            ..Default::default()
        }
    }
}

/// Runs external commands
///
/// Calls block until the process exits. No timeout is enforced.
pub trait CommandRunner {
    /// Run a command to completion
    ///
    /// An `Err` means the process could not be started at all. A process
    /// that starts and exits non-zero is reported through
    /// [`CommandOutput::success`].
    fn run(&mut self, command: &CommandSpec) -> io::Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &CommandSpec) -> io::Result<CommandOutput> {
        log::debug!("Running: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output()?;
        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.is_empty() {
            log::debug!("{} stdout:\n{}", command.program, result.stdout.trim_end());
        }
        if !result.stderr.is_empty() {
            // Tools print warnings to stderr even on success
            if result.success {
                log::info!("{}", result.stderr.trim_end());
            } else {
                log::error!("{}", result.stderr.trim_end());
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let cmd = CommandSpec::new("sdobjcopy")
            .args(["-I", "ihex", "-O", "binary"])
            .arg("build dir/firmware.hex");
        assert_eq!(cmd.args.len(), 5);
        assert_eq!(
            cmd.to_string(),
            "sdobjcopy -I ihex -O binary \"build dir/firmware.hex\""
        );
    }

    #[test]
    fn test_shell_command() {
        let cmd = CommandSpec::shell("flash $SOURCE");
        assert_eq!(cmd.args.last().map(String::as_str), Some("flash $SOURCE"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_status() {
        let mut runner = SystemRunner;
        let ok = runner.run(&CommandSpec::shell("echo hello")).unwrap();
        assert!(ok.success);
        assert_eq!(ok.stdout.trim(), "hello");

        let failed = runner.run(&CommandSpec::shell("exit 3")).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.code, Some(3));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let mut runner = SystemRunner;
        assert!(runner
            .run(&CommandSpec::new("mcsflash-no-such-program"))
            .is_err());
    }
}
