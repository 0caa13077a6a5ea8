//! Upload plans
//!
//! An [`UploadPlan`] is the ordered list of actions one upload request turns
//! into. It is built once, never changed, and executed front to back. The
//! first failing action stops the plan.

use core::fmt;

use mcsflash_core::process::{CommandRunner, CommandSpec};

use crate::error::{Result, UploadError};

/// What an action does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Fail unless an upload port is known
    RequirePort(Option<String>),
    /// Run an external command
    Run(CommandSpec),
}

/// One labelled step of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Progress label, e.g. "Creating binary"
    pub label: String,
    pub step: Step,
}

impl Action {
    /// Action running a command
    pub fn run(label: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            label: label.into(),
            step: Step::Run(command),
        }
    }

    /// Action checking that a port is available
    pub fn require_port(label: impl Into<String>, port: Option<String>) -> Self {
        Self {
            label: label.into(),
            step: Step::RequirePort(port),
        }
    }

    /// The command this action runs, if any
    pub fn command(&self) -> Option<&CommandSpec> {
        match &self.step {
            Step::Run(cmd) => Some(cmd),
            Step::RequirePort(_) => None,
        }
    }

    /// Text to show while running: the label, or the command line when verbose
    pub fn describe(&self, verbose: bool) -> String {
        match (&self.step, verbose) {
            (Step::Run(cmd), true) => cmd.to_string(),
            _ => self.label.clone(),
        }
    }

    fn execute(&self, runner: &mut dyn CommandRunner) -> Result<()> {
        match &self.step {
            Step::RequirePort(Some(port)) => {
                log::info!("Using upload port {}", port);
                Ok(())
            }
            Step::RequirePort(None) => Err(UploadError::PortResolution(
                "no upload port given and none detected; pass --port".into(),
            )),
            Step::Run(cmd) => {
                let output = runner.run(cmd).map_err(|source| UploadError::Spawn {
                    program: cmd.program.clone(),
                    source,
                })?;
                if output.success {
                    Ok(())
                } else {
                    Err(UploadError::ExternalTool {
                        label: self.label.clone(),
                        program: cmd.program.clone(),
                        code: output.code,
                    })
                }
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Progress callbacks during plan execution
pub trait PlanProgress {
    /// Called before each action
    fn started(&mut self, index: usize, total: usize, action: &Action);

    /// Called after each action with its outcome
    fn finished(&mut self, action: &Action, ok: bool);
}

/// Progress reporting through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress {
    pub verbose: bool,
}

impl PlanProgress for LogProgress {
    fn started(&mut self, index: usize, total: usize, action: &Action) {
        log::info!("[{}/{}] {}", index + 1, total, action.describe(self.verbose));
    }

    fn finished(&mut self, action: &Action, ok: bool) {
        if !ok {
            log::error!("{} failed", action.label);
        }
    }
}

/// Ordered actions for one upload request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    actions: Vec<Action>,
    warnings: Vec<String>,
}

impl UploadPlan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            warnings: Vec::new(),
        }
    }

    /// A plan with no actions, recording why uploading is unavailable
    pub fn unavailable(warning: impl Into<String>) -> Self {
        Self {
            actions: Vec::new(),
            warnings: vec![warning.into()],
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Non-fatal problems found while building the plan
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Run every action in order, stopping at the first failure
    pub fn execute(
        &self,
        runner: &mut dyn CommandRunner,
        progress: &mut dyn PlanProgress,
    ) -> Result<()> {
        let total = self.actions.len();
        for (index, action) in self.actions.iter().enumerate() {
            progress.started(index, total, action);
            let result = action.execute(runner);
            progress.finished(action, result.is_ok());
            result?;
        }
        Ok(())
    }
}
