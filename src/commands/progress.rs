//! Progress reporting with indicatif spinners

use indicatif::{ProgressBar, ProgressStyle};
use mcsflash_upload::{Action, PlanProgress};
use std::time::Duration;

/// Create a standard spinner style
fn create_spinner_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?)
}

/// One spinner per running step
///
/// In verbose mode the full command line is shown instead of the label.
pub struct IndicatifProgress {
    verbose: bool,
    current: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            current: None,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Start a spinner showing `message`
    pub fn start(&mut self, message: String) {
        self.finish_current();
        let pb = ProgressBar::new_spinner();
        pb.set_style(create_spinner_style().unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current = Some(pb);
    }

    /// Finish the current spinner, marking success or failure
    pub fn done(&mut self, ok: bool) {
        if let Some(pb) = self.current.take() {
            let message = pb.message();
            if ok {
                pb.finish_with_message(format!("{} ... done", message));
            } else {
                pb.abandon_with_message(format!("{} ... FAILED", message));
            }
        }
    }

    fn finish_current(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish();
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        self.finish_current();
    }
}

impl PlanProgress for IndicatifProgress {
    fn started(&mut self, index: usize, total: usize, action: &Action) {
        let message = format!("[{}/{}] {}", index + 1, total, action.describe(self.verbose));
        self.start(message);
    }

    fn finished(&mut self, _action: &Action, ok: bool) {
        self.done(ok);
    }
}
