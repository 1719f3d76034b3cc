//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner-per-stage reporter for commit operations
#[derive(Debug)]
pub struct ProgressReporter {
    pub stage_pb: Option<ProgressBar>,
    show_progress: bool,
    start_time: std::time::Instant,
}

impl ProgressReporter {
    /// Create a reporter that draws spinners
    pub fn new_interactive() -> Self {
        Self {
            stage_pb: None,
            show_progress: true,
            start_time: std::time::Instant::now(),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            stage_pb: None,
            show_progress: false,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn new(show_progress: bool) -> Self {
        if show_progress {
            Self::new_interactive()
        } else {
            Self::new_minimal()
        }
    }

    /// Begin a stage, finishing the previous one silently
    pub fn start_stage(&mut self, message: &str) {
        log::debug!("{}", message);
        if let Some(pb) = self.stage_pb.take() {
            pb.finish_and_clear();
        }
        if self.show_progress {
            self.stage_pb = Some(create_spinner(message));
        }
    }

    /// Finish the current stage with a message
    pub fn finish_stage(&mut self, message: &str) {
        if let Some(pb) = self.stage_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Time since the reporter was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.stage_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
