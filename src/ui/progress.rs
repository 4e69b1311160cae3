use indicatif::{HumanDuration, ProgressBar};
use std::time::{Duration, Instant};

/// Spinner shown while a long step runs; hidden when stdout is not a terminal
pub struct Spinner {
    pb: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() && !crate::output::is_quiet() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Self {
            pb,
            started: Instant::now(),
        }
    }

    /// Clear the spinner and return how long it ran
    pub fn finish(&self) -> String {
        self.pb.finish_and_clear();
        HumanDuration(self.started.elapsed()).to_string()
    }
}
