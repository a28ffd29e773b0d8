//! Terminal progress display for transfers.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use jnuexam::download::Progress;

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Which style the bar currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Waiting,
    Ratio,
    Indeterminate,
}

/// A progress bar that switches between a bounded bar and a byte counter
/// depending on whether the server declared a length.
pub struct TransferBar {
    bar: ProgressBar,
    mode: Mode,
}

impl TransferBar {
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            mode: Mode::Waiting,
        }
    }

    /// A bar that draws nothing (for `--quiet` and tests).
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            mode: Mode::Waiting,
        }
    }

    pub fn update(&mut self, progress: Progress) {
        match progress {
            Progress::Ratio { received, total, .. } => {
                if self.mode != Mode::Ratio {
                    self.bar.set_style(bar_style());
                    self.mode = Mode::Ratio;
                }
                self.bar.set_length(total);
                self.bar.set_position(received.min(total));
            }
            Progress::Indeterminate { received } => {
                if self.mode != Mode::Indeterminate {
                    self.bar.set_style(spinner_style());
                    self.mode = Mode::Indeterminate;
                }
                self.bar.set_position(received);
            }
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
