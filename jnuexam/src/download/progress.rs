//! Progress tracking for a single transfer.

use std::fmt;

/// A progress report for a running transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction complete in `0.0..=1.0`, known because the server declared a
    /// non-zero content length.
    Ratio { received: u64, total: u64, ratio: f64 },
    /// No usable content length; only the byte count is known.
    Indeterminate { received: u64 },
}

impl Progress {
    /// Bytes received so far.
    pub fn received(&self) -> u64 {
        match *self {
            Progress::Ratio { received, .. } | Progress::Indeterminate { received } => received,
        }
    }

    /// Fraction complete, if known.
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Progress::Ratio { ratio, .. } => Some(ratio),
            Progress::Indeterminate { .. } => None,
        }
    }

    /// Whole-number percentage, if known.
    pub fn percent(&self) -> Option<u8> {
        self.ratio().map(|r| (r * 100.0).floor() as u8)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Progress::Ratio {
                received, total, ..
            } => write!(f, "{}/{} bytes ({}%)", received, total, self.percent().unwrap_or(0)),
            Progress::Indeterminate { received } => write!(f, "{} bytes", received),
        }
    }
}

/// Accumulates received bytes and produces non-decreasing [`Progress`]
/// values.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    received: u64,
    total: Option<u64>,
    last_ratio: f64,
}

impl ProgressTracker {
    /// Start tracking a body with the given declared length.
    ///
    /// A declared length of zero is treated as unknown.
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            received: 0,
            total: content_length.filter(|&t| t > 0),
            last_ratio: 0.0,
        }
    }

    /// Record `bytes` more bytes and return the updated progress.
    pub fn advance(&mut self, bytes: usize) -> Progress {
        self.received = self.received.saturating_add(bytes as u64);
        self.current()
    }

    /// Progress as of the last recorded chunk.
    pub fn current(&mut self) -> Progress {
        match self.total {
            Some(total) => {
                // Servers occasionally send more than they declared.
                let ratio = (self.received as f64 / total as f64).min(1.0);
                self.last_ratio = self.last_ratio.max(ratio);
                Progress::Ratio {
                    received: self.received,
                    total,
                    ratio: self.last_ratio,
                }
            }
            None => Progress::Indeterminate {
                received: self.received,
            },
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }
}
