// src/progress.rs

//! Progress reporting for batch execution
//!
//! The `ProgressTracker` trait decouples the scheduler from output mode:
//! CLI progress bars, tracing logs, or silence for embedded use.
//! Implementations are thread-safe so concurrent workers can report.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Thread-safe progress sink
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Set the total number of units
    fn set_length(&self, length: u64);

    /// Advance by the given number of units
    fn increment(&self, amount: u64);

    /// Finish successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish after a failure with a message
    fn finish_with_error(&self, message: &str);
}

/// No-op tracker for embedded and quiet use
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn set_length(&self, _length: u64) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn finish_with_message(&self, _message: &str) {}

    fn finish_with_error(&self, _message: &str) {}
}

/// Tracker that logs milestones through tracing
#[derive(Debug, Default)]
pub struct LogProgress {
    position: AtomicU64,
    length: AtomicU64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}", message);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn increment(&self, amount: u64) {
        let position = self.position.fetch_add(amount, Ordering::Relaxed) + amount;
        info!(
            "progress: {}/{}",
            position,
            self.length.load(Ordering::Relaxed)
        );
    }

    fn finish_with_message(&self, message: &str) {
        info!("{}", message);
    }

    fn finish_with_error(&self, message: &str) {
        info!("aborted: {}", message);
    }
}

/// Visual progress bar for interactive terminals
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{msg:24} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(message.to_string());
        Self { bar }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}
