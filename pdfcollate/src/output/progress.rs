//! Progress indicator for page ingestion.
//!
//! Drawn on stderr so stdout stays clean for `--json` output.
//!
//! # Examples
//!
//! ```
//! use pdfcollate::output::progress::{ProgressBar, ProgressStyle};
//!
//! let mut progress = ProgressBar::new(12, ProgressStyle::Bar);
//! progress.set_message("Rendering pages");
//!
//! for _ in 0..12 {
//!     progress.increment();
//! }
//!
//! progress.finish();
//! ```

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

/// Style of progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// Classic progress bar: [=====>    ]
    Bar,
    /// Simple counter: 42/100
    Counter,
}

/// Progress bar for pages as they are rendered.
pub struct ProgressBar {
    total: usize,
    current: usize,
    style: ProgressStyle,
    message: Option<String>,
    start_time: Instant,
    last_update: Option<Instant>,
    update_interval: Duration,
    enabled: bool,
}

impl ProgressBar {
    /// Create a new progress bar.
    pub fn new(total: usize, style: ProgressStyle) -> Self {
        Self {
            total,
            current: 0,
            style,
            message: None,
            start_time: Instant::now(),
            last_update: None,
            update_interval: Duration::from_millis(100),
            enabled: io::stderr().is_terminal(),
        }
    }

    /// Bar style when the total is known, counter otherwise.
    pub fn auto(total: usize) -> Self {
        let style = if total > 0 {
            ProgressStyle::Bar
        } else {
            ProgressStyle::Counter
        };
        Self::new(total, style)
    }

    /// Create a disabled progress bar (no output).
    pub fn disabled() -> Self {
        let mut pb = Self::new(0, ProgressStyle::Counter);
        pb.enabled = false;
        pb
    }

    /// Set the message shown in front of the bar.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Change the total, e.g. once a file's page count is known.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        if self.style == ProgressStyle::Counter && total > 0 {
            self.style = ProgressStyle::Bar;
        }
    }

    /// Grow the total by `delta`.
    pub fn extend_total(&mut self, delta: usize) {
        self.set_total(self.total + delta);
    }

    /// Set the progress to `current`.
    pub fn update(&mut self, current: usize) {
        self.current = current;

        let due = self
            .last_update
            .is_none_or(|last| last.elapsed() >= self.update_interval);
        if !due && current < self.total {
            return;
        }

        self.last_update = Some(Instant::now());
        self.render();
    }

    /// Increment the progress bar by one.
    pub fn increment(&mut self) {
        self.update(self.current + 1);
    }

    /// Mark the progress bar as finished.
    pub fn finish(&mut self) {
        self.current = self.current.max(self.total);
        if self.enabled {
            self.render();
            eprintln!();
        }
    }

    /// Remove the bar from the terminal.
    pub fn clear(&self) {
        if self.enabled {
            eprint!("\r\x1b[K");
            io::stderr().flush().ok();
        }
    }

    /// Current progress.
    pub fn position(&self) -> usize {
        self.current
    }

    /// Get the current progress percentage.
    pub fn percent(&self) -> f64 {
        if self.total > 0 {
            (self.current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    fn render(&self) {
        if !self.enabled {
            return;
        }
        eprint!("\r\x1b[K{}", self.line());
        io::stderr().flush().ok();
    }

    fn line(&self) -> String {
        let counter = if self.total > 0 {
            format!("{}/{}", self.current, self.total)
        } else {
            self.current.to_string()
        };
        let elapsed = format_duration(self.start_time.elapsed());

        let mut parts = match self.style {
            ProgressStyle::Bar => {
                let width = 30;
                let filled = (width * self.current.min(self.total)) / self.total.max(1);
                let bar = format!(
                    "[{}{}]",
                    "=".repeat(filled.saturating_sub(1)) + if filled > 0 { ">" } else { "" },
                    " ".repeat(width - filled)
                );
                vec![bar, format!("{:.0}%", self.percent()), counter, elapsed]
            }
            ProgressStyle::Counter => vec![counter, elapsed],
        };

        if let Some(ref msg) = self.message {
            parts.insert(0, msg.clone());
        }
        parts.join(" ")
    }
}

/// Format a duration as a human-readable string.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
