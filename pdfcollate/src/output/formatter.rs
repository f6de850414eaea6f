//! Console message formatting.

use std::io::{self, IsTerminal, Write};

use crate::config::Config;

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    /// Extra detail, shown only in verbose mode.
    Detail,
    /// Normal progress information.
    Info,
    /// A step finished.
    Success,
    /// Something went wrong but the run continues.
    Warning,
    /// The run failed.
    Error,
}

impl MessageLevel {
    fn prefix(self) -> &'static str {
        match self {
            Self::Detail | Self::Info => "",
            Self::Success => "✓ ",
            Self::Warning => "! ",
            Self::Error => "✗ ",
        }
    }

    fn color(self) -> Option<&'static str> {
        match self {
            Self::Detail | Self::Info => None,
            Self::Success => Some("\x1b[32m"),
            Self::Warning => Some("\x1b[33m"),
            Self::Error => Some("\x1b[31m"),
        }
    }
}

/// Writes user-facing messages honouring quiet and verbose modes.
///
/// Informational output goes to stdout, warnings and errors to stderr.
/// JSON mode silences stdout so it only carries the summary document.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    quiet: bool,
    verbose: bool,
    color: bool,
}

impl OutputFormatter {
    /// Create a formatter.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose,
            color: io::stdout().is_terminal(),
        }
    }

    /// Create a formatter from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(!config.should_print(), config.verbose)
    }

    /// A formatter that prints nothing but warnings and errors.
    pub fn quiet() -> Self {
        Self::new(true, false)
    }

    /// Whether informational output is printed.
    pub fn should_print(&self) -> bool {
        !self.quiet
    }

    /// Whether quiet mode is on.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Whether verbose mode is on.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Format a message without printing it.
    pub fn format(&self, level: MessageLevel, message: &str) -> String {
        let text = format!("{}{message}", level.prefix());
        match level.color().filter(|_| self.color) {
            Some(code) => format!("{code}{text}\x1b[0m"),
            None => text,
        }
    }

    /// Print a message at `level`.
    pub fn print(&self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Warning | MessageLevel::Error => {
                eprintln!("{}", self.format(level, message));
            }
            MessageLevel::Detail if !self.verbose || self.quiet => {}
            _ if self.quiet => {}
            _ => println!("{}", self.format(level, message)),
        }
    }

    /// Print an informational message.
    pub fn info(&self, message: &str) {
        self.print(MessageLevel::Info, message);
    }

    /// Print a success message.
    pub fn success(&self, message: &str) {
        self.print(MessageLevel::Success, message);
    }

    /// Print a warning. Shown even in quiet mode.
    pub fn warning(&self, message: &str) {
        self.print(MessageLevel::Warning, message);
    }

    /// Print an error. Shown even in quiet mode.
    pub fn error(&self, message: &str) {
        self.print(MessageLevel::Error, message);
    }

    /// Print a section heading.
    pub fn section(&self, title: &str) {
        if self.should_print() {
            println!("{title}");
            println!("{}", "-".repeat(title.chars().count()));
        }
    }

    /// Print an aligned `label: value` line in verbose mode.
    pub fn detail(&self, label: &str, value: &str) {
        self.print(MessageLevel::Detail, &format!("  {label:<16} {value}"));
    }

    /// Print an empty line.
    pub fn blank_line(&self) {
        if self.should_print() {
            println!();
            io::stdout().flush().ok();
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
