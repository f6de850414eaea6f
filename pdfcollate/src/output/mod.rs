//! Output formatting and display for pdfcollate.
//!
//! This module handles all user-facing console output including:
//! - Formatted status messages
//! - Progress of page ingestion
//! - Ingestion and merge summaries
//! - Quiet and verbose modes
//!
//! # Examples
//!
//! ```no_run
//! use pdfcollate::output::OutputFormatter;
//! use pdfcollate::config::Config;
//!
//! # fn example(config: Config) {
//! let formatter = OutputFormatter::from_config(&config);
//! formatter.info("Rendering thumbnails");
//! formatter.success("Merge completed successfully");
//! # }
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::{ProgressBar, ProgressStyle};

use serde::Serialize;

use crate::config::Config;
use crate::ingest::IngestOutcome;
use crate::merge::MergeStatistics;

/// Create an output formatter from configuration.
pub fn create_formatter(config: &Config) -> OutputFormatter {
    OutputFormatter::from_config(config)
}

/// Totals over one ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Files whose pages were attempted.
    pub files_loaded: usize,
    /// Files that could not be loaded.
    pub files_failed: usize,
    /// Uploads skipped because they are not PDFs.
    pub files_ignored: usize,
    /// Pages added to the collection.
    pub pages_appended: u32,
    /// Pages that failed to render.
    pub pages_failed: usize,
}

impl IngestSummary {
    /// Add up a batch of outcomes.
    pub fn from_outcomes(outcomes: &[IngestOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome {
                    IngestOutcome::Ignored { .. } => summary.files_ignored += 1,
                    IngestOutcome::Failed { .. } => summary.files_failed += 1,
                    IngestOutcome::Completed(report) => {
                        summary.files_loaded += 1;
                        summary.pages_appended += report.pages_appended;
                        summary.pages_failed += report.pages_failed.len();
                    }
                }
                summary
            })
    }
}

/// Display the outcome of an ingestion batch.
pub fn display_ingest_summary(formatter: &OutputFormatter, outcomes: &[IngestOutcome]) {
    for outcome in outcomes {
        match outcome {
            IngestOutcome::Ignored { name, media_type } => {
                formatter.detail("Skipped", &format!("{name} ({media_type})"));
            }
            IngestOutcome::Failed { name, error } => {
                formatter.warning(&format!("{name}: {error}"));
            }
            IngestOutcome::Completed(report) => {
                formatter.detail(
                    &report.file_name,
                    &format!(
                        "{}/{} pages in {:.2}s",
                        report.pages_appended,
                        report.page_count,
                        report.elapsed.as_secs_f64()
                    ),
                );
            }
        }
    }

    let summary = IngestSummary::from_outcomes(outcomes);
    if summary.pages_failed > 0 {
        formatter.warning(&format!(
            "Warning: {} page(s) could not be rendered and were skipped",
            summary.pages_failed
        ));
    }

    formatter.info(&format!(
        "Loaded {} file(s): {} pages",
        summary.files_loaded, summary.pages_appended
    ));
}

/// Display merge statistics to the user.
pub fn display_merge_summary(formatter: &OutputFormatter, stats: &MergeStatistics) {
    formatter.success(&format!(
        "Merged {} page(s) from {} file(s) in {:.2}s: {}",
        stats.pages_merged,
        stats.files_referenced,
        stats.merge_time.as_secs_f64(),
        stats.format_output_size()
    ));
    formatter.detail("Documents parsed", &stats.documents_parsed.to_string());
}
