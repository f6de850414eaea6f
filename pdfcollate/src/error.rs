//! Error types for pdfcollate.
//!
//! Every failure a session can run into is a [`PdfCollateError`]. The
//! pipelines catch collaborator failures at their own boundary (one page,
//! one file, one merge) and turn them into session events, so none of these
//! ever ends a session by itself.
//!
//! # Error Categories
//!
//! - **Ingestion**: unsupported uploads, unreadable files, pages that fail to render
//! - **Collection**: unknown ids, invalid rotations
//! - **Merge**: too few pages, a merge already running, assembly failures
//! - **Output**: writing artifacts and thumbnails to disk

use std::io;
use std::path::PathBuf;

use crate::session::{FileId, PageId};

/// Result type alias for pdfcollate operations.
pub type Result<T> = std::result::Result<T, PdfCollateError>;

/// Main error type for pdfcollate operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfCollateError {
    /// Upload was not declared as PDF content. Ignored silently by ingestion.
    #[error("Unsupported file type for {name}: {media_type}")]
    UnsupportedFileType {
        /// Name of the rejected upload.
        name: String,
        /// Declared media type.
        media_type: String,
    },

    /// A single page could not be rendered to a thumbnail.
    #[error("Error processing page {page} of file {file}\n  Reason: {reason}\n  See logs for details")]
    PageRender {
        /// Name of the file the page belongs to.
        file: String,
        /// 1-based page number.
        page: u32,
        /// Reason reported by the renderer.
        reason: String,
    },

    /// A file could not be read or parsed.
    #[error("Error loading file {file}\n  Reason: {reason}\n  See logs for details")]
    FileLoad {
        /// Name of the file.
        file: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Merge was requested with fewer than two pages.
    #[error("Please add at least two pages to merge ({found} in the collection)")]
    InsufficientPages {
        /// Number of pages present when the merge was requested.
        found: usize,
    },

    /// A merge is already running in this session.
    #[error("A merge is already in progress")]
    MergeInProgress,

    /// Merge operation failed.
    #[error("An error occurred while merging PDFs: {reason}")]
    Merge {
        /// Description of what went wrong.
        reason: String,
    },

    /// Referenced file id is not in the store.
    #[error("Unknown file id {0}")]
    FileNotFound(FileId),

    /// Referenced page id is not in the collection.
    #[error("Unknown page id {0}")]
    PageNotFound(PageId),

    /// Referenced artifact URL is unknown or was revoked.
    #[error("Unknown or revoked artifact: {url}")]
    ArtifactNotFound {
        /// The artifact URL.
        url: String,
    },

    /// Rotation is not a multiple of 90 degrees.
    #[error("Invalid rotation: {degrees}. Must be a multiple of 90")]
    InvalidRotation {
        /// Requested rotation in degrees.
        degrees: i32,
    },

    /// A page with the same id is already in the collection.
    #[error("Page {0} is already in the collection")]
    DuplicatePage(PageId),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// An edit script refers to a page that was never ingested.
    #[error("Invalid page reference '{reference}': {details}")]
    InvalidPageReference {
        /// The reference as written by the user.
        reference: String,
        /// Details about what's invalid.
        details: String,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  Use --force to overwrite or choose a different output path",
        path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to write to an output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to read input list file.
    #[error("Failed to read input list file: {}\n  Reason: {source}", path.display())]
    FailedToReadInputList {
        /// Path to the input list file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// User declined to overwrite the output.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for PdfCollateError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for PdfCollateError {
    /// Recovers a wrapped `PdfCollateError`; anything else is an invalid config.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => Self::invalid_config(format!("{err:#}")),
        }
    }
}

impl PdfCollateError {
    /// Create a PageRender error.
    pub fn page_render(file: impl Into<String>, page: u32, reason: impl Into<String>) -> Self {
        Self::PageRender {
            file: file.into(),
            page,
            reason: reason.into(),
        }
    }

    /// Create a FileLoad error.
    pub fn file_load(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FileLoad {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a Merge error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::Merge {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether the session keeps going after this error.
    ///
    /// Per-page and per-file failures only cost the page or file concerned;
    /// rejected merges leave the collection as it was.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFileType { .. }
                | Self::PageRender { .. }
                | Self::FileLoad { .. }
                | Self::InsufficientPages { .. }
                | Self::MergeInProgress
                | Self::Merge { .. }
                | Self::FileNotFound(_)
                | Self::PageNotFound(_)
        )
    }

    /// Whether this error should be shown to the user at all.
    ///
    /// Unsupported uploads are dropped without a notification.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::UnsupportedFileType { .. })
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedFileType { .. } => 1,
            Self::PageRender { .. } => 3,
            Self::FileLoad { .. } => 3,
            Self::InsufficientPages { .. } => 1,
            Self::MergeInProgress => 1,
            Self::Merge { .. } => 6,
            Self::FileNotFound(_) => 2,
            Self::PageNotFound(_) => 2,
            Self::ArtifactNotFound { .. } => 2,
            Self::InvalidRotation { .. } => 1,
            Self::DuplicatePage(_) => 1,
            Self::InvalidConfig { .. } => 1,
            Self::InvalidPageReference { .. } => 1,
            Self::OutputExists { .. } => 4,
            Self::FailedToWrite { .. } => 5,
            Self::FailedToReadInputList { .. } => 2,
            Self::Cancelled => 130,
            Self::Io(_) => 5,
            Self::Other { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_page_render_display_names_file_and_page() {
        let err = PdfCollateError::page_render("report.pdf", 3, "bad content stream");
        let msg = err.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("report.pdf"));
        assert!(msg.contains("See logs"));
    }

    #[test]
    fn test_file_load_display() {
        let err = PdfCollateError::file_load("broken.pdf", "invalid file header");
        let msg = err.to_string();
        assert!(msg.contains("broken.pdf"));
        assert!(msg.contains("invalid file header"));
    }

    #[test]
    fn test_insufficient_pages_display() {
        let msg = PdfCollateError::InsufficientPages { found: 1 }.to_string();
        assert!(msg.contains("at least two pages"));
    }

    #[test]
    fn test_output_exists_display() {
        let msg = PdfCollateError::output_exists(PathBuf::from("merged.pdf")).to_string();
        assert!(msg.contains("merged.pdf"));
        assert!(msg.contains("--force"));
    }

    #[test]
    fn test_unsupported_file_type_is_silent() {
        let err = PdfCollateError::UnsupportedFileType {
            name: "notes.txt".into(),
            media_type: "text/plain".into(),
        };
        assert!(!err.is_user_visible());
        assert!(err.is_recoverable());
        assert!(PdfCollateError::merge_failed("x").is_user_visible());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(PdfCollateError::page_render("a.pdf", 1, "x").is_recoverable());
        assert!(PdfCollateError::file_load("a.pdf", "x").is_recoverable());
        assert!(PdfCollateError::InsufficientPages { found: 0 }.is_recoverable());
        assert!(PdfCollateError::PageNotFound(PageId(4)).is_recoverable());
        assert!(!PdfCollateError::Cancelled.is_recoverable());
        assert!(!PdfCollateError::invalid_config("x").is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PdfCollateError::file_load("x", "y").exit_code(), 3);
        assert_eq!(PdfCollateError::merge_failed("x").exit_code(), 6);
        assert_eq!(
            PdfCollateError::output_exists(PathBuf::from("x")).exit_code(),
            4
        );
        assert_eq!(PdfCollateError::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_from_io_error_keeps_source() {
        let err: PdfCollateError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, PdfCollateError::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_anyhow_recovers_variant() {
        let err: PdfCollateError =
            anyhow::Error::new(PdfCollateError::InvalidRotation { degrees: 45 }).into();
        assert!(matches!(err, PdfCollateError::InvalidRotation { degrees: 45 }));

        let err: PdfCollateError = anyhow::anyhow!("Page list cannot be empty").into();
        assert_eq!(err.to_string(), "Invalid configuration: Page list cannot be empty");
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            PdfCollateError::FileNotFound(FileId(7)).to_string(),
            "Unknown file id 7"
        );
        assert_eq!(
            PdfCollateError::PageNotFound(PageId(12)).to_string(),
            "Unknown page id 12"
        );
    }
}
