//! Merging collected pages into one PDF.
//!
//! [`Merger`] drives a merge for a [`Session`](crate::session::Session):
//! snapshot, resolve source documents, copy pages, publish. The
//! [`PageAssembler`] does the document construction, and
//! [`metadata::MetadataManager`] fills in the Info dictionary.
//!
//! # Examples
//!
//! ```no_run
//! use pdfcollate::config::{CompressionLevel, Metadata};
//! use pdfcollate::merge::{MergeOptions, Merger};
//! # use pdfcollate::session::Session;
//!
//! # async fn example(session: Session) -> pdfcollate::Result<()> {
//! let merger = Merger::with_options(MergeOptions {
//!     compression: CompressionLevel::Maximum,
//!     metadata: Metadata::new(Some("Handouts".to_string()), None, None, None),
//! });
//!
//! let result = merger.merge(&session).await?;
//! println!("{} ({})", result.artifact.url(), result.statistics.format_output_size());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod merger;
pub mod metadata;

pub use assembler::PageAssembler;
pub use merger::{MIN_MERGE_PAGES, MergeOptions, MergeResult, MergeStatistics, Merger, PreparedMerge};
pub use metadata::MetadataManager;
