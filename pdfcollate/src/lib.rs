//! pdfcollate - Collect pages from PDF files, rearrange them and merge the
//! selection into a single document.
//!
//! This library holds everything behind a page-collation tool:
//!
//! - Per-session file buffers with memoized parsed documents
//! - An ordered page collection with reorder, remove and rotate
//! - Thumbnail rendering behind a pluggable backend
//! - Merging the current page order into a new PDF
//! - Revocable artifact URLs for the merged output
//!
//! # Examples
//!
//! ## Ingest and merge
//!
//! ```no_run
//! use pdfcollate::ingest::{Ingestor, Upload};
//! use pdfcollate::merge::Merger;
//! use pdfcollate::render;
//! use pdfcollate::session::{Command, Session};
//! use std::path::Path;
//!
//! # async fn example() -> pdfcollate::Result<()> {
//! let (session, _events) = Session::new();
//! let ingestor = Ingestor::new(session.clone(), render::default_backend());
//!
//! let uploads = vec![
//!     Upload::from_path(Path::new("a.pdf")).await?,
//!     Upload::from_path(Path::new("b.pdf")).await?,
//! ];
//! ingestor.ingest_batch(uploads).await;
//!
//! // Move the last page to the front.
//! let mut order = session.page_ids().await;
//! order.rotate_right(1);
//! session.apply(Command::Reorder(order)).await?;
//!
//! let result = Merger::new().merge(&session).await?;
//! println!("Merged {} pages", result.statistics.pages_merged);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving a session from a UI
//!
//! ```no_run
//! use pdfcollate::merge::Merger;
//! use pdfcollate::session::{Command, Session, SessionEvent};
//! use pdfcollate::Controller;
//! use std::sync::Arc;
//!
//! # async fn example() -> pdfcollate::Result<()> {
//! let (session, mut events) = Session::new();
//! let controller = Controller::spawn(session.clone(), Arc::new(Merger::new()));
//!
//! controller.send(Command::StartMerge).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::MergeFinished { url, .. } = event {
//!         println!("Download: {url}");
//!         break;
//!     }
//! }
//! controller.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod config;
pub mod controller;
pub mod error;
pub mod ingest;
pub mod merge;
pub mod output;
pub mod preview;
pub mod render;
pub mod session;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use controller::{Controller, ControllerHandle};
pub use error::{PdfCollateError, Result};
pub use session::Session;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
