//! Ingestion pipeline.
//!
//! Turns uploads into page entries. For each accepted file:
//!
//! ```text
//! Received -> BufferCopied -> PageCountKnown -> (Rendering -> Appended)* -> Complete
//!                  \                 \                   \
//!                   `-----------------`-------------------`--> Failed
//! ```
//!
//! Pages of one file are rendered and appended strictly in page order, each
//! one awaited before the next starts. Files of one batch progress
//! concurrently, so their pages interleave in whatever order the work
//! completes. A page that fails to render is reported and skipped; a file
//! that fails to load is reported and dropped without adding any page.

mod upload;

pub use upload::{PDF_MEDIA_TYPE, Upload};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{PdfCollateError, Result};
use crate::render::{DEFAULT_THUMBNAIL_SCALE, RenderBackend, RenderDocument, Thumbnail};
use crate::session::{Command, FileId, FileRecord, PageEntry, Session, SessionEvent};
use crate::utils::run_blocking;

/// Where a file is in the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestState {
    /// Upload accepted for processing.
    Received,
    /// Buffer registered in the store.
    BufferCopied,
    /// The renderer opened the file and reported its page count.
    PageCountKnown,
    /// A page is being rendered.
    Rendering,
    /// A page entry was appended.
    Appended,
    /// Every page was attempted.
    Complete,
    /// The file was abandoned.
    Failed,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::BufferCopied => "buffer_copied",
            Self::PageCountKnown => "page_count_known",
            Self::Rendering => "rendering",
            Self::Appended => "appended",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of one ingested file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Id the file was registered under.
    pub file_id: FileId,
    /// Name the file was uploaded with.
    pub file_name: String,
    /// Pages the renderer reported.
    pub page_count: u32,
    /// Pages that made it into the collection.
    pub pages_appended: u32,
    /// Page numbers that failed to render.
    pub pages_failed: Vec<u32>,
    /// Time spent on the file.
    #[serde(serialize_with = "crate::utils::serialize_millis")]
    pub elapsed: Duration,
}

/// How an upload ended.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Not a PDF; dropped without notification.
    Ignored {
        /// Upload name.
        name: String,
        /// Declared media type.
        media_type: String,
    },
    /// Every page was attempted.
    Completed(IngestReport),
    /// The file could not be loaded and contributed no pages.
    Failed {
        /// Upload name.
        name: String,
        /// Why loading failed.
        error: PdfCollateError,
    },
}

impl IngestOutcome {
    /// The report, for completed files.
    pub fn report(&self) -> Option<&IngestReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }

    /// Pages this upload added to the collection.
    pub fn pages_appended(&self) -> u32 {
        self.report().map_or(0, |report| report.pages_appended)
    }
}

/// Feeds uploads into a session.
#[derive(Clone)]
pub struct Ingestor {
    session: Session,
    renderer: Arc<dyn RenderBackend>,
    thumbnail_scale: f32,
}

impl Ingestor {
    /// Ingest into `session`, rendering with `renderer`.
    pub fn new(session: Session, renderer: Arc<dyn RenderBackend>) -> Self {
        Self {
            session,
            renderer,
            thumbnail_scale: DEFAULT_THUMBNAIL_SCALE,
        }
    }

    /// Use a different thumbnail scale.
    pub fn with_thumbnail_scale(mut self, scale: f32) -> Self {
        self.thumbnail_scale = scale;
        self
    }

    /// Thumbnail scale in use.
    pub fn thumbnail_scale(&self) -> f32 {
        self.thumbnail_scale
    }

    /// Ingest every upload of one drop or pick.
    ///
    /// Outcomes are returned in upload order; the pages themselves land in
    /// the collection in completion order.
    pub async fn ingest_batch(&self, uploads: Vec<Upload>) -> Vec<IngestOutcome> {
        let started = Instant::now();
        let count = uploads.len();

        let outcomes =
            futures::future::join_all(uploads.into_iter().map(|upload| self.ingest(upload)))
                .await;

        info!(
            files = count,
            pages = outcomes.iter().map(IngestOutcome::pages_appended).sum::<u32>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch ingested"
        );
        outcomes
    }

    /// Ingest one upload.
    pub async fn ingest(&self, upload: Upload) -> IngestOutcome {
        let started = Instant::now();
        transition(&upload.name, IngestState::Received);

        if !upload.is_pdf() {
            debug!(
                file = %upload.name,
                media_type = %upload.media_type,
                "ignoring upload that is not a PDF"
            );
            return IngestOutcome::Ignored {
                name: upload.name,
                media_type: upload.media_type,
            };
        }

        let store = self.session.store();
        let record = store.register_file(upload.name.as_str(), &upload.bytes).await;
        drop(upload);
        transition(record.original_name(), IngestState::BufferCopied);

        let document = match self.open(&record).await {
            Ok(document) => document,
            Err(error) => return self.abandon(&record, error).await,
        };

        let page_count = document.page_count();
        if let Err(error) = store.set_page_count(record.id(), page_count).await {
            return self.abandon(&record, error).await;
        }
        transition(record.original_name(), IngestState::PageCountKnown);

        let mut report = IngestReport {
            file_id: record.id(),
            file_name: record.original_name().to_string(),
            page_count,
            pages_appended: 0,
            pages_failed: Vec::new(),
            elapsed: Duration::ZERO,
        };

        for page_number in 1..=page_count {
            transition(record.original_name(), IngestState::Rendering);

            match self.append_page(&record, document.clone(), page_number).await {
                Ok(()) => {
                    report.pages_appended += 1;
                    transition(record.original_name(), IngestState::Appended);
                }
                Err(error) => {
                    warn!(
                        file = %record.original_name(),
                        page = page_number,
                        error = %error,
                        "skipping page"
                    );
                    self.session.notify(SessionEvent::PageRenderFailed {
                        file: record.original_name().to_string(),
                        page_number,
                        message: error.to_string(),
                    });
                    report.pages_failed.push(page_number);
                }
            }
        }

        if let Err(error) = store.mark_settled(record.id()).await {
            warn!(file_id = %record.id(), error = %error, "file vanished during ingestion");
        }
        report.elapsed = started.elapsed();
        transition(record.original_name(), IngestState::Complete);

        IngestOutcome::Completed(report)
    }

    async fn open(&self, record: &FileRecord) -> Result<Arc<dyn RenderDocument>> {
        let renderer = self.renderer.clone();
        debug!(
            file = %record.original_name(),
            backend = renderer.name(),
            "opening document"
        );

        self.session
            .store()
            .get_or_load_render_document(record.id(), move |bytes| renderer.open(bytes))
            .await
            .map_err(|e| PdfCollateError::file_load(record.original_name(), e.to_string()))
    }

    async fn append_page(
        &self,
        record: &FileRecord,
        document: Arc<dyn RenderDocument>,
        page_number: u32,
    ) -> Result<()> {
        let thumbnail = self
            .render_thumbnail(document, page_number)
            .await
            .map_err(|e| {
                PdfCollateError::page_render(record.original_name(), page_number, e.to_string())
            })?;

        let entry = PageEntry::new(
            self.session.ids().next_page_id(),
            record.id(),
            record.display_name(),
            page_number,
            thumbnail,
        );
        let page_id = entry.id;
        self.session.apply(Command::Append(entry)).await?;

        self.session.notify(SessionEvent::PageAppended {
            page_id,
            file_id: record.id(),
            page_number,
        });
        Ok(())
    }

    async fn render_thumbnail(
        &self,
        document: Arc<dyn RenderDocument>,
        page_number: u32,
    ) -> Result<Thumbnail> {
        let scale = self.thumbnail_scale;
        run_blocking(move || {
            let viewport = document.viewport(page_number, scale)?;
            document.render(page_number, &viewport)
        })
        .await
    }

    /// Record an input whose bytes could not be read at all.
    ///
    /// Reported like any other load failure; nothing reaches the store.
    pub fn unreadable(&self, name: impl Into<String>, error: PdfCollateError) -> IngestOutcome {
        self.fail(name.into(), error)
    }

    async fn abandon(&self, record: &FileRecord, error: PdfCollateError) -> IngestOutcome {
        self.session.store().release(record.id()).await;
        self.fail(record.original_name().to_string(), error)
    }

    fn fail(&self, name: String, error: PdfCollateError) -> IngestOutcome {
        warn!(file = %name, error = %error, "abandoning file");
        self.session.notify(SessionEvent::FileLoadFailed {
            file: name.clone(),
            message: error.to_string(),
        });
        transition(&name, IngestState::Failed);

        IngestOutcome::Failed { name, error }
    }
}

impl fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestor")
            .field("renderer", &self.renderer.name())
            .field("thumbnail_scale", &self.thumbnail_scale)
            .finish()
    }
}

fn transition(file: &str, state: IngestState) {
    debug!(file = %file, state = %state, "ingest state");
}
