//! The merge pipeline.
//!
//! A merge takes a snapshot of the page order, resolves the memoized merge
//! document of every file in it, copies the pages into a fresh document,
//! applies each entry's rotation and publishes the result as an artifact.
//! The collection itself is never modified.

use lopdf::Document;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::artifact::Artifact;
use crate::config::{CompressionLevel, Config, Metadata};
use crate::error::{PdfCollateError, Result};
use crate::merge::assembler::PageAssembler;
use crate::session::{FileId, MergeGuard, PageEntry, Rotation, Session, SessionEvent};
use crate::utils::{format_file_size, run_blocking};

/// Fewest pages a merge accepts.
pub const MIN_MERGE_PAGES: usize = 2;

/// Settings applied to every merge output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Compression of the output.
    pub compression: CompressionLevel,
    /// Info dictionary fields.
    pub metadata: Metadata,
}

impl MergeOptions {
    /// Take compression and metadata from the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            compression: config.compression,
            metadata: config.metadata.clone(),
        }
    }
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    /// Pages in the output.
    pub pages_merged: usize,

    /// Distinct source files the pages came from.
    pub files_referenced: usize,

    /// Merge documents parsed by this merge. Files parsed by an earlier
    /// merge are reused and not counted.
    pub documents_parsed: usize,

    /// Time from snapshot to published artifact.
    #[serde(serialize_with = "crate::utils::serialize_millis")]
    pub merge_time: Duration,

    /// Size of the output in bytes.
    pub output_size: u64,
}

impl MergeStatistics {
    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// Result of a merge operation.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The published output.
    pub artifact: Artifact,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,
}

/// A merge that holds the trigger and has taken its snapshot.
///
/// Dropping it without running releases the trigger.
#[derive(Debug)]
pub struct PreparedMerge {
    _guard: MergeGuard,
    snapshot: Vec<PageEntry>,
    started: Instant,
}

impl PreparedMerge {
    /// The page order this merge will produce.
    pub fn snapshot(&self) -> &[PageEntry] {
        &self.snapshot
    }
}

/// One page of the merge plan, with its source document resolved.
struct PlannedPage {
    file_id: FileId,
    document: Arc<Document>,
    page_number: u32,
    rotation: Rotation,
}

/// Merges the pages of a session's collection.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    options: MergeOptions,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a merger with the given options.
    pub fn with_options(options: MergeOptions) -> Self {
        Self { options }
    }

    /// The merger's options.
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge the session's current page order into a new artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Fewer than two pages are in the collection
    /// - Another merge is running
    /// - A source file cannot be loaded or a page cannot be copied
    ///
    /// Every error is also reported as a [`SessionEvent`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfcollate::merge::Merger;
    /// # use pdfcollate::session::Session;
    /// # async fn example(session: Session) -> pdfcollate::Result<()> {
    /// let result = Merger::new().merge(&session).await?;
    /// println!(
    ///     "Merged {} pages into {}",
    ///     result.statistics.pages_merged,
    ///     result.artifact.url()
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(&self, session: &Session) -> Result<MergeResult> {
        let prepared = self.prepare(session).await?;
        self.run(session, prepared).await
    }

    /// Claim the trigger and take the snapshot.
    ///
    /// Rejections are reported as [`SessionEvent::MergeRejected`].
    pub async fn prepare(&self, session: &Session) -> Result<PreparedMerge> {
        let guard = match session.trigger().acquire() {
            Ok(guard) => guard,
            Err(e) => return Err(reject(session, e)),
        };

        let snapshot = session.snapshot().await;
        if snapshot.len() < MIN_MERGE_PAGES {
            let error = PdfCollateError::InsufficientPages {
                found: snapshot.len(),
            };
            return Err(reject(session, error));
        }

        session.notify(SessionEvent::MergeStarted {
            pages: snapshot.len(),
        });
        debug!(pages = snapshot.len(), "merge snapshot taken");

        Ok(PreparedMerge {
            _guard: guard,
            snapshot,
            started: Instant::now(),
        })
    }

    /// Assemble and publish a prepared merge.
    ///
    /// Failures are reported as [`SessionEvent::MergeFailed`]; the trigger is
    /// released on every path.
    pub async fn run(&self, session: &Session, prepared: PreparedMerge) -> Result<MergeResult> {
        match self.assemble(session, &prepared).await {
            Ok(result) => {
                session.notify(SessionEvent::MergeFinished {
                    url: result.artifact.url().to_string(),
                    pages: result.statistics.pages_merged,
                    elapsed: result.statistics.merge_time,
                });
                info!(
                    pages = result.statistics.pages_merged,
                    files = result.statistics.files_referenced,
                    parsed = result.statistics.documents_parsed,
                    size = %result.statistics.format_output_size(),
                    elapsed_ms = result.statistics.merge_time.as_millis() as u64,
                    "merge finished"
                );
                Ok(result)
            }
            Err(e) => {
                let error = match e {
                    PdfCollateError::Merge { .. } => e,
                    other => PdfCollateError::merge_failed(other.to_string()),
                };
                warn!(error = %error, "merge failed");
                session.notify(SessionEvent::MergeFailed {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn assemble(&self, session: &Session, prepared: &PreparedMerge) -> Result<MergeResult> {
        let store = session.store();
        let parses_before = store.statistics().await.merge_parses;

        let mut plan = Vec::with_capacity(prepared.snapshot.len());
        for entry in &prepared.snapshot {
            let document = store
                .get_or_load_merge_document(entry.file_id, |bytes| Ok(Document::load_mem(&bytes)?))
                .await
                .map_err(|e| {
                    PdfCollateError::merge_failed(format!("{}: {e}", entry.label))
                })?;
            plan.push(PlannedPage {
                file_id: entry.file_id,
                document,
                page_number: entry.page_number,
                rotation: entry.rotation,
            });
        }

        let files_referenced = plan
            .iter()
            .map(|page| page.file_id)
            .collect::<HashSet<_>>()
            .len();
        let documents_parsed = store.statistics().await.merge_parses - parses_before;

        let options = self.options.clone();
        let (bytes, pages_merged) = run_blocking(move || {
            let mut assembler = PageAssembler::create();
            for page in &plan {
                let page_id = assembler.copy_page(page.file_id, &page.document, page.page_number)?;
                if !page.rotation.is_none() {
                    assembler.set_rotation(page_id, page.rotation)?;
                }
                assembler.add_page(page_id);
            }
            let pages = assembler.page_count();
            let bytes = assembler.save(&options.metadata, options.compression)?;
            Ok((bytes, pages))
        })
        .await?;

        let output_size = bytes.len() as u64;
        let artifact = session.artifacts().publish(bytes, pages_merged).await;

        Ok(MergeResult {
            artifact,
            statistics: MergeStatistics {
                pages_merged,
                files_referenced,
                documents_parsed,
                merge_time: prepared.started.elapsed(),
                output_size,
            },
        })
    }
}

fn reject(session: &Session, error: PdfCollateError) -> PdfCollateError {
    debug!(error = %error, "merge rejected");
    session.notify(SessionEvent::MergeRejected {
        message: error.to_string(),
    });
    error
}
