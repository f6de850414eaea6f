//! The session context.
//!
//! A [`Session`] owns everything one user session needs: the id generator,
//! the [`FileBufferStore`], the [`PageCollection`], the [`MergeTrigger`] and
//! the [`ArtifactRegistry`]. It is created explicitly by the application
//! shell, shared by cloning (the state sits behind an `Arc`) and discarded
//! with its last clone.
//!
//! Collection edits arrive as [`Command`]s and are applied in arrival order.
//! The collection lock is never held across a collaborator call, so edits
//! stay responsive while ingestion and merges are in flight.
//!
//! # Examples
//!
//! ```no_run
//! use pdfcollate::session::{Command, Session};
//!
//! # async fn example() -> pdfcollate::Result<()> {
//! let (session, mut events) = Session::new();
//!
//! let ids = session.page_ids().await;
//! if let Some(&first) = ids.first() {
//!     session.apply(Command::Rotate { page_id: first, delta: 90 }).await?;
//! }
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod collection;
mod command;
mod event;
mod ids;
mod rotation;
mod store;
mod trigger;

pub use collection::{PageCollection, PageEntry};
pub use command::{Command, CommandOutcome};
pub use event::{EventReceiver, EventSender, SessionEvent};
pub use ids::{FileId, IdGenerator, PageId};
pub use rotation::Rotation;
pub use store::{DocumentKind, FileBufferStore, FileRecord, StoreStatistics};
pub use trigger::{BUSY_LABEL, MergeGuard, MergeTrigger, READY_LABEL};

use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::artifact::ArtifactRegistry;
use crate::error::{PdfCollateError, Result};
use crate::preview::PreviewBox;
use crate::render::{RenderBackend, Thumbnail};
use crate::utils::run_blocking;

/// One user session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    ids: Arc<IdGenerator>,
    store: FileBufferStore,
    pages: Mutex<PageCollection>,
    trigger: Arc<MergeTrigger>,
    artifacts: ArtifactRegistry,
    events: EventSender,
}

impl Session {
    /// Start a session. The receiver gets every [`SessionEvent`].
    pub fn new() -> (Self, EventReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let ids = Arc::new(IdGenerator::new());
        let session = Self {
            inner: Arc::new(SessionInner {
                store: FileBufferStore::new(ids.clone()),
                ids,
                pages: Mutex::new(PageCollection::new()),
                trigger: Arc::new(MergeTrigger::new()),
                artifacts: ArtifactRegistry::new(),
                events,
            }),
        };
        (session, receiver)
    }

    /// The session's id generator.
    pub fn ids(&self) -> &IdGenerator {
        &self.inner.ids
    }

    /// The session's file buffers.
    pub fn store(&self) -> &FileBufferStore {
        &self.inner.store
    }

    /// The merge trigger.
    pub fn trigger(&self) -> &Arc<MergeTrigger> {
        &self.inner.trigger
    }

    /// Published merge outputs.
    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.inner.artifacts
    }

    /// Send an event. Events for a shell that stopped listening are dropped.
    pub fn notify(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Apply a collection command.
    ///
    /// [`Command::StartMerge`] needs a merger and is handled by
    /// [`crate::Controller`] or [`crate::merge::Merger::merge`].
    pub async fn apply(&self, command: Command) -> Result<CommandOutcome> {
        debug!(command = command.name(), "applying command");
        let mut pages = self.inner.pages.lock().await;

        match command {
            Command::Append(entry) => {
                let id = entry.id;
                pages.append(entry)?;
                Ok(CommandOutcome::Appended(id))
            }
            Command::Remove(page_id) => Ok(CommandOutcome::Removed(
                pages.remove(page_id).is_some(),
            )),
            Command::Reorder(ids) => Ok(CommandOutcome::Reordered {
                dropped: pages.reorder(&ids),
            }),
            Command::Rotate { page_id, delta } => {
                Ok(CommandOutcome::Rotated(pages.rotate(page_id, delta)?))
            }
            Command::StartMerge => Err(PdfCollateError::other(
                "StartMerge must go through a merger",
            )),
        }
    }

    /// Reorder from the element ids a sortable widget reports.
    pub async fn reorder_from_element_ids<S: AsRef<str>>(&self, element_ids: &[S]) -> usize {
        self.inner
            .pages
            .lock()
            .await
            .reorder_from_element_ids(element_ids)
    }

    /// Run `f` against the collection while holding its lock.
    pub async fn with_pages<R>(&self, f: impl FnOnce(&PageCollection) -> R) -> R {
        f(&*self.inner.pages.lock().await)
    }

    /// Copy of the current order.
    pub async fn snapshot(&self) -> Vec<PageEntry> {
        self.inner.pages.lock().await.snapshot()
    }

    /// Page ids in current order.
    pub async fn page_ids(&self) -> Vec<PageId> {
        self.inner.pages.lock().await.ids()
    }

    /// Number of pages in the collection.
    pub async fn page_count(&self) -> usize {
        self.inner.pages.lock().await.len()
    }

    /// Copy of one entry.
    pub async fn page(&self, page_id: PageId) -> Option<PageEntry> {
        self.inner.pages.lock().await.get(page_id).cloned()
    }

    /// Release files no page refers to any more.
    ///
    /// Only files whose ingestion has finished are considered, and nothing
    /// is released while a merge runs. Returns the released ids.
    ///
    /// The sweep never claims the merge trigger. It holds the collection
    /// instead, so a merge starting meanwhile takes its snapshot afterwards.
    pub async fn release_unused_files(&self) -> Vec<FileId> {
        let pages = self.inner.pages.lock().await;
        if !self.inner.trigger.is_ready() {
            debug!("merge running, skipping file release");
            return Vec::new();
        }

        let mut released = Vec::new();
        for file_id in self.store().file_ids().await {
            let Ok(record) = self.store().file(file_id).await else {
                continue;
            };
            if !record.is_settled() {
                continue;
            }
            if !pages.references_file(file_id) && self.store().release(file_id).await.is_some() {
                released.push(file_id);
            }
        }

        if !released.is_empty() {
            info!(count = released.len(), "released unused files");
        }
        released
    }

    /// Render one page to fit `area`.
    pub async fn preview(
        &self,
        renderer: Arc<dyn RenderBackend>,
        page_id: PageId,
        area: PreviewBox,
    ) -> Result<Thumbnail> {
        let entry = self
            .page(page_id)
            .await
            .ok_or(PdfCollateError::PageNotFound(page_id))?;
        let record = self.store().file(entry.file_id).await?;
        let name = record.original_name().to_string();

        let document = self
            .store()
            .get_or_load_render_document(entry.file_id, move |bytes| renderer.open(bytes))
            .await
            .map_err(|e| PdfCollateError::file_load(&name, e.to_string()))?;

        let page_number = entry.page_number;
        run_blocking(move || {
            let natural = document.viewport(page_number, 1.0)?;
            let scale = area.fit_scale(natural.width, natural.height);
            let viewport = document.viewport(page_number, scale)?;
            document.render(page_number, &viewport)
        })
        .await
        .map_err(|e| PdfCollateError::page_render(name, page_number, e.to_string()))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.inner.store)
            .field("trigger", &self.inner.trigger)
            .finish_non_exhaustive()
    }
}
