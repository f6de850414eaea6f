//! File Buffer Store.
//!
//! Holds one immutable byte buffer per uploaded file and the documents
//! parsed from it. Buffers never change after registration; the only
//! mutable state is the pair of lazily filled document caches per file,
//! each initialised at most once.

use lopdf::Document;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use super::ids::{FileId, IdGenerator};
use crate::error::{PdfCollateError, Result};
use crate::render::RenderDocument;
use crate::utils::run_blocking;

/// Which collaborator a cached document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Parsed by the rendering backend.
    Render,
    /// Parsed by lopdf for page assembly.
    Merge,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render => f.write_str("render"),
            Self::Merge => f.write_str("merge"),
        }
    }
}

/// One uploaded file and its derived documents.
pub struct FileRecord {
    id: FileId,
    original_name: String,
    display_name: String,
    bytes: Arc<[u8]>,
    page_count: AtomicU32,
    settled: AtomicBool,
    render_doc: OnceCell<Arc<dyn RenderDocument>>,
    merge_doc: OnceCell<Arc<Document>>,
}

impl FileRecord {
    /// Session-unique id.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Name the file was uploaded with.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Short generated label, e.g. `File 2`.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Page count, 0 until ingestion has discovered it.
    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::Acquire)
    }

    /// Whether ingestion of this file has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Size of the stored buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the stored buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// A fresh, owned copy of the buffer.
    pub fn independent_copy(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl fmt::Debug for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRecord")
            .field("id", &self.id)
            .field("original_name", &self.original_name)
            .field("display_name", &self.display_name)
            .field("bytes_len", &self.bytes.len())
            .field("page_count", &self.page_count())
            .field("render_loaded", &self.render_doc.initialized())
            .field("merge_loaded", &self.merge_doc.initialized())
            .finish()
    }
}

/// Aggregate numbers about the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatistics {
    /// Files currently held.
    pub files: usize,
    /// Bytes of buffers currently held.
    pub retained_bytes: u64,
    /// Documents parsed for rendering so far.
    pub render_parses: usize,
    /// Documents parsed for merging so far.
    pub merge_parses: usize,
}

/// Buffers and memoized documents, keyed by file id.
pub struct FileBufferStore {
    ids: Arc<IdGenerator>,
    files: RwLock<HashMap<FileId, Arc<FileRecord>>>,
    render_parses: AtomicUsize,
    merge_parses: AtomicUsize,
}

impl FileBufferStore {
    /// Create an empty store drawing file ids from `ids`.
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            files: RwLock::new(HashMap::new()),
            render_parses: AtomicUsize::new(0),
            merge_parses: AtomicUsize::new(0),
        }
    }

    /// Store a copy of `bytes` under a fresh file id.
    pub async fn register_file(&self, name: impl Into<String>, bytes: &[u8]) -> Arc<FileRecord> {
        let id = self.ids.next_file_id();
        let record = Arc::new(FileRecord {
            id,
            original_name: name.into(),
            display_name: format!("File {id}"),
            bytes: Arc::from(bytes),
            page_count: AtomicU32::new(0),
            settled: AtomicBool::new(false),
            render_doc: OnceCell::new(),
            merge_doc: OnceCell::new(),
        });

        debug!(
            file_id = %id,
            name = %record.original_name,
            bytes = record.len(),
            "registered file"
        );

        self.files.write().await.insert(id, record.clone());
        record
    }

    /// Look up a file.
    pub async fn file(&self, file_id: FileId) -> Result<Arc<FileRecord>> {
        self.files
            .read()
            .await
            .get(&file_id)
            .cloned()
            .ok_or(PdfCollateError::FileNotFound(file_id))
    }

    /// Ids of all stored files, ascending.
    pub async fn file_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<_> = self.files.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// A fresh copy of a file's buffer.
    pub async fn independent_copy(&self, file_id: FileId) -> Result<Vec<u8>> {
        Ok(self.file(file_id).await?.independent_copy())
    }

    /// Record the page count discovered during ingestion.
    pub async fn set_page_count(&self, file_id: FileId, page_count: u32) -> Result<()> {
        self.file(file_id)
            .await?
            .page_count
            .store(page_count, Ordering::Release);
        Ok(())
    }

    /// Mark a file's ingestion as finished.
    pub async fn mark_settled(&self, file_id: FileId) -> Result<()> {
        self.file(file_id)
            .await?
            .settled
            .store(true, Ordering::Release);
        Ok(())
    }

    /// The render document for a file, parsing it on first use.
    ///
    /// `loader` receives an independent copy of the buffer and runs on the
    /// blocking pool. It runs at most once per file unless it fails, in
    /// which case a later call tries again.
    pub async fn get_or_load_render_document<F>(
        &self,
        file_id: FileId,
        loader: F,
    ) -> Result<Arc<dyn RenderDocument>>
    where
        F: FnOnce(Vec<u8>) -> Result<Arc<dyn RenderDocument>> + Send + 'static,
    {
        let record = self.file(file_id).await?;
        load_once(
            &record,
            &record.render_doc,
            DocumentKind::Render,
            &self.render_parses,
            loader,
        )
        .await
    }

    /// The merge document for a file, parsing it on first use.
    ///
    /// Same at-most-once contract as [`Self::get_or_load_render_document`].
    pub async fn get_or_load_merge_document<F>(
        &self,
        file_id: FileId,
        loader: F,
    ) -> Result<Arc<Document>>
    where
        F: FnOnce(Vec<u8>) -> Result<Document> + Send + 'static,
    {
        let record = self.file(file_id).await?;
        load_once(
            &record,
            &record.merge_doc,
            DocumentKind::Merge,
            &self.merge_parses,
            move |bytes| loader(bytes).map(Arc::new),
        )
        .await
    }

    /// Drop a file's buffer and cached documents.
    ///
    /// Pages still referencing the file can no longer be merged or previewed.
    pub async fn release(&self, file_id: FileId) -> Option<Arc<FileRecord>> {
        let removed = self.files.write().await.remove(&file_id);
        if let Some(record) = &removed {
            debug!(file_id = %file_id, bytes = record.len(), "released file");
        }
        removed
    }

    /// Current store statistics.
    pub async fn statistics(&self) -> StoreStatistics {
        let files = self.files.read().await;
        StoreStatistics {
            files: files.len(),
            retained_bytes: files.values().map(|f| f.len() as u64).sum(),
            render_parses: self.render_parses.load(Ordering::Relaxed),
            merge_parses: self.merge_parses.load(Ordering::Relaxed),
        }
    }
}

async fn load_once<T, F>(
    record: &FileRecord,
    cell: &OnceCell<T>,
    kind: DocumentKind,
    parses: &AtomicUsize,
    loader: F,
) -> Result<T>
where
    T: Clone + Send + 'static,
    F: FnOnce(Vec<u8>) -> Result<T> + Send + 'static,
{
    let value = cell
        .get_or_try_init(|| async {
            let bytes = record.independent_copy();
            debug!(file_id = %record.id, %kind, "parsing document");
            let value = run_blocking(move || loader(bytes)).await?;
            parses.fetch_add(1, Ordering::Relaxed);
            Ok::<_, PdfCollateError>(value)
        })
        .await?;
    Ok(value.clone())
}

impl fmt::Debug for FileBufferStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBufferStore")
            .field("render_parses", &self.render_parses.load(Ordering::Relaxed))
            .field("merge_parses", &self.merge_parses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
