//! Merged outputs and their revocable URLs.
//!
//! A finished merge is published as an [`Artifact`]: the serialised PDF plus
//! a `blob:` style URL a shell can hand to a download link. Artifacts are
//! immutable; editing the collection afterwards never touches one that was
//! already produced. Publishing a new artifact revokes the previous URL.

mod writer;

pub use writer::{WriteOptions, WriteStatistics, can_write};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PdfCollateError, Result};

/// MIME type of every artifact.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const URL_PREFIX: &str = "blob:pdfcollate/";

/// A merged PDF ready for download.
#[derive(Clone)]
pub struct Artifact {
    url: String,
    bytes: Arc<[u8]>,
    page_count: usize,
    created_at: SystemTime,
}

impl Artifact {
    /// The artifact's URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Always `application/pdf`.
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }

    /// The serialised PDF.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Size of the PDF in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// When the artifact was published.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Persist the PDF to `path`.
    pub async fn write_to(&self, path: &Path, options: &WriteOptions) -> Result<WriteStatistics> {
        writer::write_bytes(self.bytes.clone(), path, options).await
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("url", &self.url)
            .field("size", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    artifacts: HashMap<String, Artifact>,
    latest: Option<String>,
}

/// Live artifacts of one session.
#[derive(Default)]
pub struct ArtifactRegistry {
    state: RwLock<RegistryState>,
}

impl ArtifactRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `bytes` under a fresh URL, revoking the previous artifact.
    pub async fn publish(&self, bytes: Vec<u8>, page_count: usize) -> Artifact {
        let artifact = Artifact {
            url: format!("{URL_PREFIX}{}", Uuid::new_v4()),
            bytes: Arc::from(bytes),
            page_count,
            created_at: SystemTime::now(),
        };

        let mut state = self.state.write().await;
        if let Some(previous) = state.latest.take() {
            state.artifacts.remove(&previous);
            debug!(url = %previous, "revoked artifact");
        }
        state
            .artifacts
            .insert(artifact.url.clone(), artifact.clone());
        state.latest = Some(artifact.url.clone());

        debug!(url = %artifact.url, size = artifact.size(), "published artifact");
        artifact
    }

    /// Look up a live artifact.
    pub async fn resolve(&self, url: &str) -> Result<Artifact> {
        self.state
            .read()
            .await
            .artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| PdfCollateError::ArtifactNotFound {
                url: url.to_string(),
            })
    }

    /// Revoke a URL. Returns whether it was live.
    ///
    /// Holders of an [`Artifact`] keep their bytes; only the URL stops
    /// resolving.
    pub async fn revoke(&self, url: &str) -> bool {
        let mut state = self.state.write().await;
        if state.latest.as_deref() == Some(url) {
            state.latest = None;
        }
        state.artifacts.remove(url).is_some()
    }

    /// The most recently published artifact, if still live.
    pub async fn latest(&self) -> Option<Artifact> {
        let state = self.state.read().await;
        state
            .latest
            .as_ref()
            .and_then(|url| state.artifacts.get(url))
            .cloned()
    }

    /// Number of live artifacts.
    pub async fn len(&self) -> usize {
        self.state.read().await.artifacts.len()
    }

    /// Whether no artifact is live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl fmt::Debug for ArtifactRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRegistry").finish_non_exhaustive()
    }
}
