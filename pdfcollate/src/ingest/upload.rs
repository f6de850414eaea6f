use std::fmt;
use std::path::Path;

use crate::error::{PdfCollateError, Result};

/// Media type of accepted uploads.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// A candidate file from a picker or a drop.
#[derive(Clone)]
pub struct Upload {
    /// File name as the user sees it.
    pub name: String,
    /// Declared media type.
    pub media_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// An upload with an explicit media type.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// An upload declared as PDF.
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, PDF_MEDIA_TYPE, bytes)
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PdfCollateError::file_load(path.display().to_string(), e.to_string()))?;

        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, media_type, bytes))
    }

    /// Whether the declared media type is PDF. Parameters are ignored.
    pub fn is_pdf(&self) -> bool {
        self.media_type
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
