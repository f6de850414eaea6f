use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageEncoder, RgbaImage};
use std::fmt;
use std::path::Path;

use crate::error::{PdfCollateError, Result};

/// A rendered page raster, PNG encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
}

impl Thumbnail {
    /// Encode an RGBA raster as PNG.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let mut png = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new_with_quality(
            &mut png,
            image::codecs::png::CompressionType::Fast,
            image::codecs::png::FilterType::Adaptive,
        );

        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| PdfCollateError::other(format!("Failed to encode PNG: {e}")))?;

        Ok(Self {
            width: image.width(),
            height: image.height(),
            png,
        })
    }

    /// The PNG as a `data:` URL, ready for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Write the PNG to `path`.
    pub async fn write_png(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, &self.png)
            .await
            .map_err(|source| PdfCollateError::FailedToWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_len", &self.png.len())
            .finish()
    }
}
