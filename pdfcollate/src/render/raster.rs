use image::RgbaImage;
use mupdf::{Colorspace, Document as MuDocument, Matrix};
use std::fmt;
use std::sync::Arc;

use super::{OutlineRenderer, RenderBackend, RenderDocument, Thumbnail, Viewport};
use crate::error::{PdfCollateError, Result};

/// Rasterises page content with MuPDF.
///
/// Page geometry comes from lopdf, the same source the merge reads, so a
/// thumbnail's orientation always agrees with the merged page.
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfRenderer;

impl MupdfRenderer {
    /// Create the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for MupdfRenderer {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn RenderDocument>> {
        let geometry = OutlineRenderer::new().open(bytes.clone())?;

        // MuPDF handles are not Send; parse once to fail early, then reopen per render.
        MuDocument::from_bytes(&bytes, "")
            .map_err(|e| PdfCollateError::other(format!("Failed to parse PDF: {e}")))?;

        Ok(Arc::new(MupdfDocument {
            bytes: bytes.into(),
            geometry,
        }))
    }
}

struct MupdfDocument {
    bytes: Arc<[u8]>,
    geometry: Arc<dyn RenderDocument>,
}

impl RenderDocument for MupdfDocument {
    fn page_count(&self) -> u32 {
        self.geometry.page_count()
    }

    fn viewport(&self, page_number: u32, scale: f32) -> Result<Viewport> {
        self.geometry.viewport(page_number, scale)
    }

    fn render(&self, page_number: u32, viewport: &Viewport) -> Result<Thumbnail> {
        if page_number == 0 || page_number > self.page_count() {
            return Err(PdfCollateError::other(format!(
                "page {page_number} out of range (document has {} pages)",
                self.page_count()
            )));
        }
        let index = i32::try_from(page_number - 1)
            .map_err(|_| PdfCollateError::other(format!("page {page_number} out of range")))?;

        let doc = MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| PdfCollateError::other(format!("Failed to open document: {e}")))?;
        let page = doc
            .load_page(index)
            .map_err(|e| PdfCollateError::other(format!("Failed to load page: {e}")))?;

        let matrix = Matrix::new_scale(viewport.scale, viewport.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| PdfCollateError::other(format!("Failed to render: {e}")))?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let channels = pixmap.n() as usize;
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);

        for pixel in pixmap.samples().chunks(channels) {
            match *pixel {
                [gray] => rgba.extend_from_slice(&[gray, gray, gray, 255]),
                [r, g, b] => rgba.extend_from_slice(&[r, g, b, 255]),
                [r, g, b, a] => rgba.extend_from_slice(&[r, g, b, a]),
                _ => {
                    return Err(PdfCollateError::other(format!(
                        "unexpected pixel format with {channels} components"
                    )));
                }
            }
        }

        let image = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| PdfCollateError::other("Failed to create image buffer"))?;
        Thumbnail::from_rgba(&image)
    }
}

impl fmt::Debug for MupdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MupdfDocument")
            .field("bytes_len", &self.bytes.len())
            .field("pages", &self.page_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PageSpec, build_pdf};

    fn thumbnail(doc: &Arc<dyn RenderDocument>, page_number: u32, scale: f32) -> Thumbnail {
        let viewport = doc.viewport(page_number, scale).unwrap();
        doc.render(page_number, &viewport).unwrap()
    }

    #[test]
    fn test_thumbnails_follow_page_content() {
        let bytes = build_pdf(&[PageSpec::letter(), PageSpec::letter()]);
        let doc = MupdfRenderer::new().open(bytes).unwrap();

        let first = thumbnail(&doc, 1, 1.0);
        let second = thumbnail(&doc, 2, 1.0);

        assert_eq!((first.width, first.height), (second.width, second.height));
        assert_ne!(first.png, second.png);
    }

    #[test]
    fn test_render_honours_page_rotation() {
        let bytes = build_pdf(&[PageSpec::letter().rotated(90)]);
        let doc = MupdfRenderer::new().open(bytes).unwrap();

        let thumb = thumbnail(&doc, 1, 0.2);
        assert!(thumb.width > thumb.height);
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(MupdfRenderer::new().open(b"not a pdf".to_vec()).is_err());
    }

    #[test]
    fn test_out_of_range_page() {
        let bytes = build_pdf(&[PageSpec::letter()]);
        let doc = MupdfRenderer::new().open(bytes).unwrap();
        let viewport = doc.viewport(1, 0.2).unwrap();

        assert!(doc.render(0, &viewport).is_err());
        assert!(doc.render(2, &viewport).is_err());
    }
}
