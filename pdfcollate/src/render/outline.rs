use image::{Rgba, RgbaImage};
use lopdf::{Document, ObjectId};
use std::fmt;
use std::sync::Arc;

use super::{RenderBackend, RenderDocument, Thumbnail, Viewport};
use crate::error::{PdfCollateError, Result};
use crate::utils::{page_rotation, page_size};

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE: Rgba<u8> = Rgba([160, 160, 160, 255]);
const HEAD: Rgba<u8> = Rgba([90, 90, 90, 255]);

/// Renders page silhouettes from lopdf page geometry.
///
/// Page content is not drawn, so same-sized pages look alike. The raster has the page's displayed size and orientation: a white sheet
/// with a grey edge and a dark band along the side that is the top of the
/// page as authored.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineRenderer;

impl OutlineRenderer {
    /// Create the renderer.
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for OutlineRenderer {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn RenderDocument>> {
        let document = Document::load_mem(&bytes)?;
        let pages = document.get_pages().into_values().collect();
        Ok(Arc::new(OutlineDocument { document, pages }))
    }
}

struct OutlineDocument {
    document: Document,
    pages: Vec<ObjectId>,
}

impl OutlineDocument {
    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        (page_number as usize)
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .copied()
            .ok_or_else(|| {
                PdfCollateError::other(format!(
                    "page {page_number} out of range (document has {} pages)",
                    self.pages.len()
                ))
            })
    }
}

impl RenderDocument for OutlineDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn viewport(&self, page_number: u32, scale: f32) -> Result<Viewport> {
        let page_id = self.page_id(page_number)?;
        let (width, height) = page_size(&self.document, page_id);
        let rotation = page_rotation(&self.document, page_id);
        Ok(Viewport::new(width, height, scale, rotation))
    }

    fn render(&self, page_number: u32, viewport: &Viewport) -> Result<Thumbnail> {
        self.page_id(page_number)?;

        let (width, height) = viewport.pixel_size();
        let mut canvas = RgbaImage::from_pixel(width, height, PAPER);

        let band = (width.min(height) / 12).max(1);
        for y in 0..height {
            for x in 0..width {
                let on_edge = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                let in_head = match viewport.rotation.degrees() {
                    90 => x >= width - band,
                    180 => y >= height - band,
                    270 => x < band,
                    _ => y < band,
                };
                if in_head {
                    canvas.put_pixel(x, y, HEAD);
                } else if on_edge {
                    canvas.put_pixel(x, y, EDGE);
                }
            }
        }

        Thumbnail::from_rgba(&canvas)
    }
}

impl fmt::Debug for OutlineDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineDocument")
            .field("version", &self.document.version)
            .field("pages", &self.pages.len())
            .finish()
    }
}
