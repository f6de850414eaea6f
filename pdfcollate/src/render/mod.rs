//! Page rendering collaborator.
//!
//! Ingestion and preview never look inside a PDF themselves. They open a
//! document through a [`RenderBackend`], ask it for a page's [`Viewport`]
//! at some scale, and have it paint the page into a [`Thumbnail`].
//!
//! Backends are blocking; callers run them on tokio's blocking pool.
//! A byte buffer handed to [`RenderBackend::open`] belongs to the backend
//! from then on, so callers always pass an independent copy.
//!
//! With the `mupdf` feature (on by default), [`MupdfRenderer`] rasterises
//! page content. [`OutlineRenderer`] needs nothing but lopdf: it paints a
//! page silhouette of the right size and orientation, and is what
//! [`default_backend`] falls back to without MuPDF.

mod outline;
#[cfg(feature = "mupdf")]
mod raster;
mod thumbnail;

pub use outline::OutlineRenderer;
#[cfg(feature = "mupdf")]
pub use raster::MupdfRenderer;
pub use thumbnail::Thumbnail;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::session::Rotation;

/// Scale used for page thumbnails.
pub const DEFAULT_THUMBNAIL_SCALE: f32 = 0.2;

/// A page's drawing area at a given scale.
///
/// Width and height already account for the page's own rotation, the way
/// a viewer would lay the page out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in device units.
    pub width: f32,
    /// Height in device units.
    pub height: f32,
    /// Scale relative to PDF points.
    pub scale: f32,
    /// Rotation the page is displayed with.
    pub rotation: Rotation,
}

impl Viewport {
    /// Viewport for a page of `page_width` x `page_height` points.
    pub fn new(page_width: f32, page_height: f32, scale: f32, rotation: Rotation) -> Self {
        let (width, height) = if rotation.is_quarter_turn() {
            (page_height, page_width)
        } else {
            (page_width, page_height)
        };

        Self {
            width: width * scale,
            height: height * scale,
            scale,
            rotation,
        }
    }

    /// Raster size in whole pixels, never smaller than 1x1.
    pub fn pixel_size(&self) -> (u32, u32) {
        (to_pixels(self.width), to_pixels(self.height))
    }
}

/// Opens documents for rendering.
pub trait RenderBackend: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Parse `bytes` into a document handle.
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn RenderDocument>>;
}

/// A parsed document that can report geometry and paint pages.
///
/// Page numbers are 1-based.
pub trait RenderDocument: Send + Sync + fmt::Debug {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Viewport of a page at `scale`.
    fn viewport(&self, page_number: u32, scale: f32) -> Result<Viewport>;

    /// Paint a page into a fresh raster of the viewport's size.
    fn render(&self, page_number: u32, viewport: &Viewport) -> Result<Thumbnail>;
}

/// The best backend this build has.
pub fn default_backend() -> Arc<dyn RenderBackend> {
    #[cfg(feature = "mupdf")]
    {
        Arc::new(MupdfRenderer::new())
    }
    #[cfg(not(feature = "mupdf"))]
    {
        Arc::new(OutlineRenderer::new())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(value: f32) -> u32 {
    if value.is_finite() && value >= 1.0 {
        value.ceil().min(u32::MAX as f32) as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_scales_page_box() {
        let viewport = Viewport::new(612.0, 792.0, 0.5, Rotation::NONE);
        assert_eq!(viewport.width, 306.0);
        assert_eq!(viewport.height, 396.0);
        assert_eq!(viewport.pixel_size(), (306, 396));
    }

    #[test]
    fn test_viewport_swaps_for_quarter_turns() {
        let rotation = Rotation::from_degrees(90).unwrap();
        let viewport = Viewport::new(612.0, 792.0, 1.0, rotation);
        assert_eq!((viewport.width, viewport.height), (792.0, 612.0));
    }

    #[cfg(feature = "mupdf")]
    #[test]
    fn test_default_backend_is_mupdf() {
        assert_eq!(default_backend().name(), "mupdf");
    }

    #[test]
    fn test_pixel_size_rounds_up_and_clamps() {
        let viewport = Viewport::new(10.1, 0.0, 1.0, Rotation::NONE);
        assert_eq!(viewport.pixel_size(), (11, 1));

        let viewport = Viewport::new(f32::NAN, 5.0, 1.0, Rotation::NONE);
        assert_eq!(viewport.pixel_size(), (1, 5));
    }
}
