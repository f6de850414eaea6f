//! Large single-page previews.

use serde::{Deserialize, Serialize};

/// Space kept free around a preview, in the box's units.
pub const PREVIEW_MARGIN: f32 = 40.0;

/// The area a preview has to fit into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewBox {
    /// Available width.
    pub width: f32,
    /// Available height.
    pub height: f32,
}

impl PreviewBox {
    /// A box of `width` x `height`.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Scale at which a `page_width` x `page_height` page fits inside the
    /// box minus the margin, keeping its aspect ratio.
    ///
    /// Degenerate inputs yield a scale of 0, which renders a 1x1 raster.
    pub fn fit_scale(&self, page_width: f32, page_height: f32) -> f32 {
        if page_width <= 0.0 || page_height <= 0.0 {
            return 0.0;
        }
        let horizontal = (self.width - PREVIEW_MARGIN) / page_width;
        let vertical = (self.height - PREVIEW_MARGIN) / page_height;
        horizontal.min(vertical).max(0.0)
    }
}

impl Default for PreviewBox {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}
