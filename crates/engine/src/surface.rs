use crate::blitter::{Blitter, PixelOffset};
use crate::geometry::Rect;
use crate::zoom::ZoomLevel;

/// Clip window onto the screen buffer.
///
/// `left`/`top` are the drawing coordinates that land on `dst`; everything
/// drawn through the surface is clipped to `width` x `height` from there.
/// At zooms other than the finest, coordinates are virtual (scaled) ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSurface {
    pub dst: PixelOffset,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub pitch: i32,
    pub zoom: ZoomLevel,
}

impl PixelSurface {
    /// Whole-buffer surface at the finest zoom.
    pub fn screen(width: i32, height: i32, pitch: i32) -> Self {
        Self {
            dst: 0,
            left: 0,
            top: 0,
            width,
            height,
            pitch,
            zoom: ZoomLevel::MIN,
        }
    }

    /// Drawing-space rectangle covered by the surface, right/bottom exclusive.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.left, self.top, self.width, self.height)
    }

    /// Sub-surface for the area `left, top, width, height` in this surface's
    /// coordinates. The result draws at the finest zoom with the area's
    /// top-left as origin; its `left`/`top` hold how much was clipped off.
    /// Returns `None` when nothing of the area is visible.
    pub fn clip(
        &self,
        blitter: &dyn Blitter,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
    ) -> Option<PixelSurface> {
        debug_assert!(width > 0, "sub-surface width must be positive");
        debug_assert!(height > 0, "sub-surface height must be positive");

        let mut left = left - self.left;
        let mut width = width;
        let clipped_left = if left < 0 {
            width += left;
            if width <= 0 {
                return None;
            }
            let clipped = -left;
            left = 0;
            clipped
        } else {
            0
        };
        if width > self.width - left {
            width = self.width - left;
            if width <= 0 {
                return None;
            }
        }

        let mut top = top - self.top;
        let mut height = height;
        let clipped_top = if top < 0 {
            height += top;
            if height <= 0 {
                return None;
            }
            let clipped = -top;
            top = 0;
            clipped
        } else {
            0
        };
        if height > self.height - top {
            height = self.height - top;
            if height <= 0 {
                return None;
            }
        }

        Some(PixelSurface {
            dst: blitter.move_to(self.dst, left, top),
            left: clipped_left,
            top: clipped_top,
            width,
            height,
            pitch: self.pitch,
            zoom: ZoomLevel::MIN,
        })
    }
}
