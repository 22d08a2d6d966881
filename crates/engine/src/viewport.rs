//! Windows onto the isometric world.
//!
//! World positions are projected into virtual coordinates by
//! [`remap_coords`]; a viewport shows a rectangle of virtual space scaled
//! down by its zoom level.

use tracing::debug;

use crate::dirty::DirtyBlocks;
use crate::geometry::{Point, Rect};
use crate::gfx::Gfx;
use crate::surface::PixelSurface;
use crate::zoom::{
    scale_by_zoom, unscale_by_zoom, unscale_by_zoom_lower, ZoomLevel, ZOOM_BASE, ZOOM_BASE_SHIFT,
};

/// Area above which a redraw is split in two, in finest-zoom pixels.
const MAX_DRAW_AREA: i64 = 180_000 * (ZOOM_BASE as i64) * (ZOOM_BASE as i64);

/// Projects a world position onto the virtual plane.
pub const fn remap_coords(x: i32, y: i32, z: i32) -> Point {
    Point::new((y - x) * 2 * ZOOM_BASE, (y + x - z) * ZOOM_BASE)
}

/// World position at height zero under a virtual position.
pub const fn inverse_remap_coords(x: i32, y: i32) -> Point {
    Point::new(
        (y * 2 - x) >> (2 + ZOOM_BASE_SHIFT),
        (y * 2 + x) >> (2 + ZOOM_BASE_SHIFT),
    )
}

/// Receiver of "this virtual area changed" notifications.
pub trait ViewportDirtyMarker {
    /// Marks `area` (virtual coordinates) dirty in every viewport showing
    /// it. Returns true when any viewport did.
    fn mark_all_viewports_dirty(&mut self, area: Rect) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Screen position and size.
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    /// Shown part of virtual space.
    pub virtual_left: i32,
    pub virtual_top: i32,
    pub virtual_width: i32,
    pub virtual_height: i32,
    pub zoom: ZoomLevel,
}

impl Viewport {
    pub fn new(left: i32, top: i32, width: i32, height: i32, zoom: ZoomLevel) -> Self {
        Self {
            left,
            top,
            width,
            height,
            virtual_left: 0,
            virtual_top: 0,
            virtual_width: scale_by_zoom(width, zoom),
            virtual_height: scale_by_zoom(height, zoom),
            zoom,
        }
    }

    /// Screen rectangle, right and bottom exclusive.
    pub fn screen_rect(&self) -> Rect {
        Rect::from_size(self.left, self.top, self.width, self.height)
    }

    /// Virtual position under a screen point, `None` outside the viewport.
    pub fn screen_to_virtual(&self, x: i32, y: i32) -> Option<Point> {
        let x = x - self.left;
        let y = y - self.top;
        if !(0..self.width).contains(&x) || !(0..self.height).contains(&y) {
            return None;
        }
        Some(Point::new(
            scale_by_zoom(x, self.zoom) + self.virtual_left,
            scale_by_zoom(y, self.zoom) + self.virtual_top,
        ))
    }

    /// Marks the screen area showing the virtual `area` (right and bottom
    /// inclusive). Returns false when the area is outside the viewport.
    pub fn mark_dirty(&self, dirty: &mut DirtyBlocks, area: Rect) -> bool {
        let round = (1 << self.zoom.shift()) - 1;
        let left = area.left - self.virtual_left;
        if left >= self.virtual_width {
            return false;
        }
        let top = area.top - self.virtual_top;
        if top >= self.virtual_height {
            return false;
        }
        let right = area.right + round - self.virtual_left;
        if right <= 0 {
            return false;
        }
        let bottom = area.bottom + round - self.virtual_top;
        if bottom <= 0 {
            return false;
        }

        dirty.add(
            unscale_by_zoom_lower(left, self.zoom) + self.left,
            unscale_by_zoom_lower(top, self.zoom) + self.top,
            unscale_by_zoom(right, self.zoom) + self.left + 1,
            unscale_by_zoom(bottom, self.zoom) + self.top + 1,
        );
        true
    }

    /// Moves the shown area to start at virtual `x, y`. Returns how far the
    /// existing picture moves on screen, `None` when it stays put.
    pub fn scroll_to(&mut self, x: i32, y: i32) -> Option<Point> {
        let old_left = unscale_by_zoom_lower(self.virtual_left, self.zoom);
        let old_top = unscale_by_zoom_lower(self.virtual_top, self.zoom);
        self.virtual_left = x;
        self.virtual_top = y;
        let offset = Point::new(
            old_left - unscale_by_zoom_lower(x, self.zoom),
            old_top - unscale_by_zoom_lower(y, self.zoom),
        );
        (offset != Point::new(0, 0)).then_some(offset)
    }

    /// Changes the zoom level keeping the virtual point under the screen
    /// position `anchor` in place. Returns false when the level is unchanged.
    pub fn zoom_at(&mut self, zoom: ZoomLevel, anchor: Point) -> bool {
        if zoom == self.zoom {
            return false;
        }
        let local_x = (anchor.x - self.left).clamp(0, self.width);
        let local_y = (anchor.y - self.top).clamp(0, self.height);
        let fixed_x = scale_by_zoom(local_x, self.zoom) + self.virtual_left;
        let fixed_y = scale_by_zoom(local_y, self.zoom) + self.virtual_top;

        self.zoom = zoom;
        self.virtual_width = scale_by_zoom(self.width, zoom);
        self.virtual_height = scale_by_zoom(self.height, zoom);
        self.virtual_left = fixed_x - scale_by_zoom(local_x, zoom);
        self.virtual_top = fixed_y - scale_by_zoom(local_y, zoom);
        debug!(zoom = ?zoom, virtual_left = self.virtual_left, virtual_top = self.virtual_top, "viewport_zoomed");
        true
    }

    /// Moves the viewport on screen and changes its size, keeping the
    /// virtual top-left.
    pub fn resize(&mut self, left: i32, top: i32, width: i32, height: i32) {
        self.left = left;
        self.top = top;
        self.width = width;
        self.height = height;
        self.virtual_width = scale_by_zoom(width, self.zoom);
        self.virtual_height = scale_by_zoom(height, self.zoom);
    }

    /// Draws the part of the screen area `left..right` x `top..bottom`
    /// covered by this viewport. `draw_world` gets a surface in virtual
    /// coordinates at the viewport zoom and the virtual area to fill;
    /// large areas are handed out in several pieces.
    pub fn draw(
        &self,
        gfx: &mut Gfx<'_>,
        area: Rect,
        draw_world: &mut dyn FnMut(&mut Gfx<'_>, Rect),
    ) {
        let mut area = area;
        if area.right <= self.left || area.bottom <= self.top {
            return;
        }
        if area.left >= self.left + self.width || area.top >= self.top + self.height {
            return;
        }
        area.left = area.left.max(self.left);
        area.right = area.right.min(self.left + self.width);
        area.top = area.top.max(self.top);
        area.bottom = area.bottom.min(self.top + self.height);
        self.draw_chunked(gfx, area, draw_world);
    }

    fn draw_chunked(&self, gfx: &mut Gfx<'_>, area: Rect, draw_world: &mut dyn FnMut(&mut Gfx<'_>, Rect)) {
        let scaled_width = scale_by_zoom(area.width(), self.zoom) as i64;
        let scaled_height = scale_by_zoom(area.height(), self.zoom) as i64;
        if scaled_width * scaled_height > MAX_DRAW_AREA {
            if area.height() > area.width() {
                let split = (area.top + area.bottom) >> 1;
                self.draw_chunked(gfx, Rect::new(area.left, area.top, area.right, split), draw_world);
                self.draw_chunked(gfx, Rect::new(area.left, split, area.right, area.bottom), draw_world);
            } else {
                let split = (area.left + area.right) >> 1;
                self.draw_chunked(gfx, Rect::new(area.left, area.top, split, area.bottom), draw_world);
                self.draw_chunked(gfx, Rect::new(split, area.top, area.right, area.bottom), draw_world);
            }
            return;
        }

        let to_virtual_x = |x: i32| scale_by_zoom(x - self.left, self.zoom) + self.virtual_left;
        let to_virtual_y = |y: i32| scale_by_zoom(y - self.top, self.zoom) + self.virtual_top;
        self.draw_virtual(
            gfx,
            Rect::new(
                to_virtual_x(area.left),
                to_virtual_y(area.top),
                to_virtual_x(area.right),
                to_virtual_y(area.bottom),
            ),
            draw_world,
        );
    }

    fn draw_virtual(&self, gfx: &mut Gfx<'_>, area: Rect, draw_world: &mut dyn FnMut(&mut Gfx<'_>, Rect)) {
        let mask = scale_by_zoom(-1, self.zoom);
        let left = area.left & mask;
        let top = area.top & mask;
        let width = (area.right - area.left) & mask;
        let height = (area.bottom - area.top) & mask;
        if width <= 0 || height <= 0 {
            return;
        }

        let x = unscale_by_zoom(left - (self.virtual_left & mask), self.zoom) + self.left;
        let y = unscale_by_zoom(top - (self.virtual_top & mask), self.zoom) + self.top;
        let current = *gfx.surface();
        let dst = gfx.blitter().move_to(current.dst, x - current.left, y - current.top);
        let surface = PixelSurface {
            dst,
            left,
            top,
            width,
            height,
            pitch: current.pitch,
            zoom: self.zoom,
        };
        gfx.with_surface(surface, |gfx| {
            draw_world(gfx, Rect::from_size(left, top, width, height));
        });
    }
}

/// Marks areas dirty in a set of viewports drawn on one screen.
pub struct ViewportSet<'a> {
    pub viewports: &'a [Viewport],
    pub dirty: &'a mut DirtyBlocks,
}

impl ViewportDirtyMarker for ViewportSet<'_> {
    fn mark_all_viewports_dirty(&mut self, area: Rect) -> bool {
        let mut marked = false;
        for viewport in self.viewports {
            marked |= viewport.mark_dirty(self.dirty, area);
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::GfxAssets;
    use crate::gfx::tests::assets_fixture;
    use crate::test_support::RecordingBlitter;

    #[test]
    fn remap_and_inverse_agree_at_height_zero() {
        let virtual_pos = remap_coords(48, 80, 0);
        assert_eq!(virtual_pos, Point::new(32 * 8, 128 * 4));
        assert_eq!(inverse_remap_coords(virtual_pos.x, virtual_pos.y), Point::new(48, 80));
    }

    #[test]
    fn mark_dirty_rounds_outwards_and_offsets_to_the_screen() {
        let viewport = Viewport::new(10, 20, 100, 50, ZoomLevel::Normal);
        let mut dirty = DirtyBlocks::new(640, 480);
        assert!(viewport.mark_dirty(&mut dirty, Rect::new(0, 0, 8, 8)));
        assert_eq!(dirty.invalid_rect(), Rect::new(10, 20, 14, 24));
    }

    #[test]
    fn mark_dirty_outside_the_viewport_is_rejected() {
        let mut viewport = Viewport::new(0, 0, 100, 50, ZoomLevel::Normal);
        viewport.scroll_to(1000, 1000);
        let mut dirty = DirtyBlocks::new(640, 480);
        assert!(!viewport.mark_dirty(&mut dirty, Rect::new(1400, 1000, 1500, 1100)));
        assert!(!viewport.mark_dirty(&mut dirty, Rect::new(0, 0, 990, 990)));
        assert!(!dirty.has_dirty());
    }

    #[test]
    fn viewport_set_marks_every_viewport_showing_the_area() {
        let viewports = [
            Viewport::new(0, 0, 100, 100, ZoomLevel::MIN),
            Viewport::new(200, 0, 100, 100, ZoomLevel::MIN),
        ];
        let mut dirty = DirtyBlocks::new(640, 480);
        let mut set = ViewportSet {
            viewports: &viewports,
            dirty: &mut dirty,
        };
        assert!(set.mark_all_viewports_dirty(Rect::new(10, 10, 20, 20)));
        assert!(dirty.is_dirty_at(10, 10));
        assert!(dirty.is_dirty_at(210, 10));
    }

    #[test]
    fn screen_to_virtual_scales_by_zoom() {
        let mut viewport = Viewport::new(10, 10, 100, 100, ZoomLevel::Normal);
        viewport.scroll_to(400, 800);
        assert_eq!(viewport.screen_to_virtual(15, 20), Some(Point::new(420, 840)));
        assert_eq!(viewport.screen_to_virtual(5, 20), None);
        assert_eq!(viewport.screen_to_virtual(110, 20), None);
    }

    #[test]
    fn scroll_reports_the_screen_offset() {
        let mut viewport = Viewport::new(0, 0, 100, 100, ZoomLevel::Normal);
        assert_eq!(viewport.scroll_to(40, 0), Some(Point::new(-10, 0)));
        assert_eq!(viewport.scroll_to(41, 2), None);
        assert_eq!(viewport.virtual_left, 41);
    }

    #[test]
    fn zoom_keeps_the_anchor_in_place() {
        let mut viewport = Viewport::new(0, 0, 200, 100, ZoomLevel::Normal);
        viewport.scroll_to(1000, 500);
        let before = viewport.screen_to_virtual(50, 40);
        assert!(viewport.zoom_at(ZoomLevel::Out2x, Point::new(50, 40)));
        assert_eq!(viewport.screen_to_virtual(50, 40), before);
        assert_eq!(viewport.virtual_width, 1600);
        assert!(!viewport.zoom_at(ZoomLevel::Out2x, Point::new(0, 0)));
    }

    #[test]
    fn large_redraws_are_split() {
        let (store, font) = assets_fixture();
        let mut blitter = RecordingBlitter::new(640);
        let mut gfx = Gfx::new(
            &mut blitter,
            GfxAssets {
                sprites: &store,
                layouter: &font,
            },
            PixelSurface::screen(640, 480, 640),
        );
        let viewport = Viewport::new(0, 0, 400, 300, ZoomLevel::Out2x);
        let mut chunks = Vec::new();
        viewport.draw(&mut gfx, Rect::new(0, 0, 640, 480), &mut |gfx, area| {
            assert_eq!(gfx.surface().zoom, ZoomLevel::Out2x);
            chunks.push(area);
        });
        assert_eq!(chunks.len(), 4);
        let covered: i64 = chunks
            .iter()
            .map(|chunk| chunk.width() as i64 * chunk.height() as i64)
            .sum();
        assert_eq!(covered, 3200 * 2400);
    }

    #[test]
    fn small_redraw_gets_a_virtual_surface() {
        let (store, font) = assets_fixture();
        let mut blitter = RecordingBlitter::new(640);
        let mut gfx = Gfx::new(
            &mut blitter,
            GfxAssets {
                sprites: &store,
                layouter: &font,
            },
            PixelSurface::screen(640, 480, 640),
        );
        let mut viewport = Viewport::new(100, 50, 200, 100, ZoomLevel::Normal);
        viewport.scroll_to(1000, 2000);
        let mut seen = None;
        viewport.draw(&mut gfx, Rect::new(110, 60, 120, 70), &mut |gfx, area| {
            seen = Some((*gfx.surface(), area));
        });
        let (surface, area) = seen.expect("drawn");
        assert_eq!(area, Rect::new(1040, 2040, 1080, 2080));
        assert_eq!(surface.dst, 60 * 640 + 110);
        assert_eq!((surface.width, surface.height), (40, 40));
        assert_eq!(*gfx.surface(), PixelSurface::screen(640, 480, 640));
    }
}
