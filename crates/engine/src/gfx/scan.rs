use crate::blitter::{Blitter, LineStyle, PixelOffset};
use crate::geometry::{ceil_div, Point, Rect};
use crate::palette::{PixelColour, RecolourMap};
use crate::surface::PixelSurface;
use crate::zoom::{unscale_by_zoom, ZoomLevel};

use super::Gfx;

/// How [`Gfx::fill_rect`] and [`Gfx::fill_polygon`] cover their area.
#[derive(Debug, Clone, Copy)]
pub enum FillRectMode<'r> {
    Opaque(PixelColour),
    /// Every other pixel, in a pattern anchored to the unclipped shape.
    Checker(PixelColour),
    /// Pushes the existing pixels through a recolour table.
    Recolour(&'r RecolourMap),
}

/// Polygon edge stored with its upper end first.
#[derive(Debug, Clone, Copy)]
struct Segment {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl Segment {
    fn between(a: Point, b: Point) -> Option<Segment> {
        match a.y.cmp(&b.y) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Less => Some(Segment {
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
            }),
            std::cmp::Ordering::Greater => Some(Segment {
                x1: b.x,
                y1: b.y,
                x2: a.x,
                y2: a.y,
            }),
        }
    }

    fn x_at(&self, y: i32) -> i32 {
        let dx = self.x2 - self.x1;
        let dy = self.y2 - self.y1;
        self.x1 + ((dx as i64 * (y - self.y1) as i64) / dy as i64) as i32
    }
}

/// Polygon edges in surface-local coordinates, horizontal edges dropped.
fn polygon_segments(points: &[Point], surface: &PixelSurface) -> Vec<Segment> {
    if points.len() < 3 {
        return Vec::new();
    }
    let local = |p: &Point| Point::new(p.x - surface.left, p.y - surface.top);
    let mut segments = Vec::with_capacity(points.len());
    let mut previous = local(&points[points.len() - 1]);
    for point in points {
        let current = local(point);
        if let Some(segment) = Segment::between(previous, current) {
            segments.push(segment);
        }
        previous = current;
    }
    segments
}

/// Moves a line into surface-local coordinates, or `None` when a pen of
/// `width` would leave nothing on the surface.
fn preprocess_line(surface: &PixelSurface, from: Point, to: Point, width: i32) -> Option<(Point, Point)> {
    let from = Point::new(from.x - surface.left, from.y - surface.top);
    let to = Point::new(to.x - surface.left, to.y - surface.top);
    let half = width / 2;
    if from.x + half < 0 && to.x + half < 0 {
        return None;
    }
    if from.y + half < 0 && to.y + half < 0 {
        return None;
    }
    if from.x - half > surface.width && to.x - half > surface.width {
        return None;
    }
    if from.y - half > surface.height && to.y - half > surface.height {
        return None;
    }
    Some((from, to))
}

/// Hands a local line to the blitter unless its extension provably misses
/// the screen.
fn draw_local_line(
    blitter: &mut dyn Blitter,
    dst: PixelOffset,
    from: Point,
    to: Point,
    screen_width: i32,
    screen_height: i32,
    style: LineStyle,
) {
    let mut grade_y = to.y - from.y;
    let mut grade_x = to.x - from.x;

    if grade_x == 0 || grade_y == 0 {
        blitter.draw_line(dst, from, to, screen_width, screen_height, style);
        return;
    }

    let extra = ceil_div(3 * style.width, 4);
    let clip = Rect::new(-extra, -extra, screen_width - 1 + extra, screen_height - 1 + extra);
    let mut margin = 1;

    // Halve the gradient until the intersections below cannot overflow.
    let reach = (clip.left - from.x).abs().max((clip.right - from.x).abs());
    while grade_y != 0 && i32::MAX / grade_y.abs() < reach {
        grade_y /= 2;
        grade_x /= 2;
        margin *= 2;
    }

    if grade_x != 0 {
        let left_isec_y = from.y + (clip.left - from.x) * grade_y / grade_x;
        let right_isec_y = from.y + (clip.right - from.x) * grade_y / grade_x;

        if (left_isec_y > clip.bottom + margin && right_isec_y > clip.bottom + margin)
            || (left_isec_y < clip.top - margin && right_isec_y < clip.top - margin)
        {
            return;
        }
    }

    blitter.draw_line(dst, from, to, screen_width, screen_height, style);
}

impl Gfx<'_> {
    /// Fills the rectangle with inclusive corners `left, top` and
    /// `right, bottom`, clipped to the surface. Only draws at the finest zoom.
    pub fn fill_rect(&mut self, left: i32, top: i32, right: i32, bottom: i32, mode: FillRectMode<'_>) {
        let surface = self.surface;
        if surface.zoom != ZoomLevel::MIN {
            return;
        }
        if left > right || top > bottom {
            return;
        }
        if right < surface.left || left >= surface.left + surface.width {
            return;
        }
        if bottom < surface.top || top >= surface.top + surface.height {
            return;
        }

        let origin_left = left;
        let origin_top = top;

        let left = (left - surface.left).max(0);
        let width = (right - surface.left + 1).min(surface.width) - left;
        let top = (top - surface.top).max(0);
        let height = (bottom - surface.top + 1).min(surface.height) - top;

        let dst = self.blitter.move_to(surface.dst, left, top);

        match mode {
            FillRectMode::Opaque(colour) => self.blitter.draw_rect(dst, width, height, colour),
            FillRectMode::Recolour(remap) => {
                self.blitter.draw_colour_mapping_rect(dst, width, height, remap)
            }
            FillRectMode::Checker(colour) => {
                let mut phase =
                    (origin_left - left + surface.left + origin_top - top + surface.top) & 1;
                let mut row = dst;
                for _ in 0..height {
                    phase ^= 1;
                    let mut x = phase;
                    while x < width {
                        self.blitter.set_pixel(row, x, 0, colour);
                        x += 2;
                    }
                    row = self.blitter.move_to(row, 0, 1);
                }
            }
        }
    }

    /// Scan-converts a closed polygon with the even-odd rule. Vertices are
    /// in drawing coordinates; the last connects back to the first.
    pub fn fill_polygon(&mut self, points: &[Point], mode: FillRectMode<'_>) {
        let surface = self.surface;
        if surface.zoom != ZoomLevel::MIN {
            return;
        }

        let mut segments: Vec<Segment> = polygon_segments(points, &surface)
            .into_iter()
            .filter(|s| s.y2 > 0 && s.y1 < surface.height)
            .collect();
        if segments.is_empty() {
            return;
        }
        segments.sort_by_key(|s| s.y1);

        let mut pending = segments.into_iter().peekable();
        let mut active: Vec<Segment> = Vec::new();
        let mut intersections: Vec<i32> = Vec::new();
        let mut y = pending.peek().map_or(0, |s| s.y1);

        while pending.peek().is_some() || !active.is_empty() {
            active.retain(|s| s.y2 != y);
            while let Some(segment) = pending.next_if(|s| s.y1 == y) {
                active.push(segment);
            }

            if y < 0 {
                y += 1;
                continue;
            }
            if y >= surface.height {
                return;
            }

            intersections.clear();
            intersections.extend(active.iter().map(|s| s.x_at(y)));
            intersections.sort_unstable();

            for pair in intersections.chunks_exact(2) {
                let x1 = pair[0].max(0);
                let x2 = pair[1].min(surface.width);
                if x2 <= x1 || x2 < 0 || x1 >= surface.width {
                    continue;
                }
                match mode {
                    FillRectMode::Opaque(colour) => {
                        let dst = self.blitter.move_to(surface.dst, x1, y);
                        self.blitter.set_horizontal_line(dst, x2 - x1, colour);
                    }
                    FillRectMode::Recolour(remap) => {
                        let dst = self.blitter.move_to(surface.dst, x1, y);
                        self.blitter.draw_colour_mapping_rect(dst, x2 - x1, 1, remap);
                    }
                    FillRectMode::Checker(colour) => {
                        let dst = self.blitter.move_to(surface.dst, x1, y);
                        let mut x = (x1 + y) & 1;
                        while x < x2 - x1 {
                            self.blitter.set_pixel(dst, x, 0, colour);
                            x += 2;
                        }
                    }
                }
            }

            y += 1;
        }
    }

    /// Draws a line in drawing coordinates with the given pen.
    pub fn draw_line(&mut self, from: Point, to: Point, style: LineStyle) {
        let surface = self.surface;
        if let Some((from, to)) = preprocess_line(&surface, from, to, style.width) {
            draw_local_line(
                &mut *self.blitter,
                surface.dst,
                from,
                to,
                surface.width,
                surface.height,
                style,
            );
        }
    }

    /// Hairline in virtual coordinates, drawn at the surface zoom.
    pub fn draw_line_unscaled(&mut self, from: Point, to: Point, colour: PixelColour) {
        let surface = self.surface;
        let Some((from, to)) = preprocess_line(&surface, from, to, 1) else {
            return;
        };
        let zoom = surface.zoom;
        let unscale = |p: Point| Point::new(unscale_by_zoom(p.x, zoom), unscale_by_zoom(p.y, zoom));
        draw_local_line(
            &mut *self.blitter,
            surface.dst,
            unscale(from),
            unscale(to),
            unscale_by_zoom(surface.width, zoom),
            unscale_by_zoom(surface.height, zoom),
            LineStyle::solid(colour),
        );
    }

    /// White wireframe of a parallelepiped with one corner at `origin` and
    /// the three edges leaving it along `d1`, `d2` and `d3`.
    pub fn draw_box(&mut self, origin: Point, d1: Point, d2: Point, d3: Point) {
        let at = |a: Point, b: Point| Point::new(a.x + b.x, a.y + b.y);
        let c1 = at(origin, d1);
        let c2 = at(origin, d2);
        let c3 = at(origin, d3);

        let edges = [
            (origin, c1),
            (origin, c2),
            (origin, c3),
            (c1, at(c1, d2)),
            (c1, at(c1, d3)),
            (c2, at(c2, d1)),
            (c2, at(c2, d3)),
            (c3, at(c3, d1)),
            (c3, at(c3, d2)),
        ];
        for (from, to) in edges {
            self.draw_line_unscaled(from, to, PixelColour::WHITE);
        }
    }

    /// Outline along the inclusive edges of `rect`.
    pub fn draw_rect_outline(&mut self, rect: Rect, style: LineStyle) {
        let Rect {
            left,
            top,
            right,
            bottom,
        } = rect;
        self.draw_line(Point::new(left, top), Point::new(right, top), style);
        self.draw_line(Point::new(left, top), Point::new(left, bottom), style);
        self.draw_line(Point::new(right, top), Point::new(right, bottom), style);
        self.draw_line(Point::new(left, bottom), Point::new(right, bottom), style);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::blitter::PalettedBlitter;
    use crate::gfx::tests::assets_fixture;
    use crate::gfx::GfxAssets;
    use crate::test_support::{BlitterCall, RecordingBlitter};

    fn recorded(width: i32, height: i32, draw: impl FnOnce(&mut Gfx<'_>)) -> RecordingBlitter {
        let (store, font) = assets_fixture();
        let mut blitter = RecordingBlitter::new(width);
        {
            let mut gfx = Gfx::new(
                &mut blitter,
                GfxAssets {
                    sprites: &store,
                    layouter: &font,
                },
                PixelSurface::screen(width, height, width),
            );
            draw(&mut gfx);
        }
        blitter
    }

    #[test]
    fn fill_rect_is_clipped_to_the_surface() {
        let blitter = recorded(20, 20, |gfx| {
            gfx.fill_rect(-10, -10, 100, 100, FillRectMode::Opaque(PixelColour(5)));
        });
        assert_eq!(
            blitter.calls,
            vec![BlitterCall::Rect {
                x: 0,
                y: 0,
                width: 20,
                height: 20
            }]
        );
    }

    #[test]
    fn fill_rect_right_and_bottom_are_inclusive() {
        let blitter = recorded(20, 20, |gfx| {
            gfx.fill_rect(2, 3, 4, 3, FillRectMode::Opaque(PixelColour(5)));
        });
        assert_eq!(
            blitter.calls,
            vec![BlitterCall::Rect {
                x: 2,
                y: 3,
                width: 3,
                height: 1
            }]
        );
    }

    #[test]
    fn fill_rect_rejects_inverted_and_offscreen_rects() {
        let blitter = recorded(20, 20, |gfx| {
            gfx.fill_rect(5, 5, 4, 10, FillRectMode::Opaque(PixelColour(5)));
            gfx.fill_rect(20, 0, 30, 10, FillRectMode::Opaque(PixelColour(5)));
            gfx.fill_rect(0, -10, 10, -1, FillRectMode::Opaque(PixelColour(5)));
        });
        assert!(blitter.calls.is_empty());
    }

    #[test]
    fn checker_pattern_is_anchored_to_the_unclipped_rect() {
        let full = recorded(20, 20, |gfx| {
            gfx.fill_rect(0, 0, 9, 9, FillRectMode::Checker(PixelColour(1)));
        });
        let (store, font) = assets_fixture();
        let mut blitter = RecordingBlitter::new(20);
        {
            let mut gfx = Gfx::new(
                &mut blitter,
                GfxAssets {
                    sprites: &store,
                    layouter: &font,
                },
                PixelSurface::screen(20, 20, 20),
            );
            gfx.with_clip(3, 2, 10, 10, |gfx| {
                gfx.fill_rect(-3, -2, 6, 7, FillRectMode::Checker(PixelColour(1)));
            });
        }
        let expected: BTreeSet<(i32, i32)> = full
            .touched
            .iter()
            .copied()
            .filter(|&(x, y)| x >= 3 && y >= 2)
            .collect();
        assert!(!expected.is_empty());
        assert_eq!(blitter.touched, expected);
        assert_eq!(full.touched.len(), 50);
    }

    #[test]
    fn polygon_fills_its_interior_only() {
        let mut blitter = PalettedBlitter::new(20, 20);
        let (store, font) = assets_fixture();
        {
            let mut gfx = Gfx::new(
                &mut blitter,
                GfxAssets {
                    sprites: &store,
                    layouter: &font,
                },
                PixelSurface::screen(20, 20, 20),
            );
            let square = [
                Point::new(2, 2),
                Point::new(8, 2),
                Point::new(8, 8),
                Point::new(2, 8),
            ];
            gfx.fill_polygon(&square, FillRectMode::Opaque(PixelColour(7)));
        }
        assert_eq!(blitter.pixel(2, 2), PixelColour(7));
        assert_eq!(blitter.pixel(7, 7), PixelColour(7));
        assert_eq!(blitter.pixel(8, 5), PixelColour(0));
        assert_eq!(blitter.pixel(5, 8), PixelColour(0));
        assert_eq!(blitter.pixel(1, 5), PixelColour(0));
    }

    #[test]
    fn polygon_uses_the_even_odd_rule() {
        // Square ring drawn as one outline that doubles back on itself.
        let outline = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(0, 0),
            Point::new(3, 3),
            Point::new(3, 7),
            Point::new(7, 7),
            Point::new(7, 3),
            Point::new(3, 3),
        ];
        let blitter = recorded(20, 20, |gfx| {
            gfx.fill_polygon(&outline, FillRectMode::Opaque(PixelColour(7)));
        });
        assert!(blitter.touched.contains(&(1, 5)));
        assert!(blitter.touched.contains(&(8, 5)));
        assert!(!blitter.touched.contains(&(5, 5)));
    }

    #[test]
    fn degenerate_polygons_draw_nothing() {
        let blitter = recorded(20, 20, |gfx| {
            gfx.fill_polygon(&[Point::new(0, 0), Point::new(5, 5)], FillRectMode::Opaque(PixelColour(1)));
            gfx.fill_polygon(
                &[Point::new(0, 4), Point::new(5, 4), Point::new(9, 4)],
                FillRectMode::Opaque(PixelColour(1)),
            );
        });
        assert!(blitter.calls.is_empty());
    }

    #[test]
    fn lines_far_off_screen_never_reach_the_blitter() {
        let blitter = recorded(100, 100, |gfx| {
            let style = LineStyle::solid(PixelColour(1));
            gfx.draw_line(Point::new(-1000, -1000), Point::new(-900, -900), style);
            gfx.draw_line(Point::new(50, -60), Point::new(160, 50), style);
        });
        assert!(blitter.calls.is_empty());
    }

    #[test]
    fn lines_crossing_the_screen_are_drawn_in_local_coordinates() {
        let (store, font) = assets_fixture();
        let mut blitter = RecordingBlitter::new(100);
        {
            let mut gfx = Gfx::new(
                &mut blitter,
                GfxAssets {
                    sprites: &store,
                    layouter: &font,
                },
                PixelSurface::screen(100, 100, 100),
            );
            gfx.with_clip(-10, -10, 50, 50, |gfx| {
                gfx.draw_line(Point::new(0, 0), Point::new(40, 30), LineStyle::solid(PixelColour(1)));
            });
        }
        assert_eq!(
            blitter.calls,
            vec![BlitterCall::Line {
                from: Point::new(-10, -10),
                to: Point::new(30, 20)
            }]
        );
    }

    #[test]
    fn rect_outline_draws_four_edges() {
        let blitter = recorded(50, 50, |gfx| {
            gfx.draw_rect_outline(Rect::new(5, 5, 15, 10), LineStyle::solid(PixelColour(1)));
        });
        assert_eq!(blitter.calls.len(), 4);
    }
}
