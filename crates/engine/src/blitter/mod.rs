//! Pixel-format specific drawing backend.
//!
//! The drawing code clips every coordinate before calling into a
//! [`Blitter`]; implementations do no bounds checking of their own.

mod paletted;

use crate::geometry::{Point, Rect};
use crate::palette::{PixelColour, RecolourMap};
use crate::sprite::Sprite;
use crate::zoom::ZoomLevel;

pub use paletted::PalettedBlitter;

/// Position in the screen buffer, in pixels from its start.
pub type PixelOffset = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlitterMode {
    Normal,
    /// Sprite pixels go through the remap; remapped zero is skipped.
    ColourRemap,
    /// Sprite acts as a mask; covered screen pixels go through the remap.
    TransparentRemap,
    Transparent,
    CrashRemap,
    BlackRemap,
}

/// Clipped sprite copy handed to [`Blitter::draw`]. `width`, `height`,
/// `skip_left` and `skip_top` are in destination pixels at the draw zoom;
/// `left`/`top` are relative to `dst`.
#[derive(Debug, Clone, Copy)]
pub struct BlitterParams<'a> {
    pub sprite: &'a Sprite,
    pub skip_left: i32,
    pub skip_top: i32,
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
    pub dst: PixelOffset,
    pub pitch: i32,
    pub remap: Option<&'a RecolourMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStyle {
    pub colour: PixelColour,
    pub width: i32,
    /// Length of dashes and gaps; 0 draws a solid line.
    pub dash: i32,
}

impl LineStyle {
    pub const fn solid(colour: PixelColour) -> Self {
        Self {
            colour,
            width: 1,
            dash: 0,
        }
    }
}

pub trait Blitter {
    fn screen_depth(&self) -> u8;

    fn move_to(&self, dst: PixelOffset, x: i32, y: i32) -> PixelOffset;

    fn set_pixel(&mut self, dst: PixelOffset, x: i32, y: i32, colour: PixelColour);

    fn set_horizontal_line(&mut self, dst: PixelOffset, width: i32, colour: PixelColour);

    fn draw_rect(&mut self, dst: PixelOffset, width: i32, height: i32, colour: PixelColour);

    /// Remaps every pixel already in the rectangle.
    fn draw_colour_mapping_rect(
        &mut self,
        dst: PixelOffset,
        width: i32,
        height: i32,
        remap: &RecolourMap,
    );

    /// Draws a line between two points relative to `dst`, clipped to
    /// `[0, screen_width) x [0, screen_height)`.
    fn draw_line(
        &mut self,
        dst: PixelOffset,
        from: Point,
        to: Point,
        screen_width: i32,
        screen_height: i32,
        style: LineStyle,
    );

    fn copy_to_buffer(&self, src: PixelOffset, buffer: &mut [u8], width: i32, height: i32);

    fn copy_from_buffer(&mut self, dst: PixelOffset, buffer: &[u8], width: i32, height: i32);

    /// Moves the pixels of `area` by the scroll offsets and returns the
    /// destination rectangle that received them.
    fn scroll_buffer(&mut self, dst: PixelOffset, area: Rect, scroll_x: i32, scroll_y: i32)
        -> Rect;

    fn draw(&mut self, params: &BlitterParams<'_>, mode: BlitterMode, zoom: ZoomLevel);

    /// Bytes needed to back up a `width` x `height` area.
    fn buffer_size(&self, width: i32, height: i32) -> usize;
}

/// Blitter that owns the whole screen buffer.
pub trait ScreenBlitter: Blitter {
    fn resize(&mut self, width: u32, height: u32);

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn pitch(&self) -> i32;

    fn pixels(&self) -> &[u8];
}

/// Walks a clipped line of the given width and dash pattern, calling `plot`
/// for every covered pixel inside the screen.
pub fn draw_line_generic(
    from: Point,
    to: Point,
    screen_width: i32,
    screen_height: i32,
    width: i32,
    dash: i32,
    mut plot: impl FnMut(i32, i32),
) {
    let dy = (to.y - from.y) * 2;
    let dx = (to.x - from.x) * 2;
    let (dy, step_y) = if dy < 0 { (-dy, -1) } else { (dy, 1) };
    let (dx, step_x) = if dx < 0 { (-dx, -1) } else { (dx, 1) };

    if dx == 0 && dy == 0 {
        if from.x >= 0 && from.x < screen_width && from.y >= 0 && from.y < screen_height {
            plot(from.x, from.y);
        }
        return;
    }

    let frac_diff = line_frac_diff(width, dx, dy);
    let pattern = DashPattern {
        dash: dash.max(1),
        gap: dash.max(0),
    };

    if dx > dy {
        walk_line(
            MajorAxis {
                start: from.x,
                end: to.x,
                minor_start: from.y,
                minor_end: to.y,
                delta: dx,
                minor_delta: dy,
                step: step_x,
                minor_step: step_y,
                extent: screen_width,
                minor_extent: screen_height,
            },
            frac_diff,
            pattern,
            |major, minor| plot(major, minor),
        );
    } else {
        walk_line(
            MajorAxis {
                start: from.y,
                end: to.y,
                minor_start: from.x,
                minor_end: to.x,
                delta: dy,
                minor_delta: dx,
                step: step_y,
                minor_step: step_x,
                extent: screen_height,
                minor_extent: screen_width,
            },
            frac_diff,
            pattern,
            |major, minor| plot(minor, major),
        );
    }
}

/// `width * sqrt(dx^2 + dy^2)` by bisection, or `width * max(dx, dy)` for
/// hairlines.
fn line_frac_diff(width: i32, dx: i32, dy: i32) -> i32 {
    let mut frac_diff = width * dx.max(dy);
    if width > 1 {
        let width = width as i64;
        let frac_sq = width * width * ((dx as i64) * (dx as i64) + (dy as i64) * (dy as i64));
        let mut frac_max = 3 * frac_diff / 2;
        while frac_diff < frac_max {
            let frac_test = (frac_diff + frac_max) / 2;
            if (frac_test as i64) * (frac_test as i64) < frac_sq {
                frac_diff = frac_test + 1;
            } else {
                frac_max = frac_test - 1;
            }
        }
    }
    frac_diff
}

#[derive(Debug, Clone, Copy)]
struct DashPattern {
    dash: i32,
    gap: i32,
}

#[derive(Debug, Clone, Copy)]
struct MajorAxis {
    start: i32,
    end: i32,
    minor_start: i32,
    minor_end: i32,
    delta: i32,
    minor_delta: i32,
    step: i32,
    minor_step: i32,
    extent: i32,
    minor_extent: i32,
}

fn walk_line(
    axis: MajorAxis,
    frac_diff: i32,
    pattern: DashPattern,
    mut plot: impl FnMut(i32, i32),
) {
    let MajorAxis {
        mut start,
        mut end,
        mut minor_start,
        delta,
        minor_delta,
        mut minor_step,
        extent,
        minor_extent,
        ..
    } = axis;
    if axis.step < 0 {
        std::mem::swap(&mut start, &mut end);
        minor_start = axis.minor_end;
        minor_step = -minor_step;
    }
    if end < 0 || start >= extent {
        return;
    }

    let mut minor_low = minor_start;
    let mut minor_high = minor_start;
    let mut frac_low = minor_delta - frac_diff / 2;
    let mut frac_high = minor_delta + frac_diff / 2;

    while frac_low < -(delta / 2) {
        frac_low += delta;
        minor_low -= minor_step;
    }
    while frac_high >= delta / 2 {
        frac_high -= delta;
        minor_high += minor_step;
    }

    let period = pattern.dash + pattern.gap;
    let mut dash_count = 0;
    if start < 0 {
        dash_count = (-start) % period;
        let skip_ahead = |frac: i32, bound: &mut i32| -> i32 {
            let mut frac = frac as i64 - (minor_delta as i64) * (start as i64);
            if frac >= 0 {
                let quotient = frac / delta as i64;
                let remainder = frac % delta as i64;
                *bound += (1 + quotient as i32) * minor_step;
                frac = remainder - delta as i64;
            }
            frac as i32
        };
        frac_low = skip_ahead(frac_low, &mut minor_low);
        frac_high = skip_ahead(frac_high, &mut minor_high);
        start = 0;
    }
    let end = (end + 1).min(extent);

    while start < end {
        if dash_count < pattern.dash {
            let mut minor = minor_low;
            while minor != minor_high {
                if minor >= 0 && minor < minor_extent {
                    plot(start, minor);
                }
                minor += minor_step;
            }
        }
        if frac_low >= 0 {
            minor_low += minor_step;
            frac_low -= delta;
        }
        if frac_high >= 0 {
            minor_high += minor_step;
            frac_high -= delta;
        }
        start += 1;
        frac_low += minor_delta;
        frac_high += minor_delta;
        dash_count += 1;
        if dash_count >= period {
            dash_count = 0;
        }
    }
}
