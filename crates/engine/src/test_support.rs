//! Recording collaborators for unit tests.

use std::collections::BTreeSet;

use crate::blitter::{Blitter, BlitterMode, BlitterParams, LineStyle, PixelOffset};
use crate::geometry::{Point, Rect};
use crate::palette::{PixelColour, RecolourMap};
use crate::video::VideoDriver;
use crate::zoom::ZoomLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlitterCall {
    SetPixel { x: i32, y: i32 },
    HorizontalLine { x: i32, y: i32, width: i32 },
    Rect { x: i32, y: i32, width: i32, height: i32 },
    ColourMappingRect { x: i32, y: i32, width: i32, height: i32 },
    Line { from: Point, to: Point },
    Sprite { x: i32, y: i32, width: i32, height: i32, mode: BlitterMode },
}

/// Blitter that stores nothing but the calls made to it and the screen
/// coordinates they touched.
#[derive(Debug, Default)]
pub(crate) struct RecordingBlitter {
    pitch: i32,
    pub calls: Vec<BlitterCall>,
    pub touched: BTreeSet<(i32, i32)>,
}

impl RecordingBlitter {
    pub fn new(pitch: i32) -> Self {
        Self {
            pitch,
            ..Self::default()
        }
    }

    fn position(&self, dst: PixelOffset) -> (i32, i32) {
        let dst = dst as i32;
        (dst % self.pitch, dst / self.pitch)
    }

    fn touch_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        for row in y..y + height {
            for column in x..x + width {
                self.touched.insert((column, row));
            }
        }
    }
}

impl Blitter for RecordingBlitter {
    fn screen_depth(&self) -> u8 {
        8
    }

    fn move_to(&self, dst: PixelOffset, x: i32, y: i32) -> PixelOffset {
        (dst as i32 + y * self.pitch + x) as PixelOffset
    }

    fn set_pixel(&mut self, dst: PixelOffset, x: i32, y: i32, _colour: PixelColour) {
        let (x, y) = self.position(self.move_to(dst, x, y));
        self.calls.push(BlitterCall::SetPixel { x, y });
        self.touched.insert((x, y));
    }

    fn set_horizontal_line(&mut self, dst: PixelOffset, width: i32, _colour: PixelColour) {
        let (x, y) = self.position(dst);
        self.calls.push(BlitterCall::HorizontalLine { x, y, width });
        self.touch_rect(x, y, width, 1);
    }

    fn draw_rect(&mut self, dst: PixelOffset, width: i32, height: i32, _colour: PixelColour) {
        let (x, y) = self.position(dst);
        self.calls.push(BlitterCall::Rect {
            x,
            y,
            width,
            height,
        });
        self.touch_rect(x, y, width, height);
    }

    fn draw_colour_mapping_rect(
        &mut self,
        dst: PixelOffset,
        width: i32,
        height: i32,
        _remap: &RecolourMap,
    ) {
        let (x, y) = self.position(dst);
        self.calls.push(BlitterCall::ColourMappingRect {
            x,
            y,
            width,
            height,
        });
        self.touch_rect(x, y, width, height);
    }

    fn draw_line(
        &mut self,
        _dst: PixelOffset,
        from: Point,
        to: Point,
        _screen_width: i32,
        _screen_height: i32,
        _style: LineStyle,
    ) {
        self.calls.push(BlitterCall::Line { from, to });
    }

    fn copy_to_buffer(&self, _src: PixelOffset, _buffer: &mut [u8], _width: i32, _height: i32) {}

    fn copy_from_buffer(&mut self, _dst: PixelOffset, _buffer: &[u8], _width: i32, _height: i32) {}

    fn scroll_buffer(&mut self, _dst: PixelOffset, area: Rect, _scroll_x: i32, _scroll_y: i32) -> Rect {
        area
    }

    fn draw(&mut self, params: &BlitterParams<'_>, mode: BlitterMode, _zoom: ZoomLevel) {
        let (x, y) = self.position(self.move_to(params.dst, params.left, params.top));
        self.calls.push(BlitterCall::Sprite {
            x,
            y,
            width: params.width,
            height: params.height,
            mode,
        });
        self.touch_rect(x, y, params.width, params.height);
    }

    fn buffer_size(&self, width: i32, height: i32) -> usize {
        (width * height).max(0) as usize
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingVideoDriver {
    pub dirty: Vec<Rect>,
    pub system_cursor: bool,
}

impl VideoDriver for RecordingVideoDriver {
    fn make_dirty(&mut self, left: i32, top: i32, width: i32, height: i32) {
        self.dirty.push(Rect::from_size(left, top, width, height));
    }

    fn use_system_cursor(&self) -> bool {
        self.system_cursor
    }
}
