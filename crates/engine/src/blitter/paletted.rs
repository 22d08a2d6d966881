use crate::geometry::{Point, Rect};
use crate::palette::{PixelColour, RecolourMap};
use crate::zoom::ZoomLevel;

use super::{
    draw_line_generic, Blitter, BlitterMode, BlitterParams, LineStyle, PixelOffset, ScreenBlitter,
};

/// 8 bits per pixel blitter over an owned palette-index buffer.
#[derive(Debug, Clone, Default)]
pub struct PalettedBlitter {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PalettedBlitter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> PixelColour {
        PixelColour(self.pixels[y as usize * self.width as usize + x as usize])
    }

    fn index(&self, dst: PixelOffset, x: i32, y: i32) -> usize {
        self.move_to(dst, x, y)
    }
}

impl Blitter for PalettedBlitter {
    fn screen_depth(&self) -> u8 {
        8
    }

    fn move_to(&self, dst: PixelOffset, x: i32, y: i32) -> PixelOffset {
        let offset = y as isize * self.width as isize + x as isize;
        (dst as isize + offset) as PixelOffset
    }

    fn set_pixel(&mut self, dst: PixelOffset, x: i32, y: i32, colour: PixelColour) {
        let index = self.index(dst, x, y);
        self.pixels[index] = colour.0;
    }

    fn set_horizontal_line(&mut self, dst: PixelOffset, width: i32, colour: PixelColour) {
        self.pixels[dst..dst + width as usize].fill(colour.0);
    }

    fn draw_rect(&mut self, dst: PixelOffset, width: i32, height: i32, colour: PixelColour) {
        for row in 0..height {
            let start = self.index(dst, 0, row);
            self.pixels[start..start + width as usize].fill(colour.0);
        }
    }

    fn draw_colour_mapping_rect(
        &mut self,
        dst: PixelOffset,
        width: i32,
        height: i32,
        remap: &RecolourMap,
    ) {
        for row in 0..height {
            let start = self.index(dst, 0, row);
            for pixel in &mut self.pixels[start..start + width as usize] {
                *pixel = remap.get(*pixel);
            }
        }
    }

    fn draw_line(
        &mut self,
        dst: PixelOffset,
        from: Point,
        to: Point,
        screen_width: i32,
        screen_height: i32,
        style: LineStyle,
    ) {
        let pitch = self.width as isize;
        let pixels = &mut self.pixels;
        draw_line_generic(
            from,
            to,
            screen_width,
            screen_height,
            style.width,
            style.dash,
            |x, y| {
                let index = dst as isize + y as isize * pitch + x as isize;
                pixels[index as usize] = style.colour.0;
            },
        );
    }

    fn copy_to_buffer(&self, src: PixelOffset, buffer: &mut [u8], width: i32, height: i32) {
        let width = width as usize;
        for row in 0..height {
            let start = self.index(src, 0, row);
            let out = row as usize * width;
            buffer[out..out + width].copy_from_slice(&self.pixels[start..start + width]);
        }
    }

    fn copy_from_buffer(&mut self, dst: PixelOffset, buffer: &[u8], width: i32, height: i32) {
        let width = width as usize;
        for row in 0..height {
            let start = self.index(dst, 0, row);
            let input = row as usize * width;
            self.pixels[start..start + width].copy_from_slice(&buffer[input..input + width]);
        }
    }

    fn scroll_buffer(&mut self, dst: PixelOffset, area: Rect, scroll_x: i32, scroll_y: i32) -> Rect {
        let mut left = area.left;
        let mut top = area.top;
        let mut width = area.width();
        let mut height = area.height();
        let mut src_left = left;

        if scroll_x >= 0 {
            left += scroll_x;
            width -= scroll_x;
        } else {
            src_left -= scroll_x;
            width += scroll_x;
        }
        if scroll_y > 0 {
            top += scroll_y;
            height -= scroll_y;
        } else {
            height += scroll_y;
        }
        if width <= 0 || height <= 0 {
            return Rect::from_size(left, top, 0, 0);
        }

        let src_top = top - scroll_y;
        let row_len = width as usize;
        let rows: Box<dyn Iterator<Item = i32>> = if scroll_y > 0 {
            Box::new((0..height).rev())
        } else {
            Box::new(0..height)
        };
        for row in rows {
            let from = self.index(dst, src_left, src_top + row);
            let to = self.index(dst, left, top + row);
            self.pixels.copy_within(from..from + row_len, to);
        }
        Rect::from_size(left, top, width, height)
    }

    fn draw(&mut self, params: &BlitterParams<'_>, mode: BlitterMode, zoom: ZoomLevel) {
        let shift = zoom.shift();
        let sprite = params.sprite;
        for row in 0..params.height {
            let src_y = ((params.skip_top + row) as u32) << shift;
            let line = self.index(params.dst, params.left, params.top + row);
            for column in 0..params.width {
                let src_x = ((params.skip_left + column) as u32) << shift;
                let colour = sprite.pixel(src_x, src_y);
                if colour == 0 {
                    continue;
                }
                let target = &mut self.pixels[line + column as usize];
                match (mode, params.remap) {
                    (BlitterMode::BlackRemap, _) => *target = 0,
                    (BlitterMode::Normal, _) | (_, None) => *target = colour,
                    (BlitterMode::ColourRemap | BlitterMode::CrashRemap, Some(remap)) => {
                        let mapped = remap.get(colour);
                        if mapped != 0 {
                            *target = mapped;
                        }
                    }
                    (BlitterMode::Transparent | BlitterMode::TransparentRemap, Some(remap)) => {
                        *target = remap.get(*target);
                    }
                }
            }
        }
    }

    fn buffer_size(&self, width: i32, height: i32) -> usize {
        width.max(0) as usize * height.max(0) as usize
    }
}

impl ScreenBlitter for PalettedBlitter {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, 0);
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pitch(&self) -> i32 {
        self.width as i32
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Sprite;

    fn params<'a>(sprite: &'a Sprite, remap: Option<&'a RecolourMap>) -> BlitterParams<'a> {
        BlitterParams {
            sprite,
            skip_left: 0,
            skip_top: 0,
            width: sprite.width as i32,
            height: sprite.height as i32,
            left: 1,
            top: 1,
            dst: 0,
            pitch: 8,
            remap,
        }
    }

    #[test]
    fn normal_draw_skips_transparent_pixels() {
        let mut blitter = PalettedBlitter::new(8, 8);
        blitter.draw_rect(0, 8, 8, PixelColour(3));
        let sprite = Sprite::new(2, 1, 0, 0, vec![0, 9]).expect("sprite");
        blitter.draw(&params(&sprite, None), BlitterMode::Normal, ZoomLevel::In4x);
        assert_eq!(blitter.pixel(1, 1), PixelColour(3));
        assert_eq!(blitter.pixel(2, 1), PixelColour(9));
    }

    #[test]
    fn zoomed_out_draw_samples_every_other_pixel() {
        let mut blitter = PalettedBlitter::new(8, 8);
        let sprite = Sprite::new(4, 1, 0, 0, vec![5, 6, 7, 8]).expect("sprite");
        let mut bp = params(&sprite, None);
        bp.width = 2;
        blitter.draw(&bp, BlitterMode::Normal, ZoomLevel::In2x);
        assert_eq!(blitter.pixel(1, 1), PixelColour(5));
        assert_eq!(blitter.pixel(2, 1), PixelColour(7));
    }

    #[test]
    fn transparent_mode_remaps_the_screen_not_the_sprite() {
        let mut blitter = PalettedBlitter::new(8, 8);
        blitter.draw_rect(0, 8, 8, PixelColour(10));
        let remap = RecolourMap::from_fn(|index| index / 2);
        let sprite = Sprite::filled(1, 1, 0, 0, 200).expect("sprite");
        blitter.draw(&params(&sprite, Some(&remap)), BlitterMode::Transparent, ZoomLevel::In4x);
        assert_eq!(blitter.pixel(1, 1), PixelColour(5));
    }

    #[test]
    fn colour_remap_skips_pixels_mapped_to_zero() {
        let mut blitter = PalettedBlitter::new(8, 8);
        blitter.draw_rect(0, 8, 8, PixelColour(4));
        let mut remap = RecolourMap::identity();
        remap.set(2, 0);
        remap.set(1, 77);
        let sprite = Sprite::new(2, 1, 0, 0, vec![1, 2]).expect("sprite");
        blitter.draw(&params(&sprite, Some(&remap)), BlitterMode::ColourRemap, ZoomLevel::In4x);
        assert_eq!(blitter.pixel(1, 1), PixelColour(77));
        assert_eq!(blitter.pixel(2, 1), PixelColour(4));
    }

    #[test]
    fn copy_round_trips_a_region() {
        let mut blitter = PalettedBlitter::new(4, 4);
        blitter.set_pixel(0, 1, 1, PixelColour(42));
        let mut backup = vec![0u8; blitter.buffer_size(2, 2)];
        let origin = blitter.move_to(0, 1, 1);
        blitter.copy_to_buffer(origin, &mut backup, 2, 2);
        blitter.draw_rect(0, 4, 4, PixelColour(1));
        blitter.copy_from_buffer(origin, &backup, 2, 2);
        assert_eq!(blitter.pixel(1, 1), PixelColour(42));
        assert_eq!(blitter.pixel(2, 2), PixelColour(0));
        assert_eq!(blitter.pixel(0, 0), PixelColour(1));
    }

    #[test]
    fn scroll_moves_pixels_and_reports_the_target_area() {
        let mut blitter = PalettedBlitter::new(4, 4);
        blitter.set_pixel(0, 0, 0, PixelColour(9));
        let moved = blitter.scroll_buffer(0, Rect::from_size(0, 0, 4, 4), 1, 2);
        assert_eq!(moved, Rect::from_size(1, 2, 3, 2));
        assert_eq!(blitter.pixel(1, 2), PixelColour(9));
    }

    #[test]
    fn scroll_up_and_left_copies_in_forward_order() {
        let mut blitter = PalettedBlitter::new(4, 4);
        blitter.set_pixel(0, 3, 3, PixelColour(6));
        blitter.set_pixel(0, 2, 2, PixelColour(5));
        let moved = blitter.scroll_buffer(0, Rect::from_size(0, 0, 4, 4), -1, -1);
        assert_eq!(moved, Rect::from_size(0, 0, 3, 3));
        assert_eq!(blitter.pixel(2, 2), PixelColour(6));
        assert_eq!(blitter.pixel(1, 1), PixelColour(5));
    }
}
