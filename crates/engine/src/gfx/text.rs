use crate::blitter::BlitterMode;
use crate::geometry::{centre_bounds, round_div_su, Rect};
use crate::palette::{PixelColour, TextColour, TEXT_COLOUR_MAP};
use crate::text::{
    FontSize, GlyphId, HorizontalAlign, LayoutLine, StringAlignment, TextDirection, VerticalAlign,
};
use crate::zoom::ZoomLevel;

use super::{BlitScale, FillRectMode, Gfx, RemapSource};

/// Distance between a glyph and its drop shadow.
const SHADOW_OFFSET: i32 = 1;
const UNDERLINE_THICKNESS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub colour: TextColour,
    pub align: StringAlignment,
    pub underline: bool,
    pub size: FontSize,
}

impl TextStyle {
    pub const fn new(colour: TextColour) -> Self {
        Self {
            colour,
            align: StringAlignment::LEFT,
            underline: false,
            size: FontSize::Normal,
        }
    }

    pub const fn aligned(mut self, align: StringAlignment) -> Self {
        self.align = align;
        self
    }

    pub const fn sized(mut self, size: FontSize) -> Self {
        self.size = size;
        self
    }

    pub const fn underlined(mut self) -> Self {
        self.underline = true;
        self
    }
}

/// Horizontal limits a pass may draw glyphs in, when truncating.
#[derive(Debug, Clone, Copy)]
struct GlyphWindow {
    min_x: i32,
    max_x: i32,
}

impl Gfx<'_> {
    /// Points the text remap at `colour`: index 1 becomes the text colour and
    /// index 2 the shade. `TextColour::INVALID` leaves the remap untouched.
    pub fn set_colour_remap(&mut self, colour: TextColour) {
        if colour == TextColour::INVALID {
            return;
        }
        let no_shade = colour.contains(TextColour::NO_SHADE) || colour == TextColour::BLACK;
        let raw = colour.contains(TextColour::IS_PALETTE_COLOUR);
        let base = colour.base();

        let text = if raw {
            base as u8
        } else {
            TEXT_COLOUR_MAP
                .get(base as usize)
                .copied()
                .unwrap_or(PixelColour::WHITE)
                .0
        };
        self.string_remap.set(1, text);
        self.string_remap.set(2, if no_shade { 0 } else { 1 });
    }

    /// Draws one laid out line between `left` and `right` (inclusive) at
    /// `y`. With `truncation` set, a line too wide for the span loses
    /// glyphs at its end and gains an ellipsis.
    ///
    /// Returns the left edge of the drawn text for right-aligned lines and
    /// the right edge otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_layout_line(
        &mut self,
        line: &LayoutLine,
        y: i32,
        left: i32,
        right: i32,
        align: StringAlignment,
        underline: bool,
        truncation: bool,
        default_colour: TextColour,
    ) -> i32 {
        if line.runs.is_empty() {
            return 0;
        }

        let layouter = self.assets.layouter;
        let rtl = self.text_direction == TextDirection::Rtl;
        let mut left = left;
        let mut right = right;
        let mut width = line.width;
        let max_width = right - left + 1;
        let mut window = GlyphWindow {
            min_x: left,
            max_x: right,
        };
        let mut offset_x = 0;

        let truncation = truncation && max_width < width;
        let mut ellipsis = None;
        if truncation {
            let size = line.runs[0].font.size;
            let dots = layouter
                .layout(layouter.ellipsis(), i32::MAX, size)
                .lines
                .into_iter()
                .next()
                .unwrap_or_default();
            let dots_width = dots.width;
            if max_width < dots_width {
                return if rtl { left } else { right };
            }
            if rtl {
                window.min_x += dots_width;
                offset_x = width - max_width;
            } else {
                window.max_x -= dots_width;
            }
            width = max_width;
            ellipsis = Some((dots, dots_width));
        }

        let align = align.resolve(self.text_direction);
        match align.horizontal() {
            HorizontalAlign::Left => right = left + width - 1,
            HorizontalAlign::Centre => {
                left = round_div_su(right + 1 + left - width, 2);
                right = left + width - 1;
            }
            HorizontalAlign::Right => left = right + 1 - width,
        }

        for shadow in [true, false] {
            let window = truncation.then_some(window);
            let last_colour = self.draw_line_pass(line, shadow, left - offset_x, y, window, default_colour);
            if let Some((dots, dots_width)) = &ellipsis {
                let x = if rtl { left } else { right + 1 - dots_width };
                self.draw_line_pass(dots, shadow, x, y, None, last_colour);
            }
        }

        if underline {
            let top = y + line.leading;
            self.fill_rect(
                left,
                top,
                right,
                top + UNDERLINE_THICKNESS - 1,
                FillRectMode::Opaque(PixelColour::BLACK),
            );
        }

        if align.horizontal() == HorizontalAlign::Right {
            left
        } else {
            right
        }
    }

    /// One shadow or foreground pass over a line. Returns the colour of the
    /// last run so trailing decorations can match it.
    fn draw_line_pass(
        &mut self,
        line: &LayoutLine,
        shadow: bool,
        left: i32,
        y: i32,
        window: Option<GlyphWindow>,
        initial_colour: TextColour,
    ) -> TextColour {
        let sprites = self.assets.sprites;
        let dpi_left = self.surface.left;
        let dpi_right = self.surface.left + self.surface.width - 1;
        let offset = if shadow { SHADOW_OFFSET } else { 0 };
        let mut last_colour = initial_colour;

        for run in &line.runs {
            let colour = if run.font.colour == TextColour::INVALID
                || initial_colour.contains(TextColour::FORCED)
            {
                initial_colour
            } else {
                run.font.colour
            };
            last_colour = colour;

            self.set_colour_remap(if shadow { TextColour::BLACK } else { colour });
            if shadow && (!run.font.draw_shadow || !colour.has_shadow()) {
                continue;
            }

            for (glyph, position) in run.glyphs.iter().zip(&run.positions) {
                if *glyph == GlyphId::INVALID {
                    continue;
                }
                let begin_x = position.left + left;
                let end_x = position.right + left;
                let top = position.top + y;

                if let Some(window) = window {
                    if begin_x < window.min_x || end_x > window.max_x {
                        continue;
                    }
                }

                let Some(sprite) = sprites.glyph(run.font.size, *glyph) else {
                    continue;
                };
                let x_offs = sprite.x_offs as i32;
                if begin_x + x_offs > dpi_right || begin_x + x_offs + sprite.width as i32 - 1 < dpi_left {
                    continue;
                }
                if shadow && glyph.is_sprite() {
                    continue;
                }

                self.blit(
                    sprite,
                    begin_x + offset,
                    top + offset,
                    BlitterMode::ColourRemap,
                    RemapSource::String,
                    None,
                    None,
                    ZoomLevel::MIN,
                    BlitScale::SCREEN,
                );
            }
        }
        last_colour
    }

    /// Draws the first line of `text` between `left` and `right`
    /// (inclusive), truncating it with an ellipsis when it does not fit.
    /// Returns 0 when nothing was drawn, otherwise as
    /// [`Gfx::draw_layout_line`].
    pub fn draw_string(&mut self, left: i32, right: i32, top: i32, text: &str, style: TextStyle) -> i32 {
        let layouter = self.assets.layouter;
        let max_height = layouter.max_character_height();
        let extra = max_height / 2;
        let surface = self.surface;
        if surface.top + surface.height + extra < top
            || surface.top > top + max_height + extra
            || surface.left + surface.width + extra < left
            || surface.left > right + extra
        {
            return 0;
        }

        let layout = layouter.layout(text, i32::MAX, style.size);
        let Some(line) = layout.lines.first() else {
            return 0;
        };
        self.draw_layout_line(line, top, left, right, style.align, style.underline, true, style.colour)
    }

    /// Word-wraps `text` into the box and draws every line that fits
    /// completely. Returns the top of the first drawn line for bottom
    /// alignment, otherwise the bottom of the last drawn line.
    pub fn draw_string_multi_line(
        &mut self,
        left: i32,
        right: i32,
        top: i32,
        bottom: i32,
        text: &str,
        style: TextStyle,
    ) -> i32 {
        let max_width = right - left + 1;
        let max_height = bottom - top + 1;
        if max_height <= 0 {
            return top;
        }

        let layout = self.assets.layouter.layout(text, max_width, style.size);
        let total_height = layout.bounds().height as i32;
        let vertical = style.align.vertical();
        let mut y = match vertical {
            VerticalAlign::Top => top,
            VerticalAlign::Centre => round_div_su(bottom + top - total_height, 2),
            VerticalAlign::Bottom => bottom - total_height,
        };

        let mut first_line = bottom;
        let mut last_line = top;
        for line in &layout.lines {
            let leading = line.leading;
            if y >= top && y + leading - 1 <= bottom {
                last_line = y + leading;
                first_line = first_line.min(y);
                self.draw_layout_line(line, y, left, right, style.align, style.underline, false, style.colour);
            }
            y += leading;
        }

        if vertical == VerticalAlign::Bottom {
            first_line
        } else {
            last_line
        }
    }

    /// As [`Gfx::draw_string_multi_line`], skipping layout entirely when the
    /// box is nowhere near the surface. Returns whether anything was tried.
    pub fn draw_string_multi_line_with_clipping(
        &mut self,
        left: i32,
        right: i32,
        top: i32,
        bottom: i32,
        text: &str,
        style: TextStyle,
    ) -> bool {
        let extra = self.assets.layouter.max_character_height() / 2;
        let surface = self.surface;
        if surface.top + surface.height + extra < top
            || surface.top > bottom + extra
            || surface.left + surface.width + extra < left
            || surface.left > right + extra
        {
            return false;
        }
        self.draw_string_multi_line(left, right, top, bottom, text, style);
        true
    }

    /// Draws one normal-size character centred in `rect` (inclusive edges).
    pub fn draw_char_centered(&mut self, ch: char, rect: Rect, colour: TextColour) {
        let layouter = self.assets.layouter;
        let sprites = self.assets.sprites;
        self.set_colour_remap(colour);

        let Some(sprite) = sprites.glyph(FontSize::Normal, layouter.glyph_id(ch)) else {
            return;
        };
        let x = centre_bounds(rect.left, rect.right, layouter.character_width(FontSize::Normal, ch));
        let y = centre_bounds(rect.top, rect.bottom, layouter.character_height(FontSize::Normal));
        self.blit(
            sprite,
            x,
            y,
            BlitterMode::ColourRemap,
            RemapSource::String,
            None,
            None,
            ZoomLevel::MIN,
            BlitScale::SCREEN,
        );
    }
}
