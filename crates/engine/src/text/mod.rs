//! Text layout types and measurement helpers.
//!
//! A [`Layouter`] turns a string into lines of visual runs with positioned
//! glyphs; drawing those lines onto a surface lives in `gfx::text`.

mod bitmap_font;

use bitflags::bitflags;

use crate::geometry::Dimension;
use crate::palette::TextColour;
use crate::sprite::SpriteId;

pub use bitmap_font::BitmapFont;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontSize {
    #[default]
    Normal,
    Small,
    Large,
    Mono,
}

impl FontSize {
    pub const ALL: [FontSize; 4] = [
        FontSize::Normal,
        FontSize::Small,
        FontSize::Large,
        FontSize::Mono,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Glyph identifier within a font. Glyphs with [`GlyphId::SPRITE_FLAG`] set
/// are inline sprites and never cast a shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphId(pub u32);

impl GlyphId {
    pub const SPRITE_FLAG: u32 = 1 << 30;
    /// Empty slot in a run; skipped when drawing.
    pub const INVALID: GlyphId = GlyphId(0xFFFF);

    pub const fn sprite(id: SpriteId) -> GlyphId {
        GlyphId(id.0 | Self::SPRITE_FLAG)
    }

    pub const fn is_sprite(self) -> bool {
        self.0 & Self::SPRITE_FLAG != 0
    }

    pub const fn sprite_id(self) -> Option<SpriteId> {
        if self.is_sprite() {
            Some(SpriteId(self.0 & !Self::SPRITE_FLAG))
        } else {
            None
        }
    }
}

/// Horizontal span of a glyph relative to the line origin. `right` is
/// inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphPosition {
    pub left: i32,
    pub right: i32,
    pub top: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSpec {
    pub size: FontSize,
    /// `TextColour::INVALID` means "use the caller's colour".
    pub colour: TextColour,
    pub draw_shadow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualRun {
    pub font: FontSpec,
    pub glyphs: Vec<GlyphId>,
    pub positions: Vec<GlyphPosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutLine {
    pub runs: Vec<VisualRun>,
    pub width: i32,
    pub leading: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub lines: Vec<LayoutLine>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Widest line by the summed height of all lines.
    pub fn bounds(&self) -> Dimension {
        let mut bounds = Dimension::default();
        for line in &self.lines {
            bounds.width = bounds.width.max(line.width.max(0) as u32);
            bounds.height += line.leading.max(0) as u32;
        }
        bounds
    }
}

/// Text shaping collaborator.
pub trait Layouter {
    /// Lays `text` out into lines no wider than `max_width` where possible.
    fn layout(&self, text: &str, max_width: i32, size: FontSize) -> Layout;

    fn character_height(&self, size: FontSize) -> i32;

    fn character_width(&self, size: FontSize, ch: char) -> i32;

    fn glyph_id(&self, ch: char) -> GlyphId;

    fn ellipsis(&self) -> &str {
        "..."
    }

    /// Tallest line height over every font size.
    fn max_character_height(&self) -> i32 {
        FontSize::ALL
            .iter()
            .map(|size| self.character_height(*size))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Centre,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Centre,
    Bottom,
}

bitflags! {
    /// String alignment. Left and top are the absence of the other bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StringAlignment: u8 {
        const HOR_CENTER = 0x01;
        const RIGHT = 0x02;
        const VERT_CENTER = 0x04;
        const BOTTOM = 0x08;
        /// Keep the horizontal alignment for right-to-left text.
        const FORCE = 0x10;
        const _ = !0;
    }
}

impl StringAlignment {
    pub const LEFT: StringAlignment = StringAlignment::empty();
    pub const TOP: StringAlignment = StringAlignment::empty();
    pub const CENTER: StringAlignment = StringAlignment::from_bits_retain(
        StringAlignment::HOR_CENTER.bits() | StringAlignment::VERT_CENTER.bits(),
    );
    pub const HOR_MASK: StringAlignment = StringAlignment::from_bits_retain(0x03);
    pub const VERT_MASK: StringAlignment = StringAlignment::from_bits_retain(0x0C);

    pub fn horizontal(self) -> HorizontalAlign {
        match (self & Self::HOR_MASK).bits() {
            0x01 => HorizontalAlign::Centre,
            0x02 => HorizontalAlign::Right,
            _ => HorizontalAlign::Left,
        }
    }

    pub fn vertical(self) -> VerticalAlign {
        match (self & Self::VERT_MASK).bits() {
            0x04 => VerticalAlign::Centre,
            0x08 => VerticalAlign::Bottom,
            _ => VerticalAlign::Top,
        }
    }

    /// Mirrors left and right for right-to-left text unless forced or centred.
    pub fn resolve(self, direction: TextDirection) -> StringAlignment {
        if !self.contains(Self::FORCE)
            && direction == TextDirection::Rtl
            && self.horizontal() != HorizontalAlign::Centre
        {
            self ^ Self::RIGHT
        } else {
            self
        }
    }
}

impl Default for StringAlignment {
    fn default() -> Self {
        StringAlignment::LEFT
    }
}

pub fn string_height(layouter: &dyn Layouter, text: &str, max_width: i32, size: FontSize) -> i32 {
    layouter.layout(text, max_width, size).bounds().height as i32
}

pub fn string_line_count(layouter: &dyn Layouter, text: &str, max_width: i32) -> usize {
    layouter.layout(text, max_width, FontSize::Normal).lines.len()
}

pub fn string_bounding_box(layouter: &dyn Layouter, text: &str, size: FontSize) -> Dimension {
    layouter.layout(text, i32::MAX, size).bounds()
}

pub fn string_list_width(layouter: &dyn Layouter, texts: &[&str]) -> u32 {
    texts
        .iter()
        .map(|text| string_bounding_box(layouter, text, FontSize::Normal).width)
        .max()
        .unwrap_or(0)
}

pub fn string_list_bounding_box(layouter: &dyn Layouter, texts: &[&str]) -> Dimension {
    texts.iter().fold(Dimension::default(), |acc, text| {
        acc.max(string_bounding_box(layouter, text, FontSize::Normal))
    })
}

/// Keeps the suggested width and measures the wrapped height at that width.
pub fn string_multi_line_bounding_box(
    layouter: &dyn Layouter,
    text: &str,
    suggestion: Dimension,
) -> Dimension {
    Dimension {
        width: suggestion.width,
        height: string_height(layouter, text, suggestion.width as i32, FontSize::Normal).max(0)
            as u32,
    }
}
