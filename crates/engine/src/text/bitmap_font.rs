use crate::palette::TextColour;
use crate::sprite::Sprite;

use super::{FontSize, FontSpec, GlyphId, GlyphPosition, Layout, LayoutLine, Layouter, VisualRun};

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const FIRST_GLYPH: char = ' ';
const LAST_GLYPH: char = '~';
/// Glyph pixel value; the string remap turns it into the text colour.
const INK: u8 = 1;

/// Rows of each printable ASCII glyph, most significant bit on the left.
const GLYPH_ROWS: [[u8; GLYPH_HEIGHT as usize]; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], // space
    [0b010, 0b010, 0b010, 0b000, 0b010], // !
    [0b101, 0b101, 0b000, 0b000, 0b000], // "
    [0b101, 0b111, 0b101, 0b111, 0b101], // #
    [0b111, 0b110, 0b111, 0b011, 0b111], // $
    [0b101, 0b001, 0b010, 0b100, 0b101], // %
    [0b010, 0b101, 0b010, 0b101, 0b011], // &
    [0b010, 0b010, 0b000, 0b000, 0b000], // '
    [0b001, 0b010, 0b010, 0b010, 0b001], // (
    [0b100, 0b010, 0b010, 0b010, 0b100], // )
    [0b000, 0b101, 0b010, 0b101, 0b000], // *
    [0b000, 0b010, 0b111, 0b010, 0b000], // +
    [0b000, 0b000, 0b000, 0b010, 0b100], // ,
    [0b000, 0b000, 0b111, 0b000, 0b000], // -
    [0b000, 0b000, 0b000, 0b000, 0b010], // .
    [0b001, 0b001, 0b010, 0b100, 0b100], // /
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
    [0b000, 0b010, 0b000, 0b010, 0b000], // :
    [0b000, 0b010, 0b000, 0b010, 0b100], // ;
    [0b001, 0b010, 0b100, 0b010, 0b001], // <
    [0b000, 0b111, 0b000, 0b111, 0b000], // =
    [0b100, 0b010, 0b001, 0b010, 0b100], // >
    [0b111, 0b001, 0b011, 0b000, 0b010], // ?
    [0b111, 0b101, 0b111, 0b100, 0b111], // @
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b111, 0b100, 0b100, 0b100, 0b111], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b110, 0b100, 0b111], // E
    [0b111, 0b100, 0b110, 0b100, 0b100], // F
    [0b111, 0b100, 0b101, 0b101, 0b111], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b111, 0b001, 0b001, 0b101, 0b111], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b101, 0b111, 0b111, 0b111, 0b101], // N
    [0b111, 0b101, 0b101, 0b101, 0b111], // O
    [0b110, 0b101, 0b110, 0b100, 0b100], // P
    [0b111, 0b101, 0b101, 0b111, 0b001], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b111, 0b100, 0b111, 0b001, 0b111], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b101, 0b010], // V
    [0b101, 0b101, 0b111, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b010, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
    [0b110, 0b100, 0b100, 0b100, 0b110], // [
    [0b100, 0b100, 0b010, 0b001, 0b001], // \
    [0b011, 0b001, 0b001, 0b001, 0b011], // ]
    [0b010, 0b101, 0b000, 0b000, 0b000], // ^
    [0b000, 0b000, 0b000, 0b000, 0b111], // _
    [0b100, 0b010, 0b000, 0b000, 0b000], // `
    [0b000, 0b111, 0b001, 0b111, 0b111], // a
    [0b100, 0b100, 0b110, 0b101, 0b110], // b
    [0b000, 0b111, 0b100, 0b100, 0b111], // c
    [0b001, 0b001, 0b111, 0b101, 0b111], // d
    [0b000, 0b111, 0b110, 0b100, 0b111], // e
    [0b011, 0b100, 0b110, 0b100, 0b100], // f
    [0b000, 0b111, 0b101, 0b111, 0b001], // g
    [0b100, 0b100, 0b110, 0b101, 0b101], // h
    [0b010, 0b000, 0b010, 0b010, 0b010], // i
    [0b001, 0b000, 0b001, 0b101, 0b010], // j
    [0b100, 0b101, 0b110, 0b101, 0b101], // k
    [0b100, 0b100, 0b100, 0b100, 0b111], // l
    [0b000, 0b110, 0b111, 0b101, 0b101], // m
    [0b000, 0b110, 0b101, 0b101, 0b101], // n
    [0b000, 0b111, 0b101, 0b101, 0b111], // o
    [0b000, 0b110, 0b101, 0b110, 0b100], // p
    [0b000, 0b111, 0b101, 0b111, 0b001], // q
    [0b000, 0b110, 0b101, 0b100, 0b100], // r
    [0b000, 0b111, 0b110, 0b001, 0b111], // s
    [0b010, 0b111, 0b010, 0b010, 0b011], // t
    [0b000, 0b101, 0b101, 0b101, 0b111], // u
    [0b000, 0b101, 0b101, 0b101, 0b010], // v
    [0b000, 0b101, 0b101, 0b111, 0b010], // w
    [0b000, 0b101, 0b010, 0b010, 0b101], // x
    [0b000, 0b101, 0b101, 0b111, 0b001], // y
    [0b000, 0b111, 0b001, 0b010, 0b111], // z
    [0b011, 0b010, 0b110, 0b010, 0b011], // {
    [0b010, 0b010, 0b010, 0b010, 0b010], // |
    [0b110, 0b010, 0b011, 0b010, 0b110], // }
    [0b000, 0b011, 0b110, 0b000, 0b000], // ~
];

/// Monospace font built from a 3x5 pixel glyph table.
///
/// Acts as both the [`Layouter`] and the source of glyph sprites. Lines wrap
/// on spaces and break on `\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    pub fn new() -> Self {
        Self
    }

    pub const fn scale(size: FontSize) -> i32 {
        match size {
            FontSize::Small => 1,
            FontSize::Normal | FontSize::Mono => 2,
            FontSize::Large => 3,
        }
    }

    pub const fn advance(size: FontSize) -> i32 {
        (GLYPH_WIDTH + 1) * Self::scale(size)
    }

    pub const fn line_height(size: FontSize) -> i32 {
        (GLYPH_HEIGHT + 2) * Self::scale(size)
    }

    /// Every glyph id this font can produce, in table order.
    pub fn glyph_ids() -> impl Iterator<Item = GlyphId> {
        (FIRST_GLYPH..=LAST_GLYPH).map(|ch| GlyphId(ch as u32))
    }

    /// Scaled sprite for a glyph, or `None` for ids outside the table.
    pub fn render_glyph(size: FontSize, glyph: GlyphId) -> Option<Sprite> {
        let index = glyph.0.checked_sub(FIRST_GLYPH as u32)? as usize;
        let rows = GLYPH_ROWS.get(index)?;
        let scale = Self::scale(size);
        let width = GLYPH_WIDTH * scale;
        let height = GLYPH_HEIGHT * scale;
        let mut pixels = vec![0u8; (width * height) as usize];
        for y in 0..height {
            let row = rows[(y / scale) as usize];
            for x in 0..width {
                let bit = GLYPH_WIDTH - 1 - x / scale;
                if row & (1 << bit) != 0 {
                    pixels[(y * width + x) as usize] = INK;
                }
            }
        }
        Sprite::new(width as u16, height as u16, 0, scale as i16, pixels).ok()
    }

    fn push_glyphs(run: &mut VisualRun, text: &str, size: FontSize, x: &mut i32) {
        let advance = Self::advance(size);
        for ch in text.chars() {
            run.glyphs.push(glyph_for_char(ch));
            run.positions.push(GlyphPosition {
                left: *x,
                right: *x + advance - 1,
                top: 0,
            });
            *x += advance;
        }
    }

    fn finish_line(&self, text: &str, size: FontSize) -> LayoutLine {
        let mut line = LayoutLine {
            runs: Vec::new(),
            width: 0,
            leading: Self::line_height(size),
        };
        if text.is_empty() {
            return line;
        }
        let mut run = VisualRun {
            font: FontSpec {
                size,
                colour: TextColour::INVALID,
                draw_shadow: true,
            },
            glyphs: Vec::with_capacity(text.len()),
            positions: Vec::with_capacity(text.len()),
        };
        let mut x = 0;
        Self::push_glyphs(&mut run, text, size, &mut x);
        line.width = x;
        line.runs.push(run);
        line
    }

    fn wrap_paragraph(&self, paragraph: &str, max_chars: usize, size: FontSize, out: &mut Vec<LayoutLine>) {
        let mut current = String::new();
        for word in paragraph.split(' ') {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }
            if !current.is_empty() {
                out.push(self.finish_line(&current, size));
                current.clear();
            }
            let mut rest: Vec<char> = word.chars().collect();
            while rest.len() > max_chars {
                let tail = rest.split_off(max_chars);
                out.push(self.finish_line(&rest.iter().collect::<String>(), size));
                rest = tail;
            }
            current.extend(rest);
        }
        out.push(self.finish_line(&current, size));
    }
}

fn glyph_for_char(ch: char) -> GlyphId {
    match ch {
        FIRST_GLYPH..=LAST_GLYPH => GlyphId(ch as u32),
        _ => GlyphId('?' as u32),
    }
}

impl Layouter for BitmapFont {
    fn layout(&self, text: &str, max_width: i32, size: FontSize) -> Layout {
        let advance = Self::advance(size);
        let max_chars = (max_width / advance).max(1) as usize;
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            if max_width == i32::MAX {
                lines.push(self.finish_line(paragraph, size));
            } else {
                self.wrap_paragraph(paragraph, max_chars, size, &mut lines);
            }
        }
        Layout { lines }
    }

    fn character_height(&self, size: FontSize) -> i32 {
        Self::line_height(size)
    }

    fn character_width(&self, size: FontSize, _ch: char) -> i32 {
        Self::advance(size)
    }

    fn glyph_id(&self, ch: char) -> GlyphId {
        glyph_for_char(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &LayoutLine) -> String {
        line.runs
            .iter()
            .flat_map(|run| run.glyphs.iter())
            .filter_map(|glyph| char::from_u32(glyph.0))
            .collect()
    }

    #[test]
    fn glyph_table_covers_printable_ascii() {
        assert_eq!(BitmapFont::glyph_ids().count(), GLYPH_ROWS.len());
        for glyph in BitmapFont::glyph_ids() {
            assert!(BitmapFont::render_glyph(FontSize::Small, glyph).is_some());
        }
        assert!(BitmapFont::render_glyph(FontSize::Small, GlyphId(0x7F)).is_none());
    }

    #[test]
    fn rendered_glyph_scales_rows_and_columns() {
        let sprite = BitmapFont::render_glyph(FontSize::Normal, GlyphId('-' as u32))
            .expect("dash glyph");
        assert_eq!((sprite.width, sprite.height), (6, 10));
        // middle row of '-' is fully lit, first row is empty
        assert_eq!(sprite.pixel(0, 4), INK);
        assert_eq!(sprite.pixel(5, 5), INK);
        assert_eq!(sprite.pixel(0, 0), 0);
    }

    #[test]
    fn unbounded_layout_keeps_one_line_per_paragraph() {
        let layout = BitmapFont::new().layout("ab cd\nef", i32::MAX, FontSize::Small);
        assert_eq!(layout.lines.len(), 2);
        assert_eq!(line_text(&layout.lines[0]), "ab cd");
        assert_eq!(layout.lines[0].width, 5 * BitmapFont::advance(FontSize::Small));
    }

    #[test]
    fn wrapping_breaks_on_spaces_and_splits_long_words() {
        let advance = BitmapFont::advance(FontSize::Small);
        let layout = BitmapFont::new().layout("one two abcdefgh", 4 * advance, FontSize::Small);
        let texts: Vec<String> = layout.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["one", "two", "abcd", "efgh"]);
    }

    #[test]
    fn empty_paragraph_still_takes_a_line() {
        let layout = BitmapFont::new().layout("a\n\nb", i32::MAX, FontSize::Small);
        assert_eq!(layout.lines.len(), 3);
        assert!(layout.lines[1].runs.is_empty());
        assert_eq!(
            layout.bounds().height as i32,
            3 * BitmapFont::line_height(FontSize::Small)
        );
    }

    #[test]
    fn positions_are_inclusive_on_the_right() {
        let layout = BitmapFont::new().layout("ab", i32::MAX, FontSize::Large);
        let positions = &layout.lines[0].runs[0].positions;
        let advance = BitmapFont::advance(FontSize::Large);
        assert_eq!(positions[0].right, advance - 1);
        assert_eq!(positions[1].left, advance);
    }
}
