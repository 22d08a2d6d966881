use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::palette::{
    Palette, RecolourId, RecolourMap, PALETTE_ALL_BLACK, PALETTE_CRASH, PALETTE_TEAM_BASE,
    PALETTE_TO_TRANSPARENT, TEAM_RAMP_COUNT,
};
use crate::text::{BitmapFont, FontSize, GlyphId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start with '/'")]
    LeadingSlash,
    #[error("sprite key must not contain '\\\\'")]
    Backslash,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("invalid sprite key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: SpriteKeyError,
    },
    #[error("sprite key '{key}' is already registered")]
    DuplicateKey { key: String },
    #[error("sprite must be at least 1x1, got {width}x{height}")]
    EmptySprite { width: u16, height: u16 },
    #[error("sprite data holds {actual} pixels but {width}x{height} needs {expected}")]
    DataSize {
        width: u16,
        height: u16,
        expected: usize,
        actual: usize,
    },
}

pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(SpriteKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|&ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        Some(character) => Err(SpriteKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

/// Paletted sprite authored at the finest zoom level. Pixel value 0 is
/// transparent. Offsets place the top-left corner relative to the draw point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub width: u16,
    pub height: u16,
    pub x_offs: i16,
    pub y_offs: i16,
    data: Vec<u8>,
}

impl Sprite {
    pub fn new(
        width: u16,
        height: u16,
        x_offs: i16,
        y_offs: i16,
        data: Vec<u8>,
    ) -> Result<Self, SpriteError> {
        if width == 0 || height == 0 {
            return Err(SpriteError::EmptySprite { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SpriteError::DataSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            x_offs,
            y_offs,
            data,
        })
    }

    /// Solid block of one palette index.
    pub fn filled(
        width: u16,
        height: u16,
        x_offs: i16,
        y_offs: i16,
        colour: u8,
    ) -> Result<Self, SpriteError> {
        Self::new(
            width,
            height,
            x_offs,
            y_offs,
            vec![colour; width as usize * height as usize],
        )
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Sprite and glyph source used by the drawing code.
pub trait SpriteCache {
    fn sprite(&self, id: SpriteId) -> Option<&Sprite>;

    fn recolour(&self, id: RecolourId) -> Option<&RecolourMap>;

    fn glyph(&self, size: FontSize, glyph: GlyphId) -> Option<&Sprite>;

    /// Horizontal advance of a glyph, 0 when unknown.
    fn glyph_width(&self, size: FontSize, glyph: GlyphId) -> i32;
}

/// In-memory [`SpriteCache`] keyed by validated string names.
#[derive(Debug, Clone)]
pub struct SpriteStore {
    sprites: Vec<Sprite>,
    keys: HashMap<String, SpriteId>,
    recolours: BTreeMap<RecolourId, RecolourMap>,
    glyphs: Vec<BTreeMap<GlyphId, Sprite>>,
}

impl SpriteStore {
    /// Store with the built-in recolour tables and the bitmap font glyphs.
    pub fn new(palette: &Palette) -> Self {
        let mut recolours = BTreeMap::new();
        recolours.insert(PALETTE_TO_TRANSPARENT, RecolourMap::darken(palette));
        recolours.insert(PALETTE_CRASH, RecolourMap::greyscale(palette));
        recolours.insert(PALETTE_ALL_BLACK, RecolourMap::all_black());
        for team in 0..TEAM_RAMP_COUNT {
            recolours.insert(
                RecolourId(PALETTE_TEAM_BASE.0 + team as u32),
                RecolourMap::team(team),
            );
        }

        let glyphs = FontSize::ALL
            .iter()
            .map(|size| {
                BitmapFont::glyph_ids()
                    .filter_map(|glyph| {
                        BitmapFont::render_glyph(*size, glyph).map(|sprite| (glyph, sprite))
                    })
                    .collect()
            })
            .collect();

        Self {
            sprites: Vec::new(),
            keys: HashMap::new(),
            recolours,
            glyphs,
        }
    }

    pub fn insert(&mut self, key: &str, sprite: Sprite) -> Result<SpriteId, SpriteError> {
        validate_sprite_key(key).map_err(|source| SpriteError::InvalidKey {
            key: key.to_string(),
            source,
        })?;
        if self.keys.contains_key(key) {
            return Err(SpriteError::DuplicateKey {
                key: key.to_string(),
            });
        }
        let id = SpriteId(self.sprites.len() as u32);
        self.sprites.push(sprite);
        self.keys.insert(key.to_string(), id);
        debug!(key, id = id.0, "sprite_registered");
        Ok(id)
    }

    pub fn id(&self, key: &str) -> Option<SpriteId> {
        self.keys.get(key).copied()
    }

    /// Key a sprite was registered under.
    pub fn key(&self, id: SpriteId) -> Option<&str> {
        self.keys
            .iter()
            .find(|(_, registered)| **registered == id)
            .map(|(key, _)| key.as_str())
    }

    pub fn set_recolour(&mut self, id: RecolourId, map: RecolourMap) {
        self.recolours.insert(id, map);
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl SpriteCache for SpriteStore {
    fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id.0 as usize)
    }

    fn recolour(&self, id: RecolourId) -> Option<&RecolourMap> {
        self.recolours.get(&id)
    }

    fn glyph(&self, size: FontSize, glyph: GlyphId) -> Option<&Sprite> {
        if let Some(id) = glyph.sprite_id() {
            return self.sprite(id);
        }
        self.glyphs.get(size.index())?.get(&glyph)
    }

    fn glyph_width(&self, size: FontSize, glyph: GlyphId) -> i32 {
        match glyph.sprite_id() {
            Some(id) => self.sprite(id).map_or(0, |sprite| sprite.width as i32),
            None if self.glyph(size, glyph).is_some() => BitmapFont::advance(size),
            None => 0,
        }
    }
}
