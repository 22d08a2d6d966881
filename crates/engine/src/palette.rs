use bitflags::bitflags;

/// Index into the 256-entry screen palette. Index 0 is transparent inside
/// sprites and black on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelColour(pub u8);

impl PixelColour {
    pub const BLACK: PixelColour = PixelColour(0);
    pub const DARK_GREY: PixelColour = PixelColour(4);
    pub const GREY: PixelColour = PixelColour(8);
    pub const LIGHT_GREY: PixelColour = PixelColour(11);
    pub const WHITE: PixelColour = PixelColour(15);
    pub const RED: PixelColour = PixelColour(cube_index(5, 0, 0));
    pub const ORANGE: PixelColour = PixelColour(cube_index(5, 2, 0));
    pub const YELLOW: PixelColour = PixelColour(cube_index(5, 5, 0));
    pub const GREEN: PixelColour = PixelColour(cube_index(0, 4, 0));
    pub const DARK_GREEN: PixelColour = PixelColour(cube_index(0, 2, 0));
    pub const BLUE: PixelColour = PixelColour(cube_index(0, 1, 5));
    pub const DARK_BLUE: PixelColour = PixelColour(cube_index(0, 0, 2));
    pub const LIGHT_BLUE: PixelColour = PixelColour(cube_index(2, 4, 5));
    pub const BROWN: PixelColour = PixelColour(cube_index(2, 1, 0));
    pub const LIGHT_BROWN: PixelColour = PixelColour(cube_index(4, 3, 1));
    pub const CREAM: PixelColour = PixelColour(cube_index(5, 5, 3));
    pub const PURPLE: PixelColour = PixelColour(cube_index(3, 0, 4));
    pub const GOLD: PixelColour = PixelColour(cube_index(5, 4, 1));
    pub const SILVER: PixelColour = PixelColour(12);
}

const GREY_RAMP_LEN: usize = 16;
const CUBE_START: usize = 16;
const CUBE_LEVELS: usize = 6;
const CUBE_END: usize = CUBE_START + CUBE_LEVELS * CUBE_LEVELS * CUBE_LEVELS;

/// First index of the eight-step team colour ramps.
pub const TEAM_RAMP_START: u8 = CUBE_END as u8;
pub const TEAM_RAMP_LEN: u8 = 8;
pub const TEAM_RAMP_COUNT: u8 = 3;

const fn cube_index(r: u8, g: u8, b: u8) -> u8 {
    (CUBE_START as u8) + r * 36 + g * 6 + b
}

/// RGBA values for every palette index, used when presenting the paletted
/// screen buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: [[u8; 4]; 256],
}

impl Palette {
    /// Grey ramp, a 6x6x6 colour cube, then three team colour ramps
    /// (red, blue, green).
    pub fn standard() -> Self {
        let mut colours = [[0, 0, 0, 255]; 256];
        for (index, colour) in colours.iter_mut().enumerate().take(GREY_RAMP_LEN) {
            let level = (index * 255 / (GREY_RAMP_LEN - 1)) as u8;
            *colour = [level, level, level, 255];
        }
        for index in CUBE_START..CUBE_END {
            let cube = index - CUBE_START;
            let level = |step: usize| (step * 51) as u8;
            colours[index] = [
                level(cube / 36),
                level((cube / 6) % 6),
                level(cube % 6),
                255,
            ];
        }
        let tints: [[u16; 3]; TEAM_RAMP_COUNT as usize] =
            [[255, 64, 48], [56, 96, 255], [64, 220, 72]];
        for (ramp, tint) in tints.iter().enumerate() {
            for step in 0..TEAM_RAMP_LEN as usize {
                let index = CUBE_END + ramp * TEAM_RAMP_LEN as usize + step;
                let brightness = 64 + step as u16 * 27;
                colours[index] = [
                    (tint[0] * brightness / 255) as u8,
                    (tint[1] * brightness / 255) as u8,
                    (tint[2] * brightness / 255) as u8,
                    255,
                ];
            }
        }
        Self { colours }
    }

    pub fn rgba(&self, colour: PixelColour) -> [u8; 4] {
        self.colours[colour.0 as usize]
    }

    /// Closest opaque palette entry to an RGB triple by squared distance.
    pub fn nearest(&self, rgb: [u8; 3]) -> PixelColour {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (index, colour) in self.colours.iter().enumerate() {
            let distance = (0..3)
                .map(|channel| {
                    let delta = colour[channel] as i32 - rgb[channel] as i32;
                    (delta * delta) as u32
                })
                .sum::<u32>();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        PixelColour(best as u8)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

/// Identifier of a recolour table held by the sprite cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecolourId(pub u32);

/// Darkens whatever is already on screen.
pub const PALETTE_TO_TRANSPARENT: RecolourId = RecolourId(1);
/// Greyscale wreck colouring.
pub const PALETTE_CRASH: RecolourId = RecolourId(2);
pub const PALETTE_ALL_BLACK: RecolourId = RecolourId(3);
/// Team colour remaps start here, one per team ramp.
pub const PALETTE_TEAM_BASE: RecolourId = RecolourId(16);

/// Palette index to palette index remapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecolourMap([u8; 256]);

impl RecolourMap {
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (index, entry) in table.iter_mut().enumerate() {
            *entry = index as u8;
        }
        Self(table)
    }

    pub fn from_fn(mut map: impl FnMut(u8) -> u8) -> Self {
        let mut table = [0u8; 256];
        for (index, entry) in table.iter_mut().enumerate() {
            *entry = map(index as u8);
        }
        Self(table)
    }

    pub fn darken(palette: &Palette) -> Self {
        Self::from_fn(|index| {
            let [r, g, b, _] = palette.rgba(PixelColour(index));
            palette
                .nearest([
                    (r as u16 * 5 / 8) as u8,
                    (g as u16 * 5 / 8) as u8,
                    (b as u16 * 5 / 8) as u8,
                ])
                .0
        })
    }

    pub fn greyscale(palette: &Palette) -> Self {
        Self::from_fn(|index| {
            if index == 0 {
                return 0;
            }
            let [r, g, b, _] = palette.rgba(PixelColour(index));
            let luma = ((r as u32 * 30 + g as u32 * 59 + b as u32 * 11) / 100) as usize;
            (1 + luma * (GREY_RAMP_LEN - 2) / 255) as u8
        })
    }

    /// Keeps transparency, paints everything else black.
    pub fn all_black() -> Self {
        Self::from_fn(|index| if index == 0 { 0 } else { 1 })
    }

    /// Moves the first team ramp onto ramp `team` (wrapping).
    pub fn team(team: u8) -> Self {
        let target = TEAM_RAMP_START + (team % TEAM_RAMP_COUNT) * TEAM_RAMP_LEN;
        Self::from_fn(|index| {
            if (TEAM_RAMP_START..TEAM_RAMP_START + TEAM_RAMP_LEN).contains(&index) {
                target + (index - TEAM_RAMP_START)
            } else {
                index
            }
        })
    }

    pub fn get(&self, index: u8) -> u8 {
        self.0[index as usize]
    }

    pub fn set(&mut self, index: u8, value: u8) {
        self.0[index as usize] = value;
    }
}

impl Default for RecolourMap {
    fn default() -> Self {
        Self::identity()
    }
}

bitflags! {
    /// Text colour: a base colour in the low byte plus modifier bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextColour: u16 {
        /// The low byte is a raw palette index rather than a text colour.
        const IS_PALETTE_COLOUR = 0x100;
        const NO_SHADE = 0x200;
        /// Overrides colours embedded in the laid out runs.
        const FORCED = 0x400;
        const _ = !0;
    }
}

impl TextColour {
    pub const BLUE: TextColour = TextColour::from_bits_retain(0x00);
    pub const SILVER: TextColour = TextColour::from_bits_retain(0x01);
    pub const GOLD: TextColour = TextColour::from_bits_retain(0x02);
    pub const RED: TextColour = TextColour::from_bits_retain(0x03);
    pub const PURPLE: TextColour = TextColour::from_bits_retain(0x04);
    pub const LIGHT_BROWN: TextColour = TextColour::from_bits_retain(0x05);
    pub const ORANGE: TextColour = TextColour::from_bits_retain(0x06);
    pub const GREEN: TextColour = TextColour::from_bits_retain(0x07);
    pub const YELLOW: TextColour = TextColour::from_bits_retain(0x08);
    pub const DARK_GREEN: TextColour = TextColour::from_bits_retain(0x09);
    pub const CREAM: TextColour = TextColour::from_bits_retain(0x0A);
    pub const BROWN: TextColour = TextColour::from_bits_retain(0x0B);
    pub const WHITE: TextColour = TextColour::from_bits_retain(0x0C);
    pub const LIGHT_BLUE: TextColour = TextColour::from_bits_retain(0x0D);
    pub const GREY: TextColour = TextColour::from_bits_retain(0x0E);
    pub const DARK_BLUE: TextColour = TextColour::from_bits_retain(0x0F);
    pub const BLACK: TextColour = TextColour::from_bits_retain(0x10);
    pub const INVALID: TextColour = TextColour::from_bits_retain(0xFF);

    const MODIFIERS: TextColour = TextColour::from_bits_retain(
        TextColour::IS_PALETTE_COLOUR.bits() | TextColour::NO_SHADE.bits() | TextColour::FORCED.bits(),
    );

    /// Raw palette index used as a text colour.
    pub const fn palette(colour: PixelColour) -> TextColour {
        TextColour::from_bits_retain(colour.0 as u16 | TextColour::IS_PALETTE_COLOUR.bits())
    }

    /// Colour with every modifier bit cleared.
    pub fn base(self) -> u16 {
        (self & !Self::MODIFIERS).bits()
    }

    /// Whether glyphs in this colour get a drop shadow.
    pub fn has_shadow(self) -> bool {
        !self.contains(TextColour::NO_SHADE) && self != TextColour::BLACK
    }
}

/// Screen colour of each base text colour.
pub const TEXT_COLOUR_MAP: [PixelColour; 17] = [
    PixelColour::BLUE,
    PixelColour::SILVER,
    PixelColour::GOLD,
    PixelColour::RED,
    PixelColour::PURPLE,
    PixelColour::LIGHT_BROWN,
    PixelColour::ORANGE,
    PixelColour::GREEN,
    PixelColour::YELLOW,
    PixelColour::DARK_GREEN,
    PixelColour::CREAM,
    PixelColour::BROWN,
    PixelColour::WHITE,
    PixelColour::LIGHT_BLUE,
    PixelColour::GREY,
    PixelColour::DARK_BLUE,
    PixelColour(1),
];

/// How a sprite's pixels are coloured when blitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteSpec {
    None,
    Recolour(RecolourId),
    Text(TextColour),
    /// Sprite acts as a mask that remaps what is already on screen.
    Transparent(RecolourId),
}
