//! Sprites painted procedurally at load time. Everything is authored at the
//! finest zoom, where one sprite pixel is one virtual unit.

use tilegfx::cursor::AnimCursorStep;
use tilegfx::palette::{TEAM_RAMP_LEN, TEAM_RAMP_START};
use tilegfx::{PixelColour, Sprite, SpriteError, SpriteId, SpriteStore};

pub(crate) const TILE_SPRITE_WIDTH: u16 = 256;
pub(crate) const TILE_SPRITE_HEIGHT: u16 = 128;

const VEHICLE_SPRITE_WIDTH: u16 = 64;
const VEHICLE_SPRITE_HEIGHT: u16 = 32;
const VEHICLE_ROOF_HALF_WIDTH: i32 = 24;
const VEHICLE_ROOF_HALF_HEIGHT: i32 = 12;
const VEHICLE_SIDE_DEPTH: i32 = 8;

const CURSOR_WIDTH: u16 = 16;
const CURSOR_HEIGHT: u16 = 24;
const CURSOR_TIP_LENGTH: i32 = 18;
const CURSOR_FRAME_TICKS: u8 = 6;
const CURSOR_FRAME_COLOURS: [PixelColour; 4] = [
    PixelColour::WHITE,
    PixelColour::LIGHT_GREY,
    PixelColour::CREAM,
    PixelColour::LIGHT_GREY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TerrainKind {
    Grass,
    Meadow,
    Sand,
    Water,
}

impl TerrainKind {
    pub(crate) const ALL: [TerrainKind; 4] = [
        TerrainKind::Grass,
        TerrainKind::Meadow,
        TerrainKind::Sand,
        TerrainKind::Water,
    ];

    fn key(self) -> &'static str {
        match self {
            TerrainKind::Grass => "terrain/grass",
            TerrainKind::Meadow => "terrain/meadow",
            TerrainKind::Sand => "terrain/sand",
            TerrainKind::Water => "terrain/water",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Fill, rim and detail colours.
    fn colours(self) -> (PixelColour, PixelColour, PixelColour) {
        match self {
            TerrainKind::Grass => (PixelColour::GREEN, PixelColour::DARK_GREEN, PixelColour::DARK_GREEN),
            TerrainKind::Meadow => (PixelColour::DARK_GREEN, PixelColour::BROWN, PixelColour::YELLOW),
            TerrainKind::Sand => (PixelColour::LIGHT_BROWN, PixelColour::BROWN, PixelColour::CREAM),
            TerrainKind::Water => (PixelColour::BLUE, PixelColour::DARK_BLUE, PixelColour::LIGHT_BLUE),
        }
    }
}

/// Direction of travel as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Heading {
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Heading {
    pub(crate) const ALL: [Heading; 4] = [
        Heading::NorthEast,
        Heading::SouthEast,
        Heading::SouthWest,
        Heading::NorthWest,
    ];

    fn key(self) -> &'static str {
        match self {
            Heading::NorthEast => "vehicle/car_ne",
            Heading::SouthEast => "vehicle/car_se",
            Heading::SouthWest => "vehicle/car_sw",
            Heading::NorthWest => "vehicle/car_nw",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Screen-space sign of the front of the vehicle.
    fn screen_sign(self) -> (i32, i32) {
        match self {
            Heading::NorthEast => (1, -1),
            Heading::SouthEast => (1, 1),
            Heading::SouthWest => (-1, 1),
            Heading::NorthWest => (-1, -1),
        }
    }
}

/// Ids of everything the demo registers.
#[derive(Debug, Clone)]
pub(crate) struct DemoSprites {
    terrain: [SpriteId; 4],
    vehicles: [SpriteId; 4],
    cursor: Vec<AnimCursorStep>,
}

impl DemoSprites {
    pub(crate) fn register(store: &mut SpriteStore) -> Result<Self, SpriteError> {
        let mut terrain = [SpriteId(0); 4];
        for kind in TerrainKind::ALL {
            terrain[kind.index()] = store.insert(kind.key(), tile_sprite(kind)?)?;
        }
        let mut vehicles = [SpriteId(0); 4];
        for heading in Heading::ALL {
            vehicles[heading.index()] = store.insert(heading.key(), vehicle_sprite(heading)?)?;
        }
        let mut cursor = Vec::with_capacity(CURSOR_FRAME_COLOURS.len());
        for (frame, colour) in CURSOR_FRAME_COLOURS.iter().enumerate() {
            let sprite = store.insert(&format!("cursor/arrow_{frame}"), cursor_sprite(*colour)?)?;
            cursor.push(AnimCursorStep {
                sprite,
                display_time: CURSOR_FRAME_TICKS,
            });
        }
        Ok(Self {
            terrain,
            vehicles,
            cursor,
        })
    }

    pub(crate) fn terrain(&self, kind: TerrainKind) -> SpriteId {
        self.terrain[kind.index()]
    }

    pub(crate) fn vehicle(&self, heading: Heading) -> SpriteId {
        self.vehicles[heading.index()]
    }

    pub(crate) fn cursor_animation(&self) -> &[AnimCursorStep] {
        &self.cursor
    }
}

/// Whether the pixel `px, py` lies in the diamond centred on `cx, cy`.
fn in_diamond(px: i32, py: i32, cx: i32, cy: i32, half_width: i32, half_height: i32) -> bool {
    diamond_distance(px, py, cx, cy, half_width, half_height) <= 2 * half_width * half_height
}

fn diamond_distance(px: i32, py: i32, cx: i32, cy: i32, half_width: i32, half_height: i32) -> i32 {
    (2 * px + 1 - 2 * cx).abs() * half_height + (2 * py + 1 - 2 * cy).abs() * half_width
}

/// Ground diamond drawn from its north corner.
pub(crate) fn tile_sprite(kind: TerrainKind) -> Result<Sprite, SpriteError> {
    let width = TILE_SPRITE_WIDTH as i32;
    let height = TILE_SPRITE_HEIGHT as i32;
    let (half_width, half_height) = (width / 2, height / 2);
    let limit = 2 * half_width * half_height;
    let rim = limit - limit / 24;
    let (fill, edge, detail) = kind.colours();

    let mut data = vec![0u8; width as usize * height as usize];
    for py in 0..height {
        for px in 0..width {
            let distance = diamond_distance(px, py, half_width, half_height, half_width, half_height);
            if distance > limit {
                continue;
            }
            let colour = if distance > rim {
                edge
            } else if has_detail(kind, px, py) {
                detail
            } else {
                fill
            };
            data[(py * width + px) as usize] = colour.0;
        }
    }
    Sprite::new(
        TILE_SPRITE_WIDTH,
        TILE_SPRITE_HEIGHT,
        -(half_width as i16),
        0,
        data,
    )
}

fn has_detail(kind: TerrainKind, px: i32, py: i32) -> bool {
    match kind {
        TerrainKind::Grass => (px * 7 + py * 13) % 97 == 0,
        TerrainKind::Meadow => (px * 5 + py * 11) % 61 == 0,
        TerrainKind::Sand => (px + py * 3) % 43 == 0,
        TerrainKind::Water => (py / 8 + px / 32) % 4 == 0 && py % 8 == 0,
    }
}

/// Box-shaped car in the first team ramp, so team recolours apply, with
/// a windscreen on the side it drives towards.
pub(crate) fn vehicle_sprite(heading: Heading) -> Result<Sprite, SpriteError> {
    let width = VEHICLE_SPRITE_WIDTH as i32;
    let height = VEHICLE_SPRITE_HEIGHT as i32;
    let cx = width / 2;
    let cy = VEHICLE_ROOF_HALF_HEIGHT;
    let (sign_x, sign_y) = heading.screen_sign();
    let screen_x = cx + sign_x * VEHICLE_ROOF_HALF_WIDTH / 2;
    let screen_y = cy + sign_y * VEHICLE_ROOF_HALF_HEIGHT / 2;
    let roof = TEAM_RAMP_START + TEAM_RAMP_LEN - 2;

    let mut data = vec![0u8; width as usize * height as usize];
    for py in 0..height {
        for px in 0..width {
            let colour = if in_diamond(px, py, cx, cy, VEHICLE_ROOF_HALF_WIDTH, VEHICLE_ROOF_HALF_HEIGHT) {
                if in_diamond(px, py, screen_x, screen_y, 6, 3) {
                    PixelColour::LIGHT_BLUE.0
                } else {
                    roof
                }
            } else if is_vehicle_side(px, py, cx, cy) {
                if px < cx {
                    TEAM_RAMP_START + 3
                } else {
                    TEAM_RAMP_START + 1
                }
            } else {
                continue;
            };
            data[(py * width + px) as usize] = colour;
        }
    }
    Sprite::new(
        VEHICLE_SPRITE_WIDTH,
        VEHICLE_SPRITE_HEIGHT,
        -(cx as i16),
        -(2 * VEHICLE_ROOF_HALF_HEIGHT) as i16,
        data,
    )
}

/// Below the lower half of the roof, at most the side depth down.
fn is_vehicle_side(px: i32, py: i32, cx: i32, cy: i32) -> bool {
    (1..=VEHICLE_SIDE_DEPTH).any(|depth| {
        py - depth >= cy
            && in_diamond(px, py - depth, cx, cy, VEHICLE_ROOF_HALF_WIDTH, VEHICLE_ROOF_HALF_HEIGHT)
    })
}

/// Arrow with its tip on the pointer position.
pub(crate) fn cursor_sprite(fill: PixelColour) -> Result<Sprite, SpriteError> {
    let width = CURSOR_WIDTH as i32;
    let height = CURSOR_HEIGHT as i32;
    let mut data = vec![0u8; width as usize * height as usize];
    for py in 0..height {
        for px in 0..width {
            let head_edge = py * 2 / 3;
            let colour = if py <= CURSOR_TIP_LENGTH && px <= head_edge {
                if px == 0 || px == head_edge || py == CURSOR_TIP_LENGTH {
                    PixelColour::BLACK.0
                } else {
                    fill.0
                }
            } else if py > CURSOR_TIP_LENGTH && (4..=7).contains(&(px - py / 3)) {
                PixelColour::BLACK.0
            } else {
                continue;
            };
            data[(py * width + px) as usize] = colour;
        }
    }
    Sprite::new(CURSOR_WIDTH, CURSOR_HEIGHT, 0, 0, data)
}
