use std::collections::BTreeSet;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::blitter::{Blitter, BlitterMode, BlitterParams, PalettedBlitter, PixelOffset};
use crate::geometry::{Dimension, Point};
use crate::palette::{
    Palette, PaletteSpec, RecolourId, PALETTE_ALL_BLACK, PALETTE_CRASH, PALETTE_TO_TRANSPARENT,
};
use crate::sprite::{Sprite, SpriteCache, SpriteId};
use crate::surface::PixelSurface;
use crate::zoom::{
    scale_by_zoom, unscale_by_zoom, unscale_by_zoom_lower, ZoomLevel, ZOOM_BASE,
};

use super::{Gfx, RemapSource};

/// Coordinate convention of a sprite blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitScale {
    /// Sub-sprite bounds are multiplied by this to get sprite pixels.
    pub zoom_base: i32,
    /// Positions are device pixels that still need scaling by the zoom,
    /// rather than virtual coordinates.
    pub scaled: bool,
}

impl BlitScale {
    /// GUI drawing: device pixel positions, sub-sprites in sprite pixels.
    pub const SCREEN: BlitScale = BlitScale {
        zoom_base: 1,
        scaled: true,
    };
    /// World drawing: virtual positions, sub-sprites in normal-zoom pixels.
    pub const VIEWPORT: BlitScale = BlitScale {
        zoom_base: ZOOM_BASE,
        scaled: false,
    };
}

/// Part of a sprite to draw, inclusive on all edges, relative to the
/// sprite's draw point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubSprite {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Result of clipping a sprite against a surface, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub skip_left: i32,
    pub skip_top: i32,
}

/// Clips `sprite`, drawn at `x, y`, against `surface`. `None` when nothing
/// of it is visible.
pub fn compute_blit_rect(
    sprite: &Sprite,
    x: i32,
    y: i32,
    sub: Option<&SubSprite>,
    zoom: ZoomLevel,
    scale: BlitScale,
    surface: &PixelSurface,
) -> Option<BlitRect> {
    let (mut x, mut y) = if scale.scaled {
        (scale_by_zoom(x, zoom), scale_by_zoom(y, zoom))
    } else {
        (x, y)
    };
    x += sprite.x_offs as i32;
    y += sprite.y_offs as i32;

    let sprite_width = sprite.width as i32;
    let sprite_height = sprite.height as i32;

    let (mut skip_left, mut skip_top, mut width, mut height) = match sub {
        None => (
            0,
            0,
            unscale_by_zoom(sprite_width, zoom),
            unscale_by_zoom(sprite_height, zoom),
        ),
        Some(sub) => {
            let base = scale.zoom_base;
            let x_offs = sprite.x_offs as i32;
            let y_offs = sprite.y_offs as i32;
            let clip_left = (-x_offs + sub.left * base).max(0);
            let clip_top = (-y_offs + sub.top * base).max(0);
            let clip_right = (sprite_width - (-x_offs + (sub.right + 1) * base)).max(0);
            let clip_bottom = (sprite_height - (-y_offs + (sub.bottom + 1) * base)).max(0);

            if clip_left + clip_right >= sprite_width || clip_top + clip_bottom >= sprite_height {
                return None;
            }

            let skip_left = unscale_by_zoom_lower(clip_left, zoom);
            let skip_top = unscale_by_zoom_lower(clip_top, zoom);
            x += scale_by_zoom(skip_left, zoom);
            y += scale_by_zoom(skip_top, zoom);
            (
                skip_left,
                skip_top,
                unscale_by_zoom(sprite_width - clip_left - clip_right, zoom),
                unscale_by_zoom(sprite_height - clip_top - clip_bottom, zoom),
            )
        }
    };

    if width <= 0 || height <= 0 {
        return None;
    }

    let to_virtual = |device: i32| if scale.scaled { scale_by_zoom(device, zoom) } else { device };

    y -= to_virtual(surface.top);
    let y_unscaled = unscale_by_zoom(y, zoom);
    let mut top = 0;
    if y < 0 {
        height -= -y_unscaled;
        if height <= 0 {
            return None;
        }
        skip_top += -y_unscaled;
        y = 0;
    } else {
        top = y_unscaled;
    }
    y += if scale.scaled {
        scale_by_zoom(height - surface.height, zoom)
    } else {
        scale_by_zoom(height, zoom) - surface.height
    };
    if y > 0 {
        height -= unscale_by_zoom(y, zoom);
        if height <= 0 {
            return None;
        }
    }

    x -= to_virtual(surface.left);
    let x_unscaled = unscale_by_zoom(x, zoom);
    let mut left = 0;
    if x < 0 {
        width -= -x_unscaled;
        if width <= 0 {
            return None;
        }
        skip_left += -x_unscaled;
        x = 0;
    } else {
        left = x_unscaled;
    }
    x += if scale.scaled {
        scale_by_zoom(width - surface.width, zoom)
    } else {
        scale_by_zoom(width, zoom) - surface.width
    };
    if x > 0 {
        width -= unscale_by_zoom(x, zoom);
        if width <= 0 {
            return None;
        }
    }

    Some(BlitRect {
        left,
        top,
        width,
        height,
        skip_left,
        skip_top,
    })
}

/// Blitter mode for drawing through a recolour table.
pub fn blitter_mode_for(id: RecolourId) -> BlitterMode {
    match id {
        PALETTE_CRASH => BlitterMode::CrashRemap,
        PALETTE_ALL_BLACK => BlitterMode::BlackRemap,
        _ => BlitterMode::ColourRemap,
    }
}

/// Offset of the sprite's top-left corner from its draw point and its size,
/// both in device pixels at `zoom`.
pub fn sprite_size(sprites: &dyn SpriteCache, id: SpriteId, zoom: ZoomLevel) -> Option<(Point, Dimension)> {
    let sprite = sprites.sprite(id)?;
    let offset = Point::new(
        unscale_by_zoom(sprite.x_offs as i32, zoom),
        unscale_by_zoom(sprite.y_offs as i32, zoom),
    );
    let size = Dimension::new(
        unscale_by_zoom(sprite.width as i32, zoom).max(0) as u32,
        unscale_by_zoom(sprite.height as i32, zoom).max(0) as u32,
    );
    Some((offset, size))
}

/// Renders a whole sprite at `zoom` into an RGBA image, mapping palette
/// index 0 to fully transparent.
pub fn draw_sprite_to_rgba_buffer(
    sprites: &dyn SpriteCache,
    palette: &Palette,
    id: SpriteId,
    zoom: ZoomLevel,
) -> Option<RgbaImage> {
    let sprite = sprites.sprite(id)?;
    let (_, size) = sprite_size(sprites, id, zoom)?;

    let mut scratch = PalettedBlitter::new(size.width, size.height);
    let params = BlitterParams {
        sprite,
        skip_left: 0,
        skip_top: 0,
        width: size.width as i32,
        height: size.height as i32,
        left: 0,
        top: 0,
        dst: 0,
        pitch: size.width as i32,
        remap: None,
    };
    scratch.draw(&params, BlitterMode::Normal, zoom);

    Some(RgbaImage::from_fn(size.width, size.height, |x, y| {
        let colour = scratch.pixel(x, y);
        if colour.0 == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba(palette.rgba(colour))
        }
    }))
}

/// Sees every sprite blit that carries a sprite id.
pub trait BlitObserver {
    /// `top_left` and `bottom_right` bound the clipped blit in the screen
    /// buffer; `width` is its width in pixels.
    fn sprite_blitted(
        &mut self,
        id: SpriteId,
        top_left: PixelOffset,
        bottom_right: PixelOffset,
        width: i32,
        pitch: i32,
    );
}

/// Collects the sprites whose blit rectangle covers one screen pixel.
#[derive(Debug, Clone, Default)]
pub struct SpritePicker {
    clicked: PixelOffset,
    picked: BTreeSet<SpriteId>,
}

impl SpritePicker {
    pub fn new(clicked: PixelOffset) -> Self {
        Self {
            clicked,
            picked: BTreeSet::new(),
        }
    }

    pub fn picked(&self) -> &BTreeSet<SpriteId> {
        &self.picked
    }

    pub fn into_picked(self) -> BTreeSet<SpriteId> {
        self.picked
    }
}

impl BlitObserver for SpritePicker {
    fn sprite_blitted(
        &mut self,
        id: SpriteId,
        top_left: PixelOffset,
        bottom_right: PixelOffset,
        width: i32,
        pitch: i32,
    ) {
        if pitch <= 0 || self.clicked < top_left || self.clicked > bottom_right {
            return;
        }
        let column = (self.clicked - top_left) % pitch as usize;
        if column < width.max(0) as usize {
            self.picked.insert(id);
        }
    }
}

impl Gfx<'_> {
    /// Draws a sprite at device pixel position `x, y`, with sub-sprite
    /// bounds in sprite pixels.
    pub fn draw_sprite(
        &mut self,
        id: SpriteId,
        palette: PaletteSpec,
        x: i32,
        y: i32,
        sub: Option<&SubSprite>,
        zoom: ZoomLevel,
    ) {
        self.draw_sprite_scaled(id, palette, x, y, sub, zoom, BlitScale::SCREEN);
    }

    /// Draws a sprite at virtual position `x, y` at the surface zoom, with
    /// sub-sprite bounds in normal-zoom pixels.
    pub fn draw_sprite_viewport(
        &mut self,
        id: SpriteId,
        palette: PaletteSpec,
        x: i32,
        y: i32,
        sub: Option<&SubSprite>,
    ) {
        let zoom = self.surface.zoom;
        self.draw_sprite_scaled(id, palette, x, y, sub, zoom, BlitScale::VIEWPORT);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_sprite_scaled(
        &mut self,
        id: SpriteId,
        palette: PaletteSpec,
        x: i32,
        y: i32,
        sub: Option<&SubSprite>,
        zoom: ZoomLevel,
        scale: BlitScale,
    ) {
        let sprites = self.assets.sprites;
        let Some(sprite) = sprites.sprite(id) else {
            debug!(sprite = id.0, "sprite_missing");
            return;
        };

        let (mode, remap) = match palette {
            PaletteSpec::None => (BlitterMode::Normal, RemapSource::None),
            PaletteSpec::Text(colour) => {
                self.set_colour_remap(colour);
                (BlitterMode::ColourRemap, RemapSource::String)
            }
            PaletteSpec::Transparent(recolour) => {
                let mode = if recolour == PALETTE_TO_TRANSPARENT {
                    BlitterMode::Transparent
                } else {
                    BlitterMode::TransparentRemap
                };
                match sprites.recolour(recolour) {
                    Some(table) => (mode, RemapSource::Table(table)),
                    None => {
                        debug!(recolour = recolour.0, "recolour_missing");
                        (BlitterMode::Normal, RemapSource::None)
                    }
                }
            }
            PaletteSpec::Recolour(recolour) => match sprites.recolour(recolour) {
                Some(table) => (blitter_mode_for(recolour), RemapSource::Table(table)),
                None => {
                    debug!(recolour = recolour.0, "recolour_missing");
                    (BlitterMode::Normal, RemapSource::None)
                }
            },
        };

        self.blit(sprite, x, y, mode, remap, sub, Some(id), zoom, scale);
    }
}
