//! Drawing context and the primitives drawn through it.
//!
//! A [`Gfx`] pairs a blitter with the surface currently being drawn on. Code
//! that wants a smaller clip window derives a sub-surface and draws inside
//! [`Gfx::with_surface`]; the previous surface comes back afterwards.

mod scan;
mod sprite;
mod text;

use crate::blitter::{Blitter, BlitterMode, BlitterParams, PixelOffset};
use crate::palette::RecolourMap;
use crate::sprite::{Sprite, SpriteCache, SpriteId};
use crate::surface::PixelSurface;
use crate::text::{Layouter, TextDirection};
use crate::zoom::ZoomLevel;

pub use scan::FillRectMode;
pub use sprite::{
    blitter_mode_for, compute_blit_rect, draw_sprite_to_rgba_buffer, sprite_size, BlitObserver,
    BlitRect, BlitScale, SpritePicker, SubSprite,
};
pub use text::TextStyle;

/// Read-only collaborators every drawing call may need.
#[derive(Clone, Copy)]
pub struct GfxAssets<'a> {
    pub sprites: &'a dyn SpriteCache,
    pub layouter: &'a dyn Layouter,
}

pub struct Gfx<'a> {
    blitter: &'a mut dyn Blitter,
    assets: GfxAssets<'a>,
    surface: PixelSurface,
    text_direction: TextDirection,
    string_remap: RecolourMap,
    observer: Option<&'a mut dyn BlitObserver>,
}

/// Where the remap table of a sprite blit comes from.
#[derive(Clone, Copy)]
enum RemapSource<'r> {
    None,
    /// The text colour table set up by the last string colour change.
    String,
    Table(&'r RecolourMap),
}

impl<'a> Gfx<'a> {
    pub fn new(blitter: &'a mut dyn Blitter, assets: GfxAssets<'a>, surface: PixelSurface) -> Self {
        Self {
            blitter,
            assets,
            surface,
            text_direction: TextDirection::Ltr,
            string_remap: RecolourMap::identity(),
            observer: None,
        }
    }

    pub fn with_text_direction(mut self, direction: TextDirection) -> Self {
        self.text_direction = direction;
        self
    }

    /// Reports every named sprite blit to `observer` as well as drawing it.
    pub fn with_observer(mut self, observer: &'a mut dyn BlitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn assets(&self) -> GfxAssets<'a> {
        self.assets
    }

    pub fn text_direction(&self) -> TextDirection {
        self.text_direction
    }

    pub fn blitter(&mut self) -> &mut dyn Blitter {
        &mut *self.blitter
    }

    /// Sub-surface of the current one, see [`PixelSurface::clip`].
    pub fn clip_surface(&self, left: i32, top: i32, width: i32, height: i32) -> Option<PixelSurface> {
        self.surface.clip(&*self.blitter, left, top, width, height)
    }

    /// Runs `draw` against `surface`, restoring the current surface after.
    pub fn with_surface<R>(&mut self, surface: PixelSurface, draw: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.surface, surface);
        let result = draw(self);
        self.surface = previous;
        result
    }

    /// Clips to the given area and runs `draw` there; `None` if nothing of
    /// the area is visible.
    pub fn with_clip<R>(
        &mut self,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        draw: impl FnOnce(&mut Self) -> R,
    ) -> Option<R> {
        let surface = self.clip_surface(left, top, width, height)?;
        Some(self.with_surface(surface, draw))
    }

    #[allow(clippy::too_many_arguments)]
    fn blit(
        &mut self,
        sprite: &Sprite,
        x: i32,
        y: i32,
        mode: BlitterMode,
        remap: RemapSource<'_>,
        sub: Option<&SubSprite>,
        sprite_id: Option<SpriteId>,
        zoom: ZoomLevel,
        scale: BlitScale,
    ) {
        let Some(rect) = compute_blit_rect(sprite, x, y, sub, zoom, scale, &self.surface) else {
            return;
        };

        if let (Some(id), Some(observer)) = (sprite_id, self.observer.as_deref_mut()) {
            let top_left: PixelOffset = self.blitter.move_to(self.surface.dst, rect.left, rect.top);
            let bottom_right = self.blitter.move_to(top_left, rect.width - 1, rect.height - 1);
            observer.sprite_blitted(id, top_left, bottom_right, rect.width, self.surface.pitch);
        }

        let remap = match remap {
            RemapSource::None => None,
            RemapSource::String => Some(&self.string_remap),
            RemapSource::Table(table) => Some(table),
        };
        let params = BlitterParams {
            sprite,
            skip_left: rect.skip_left,
            skip_top: rect.skip_top,
            width: rect.width,
            height: rect.height,
            left: rect.left,
            top: rect.top,
            dst: self.surface.dst,
            pitch: self.surface.pitch,
            remap,
        };
        self.blitter.draw(&params, mode, zoom);
    }
}
