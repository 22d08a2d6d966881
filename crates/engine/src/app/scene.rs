use std::collections::BTreeSet;

use crate::cursor::CursorController;
use crate::dirty::DirtyBlocks;
use crate::geometry::Rect;
use crate::gfx::Gfx;
use crate::perf::PerformanceRegistry;
use crate::sprite::{SpriteId, SpriteStore};

use super::InputSnapshot;

/// What a scene may touch while the simulation runs.
pub struct SceneContext<'a> {
    pub sprites: &'a SpriteStore,
    pub dirty: &'a mut DirtyBlocks,
    pub cursor: &'a mut CursorController,
    pub perf: &'a PerformanceRegistry,
    pub screen_width: i32,
    pub screen_height: i32,
    /// Completed dirty-block flushes so far.
    pub generation: u32,
    pub fixed_dt_seconds: f32,
}

pub trait Scene {
    /// Registers sprites, picks the mouse cursor and sets up initial state.
    /// Runs once before the first tick.
    fn load(
        &mut self,
        sprites: &mut SpriteStore,
        cursor: &mut CursorController,
        screen_width: i32,
        screen_height: i32,
    );

    /// One fixed simulation step. Anything that changes on screen must be
    /// marked in `ctx.dirty`.
    fn update(&mut self, input: &InputSnapshot, ctx: &mut SceneContext<'_>);

    /// Repaints `rect` (right and bottom exclusive) in screen coordinates.
    fn paint(&mut self, gfx: &mut Gfx<'_>, rect: Rect);

    /// The window size changed; the whole screen is repainted afterwards.
    fn resized(&mut self, _width: i32, _height: i32) {}

    /// Sprites found under the pointer by a pick request.
    fn sprites_picked(&mut self, _picked: &BTreeSet<SpriteId>, _sprites: &SpriteStore) {}

    fn unload(&mut self) {}
}
