//! Software mouse cursor.
//!
//! The cursor is painted straight onto the screen buffer after everything
//! else. The pixels underneath are saved first so the cursor can be lifted
//! off again without repainting the area.

use tracing::{debug, trace};

use crate::blitter::{Blitter, PixelOffset};
use crate::geometry::{Point, Rect};
use crate::gfx::Gfx;
use crate::palette::PaletteSpec;
use crate::sprite::{SpriteCache, SpriteId};
use crate::video::VideoDriver;
use crate::zoom::{unscale_by_zoom, ZOOM_GUI};

/// One layer of a possibly multi-sprite cursor, offset from the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSprite {
    pub sprite: SpriteId,
    pub palette: PaletteSpec,
    pub pos: Point,
}

impl CursorSprite {
    pub const fn new(sprite: SpriteId, palette: PaletteSpec) -> Self {
        Self {
            sprite,
            palette,
            pos: Point::new(0, 0),
        }
    }
}

/// Frame of an animated cursor; `display_time` is in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimCursorStep {
    pub sprite: SpriteId,
    pub display_time: u8,
}

#[derive(Debug, Default)]
pub struct CursorController {
    pos: Point,
    delta: Point,
    sprites: Vec<CursorSprite>,
    total_offset: Point,
    total_size: Point,
    draw_pos: Point,
    draw_size: Point,
    animate_list: Vec<AnimCursorStep>,
    /// Next frame of `animate_list` to show; `None` restarts the list.
    animate_cur: Option<usize>,
    animate_timeout: u32,
    wheel: i32,
    visible: bool,
    dirty: bool,
    in_window: bool,
    fix_at: bool,
    backup: Vec<u8>,
}

impl CursorController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos(&self) -> Point {
        self.pos
    }

    /// Movement reported by the last position update.
    pub fn delta(&self) -> Point {
        self.delta
    }

    pub fn sprites(&self) -> &[CursorSprite] {
        &self.sprites
    }

    pub fn total_offset(&self) -> Point {
        self.total_offset
    }

    pub fn total_size(&self) -> Point {
        self.total_size
    }

    /// Whether the cursor is currently painted on the screen buffer.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn in_window(&self) -> bool {
        self.in_window
    }

    pub fn set_in_window(&mut self, in_window: bool) {
        self.in_window = in_window;
        self.dirty = true;
    }

    pub fn fix_at(&self) -> bool {
        self.fix_at
    }

    /// While fixed, the pointer stays where it is and only deltas are
    /// reported; used for drag-scrolling.
    pub fn set_fix_at(&mut self, fix_at: bool) {
        self.fix_at = fix_at;
    }

    /// Screen area the painted cursor covers, right and bottom exclusive.
    pub fn draw_rect(&self) -> Rect {
        Rect::from_size(self.draw_pos.x, self.draw_pos.y, self.draw_size.x, self.draw_size.y)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Forgets the painted cursor without restoring the pixels beneath it;
    /// for when the screen buffer was reallocated.
    pub fn invalidate(&mut self) {
        self.visible = false;
    }

    pub fn add_wheel(&mut self, steps: i32) {
        self.wheel = self.wheel.saturating_add(steps);
    }

    /// Wheel movement accumulated since the last call.
    pub fn take_wheel(&mut self) -> i32 {
        std::mem::take(&mut self.wheel)
    }

    /// Records a new pointer position. Returns true when the cursor is fixed
    /// and the OS pointer has to be warped back to `pos`.
    pub fn update_position(&mut self, x: i32, y: i32) -> bool {
        self.delta = Point::new(x - self.pos.x, y - self.pos.y);
        if self.fix_at {
            return self.delta != Point::new(0, 0);
        }
        if self.pos != Point::new(x, y) {
            self.dirty = true;
            self.pos = Point::new(x, y);
        }
        false
    }

    /// Relative motion from a backend that reports deltas directly. Only
    /// meaningful while the cursor is fixed.
    pub fn update_position_relative(&mut self, delta_x: i32, delta_y: i32) {
        if !self.fix_at {
            debug!(delta_x, delta_y, "relative_cursor_motion_ignored");
            return;
        }
        self.delta = Point::new(delta_x, delta_y);
    }

    /// Recomputes the union of all layer rectangles.
    pub fn update_size(&mut self, sprites: &dyn SpriteCache) {
        let mut bounds: Option<(Point, Point)> = None;
        for layer in &self.sprites {
            let Some(sprite) = sprites.sprite(layer.sprite) else {
                debug!(sprite = layer.sprite.0, "sprite_missing");
                continue;
            };
            let offset = Point::new(
                unscale_by_zoom(sprite.x_offs as i32, ZOOM_GUI) + layer.pos.x,
                unscale_by_zoom(sprite.y_offs as i32, ZOOM_GUI) + layer.pos.y,
            );
            let size = Point::new(
                unscale_by_zoom(sprite.width as i32, ZOOM_GUI),
                unscale_by_zoom(sprite.height as i32, ZOOM_GUI),
            );
            bounds = Some(match bounds {
                None => (offset, size),
                Some((total_offset, total_size)) => {
                    let right = (total_offset.x + total_size.x).max(offset.x + size.x);
                    let bottom = (total_offset.y + total_size.y).max(offset.y + size.y);
                    let left = total_offset.x.min(offset.x);
                    let top = total_offset.y.min(offset.y);
                    (Point::new(left, top), Point::new(right - left, bottom - top))
                }
            });
        }
        if let Some((offset, size)) = bounds {
            self.total_offset = offset;
            self.total_size = size;
        }
        self.dirty = true;
    }

    /// Shows a single static sprite.
    pub fn set_mouse_cursor(&mut self, sprites: &dyn SpriteCache, sprite: SpriteId, palette: PaletteSpec) {
        self.animate_timeout = 0;
        self.set_cursor_sprite(sprites, sprite, palette);
    }

    /// Shows several sprites at once, e.g. an icon attached to the pointer.
    pub fn set_cursor_layers(&mut self, sprites: &dyn SpriteCache, layers: Vec<CursorSprite>) {
        self.animate_timeout = 0;
        self.sprites = layers;
        self.update_size(sprites);
    }

    /// Cycles through `table`, starting with its first frame.
    pub fn set_animated_mouse_cursor(&mut self, sprites: &dyn SpriteCache, table: &[AnimCursorStep]) {
        if table.is_empty() {
            debug!("animated_cursor_table_empty");
            return;
        }
        self.animate_list = table.to_vec();
        self.animate_cur = None;
        if let Some(first) = self.sprites.first_mut() {
            first.palette = PaletteSpec::None;
        }
        self.switch_animated_cursor(sprites);
    }

    /// Advances the cursor animation by one tick.
    pub fn tick(&mut self, sprites: &dyn SpriteCache) {
        if self.animate_timeout != 0 {
            self.animate_timeout -= 1;
            if self.animate_timeout == 0 {
                self.switch_animated_cursor(sprites);
            }
        }
    }

    /// Swaps between the normal and the busy pointer. Any other cursor is
    /// left alone.
    pub fn set_busy(&mut self, sprites: &dyn SpriteCache, busy: bool, mouse: SpriteId, busy_sprite: SpriteId) {
        let Some(current) = self.sprites.first().map(|layer| layer.sprite) else {
            return;
        };
        if busy && current == mouse {
            self.set_mouse_cursor(sprites, busy_sprite, PaletteSpec::None);
        } else if !busy && current == busy_sprite {
            self.set_mouse_cursor(sprites, mouse, PaletteSpec::None);
        }
    }

    fn set_cursor_sprite(&mut self, sprites: &dyn SpriteCache, sprite: SpriteId, palette: PaletteSpec) {
        if let [only] = self.sprites.as_slice() {
            if only.sprite == sprite && only.palette == palette {
                return;
            }
        }
        self.sprites.clear();
        self.sprites.push(CursorSprite::new(sprite, palette));
        self.update_size(sprites);
    }

    fn switch_animated_cursor(&mut self, sprites: &dyn SpriteCache) {
        let index = match self.animate_cur {
            Some(index) if index < self.animate_list.len() => index,
            _ => 0,
        };
        let Some(step) = self.animate_list.get(index).copied() else {
            return;
        };
        let palette = self
            .sprites
            .first()
            .map_or(PaletteSpec::None, |layer| layer.palette);
        self.set_cursor_sprite(sprites, step.sprite, palette);
        self.animate_timeout = step.display_time as u32;
        self.animate_cur = Some(index + 1);
    }

    /// Paints the cursor onto the full-screen surface of `gfx`, saving what
    /// it covers. Does nothing when already painted and unchanged.
    pub fn draw(&mut self, gfx: &mut Gfx<'_>, video: &mut dyn VideoDriver) {
        if !self.in_window || video.use_system_cursor() {
            return;
        }
        let screen = *gfx.surface();
        if self.visible {
            if !self.dirty {
                return;
            }
            self.undraw(gfx.blitter(), screen.dst, video);
        }

        let mut left = self.pos.x + self.total_offset.x;
        let mut width = self.total_size.x;
        if left < 0 {
            width += left;
            left = 0;
        }
        if left + width > screen.width {
            width = screen.width - left;
        }
        if width <= 0 {
            return;
        }

        let mut top = self.pos.y + self.total_offset.y;
        let mut height = self.total_size.y;
        if top < 0 {
            height += top;
            top = 0;
        }
        if top + height > screen.height {
            height = screen.height - top;
        }
        if height <= 0 {
            return;
        }

        self.draw_pos = Point::new(left, top);
        self.draw_size = Point::new(width, height);

        let blitter = gfx.blitter();
        let size = blitter.buffer_size(width, height);
        if self.backup.len() < size {
            self.backup.resize(size, 0);
        }
        let under = blitter.move_to(screen.dst, left, top);
        blitter.copy_to_buffer(under, &mut self.backup[..size], width, height);

        for layer in &self.sprites {
            gfx.draw_sprite(
                layer.sprite,
                layer.palette,
                self.pos.x + layer.pos.x,
                self.pos.y + layer.pos.y,
                None,
                ZOOM_GUI,
            );
        }

        video.make_dirty(left, top, width, height);
        self.visible = true;
        self.dirty = false;
        trace!(x = left, y = top, width, height, "cursor_drawn");
    }

    /// Restores the pixels saved by [`CursorController::draw`].
    pub fn undraw(&mut self, blitter: &mut dyn Blitter, screen_dst: PixelOffset, video: &mut dyn VideoDriver) {
        if video.use_system_cursor() || !self.visible {
            return;
        }
        self.visible = false;
        let size = blitter.buffer_size(self.draw_size.x, self.draw_size.y);
        let dst = blitter.move_to(screen_dst, self.draw_pos.x, self.draw_pos.y);
        blitter.copy_from_buffer(dst, &self.backup[..size], self.draw_size.x, self.draw_size.y);
        video.make_dirty(self.draw_pos.x, self.draw_pos.y, self.draw_size.x, self.draw_size.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blitter::{PalettedBlitter, ScreenBlitter};
    use crate::gfx::GfxAssets;
    use crate::palette::{Palette, PixelColour};
    use crate::sprite::{Sprite, SpriteStore};
    use crate::surface::PixelSurface;
    use crate::test_support::RecordingVideoDriver;
    use crate::text::BitmapFont;

    struct Fixture {
        store: SpriteStore,
        font: BitmapFont,
        arrow: SpriteId,
        busy: SpriteId,
        frames: [SpriteId; 2],
    }

    fn fixture() -> Fixture {
        let mut store = SpriteStore::new(&Palette::standard());
        let arrow = store
            .insert("cursor/arrow", Sprite::filled(4, 4, 0, 0, 7).expect("sprite"))
            .expect("insert");
        let busy = store
            .insert("cursor/busy", Sprite::filled(6, 6, -3, -3, 9).expect("sprite"))
            .expect("insert");
        let first = store
            .insert("cursor/anim_0", Sprite::filled(2, 2, 0, 0, 10).expect("sprite"))
            .expect("insert");
        let second = store
            .insert("cursor/anim_1", Sprite::filled(2, 2, 0, 0, 11).expect("sprite"))
            .expect("insert");
        Fixture {
            store,
            font: BitmapFont::new(),
            arrow,
            busy,
            frames: [first, second],
        }
    }

    fn draw(cursor: &mut CursorController, fixture: &Fixture, blitter: &mut PalettedBlitter, video: &mut RecordingVideoDriver) {
        let surface = PixelSurface::screen(blitter.width() as i32, blitter.height() as i32, blitter.pitch());
        let mut gfx = Gfx::new(
            blitter,
            GfxAssets {
                sprites: &fixture.store,
                layouter: &fixture.font,
            },
            surface,
        );
        cursor.draw(&mut gfx, video);
    }

    fn patterned_screen(width: u32, height: u32) -> PalettedBlitter {
        let mut blitter = PalettedBlitter::new(width, height);
        for y in 0..height as i32 {
            let dst = blitter.move_to(0, 0, y);
            blitter.set_horizontal_line(dst, width as i32, PixelColour((y % 5) as u8 + 1));
        }
        blitter
    }

    #[test]
    fn undraw_restores_the_pixels_under_the_cursor() {
        let fixture = fixture();
        let mut blitter = patterned_screen(32, 32);
        let before = blitter.pixels().to_vec();
        let mut video = RecordingVideoDriver::default();
        let mut cursor = CursorController::new();
        cursor.set_in_window(true);
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);
        cursor.update_position(10, 12);

        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert!(cursor.visible());
        assert_eq!(blitter.pixel(10, 12), PixelColour(7));
        assert_eq!(cursor.draw_rect(), Rect::from_size(10, 12, 4, 4));

        cursor.undraw(&mut blitter, 0, &mut video);
        assert!(!cursor.visible());
        assert_eq!(blitter.pixels(), before.as_slice());
        assert_eq!(
            video.dirty,
            vec![Rect::from_size(10, 12, 4, 4), Rect::from_size(10, 12, 4, 4)]
        );
    }

    #[test]
    fn drawn_area_is_clipped_to_the_screen() {
        let fixture = fixture();
        let mut blitter = PalettedBlitter::new(32, 32);
        let mut video = RecordingVideoDriver::default();
        let mut cursor = CursorController::new();
        cursor.set_in_window(true);
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);
        cursor.update_position(-2, 30);

        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert_eq!(cursor.draw_rect(), Rect::from_size(0, 30, 2, 2));

        cursor.update_position(40, 0);
        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert!(!cursor.visible());
    }

    #[test]
    fn unchanged_cursor_is_not_redrawn() {
        let fixture = fixture();
        let mut blitter = PalettedBlitter::new(32, 32);
        let mut video = RecordingVideoDriver::default();
        let mut cursor = CursorController::new();
        cursor.set_in_window(true);
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);

        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert_eq!(video.dirty.len(), 1);

        cursor.update_position(5, 5);
        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert_eq!(video.dirty.len(), 3);
    }

    #[test]
    fn system_cursor_or_leaving_the_window_skips_drawing() {
        let fixture = fixture();
        let mut blitter = PalettedBlitter::new(32, 32);
        let mut video = RecordingVideoDriver::default();
        let mut cursor = CursorController::new();
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);

        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert!(!cursor.visible());

        cursor.set_in_window(true);
        video.system_cursor = true;
        draw(&mut cursor, &fixture, &mut blitter, &mut video);
        assert!(!cursor.visible());
        assert!(video.dirty.is_empty());
    }

    #[test]
    fn size_covers_every_layer() {
        let fixture = fixture();
        let mut cursor = CursorController::new();
        let mut icon = CursorSprite::new(fixture.arrow, PaletteSpec::None);
        icon.pos = Point::new(8, 8);
        cursor.set_cursor_layers(
            &fixture.store,
            vec![CursorSprite::new(fixture.busy, PaletteSpec::None), icon],
        );
        assert_eq!(cursor.total_offset(), Point::new(-3, -3));
        assert_eq!(cursor.total_size(), Point::new(15, 15));
        assert!(cursor.dirty());
    }

    #[test]
    fn animation_cycles_and_wraps_to_the_start() {
        let fixture = fixture();
        let mut cursor = CursorController::new();
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);
        let table = [
            AnimCursorStep {
                sprite: fixture.frames[0],
                display_time: 2,
            },
            AnimCursorStep {
                sprite: fixture.frames[1],
                display_time: 1,
            },
        ];
        cursor.set_animated_mouse_cursor(&fixture.store, &table);
        assert_eq!(cursor.sprites()[0].sprite, fixture.frames[0]);

        cursor.tick(&fixture.store);
        assert_eq!(cursor.sprites()[0].sprite, fixture.frames[0]);
        cursor.tick(&fixture.store);
        assert_eq!(cursor.sprites()[0].sprite, fixture.frames[1]);
        cursor.tick(&fixture.store);
        assert_eq!(cursor.sprites()[0].sprite, fixture.frames[0]);
    }

    #[test]
    fn static_cursor_stops_the_animation() {
        let fixture = fixture();
        let mut cursor = CursorController::new();
        let table = [
            AnimCursorStep {
                sprite: fixture.frames[0],
                display_time: 1,
            },
            AnimCursorStep {
                sprite: fixture.frames[1],
                display_time: 1,
            },
        ];
        cursor.set_animated_mouse_cursor(&fixture.store, &table);
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);
        cursor.tick(&fixture.store);
        assert_eq!(cursor.sprites()[0].sprite, fixture.arrow);
    }

    #[test]
    fn busy_only_replaces_the_normal_pointer() {
        let fixture = fixture();
        let mut cursor = CursorController::new();
        cursor.set_mouse_cursor(&fixture.store, fixture.arrow, PaletteSpec::None);
        cursor.set_busy(&fixture.store, true, fixture.arrow, fixture.busy);
        assert_eq!(cursor.sprites()[0].sprite, fixture.busy);
        cursor.set_busy(&fixture.store, false, fixture.arrow, fixture.busy);
        assert_eq!(cursor.sprites()[0].sprite, fixture.arrow);

        cursor.set_mouse_cursor(&fixture.store, fixture.frames[0], PaletteSpec::None);
        cursor.set_busy(&fixture.store, true, fixture.arrow, fixture.busy);
        assert_eq!(cursor.sprites()[0].sprite, fixture.frames[0]);
    }

    #[test]
    fn fixed_cursor_reports_deltas_without_moving() {
        let mut cursor = CursorController::new();
        cursor.update_position(100, 100);
        cursor.set_fix_at(true);

        assert!(cursor.update_position(104, 97));
        assert_eq!(cursor.delta(), Point::new(4, -3));
        assert_eq!(cursor.pos(), Point::new(100, 100));
        assert!(!cursor.update_position(100, 100));

        cursor.update_position_relative(2, 2);
        assert_eq!(cursor.delta(), Point::new(2, 2));

        cursor.set_fix_at(false);
        assert!(!cursor.update_position(50, 60));
        assert_eq!(cursor.pos(), Point::new(50, 60));
        assert!(cursor.dirty());
    }

    #[test]
    fn wheel_steps_accumulate_until_taken() {
        let mut cursor = CursorController::new();
        cursor.add_wheel(1);
        cursor.add_wheel(2);
        assert_eq!(cursor.take_wheel(), 3);
        assert_eq!(cursor.take_wheel(), 0);
    }
}
