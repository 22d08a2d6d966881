//! The screen buffer together with its dirty tracking and the cursor.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::blitter::ScreenBlitter;
use crate::cursor::CursorController;
use crate::dirty::DirtyBlocks;
use crate::geometry::{Point, Rect};
use crate::gfx::{Gfx, GfxAssets, SpritePicker};
use crate::palette::{Palette, PixelColour};
use crate::sprite::SpriteId;
use crate::surface::PixelSurface;
use crate::text::TextDirection;
use crate::video::VideoDriver;

#[derive(Debug, Error)]
pub enum ScreenshotError {
    #[error("screen has no pixels to capture")]
    EmptyScreen,
    #[error("failed to write screenshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Callback that repaints one screen rectangle. The [`Gfx`] is clipped to
/// the rectangle but keeps screen coordinates.
pub type Painter<'p> = dyn FnMut(&mut Gfx<'_>, Rect) + 'p;

pub struct Screen<B: ScreenBlitter, V: VideoDriver> {
    blitter: B,
    video: V,
    surface: PixelSurface,
    dirty: DirtyBlocks,
    cursor: CursorController,
    text_direction: TextDirection,
    pick_request: Option<Point>,
    picked: Option<BTreeSet<SpriteId>>,
}

impl<B: ScreenBlitter, V: VideoDriver> Screen<B, V> {
    pub fn new(blitter: B, video: V) -> Self {
        let width = blitter.width() as i32;
        let height = blitter.height() as i32;
        let surface = PixelSurface::screen(width, height, blitter.pitch());
        Self {
            blitter,
            video,
            surface,
            dirty: DirtyBlocks::new(width, height),
            cursor: CursorController::new(),
            text_direction: TextDirection::Ltr,
            pick_request: None,
            picked: None,
        }
    }

    pub fn width(&self) -> i32 {
        self.surface.width
    }

    pub fn height(&self) -> i32 {
        self.surface.height
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn blitter(&self) -> &B {
        &self.blitter
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn cursor(&self) -> &CursorController {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut CursorController {
        &mut self.cursor
    }

    pub fn dirty_blocks(&self) -> &DirtyBlocks {
        &self.dirty
    }

    pub fn dirty_blocks_mut(&mut self) -> &mut DirtyBlocks {
        &mut self.dirty
    }

    /// Dirty grid and cursor, borrowed together.
    pub fn dirty_and_cursor_mut(&mut self) -> (&mut DirtyBlocks, &mut CursorController) {
        (&mut self.dirty, &mut self.cursor)
    }

    /// Finished frame and the driver it goes out through.
    pub fn present_parts(&mut self) -> (&B, &mut V) {
        (&self.blitter, &mut self.video)
    }

    /// Number of completed dirty-block flushes.
    pub fn generation(&self) -> u32 {
        self.dirty.generation()
    }

    pub fn set_text_direction(&mut self, direction: TextDirection) {
        self.text_direction = direction;
    }

    /// Reallocates the buffer for a new window size. The old contents and
    /// any painted cursor are gone; callers mark the whole screen dirty.
    pub fn screen_size_changed(&mut self, width: u32, height: u32) {
        self.blitter.resize(width, height);
        self.surface = PixelSurface::screen(width as i32, height as i32, self.blitter.pitch());
        self.dirty.resize(width as i32, height as i32);
        self.cursor.invalidate();
        info!(width, height, "screen_resized");
    }

    /// Marks `left..right` x `top..bottom` (exclusive) for repainting.
    pub fn add_dirty_block(&mut self, left: i32, top: i32, right: i32, bottom: i32) {
        self.dirty.add(left, top, right, bottom);
    }

    pub fn mark_whole_screen_dirty(&mut self) {
        self.dirty.mark_all();
    }

    /// Asks the next flush to record every sprite drawn over the pixel at
    /// `x, y`. The whole screen is repainted for it.
    pub fn request_sprite_pick(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            debug!(x, y, "sprite_pick_outside_screen");
            return;
        }
        self.pick_request = Some(Point::new(x, y));
        self.mark_whole_screen_dirty();
        debug!(x, y, "sprite_pick_requested");
    }

    /// Result of the last completed pick, if any.
    pub fn take_picked_sprites(&mut self) -> Option<BTreeSet<SpriteId>> {
        self.picked.take()
    }

    /// Repaints every marked area through `painter` and hands the changed
    /// rectangles to the video driver. Returns how many rectangles were
    /// repainted.
    pub fn draw_dirty_blocks(&mut self, assets: GfxAssets<'_>, painter: &mut Painter<'_>) -> usize {
        let mut picker = self
            .pick_request
            .take()
            .map(|at| SpritePicker::new(self.blitter.move_to(self.surface.dst, at.x, at.y)));

        let Self {
            blitter,
            video,
            surface,
            dirty,
            cursor,
            text_direction,
            ..
        } = self;
        let count = dirty.flush(|rect| {
            redraw_rect(
                RedrawTarget {
                    blitter: &mut *blitter,
                    video: &mut *video,
                    surface,
                    cursor: &mut *cursor,
                },
                assets,
                *text_direction,
                picker.as_mut(),
                rect,
                &mut *painter,
            );
        });

        if let Some(picker) = picker {
            let picked = picker.into_picked();
            debug!(count = picked.len(), "sprites_picked");
            self.picked = Some(picked);
        }
        count
    }

    /// Repaints one rectangle (right and bottom exclusive) right away,
    /// lifting the cursor first if it is in the way.
    pub fn redraw_screen_rect(&mut self, assets: GfxAssets<'_>, rect: Rect, painter: &mut Painter<'_>) {
        let rect = rect.intersect(&self.surface.bounds());
        if rect.left >= rect.right || rect.top >= rect.bottom {
            return;
        }
        let text_direction = self.text_direction;
        redraw_rect(
            RedrawTarget {
                blitter: &mut self.blitter,
                video: &mut self.video,
                surface: &self.surface,
                cursor: &mut self.cursor,
            },
            assets,
            text_direction,
            None,
            rect,
            painter,
        );
    }

    pub fn draw_mouse_cursor(&mut self, assets: GfxAssets<'_>) {
        let mut gfx = Gfx::new(&mut self.blitter, assets, self.surface);
        self.cursor.draw(&mut gfx, &mut self.video);
    }

    pub fn undraw_mouse_cursor(&mut self) {
        self.cursor
            .undraw(&mut self.blitter, self.surface.dst, &mut self.video);
    }

    /// Moves the pixels of a screen area by `dx, dy`. The area itself is
    /// reported changed; the strip uncovered by the move still holds stale
    /// pixels and has to be repainted by the caller.
    pub fn scroll(&mut self, left: i32, top: i32, width: i32, height: i32, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        if self.cursor.visible() {
            self.undraw_mouse_cursor();
        }
        let moved = self.blitter.scroll_buffer(
            self.surface.dst,
            Rect::from_size(left, top, width, height),
            dx,
            dy,
        );
        self.video.make_dirty(left, top, width, height);
        debug!(dx, dy, moved_width = moved.width(), moved_height = moved.height(), "screen_scrolled");
    }

    /// Scrolls a screen area and marks the uncovered strips dirty. Falls
    /// back to repainting the whole area when the move is at least as big
    /// as the area.
    pub fn scroll_and_expose(&mut self, left: i32, top: i32, width: i32, height: i32, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }

        let (mut left, mut width) = (left, width);
        if left < 0 {
            width += left;
            left = 0;
        }
        width = width.min(self.width() - left);
        let (mut top, mut height) = (top, height);
        if top < 0 {
            height += top;
            top = 0;
        }
        height = height.min(self.height() - top);
        if width <= 0 || height <= 0 {
            return;
        }

        if dx.abs() >= width || dy.abs() >= height {
            self.add_dirty_block(left, top, left + width, top + height);
            return;
        }

        self.scroll(left, top, width, height, dx, dy);
        if dx > 0 {
            self.add_dirty_block(left, top, left + dx, top + height);
            left += dx;
            width -= dx;
        } else if dx < 0 {
            self.add_dirty_block(left + width + dx, top, left + width, top + height);
            width += dx;
        }
        if dy > 0 {
            self.add_dirty_block(left, top, left + width, top + dy);
        } else if dy < 0 {
            self.add_dirty_block(left, top + height + dy, left + width, top + height);
        }
    }

    /// Writes the screen contents, without the cursor, as a PNG file.
    pub fn save_screenshot(&mut self, path: &Path, palette: &Palette) -> Result<(), ScreenshotError> {
        let width = self.blitter.width();
        let height = self.blitter.height();
        if width == 0 || height == 0 {
            return Err(ScreenshotError::EmptyScreen);
        }
        self.undraw_mouse_cursor();

        let pitch = self.blitter.pitch() as usize;
        let pixels = self.blitter.pixels();
        let image = RgbaImage::from_fn(width, height, |x, y| {
            let index = y as usize * pitch + x as usize;
            Rgba(palette.rgba(PixelColour(pixels[index])))
        });
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| ScreenshotError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), width, height, "screenshot_saved");
        Ok(())
    }
}

/// The parts of a [`Screen`] a repaint needs, borrowed separately from its
/// dirty grid.
struct RedrawTarget<'s, B, V> {
    blitter: &'s mut B,
    video: &'s mut V,
    surface: &'s PixelSurface,
    cursor: &'s mut CursorController,
}

fn redraw_rect<B: ScreenBlitter, V: VideoDriver>(
    target: RedrawTarget<'_, B, V>,
    assets: GfxAssets<'_>,
    text_direction: TextDirection,
    picker: Option<&mut SpritePicker>,
    rect: Rect,
    painter: &mut Painter<'_>,
) {
    let RedrawTarget {
        blitter,
        video,
        surface,
        cursor,
    } = target;

    if cursor.visible() && cursor.draw_rect().overlaps(&rect) {
        cursor.undraw(blitter, surface.dst, video);
    }

    let clipped = PixelSurface {
        dst: blitter.move_to(surface.dst, rect.left, rect.top),
        left: rect.left,
        top: rect.top,
        width: rect.width(),
        height: rect.height(),
        pitch: surface.pitch,
        zoom: surface.zoom,
    };
    let mut gfx = Gfx::new(blitter, assets, clipped).with_text_direction(text_direction);
    if let Some(picker) = picker {
        gfx = gfx.with_observer(picker);
    }
    painter(&mut gfx, rect);

    video.make_dirty(rect.left, rect.top, rect.width(), rect.height());
}
