use pixels::{Error, Pixels, SurfaceTexture};
use tracing::trace;
use winit::window::Window;

use crate::blitter::ScreenBlitter;
use crate::geometry::Rect;
use crate::palette::{Palette, PixelColour};
use crate::video::VideoDriver;

/// Presents the paletted screen buffer through a `pixels` surface. Only the
/// rectangles reported through [`VideoDriver::make_dirty`] are converted to
/// RGBA on each present.
pub struct PixelsPresenter {
    window: &'static Window,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    pending: Vec<Rect>,
}

impl PixelsPresenter {
    pub fn new(window: &'static Window) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(window, size.width.max(1), size.height.max(1))?;
        Ok(Self {
            window,
            pixels,
            width: size.width.max(1),
            height: size.height.max(1),
            pending: Vec::new(),
        })
    }

    fn build_pixels(window: &'static Window, width: u32, height: u32) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Rebuilds the surface for a new window size. The frame starts out
    /// black; the caller repaints the whole screen.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(self.window, width, height)?;
        self.width = width;
        self.height = height;
        self.pending.clear();
        Ok(())
    }

    pub fn pending_rects(&self) -> &[Rect] {
        &self.pending
    }

    /// Converts the reported rectangles of `screen` and shows the frame.
    pub fn present(&mut self, screen: &dyn ScreenBlitter, palette: &Palette) -> Result<(), Error> {
        let frame_width = self.width;
        let frame = self.pixels.frame_mut();
        let rects = self.pending.len();
        for rect in self.pending.drain(..) {
            copy_rect_to_rgba(
                frame,
                frame_width,
                screen.pixels(),
                screen.pitch() as usize,
                rect,
                palette,
            );
        }
        trace!(rects, "frame_presented");
        self.pixels.render()
    }
}

impl VideoDriver for PixelsPresenter {
    fn make_dirty(&mut self, left: i32, top: i32, width: i32, height: i32) {
        let rect = Rect::from_size(left, top, width, height)
            .intersect(&Rect::new(0, 0, self.width as i32, self.height as i32));
        if rect.left < rect.right && rect.top < rect.bottom {
            self.pending.push(rect);
        }
    }
}

/// Writes the palette colours of `rect` (right and bottom exclusive) from
/// the index buffer `src` into the RGBA `frame`. Rows or columns past
/// either buffer are skipped.
pub(crate) fn copy_rect_to_rgba(
    frame: &mut [u8],
    frame_width: u32,
    src: &[u8],
    pitch: usize,
    rect: Rect,
    palette: &Palette,
) {
    let frame_width = frame_width as usize;
    let right = (rect.right.max(0) as usize).min(frame_width).min(pitch);
    let left = rect.left.max(0) as usize;
    if left >= right {
        return;
    }
    for y in rect.top.max(0) as usize..rect.bottom.max(0) as usize {
        let src_row = y * pitch;
        let dst_row = y * frame_width * 4;
        if src_row + right > src.len() || dst_row + right * 4 > frame.len() {
            break;
        }
        let out = &mut frame[dst_row + left * 4..dst_row + right * 4];
        for (pixel, &index) in out.chunks_exact_mut(4).zip(&src[src_row + left..src_row + right]) {
            pixel.copy_from_slice(&palette.rgba(PixelColour(index)));
        }
    }
}
