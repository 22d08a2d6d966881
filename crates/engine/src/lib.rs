//! Software renderer for a paletted, tile-based game screen: dirty-block
//! repainting, sprite and text drawing, a software mouse cursor, and the
//! spatial indexes that find the vehicles a viewport has to draw.

pub mod app;
pub mod blitter;
pub mod config;
pub mod cursor;
pub mod dirty;
pub mod geometry;
pub mod gfx;
pub mod palette;
pub mod perf;
pub mod screen;
pub mod spatial;
pub mod sprite;
pub mod surface;
pub mod text;
pub mod vehicle;
pub mod video;
pub mod viewport;
pub mod zoom;

#[cfg(test)]
mod test_support;

pub use app::{
    run_app, AppError, InputAction, InputSnapshot, LoopConfig, PixelsPresenter, Scene,
    SceneContext, SLOW_FRAME_ENV_VAR,
};
pub use blitter::{Blitter, LineStyle, PalettedBlitter, ScreenBlitter};
pub use config::{load_json_config, load_json_config_from_env, parse_json_config, ConfigError};
pub use cursor::{AnimCursorStep, CursorController, CursorSprite};
pub use dirty::{DirtyBlocks, DIRTY_BLOCK_HEIGHT, DIRTY_BLOCK_WIDTH};
pub use geometry::{Dimension, Point, Rect};
pub use gfx::{FillRectMode, Gfx, GfxAssets, SpritePicker, TextStyle};
pub use palette::{Palette, PaletteSpec, PixelColour, RecolourId, RecolourMap, TextColour};
pub use perf::{PerformanceElement, PerformanceRegistry, SoundPerfQueue};
pub use screen::{Painter, Screen, ScreenshotError};
pub use spatial::{MapSize, TileCoord, TILE_SIZE};
pub use sprite::{Sprite, SpriteCache, SpriteError, SpriteId, SpriteStore};
pub use text::{BitmapFont, FontSize, StringAlignment, TextDirection};
pub use vehicle::{SpriteSeq, Vehicle, VehicleId, VehiclePool, VehicleState};
pub use video::VideoDriver;
pub use viewport::{remap_coords, Viewport, ViewportDirtyMarker, ViewportSet};
pub use zoom::{ZoomLevel, ZOOM_BASE};
