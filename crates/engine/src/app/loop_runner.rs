use std::env;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::blitter::PalettedBlitter;
use crate::config::ConfigError;
use crate::geometry::Rect;
use crate::gfx::{Gfx, GfxAssets};
use crate::palette::Palette;
use crate::perf::{PerformanceElement, PerformanceRegistry};
use crate::screen::Screen;
use crate::sprite::SpriteStore;
use crate::text::BitmapFont;

use super::input::InputCollector;
use super::{PixelsPresenter, Scene, SceneContext};

pub const SLOW_FRAME_ENV_VAR: &str = "TILEGFX_SLOW_FRAME_MS";

/// Points averaged for the periodic draw-time log line.
const METRICS_AVERAGE_POINTS: usize = 32;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    /// Simulation ticks per cursor animation tick.
    pub cursor_tick_divider: u32,
    pub screenshot_dir: PathBuf,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "tilegfx".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 30,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            cursor_tick_divider: 1,
            screenshot_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize presenter: {0}")]
    CreatePresenter(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let presenter = PixelsPresenter::new(window).map_err(AppError::CreatePresenter)?;
    let (width, height) = presenter.size();
    window.set_cursor_visible(false);

    let palette = Palette::standard();
    let layouter = BitmapFont::new();
    let mut sprites = SpriteStore::new(&palette);
    let mut screen = Screen::new(PalettedBlitter::new(width, height), presenter);

    scene.load(&mut sprites, screen.cursor_mut(), width as i32, height as i32);
    screen.mark_whole_screen_dirty();
    info!(width, height, sprites = sprites.len(), "scene_loaded");

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let cursor_tick_divider = config.cursor_tick_divider.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let perf = PerformanceRegistry::new(target_tps as f64);
    let mut input = InputCollector::new(width, height);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        cursor_tick_divider,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut last_metrics_instant = Instant::now();
    let mut cursor_ticks = 0u32;
    let mut screenshots_taken = 0u32;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if size.width == 0 || size.height == 0 {
                        return;
                    }
                    if let Err(error) = screen.video_mut().resize(size.width, size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                        return;
                    }
                    input.set_window_size(size.width, size.height);
                    screen.screen_size_changed(size.width, size.height);
                    screen.mark_whole_screen_dirty();
                    scene.resized(size.width as i32, size.height as i32);
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if size.width == 0 || size.height == 0 {
                        return;
                    }
                    if let Err(error) = screen.video_mut().resize(size.width, size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                        return;
                    }
                    input.set_window_size(size.width, size.height);
                    screen.screen_size_changed(size.width, size.height);
                    screen.mark_whole_screen_dirty();
                    scene.resized(size.width as i32, size.height as i32);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let x = position.x as i32;
                    let y = position.y as i32;
                    input.set_cursor_position_px(x, y);
                    if screen.cursor_mut().update_position(x, y) {
                        let pos = screen.cursor().pos();
                        if let Err(error) =
                            window.set_cursor_position(PhysicalPosition::new(pos.x, pos.y))
                        {
                            debug!(error = %error, "cursor_warp_failed");
                        }
                    }
                }
                WindowEvent::CursorEntered { .. } => {
                    screen.cursor_mut().set_in_window(true);
                }
                WindowEvent::CursorLeft { .. } => {
                    input.clear_cursor_position();
                    screen.cursor_mut().set_in_window(false);
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let steps = input.handle_mouse_wheel(delta);
                    screen.cursor_mut().add_wheel(steps);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input.handle_key(event.physical_key, event.state);
                    if input.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let _tick = perf.measure(PerformanceElement::GameLoop);
                        let snapshot = input.snapshot_for_tick();
                        let screen_width = screen.width();
                        let screen_height = screen.height();
                        let generation = screen.generation();
                        let (dirty, cursor) = screen.dirty_and_cursor_mut();
                        let mut ctx = SceneContext {
                            sprites: &sprites,
                            dirty,
                            cursor,
                            perf: &perf,
                            screen_width,
                            screen_height,
                            generation,
                            fixed_dt_seconds,
                        };
                        scene.update(&snapshot, &mut ctx);

                        cursor_ticks += 1;
                        if cursor_ticks >= cursor_tick_divider {
                            cursor_ticks = 0;
                            screen.cursor_mut().tick(&sprites);
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if input.take_pick_pressed() {
                        match input.cursor_position_px() {
                            Some(pos) => screen.request_sprite_pick(pos.x, pos.y),
                            None => debug!("sprite_pick_without_cursor"),
                        }
                    }

                    perf.process_pending();

                    let assets = GfxAssets {
                        sprites: &sprites,
                        layouter: &layouter,
                    };
                    {
                        let _drawing = perf.measure(PerformanceElement::Drawing);
                        let mut painter = |gfx: &mut Gfx<'_>, rect: Rect| scene.paint(gfx, rect);
                        screen.draw_dirty_blocks(assets, &mut painter);
                    }

                    if let Some(picked) = screen.take_picked_sprites() {
                        let keys: Vec<&str> =
                            picked.iter().filter_map(|id| sprites.key(*id)).collect();
                        info!(count = picked.len(), sprites = ?keys, "sprites_picked");
                        scene.sprites_picked(&picked, &sprites);
                    }

                    if input.take_screenshot_pressed() {
                        let path = screenshot_path(&config.screenshot_dir, screenshots_taken);
                        screenshots_taken += 1;
                        if let Err(error) = screen.save_screenshot(&path, &palette) {
                            warn!(error = %error, "screenshot_failed");
                        }
                    }

                    screen.draw_mouse_cursor(assets);

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    {
                        let _video = perf.measure(PerformanceElement::Video);
                        let (blitter, presenter) = screen.present_parts();
                        if let Err(error) = presenter.present(blitter, &palette) {
                            warn!(error = %error, "presenter_draw_failed");
                            window_target.exit();
                        }
                    }
                    last_present_instant = Instant::now();

                    if now.saturating_duration_since(last_metrics_instant) >= metrics_log_interval {
                        last_metrics_instant = now;
                        info!(
                            fps = perf.rate(PerformanceElement::Video),
                            tps = perf.rate(PerformanceElement::GameLoop),
                            draw_ms = perf
                                .average_duration_ms(PerformanceElement::Drawing, METRICS_AVERAGE_POINTS),
                            generation = screen.generation(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn screenshot_path(dir: &Path, sequence: u32) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    dir.join(format!("screenshot_{seconds}_{sequence}.png"))
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => parse_slow_frame_delay(&value, config_slow_frame_ms),
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

fn parse_slow_frame_delay(value: &str, config_slow_frame_ms: u64) -> Duration {
    match value.trim().parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                value, "invalid slow-frame env var value; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
