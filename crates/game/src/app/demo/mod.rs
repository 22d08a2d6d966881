//! Scrolling isometric tile field with cars driving looping routes, a
//! statistics panel and an animated cursor.

mod overlay;
mod sprites;
mod world;

use std::collections::BTreeSet;
use std::slice;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilegfx::palette::{PALETTE_TEAM_BASE, TEAM_RAMP_COUNT};
use tilegfx::zoom::scale_by_zoom;
use tilegfx::{
    remap_coords, CursorController, DirtyBlocks, FillRectMode, Gfx, InputAction, InputSnapshot,
    MapSize, PaletteSpec, PerformanceElement, PixelColour, Point, Rect, RecolourId, Scene,
    SceneContext, SpriteId, SpriteSeq, SpriteStore, Vehicle, VehicleId, VehiclePool, VehicleState,
    Viewport, ViewportSet, TILE_SIZE,
};
use tracing::{debug, error, info};

use self::overlay::{paint_dirty_outline, paint_panel, panel_rect, PanelStats, PANEL_WIDTH};
use self::sprites::{DemoSprites, Heading};
use self::world::{map_extent, tile_north_corner, visible_tiles, Route, Terrain};
use super::config::DemoConfig;

const SCROLL_PIXELS_PER_TICK: i32 = 12;
const PANEL_REFRESH_TICKS: u64 = 15;
const MAX_CAR_SPEED: i32 = 3;

#[derive(Debug, Clone)]
struct Car {
    id: VehicleId,
    route: Route,
    distance: i32,
    /// World units per tick.
    speed: i32,
    heading: Heading,
}

pub(crate) struct DemoScene {
    rng: StdRng,
    vehicle_count: u32,
    terrain: Terrain,
    sprites: Option<DemoSprites>,
    pool: VehiclePool,
    cars: Vec<Car>,
    viewport: Viewport,
    screen_width: i32,
    screen_height: i32,
    panel_visible: bool,
    panel_stale: bool,
    dirty_overlay: bool,
    generation: u32,
    ticks: u64,
    stats: PanelStats,
    panel_lines: Vec<String>,
}

impl DemoScene {
    pub(crate) fn new(config: &DemoConfig) -> Self {
        let map = MapSize::new(config.map_width, config.map_height);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let terrain = Terrain::generate(map, &mut rng);
        let width = config.window_width as i32;
        let height = config.window_height as i32;
        Self {
            rng,
            vehicle_count: config.vehicle_count,
            terrain,
            sprites: None,
            pool: VehiclePool::new(map),
            cars: Vec::new(),
            viewport: Viewport::new(0, 0, width, height, config.initial_zoom),
            screen_width: width,
            screen_height: height,
            panel_visible: true,
            panel_stale: true,
            dirty_overlay: config.dirty_overlay,
            generation: 0,
            ticks: 0,
            stats: PanelStats {
                zoom: config.initial_zoom,
                ..PanelStats::default()
            },
            panel_lines: Vec::new(),
        }
    }

    fn spawn_cars(&mut self, sprites: &DemoSprites) {
        let map = self.terrain.map();
        for index in 0..self.vehicle_count {
            let route = Route::random(map, &mut self.rng);
            let distance = self.rng.gen_range(0..route.perimeter().max(1));
            let speed = self.rng.gen_range(1..=MAX_CAR_SPEED);
            self.add_car(sprites, route, distance, speed, (index % TEAM_RAMP_COUNT as u32) as u8);
        }
    }

    /// Puts a car on `route`. It reaches the hashes on the next tick.
    fn add_car(&mut self, sprites: &DemoSprites, route: Route, distance: i32, speed: i32, team: u8) -> VehicleId {
        let (position, heading) = route.position_at(distance);
        let mut vehicle = Vehicle::new(position.x, position.y, 0, SpriteSeq::single(sprites.vehicle(heading)));
        vehicle.palette = PaletteSpec::Recolour(RecolourId(PALETTE_TEAM_BASE.0 + team as u32));
        let id = self.pool.spawn(vehicle);
        self.cars.push(Car {
            id,
            route,
            distance,
            speed,
            heading,
        });
        id
    }

    fn layout(&mut self) {
        let width = if self.panel_visible {
            (self.screen_width - PANEL_WIDTH).max(0)
        } else {
            self.screen_width
        };
        self.viewport.resize(0, 0, width, self.screen_height);
    }

    fn centre_on_map(&mut self) {
        let map = self.terrain.map();
        let centre = remap_coords(
            map.width as i32 * TILE_SIZE / 2,
            map.height as i32 * TILE_SIZE / 2,
            0,
        );
        self.viewport.scroll_to(
            centre.x - self.viewport.virtual_width / 2,
            centre.y - self.viewport.virtual_height / 2,
        );
    }

    fn mark_viewport(&self, dirty: &mut DirtyBlocks) {
        let rect = self.viewport.screen_rect();
        dirty.add(rect.left, rect.top, rect.right, rect.bottom);
    }

    fn handle_toggles(&mut self, input: &InputSnapshot, dirty: &mut DirtyBlocks) {
        if input.overlay_toggle_pressed() {
            self.panel_visible = !self.panel_visible;
            self.panel_stale = true;
            self.layout();
            dirty.mark_all();
            info!(visible = self.panel_visible, "panel_toggled");
        }
        if input.dirty_overlay_toggle_pressed() {
            self.dirty_overlay = !self.dirty_overlay;
            dirty.mark_all();
            info!(enabled = self.dirty_overlay, "dirty_overlay_toggled");
        }
    }

    fn handle_zoom(&mut self, input: &InputSnapshot, dirty: &mut DirtyBlocks) {
        let steps = input.zoom_delta_steps();
        if steps == 0 {
            return;
        }
        let zoom = self.viewport.zoom.stepped(steps);
        let screen = self.viewport.screen_rect();
        let anchor = input
            .cursor_position_px()
            .filter(|pos| screen.overlaps(&Rect::new(pos.x, pos.y, pos.x + 1, pos.y + 1)))
            .unwrap_or(Point::new(
                (screen.left + screen.right) / 2,
                (screen.top + screen.bottom) / 2,
            ));
        if !self.viewport.zoom_at(zoom, anchor) {
            return;
        }
        let target = clamp_scroll(
            &self.viewport,
            self.terrain.map(),
            self.viewport.virtual_left,
            self.viewport.virtual_top,
        );
        self.viewport.scroll_to(target.x, target.y);
        self.mark_viewport(dirty);
        self.stats.zoom = zoom;
        self.panel_stale = true;
        debug!(zoom = ?zoom, "demo_zoom_changed");
    }

    fn handle_scroll(&mut self, input: &InputSnapshot, dirty: &mut DirtyBlocks) {
        let step = scale_by_zoom(SCROLL_PIXELS_PER_TICK, self.viewport.zoom);
        let mut dx = 0;
        let mut dy = 0;
        if input.is_down(InputAction::ScrollLeft) {
            dx -= step;
        }
        if input.is_down(InputAction::ScrollRight) {
            dx += step;
        }
        if input.is_down(InputAction::ScrollUp) {
            dy -= step;
        }
        if input.is_down(InputAction::ScrollDown) {
            dy += step;
        }
        if dx == 0 && dy == 0 {
            return;
        }
        let target = clamp_scroll(
            &self.viewport,
            self.terrain.map(),
            self.viewport.virtual_left + dx,
            self.viewport.virtual_top + dy,
        );
        if self.viewport.scroll_to(target.x, target.y).is_some() {
            self.mark_viewport(dirty);
        }
    }

    fn handle_clicks(&mut self, input: &InputSnapshot, dirty: &mut DirtyBlocks) {
        let Some(pos) = input.cursor_position_px() else {
            return;
        };
        if input.left_click_pressed() {
            if let Some(id) = self.pool.check_click_on_vehicle(&self.viewport, pos.x, pos.y) {
                let mut crashed = false;
                if let Some(vehicle) = self.pool.get_mut(id) {
                    vehicle.state.toggle(VehicleState::CRASHED);
                    crashed = vehicle.state.contains(VehicleState::CRASHED);
                }
                let mut marker = ViewportSet {
                    viewports: slice::from_ref(&self.viewport),
                    dirty: &mut *dirty,
                };
                self.pool.mark_all_viewports_dirty(id, &mut marker);
                self.panel_stale = true;
                info!(vehicle = id.0, crashed, "vehicle_clicked");
            }
        }
        if input.right_click_pressed() {
            if let Some(id) = self.pool.check_click_on_vehicle(&self.viewport, pos.x, pos.y) {
                let mut marker = ViewportSet {
                    viewports: slice::from_ref(&self.viewport),
                    dirty: &mut *dirty,
                };
                self.pool.destroy(id, &mut marker);
                self.cars.retain(|car| car.id != id);
                self.panel_stale = true;
                info!(vehicle = id.0, remaining = self.cars.len(), "vehicle_removed");
            }
        }
    }

    fn move_cars(&mut self, sprites: &SpriteStore, dirty: &mut DirtyBlocks) {
        let Self {
            pool, cars, viewport, ..
        } = self;
        let mut marker = ViewportSet {
            viewports: slice::from_ref(viewport),
            dirty,
        };
        for car in cars.iter_mut() {
            let Some(vehicle) = pool.get_mut(car.id) else {
                continue;
            };
            if vehicle.state.contains(VehicleState::CRASHED) {
                continue;
            }
            car.distance = (car.distance + car.speed).rem_euclid(car.route.perimeter().max(1));
            let (position, heading) = car.route.position_at(car.distance);
            let moved = vehicle.x_pos != position.x || vehicle.y_pos != position.y;
            if !moved && vehicle.coord().is_some() {
                continue;
            }
            vehicle.x_pos = position.x;
            vehicle.y_pos = position.y;
            if heading != car.heading {
                car.heading = heading;
                vehicle.revalidate_before_draw = true;
            }
            pool.update_position_and_viewport(car.id, sprites, &mut marker);
        }
    }

    fn refresh_panel(&mut self, ctx: &mut SceneContext<'_>) {
        self.stats.sample_perf(ctx.perf);
        self.stats.vehicles = self.pool.len();
        self.stats.crashed = self
            .pool
            .iter()
            .filter(|(_, vehicle)| vehicle.state.contains(VehicleState::CRASHED))
            .count();
        self.stats.generation = self.generation;
        self.panel_lines = self.stats.lines();
        self.panel_stale = false;
        if self.panel_visible {
            let panel = panel_rect(self.screen_width, self.screen_height);
            ctx.dirty.add(panel.left, panel.top, panel.right, panel.bottom);
        }
    }
}

impl Scene for DemoScene {
    fn load(
        &mut self,
        sprites: &mut SpriteStore,
        cursor: &mut CursorController,
        screen_width: i32,
        screen_height: i32,
    ) {
        match DemoSprites::register(sprites) {
            Ok(demo_sprites) => {
                cursor.set_animated_mouse_cursor(sprites, demo_sprites.cursor_animation());
                self.spawn_cars(&demo_sprites);
                self.sprites = Some(demo_sprites);
            }
            Err(err) => error!(error = %err, "demo_sprites_failed"),
        }
        self.screen_width = screen_width;
        self.screen_height = screen_height;
        self.layout();
        self.centre_on_map();
        info!(cars = self.cars.len(), "demo_loaded");
    }

    fn update(&mut self, input: &InputSnapshot, ctx: &mut SceneContext<'_>) {
        self.ticks += 1;
        self.generation = ctx.generation;

        self.handle_toggles(input, ctx.dirty);
        self.handle_zoom(input, ctx.dirty);
        self.handle_scroll(input, ctx.dirty);
        // Wheel steps already arrive through the snapshot.
        ctx.cursor.take_wheel();
        self.handle_clicks(input, ctx.dirty);

        {
            let _vehicles = ctx.perf.measure(PerformanceElement::GlVehicles);
            self.move_cars(ctx.sprites, ctx.dirty);
        }

        if self.panel_stale || self.ticks % PANEL_REFRESH_TICKS == 0 {
            self.refresh_panel(ctx);
        }
    }

    fn paint(&mut self, gfx: &mut Gfx<'_>, rect: Rect) {
        gfx.fill_rect(
            rect.left,
            rect.top,
            rect.right - 1,
            rect.bottom - 1,
            FillRectMode::Opaque(PixelColour::BLACK),
        );

        let Self {
            sprites,
            terrain,
            pool,
            cars,
            viewport,
            ..
        } = self;
        if let Some(sprites) = sprites.as_ref() {
            let mut resolver = |id: VehicleId, _vehicle: &Vehicle| {
                cars.iter()
                    .find(|car| car.id == id)
                    .map(|car| SpriteSeq::single(sprites.vehicle(car.heading)))
            };
            viewport.draw(gfx, rect, &mut |gfx: &mut Gfx<'_>, area: Rect| {
                for tile in visible_tiles(area, terrain.map()) {
                    let corner = tile_north_corner(tile);
                    gfx.draw_sprite_viewport(
                        sprites.terrain(terrain.kind_at(tile)),
                        PaletteSpec::None,
                        corner.x,
                        corner.y,
                        None,
                    );
                }
                pool.viewport_add_vehicles(gfx, &mut resolver);
            });
        }

        if self.panel_visible {
            let panel = panel_rect(self.screen_width, self.screen_height);
            if panel.overlaps(&rect) {
                paint_panel(gfx, panel, &self.panel_lines);
            }
        }
        if self.dirty_overlay {
            paint_dirty_outline(gfx, rect, self.generation);
        }
    }

    fn resized(&mut self, width: i32, height: i32) {
        self.screen_width = width;
        self.screen_height = height;
        self.layout();
        let target = clamp_scroll(
            &self.viewport,
            self.terrain.map(),
            self.viewport.virtual_left,
            self.viewport.virtual_top,
        );
        self.viewport.scroll_to(target.x, target.y);
        self.panel_stale = true;
    }

    fn sprites_picked(&mut self, picked: &BTreeSet<SpriteId>, sprites: &SpriteStore) {
        self.stats.picked = picked
            .iter()
            .filter_map(|id| sprites.key(*id))
            .map(str::to_string)
            .collect();
        self.panel_stale = true;
    }

    fn unload(&mut self) {
        info!(cars = self.cars.len(), ticks = self.ticks, "demo_unloaded");
    }
}

/// Top-left for a scroll to virtual `x, y` that keeps the viewport centre
/// over the map.
fn clamp_scroll(viewport: &Viewport, map: MapSize, x: i32, y: i32) -> Point {
    let extent = map_extent(map);
    let half_width = viewport.virtual_width / 2;
    let half_height = viewport.virtual_height / 2;
    Point::new(
        (x + half_width).clamp(extent.left, extent.right) - half_width,
        (y + half_height).clamp(extent.top, extent.bottom) - half_height,
    )
}
