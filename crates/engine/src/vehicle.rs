//! Vehicles as seen by the renderer: screen bounds, dirty marking and the
//! two spatial hashes used to find them.

use bitflags::bitflags;
use tracing::{debug, trace};

use crate::geometry::{Point, Rect};
use crate::gfx::Gfx;
use crate::palette::{PaletteSpec, PALETTE_CRASH, PALETTE_TO_TRANSPARENT};
use crate::spatial::{MapSize, TileCoord, TileHash, ViewportHash, TILE_SIZE};
use crate::sprite::{SpriteCache, SpriteId};
use crate::viewport::{remap_coords, Viewport, ViewportDirtyMarker};
use crate::zoom::{scale_by_zoom, ZOOM_BASE};

/// Most sprites one vehicle can be drawn with.
pub const MAX_SPRITE_SEQ: usize = 8;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VehicleState: u8 {
        const HIDDEN = 1 << 0;
        const CRASHED = 1 << 1;
        const UNCLICKABLE = 1 << 2;
        /// Drawn as a transparent shadow.
        const SHADOW = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSeqEntry {
    pub sprite: SpriteId,
    /// `PaletteSpec::None` uses the vehicle palette.
    pub palette: PaletteSpec,
}

/// Sprites a vehicle is drawn with, bottom first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteSeq {
    entries: Vec<SpriteSeqEntry>,
}

impl SpriteSeq {
    pub fn single(sprite: SpriteId) -> Self {
        Self {
            entries: vec![SpriteSeqEntry {
                sprite,
                palette: PaletteSpec::None,
            }],
        }
    }

    /// Appends a layer; ignored once the sequence is full.
    pub fn push(&mut self, sprite: SpriteId, palette: PaletteSpec) {
        if self.entries.len() >= MAX_SPRITE_SEQ {
            debug!(sprite = sprite.0, "sprite_seq_full");
            return;
        }
        self.entries.push(SpriteSeqEntry { sprite, palette });
    }

    pub fn entries(&self) -> &[SpriteSeqEntry] {
        &self.entries
    }

    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Union of the sprite rectangles relative to the draw point, right and
    /// bottom inclusive. Missing sprites are skipped.
    pub fn bounds(&self, sprites: &dyn SpriteCache) -> Rect {
        let mut bounds: Option<Rect> = None;
        for entry in &self.entries {
            let Some(sprite) = sprites.sprite(entry.sprite) else {
                continue;
            };
            let x_offs = sprite.x_offs as i32;
            let y_offs = sprite.y_offs as i32;
            let rect = Rect::new(
                x_offs,
                y_offs,
                sprite.width as i32 + x_offs - 1,
                sprite.height as i32 + y_offs - 1,
            );
            bounds = Some(match bounds {
                None => rect,
                Some(bounds) => bounds.union(&rect),
            });
        }
        bounds.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub u32);

impl VehicleId {
    fn slot(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    /// World position.
    pub x_pos: i32,
    pub y_pos: i32,
    pub z_pos: i32,
    /// Offset from the position to the point the sprites are drawn at.
    pub x_offs: i32,
    pub y_offs: i32,
    pub sprite_seq: SpriteSeq,
    pub palette: PaletteSpec,
    pub state: VehicleState,
    /// Ask the resolver for fresh sprites before the next draw.
    pub revalidate_before_draw: bool,
    coord: Option<Rect>,
    old_coord: Option<Rect>,
    is_viewport_candidate: bool,
    tile: Option<TileCoord>,
}

impl Vehicle {
    pub fn new(x_pos: i32, y_pos: i32, z_pos: i32, sprite_seq: SpriteSeq) -> Self {
        Self {
            x_pos,
            y_pos,
            z_pos,
            x_offs: 0,
            y_offs: 0,
            sprite_seq,
            palette: PaletteSpec::None,
            state: VehicleState::empty(),
            revalidate_before_draw: false,
            coord: None,
            old_coord: None,
            is_viewport_candidate: false,
            tile: None,
        }
    }

    /// Virtual screen bounds, right and bottom inclusive. `None` before the
    /// first viewport update.
    pub fn coord(&self) -> Option<Rect> {
        self.coord
    }

    /// Bounds at the last viewport update, grown by any changes since.
    pub fn old_coord(&self) -> Option<Rect> {
        self.old_coord
    }

    /// Whether the last dirty marking reached any viewport.
    pub fn is_viewport_candidate(&self) -> bool {
        self.is_viewport_candidate
    }

    pub fn tile(&self) -> Option<TileCoord> {
        self.tile
    }

    pub fn is_drawn(&self) -> bool {
        !self.state.contains(VehicleState::HIDDEN)
    }

    /// Recomputes `coord` from the sprites and position. With
    /// `update_cache` the previous bounds become `old_coord`; without, they
    /// are folded into it so the next dirty marking still covers them.
    pub fn update_bounding_box_coordinates(&mut self, sprites: &dyn SpriteCache, update_cache: bool) {
        let mut new_coord = self.sprite_seq.bounds(sprites);
        let pt = remap_coords(self.x_pos + self.x_offs, self.y_pos + self.y_offs, self.z_pos);
        new_coord.left += pt.x;
        new_coord.top += pt.y;
        new_coord.right += pt.x + 2 * ZOOM_BASE;
        new_coord.bottom += pt.y + 2 * ZOOM_BASE;

        if update_cache {
            self.old_coord = Some(self.coord.unwrap_or(new_coord));
        } else if let Some(coord) = self.coord {
            self.old_coord = Some(match self.old_coord {
                Some(old) => old.union(&coord),
                None => coord,
            });
        }
        self.coord = Some(new_coord);
    }

    /// Draws the sprites at the vehicle position onto a viewport surface.
    pub fn draw(&self, gfx: &mut Gfx<'_>) {
        let crashed = self.state.contains(VehicleState::CRASHED);
        let fallback = if crashed {
            PaletteSpec::Recolour(PALETTE_CRASH)
        } else {
            self.palette
        };
        let pt = remap_coords(self.x_pos + self.x_offs, self.y_pos + self.y_offs, self.z_pos);
        for entry in self.sprite_seq.entries() {
            let palette = if self.state.contains(VehicleState::SHADOW) {
                PaletteSpec::Transparent(PALETTE_TO_TRANSPARENT)
            } else if entry.palette == PaletteSpec::None || crashed {
                fallback
            } else {
                entry.palette
            };
            gfx.draw_sprite_viewport(entry.sprite, palette, pt.x, pt.y, None);
        }
    }

    fn dirty_area(&self) -> Option<Rect> {
        self.coord
            .map(|coord| Rect::new(coord.left, coord.top, coord.right + ZOOM_BASE, coord.bottom + ZOOM_BASE))
    }
}

/// Gives a vehicle fresh sprites before it is drawn; `None` keeps the
/// current ones.
pub type SpriteResolver<'r> = dyn FnMut(VehicleId, &Vehicle) -> Option<SpriteSeq> + 'r;

/// Arena of vehicles with their tile and viewport hashes. Ids of destroyed
/// vehicles are reused.
#[derive(Debug, Clone)]
pub struct VehiclePool {
    slots: Vec<Option<Vehicle>>,
    free: Vec<u32>,
    tile_hash: TileHash,
    viewport_hash: ViewportHash,
    map: MapSize,
}

impl VehiclePool {
    pub fn new(map: MapSize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tile_hash: TileHash::new(),
            viewport_hash: ViewportHash::new(),
            map,
        }
    }

    pub fn map_size(&self) -> MapSize {
        self.map
    }

    /// Adds a vehicle. It is not in either hash until its position and
    /// viewport are updated.
    pub fn spawn(&mut self, vehicle: Vehicle) -> VehicleId {
        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(vehicle);
                VehicleId(index)
            }
            None => {
                self.slots.push(Some(vehicle));
                VehicleId(self.slots.len() as u32 - 1)
            }
        };
        trace!(vehicle = id.0, "vehicle_spawned");
        id
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.slots.get(id.slot())?.as_ref()
    }

    /// Direct access; callers follow position changes with
    /// [`VehiclePool::update_position_and_viewport`].
    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.slots.get_mut(id.slot())?.as_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleId, &Vehicle)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|vehicle| (VehicleId(index as u32), vehicle)))
    }

    /// Refiles the vehicle under the tile of its current position.
    pub fn update_position(&mut self, id: VehicleId) {
        let map = self.map;
        let Some(vehicle) = self.get_mut(id) else {
            return;
        };
        let tile = map.tile_at(vehicle.x_pos, vehicle.y_pos);
        vehicle.tile = tile;
        self.tile_hash.update(id.slot(), tile);
    }

    /// Recomputes the screen bounds and refiles the vehicle in the viewport
    /// hash. With `dirty`, the old and new bounds are marked in every
    /// viewport.
    pub fn update_viewport(
        &mut self,
        id: VehicleId,
        sprites: &dyn SpriteCache,
        dirty: bool,
        marker: &mut dyn ViewportDirtyMarker,
    ) {
        let Some(vehicle) = self.slots.get_mut(id.slot()).and_then(Option::as_mut) else {
            return;
        };
        let ignore_cached = vehicle.old_coord.is_none();
        vehicle.update_bounding_box_coordinates(sprites, true);

        let Some(coord) = vehicle.coord else {
            return;
        };
        self.viewport_hash
            .update(id.slot(), Some(Point::new(coord.left, coord.top)));

        if dirty {
            let area = if ignore_cached {
                vehicle.dirty_area()
            } else {
                vehicle.old_coord.map(|old| old.union(&coord))
            };
            vehicle.is_viewport_candidate =
                area.map_or(false, |area| marker.mark_all_viewports_dirty(area));
        }
    }

    pub fn update_position_and_viewport(
        &mut self,
        id: VehicleId,
        sprites: &dyn SpriteCache,
        marker: &mut dyn ViewportDirtyMarker,
    ) {
        self.update_position(id);
        self.update_viewport(id, sprites, true, marker);
    }

    /// Marks the current bounds of the vehicle in every viewport.
    pub fn mark_all_viewports_dirty(&self, id: VehicleId, marker: &mut dyn ViewportDirtyMarker) -> bool {
        self.get(id)
            .and_then(Vehicle::dirty_area)
            .map_or(false, |area| marker.mark_all_viewports_dirty(area))
    }

    /// Removes the vehicle from the pool and both hashes, marking where it
    /// was drawn.
    pub fn destroy(&mut self, id: VehicleId, marker: &mut dyn ViewportDirtyMarker) -> Option<Vehicle> {
        let vehicle = self.slots.get_mut(id.slot())?.take()?;
        if vehicle.is_drawn() {
            if let Some(area) = vehicle.dirty_area() {
                marker.mark_all_viewports_dirty(area);
            }
        }
        self.tile_hash.remove(id.slot());
        self.viewport_hash.remove(id.slot());
        self.free.push(id.0);
        trace!(vehicle = id.0, "vehicle_destroyed");
        Some(vehicle)
    }

    /// Vehicles whose position is within `max_dist` world units of `x, y`
    /// on both axes.
    pub fn vehicles_near_tile_xy(&self, x: i32, y: i32, max_dist: i32) -> impl Iterator<Item = VehicleId> + '_ {
        let area = Rect::new(
            (x - max_dist).max(0),
            (y - max_dist).max(0),
            (x + max_dist).max(0),
            (y + max_dist).max(0),
        );
        self.tile_hash
            .candidates_near(area, max_dist)
            .filter_map(move |slot| {
                let vehicle = self.slots.get(slot)?.as_ref()?;
                area.contains(Point::new(vehicle.x_pos, vehicle.y_pos))
                    .then_some(VehicleId(slot as u32))
            })
    }

    pub fn has_vehicle_near_tile_xy(
        &self,
        x: i32,
        y: i32,
        max_dist: i32,
        mut predicate: impl FnMut(VehicleId, &Vehicle) -> bool,
    ) -> bool {
        self.vehicles_near_tile_xy(x, y, max_dist).any(|id| {
            self.get(id)
                .map_or(false, |vehicle| predicate(id, vehicle))
        })
    }

    pub fn vehicles_on_tile(&self, tile: TileCoord) -> impl Iterator<Item = VehicleId> + '_ {
        self.tile_hash.candidates_on(tile).filter_map(move |slot| {
            let vehicle = self.slots.get(slot)?.as_ref()?;
            (vehicle.tile == Some(tile)).then_some(VehicleId(slot as u32))
        })
    }

    /// Draws every visible vehicle intersecting the current surface of
    /// `gfx`, which must be a viewport surface in virtual coordinates.
    /// Flagged vehicles are revalidated through `resolver` first.
    pub fn viewport_add_vehicles(&mut self, gfx: &mut Gfx<'_>, resolver: &mut SpriteResolver<'_>) {
        let surface = *gfx.surface();
        let sprites = gfx.assets().sprites;
        let l = surface.left;
        let t = surface.top;
        let r = surface.left + surface.width;
        let b = surface.top + surface.height;
        let xb = crate::spatial::MAX_VEHICLE_PIXEL_X * ZOOM_BASE;
        let yb = crate::spatial::MAX_VEHICLE_PIXEL_Y * ZOOM_BASE;

        let mut drawn = 0usize;
        for slot in self.viewport_hash.candidates_in(Rect::new(l, t, r, b)) {
            let Some(vehicle) = self.slots.get_mut(slot).and_then(Option::as_mut) else {
                continue;
            };
            if !vehicle.is_drawn() {
                continue;
            }
            let Some(coord) = vehicle.coord else {
                continue;
            };
            if !(l <= coord.right + xb && t <= coord.bottom + yb && r >= coord.left - xb && b >= coord.top - yb) {
                continue;
            }

            if vehicle.revalidate_before_draw {
                if let Some(seq) = resolver(VehicleId(slot as u32), vehicle) {
                    if seq.is_valid() && seq != vehicle.sprite_seq {
                        vehicle.sprite_seq = seq;
                        vehicle.update_bounding_box_coordinates(sprites, false);
                    }
                }
                vehicle.revalidate_before_draw = false;
            }

            let Some(coord) = vehicle.coord else {
                continue;
            };
            if l <= coord.right && t <= coord.bottom && r >= coord.left && b >= coord.top {
                vehicle.draw(gfx);
                drawn += 1;
            }
        }
        trace!(drawn, "viewport_vehicles_drawn");
    }

    /// Vehicle under the screen position `x, y` of `viewport` whose bounds
    /// centre is nearest to it.
    pub fn check_click_on_vehicle(&self, viewport: &Viewport, x: i32, y: i32) -> Option<VehicleId> {
        let x = x - viewport.left;
        let y = y - viewport.top;
        if !(0..viewport.width).contains(&x) || !(0..viewport.height).contains(&y) {
            return None;
        }
        let point = Point::new(
            scale_by_zoom(x, viewport.zoom) + viewport.virtual_left,
            scale_by_zoom(y, viewport.zoom) + viewport.virtual_top,
        );

        let mut best: Option<(u32, VehicleId)> = None;
        for slot in self.viewport_hash.candidates_at(point) {
            let Some(vehicle) = self.slots.get(slot).and_then(Option::as_ref) else {
                continue;
            };
            if !vehicle.is_drawn() || vehicle.state.contains(VehicleState::UNCLICKABLE) {
                continue;
            }
            let Some(coord) = vehicle.coord else {
                continue;
            };
            if !coord.contains(point) {
                continue;
            }
            let distance = (((coord.left + coord.right) >> 1) - point.x)
                .unsigned_abs()
                .max((((coord.top + coord.bottom) >> 1) - point.y).unsigned_abs());
            if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                best = Some((distance, VehicleId(slot as u32)));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Empties both hashes; vehicles stay in the pool until refiled.
    pub fn reset_hashes(&mut self) {
        self.tile_hash.clear();
        self.viewport_hash.clear();
        for vehicle in self.slots.iter_mut().flatten() {
            vehicle.tile = None;
        }
        debug!("vehicle_hashes_reset");
    }

    /// Tile-hash bucket the vehicle is filed under.
    pub fn tile_bucket(&self, id: VehicleId) -> Option<usize> {
        self.tile_hash.bucket_of(id.slot())
    }

    /// Viewport-hash bucket the vehicle is filed under.
    pub fn viewport_bucket(&self, id: VehicleId) -> Option<usize> {
        self.viewport_hash.bucket_of(id.slot())
    }
}

/// World position of the centre of a tile.
pub const fn tile_centre(tile: TileCoord) -> Point {
    Point::new(
        tile.x as i32 * TILE_SIZE + TILE_SIZE / 2,
        tile.y as i32 * TILE_SIZE + TILE_SIZE / 2,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::gfx::tests::assets_fixture;
    use crate::gfx::GfxAssets;
    use crate::palette::Palette;
    use crate::spatial::{tile_hash, viewport_hash};
    use crate::sprite::{Sprite, SpriteStore};
    use crate::surface::PixelSurface;
    use crate::test_support::{BlitterCall, RecordingBlitter};
    use crate::zoom::ZoomLevel;

    #[derive(Default)]
    struct RecordingMarker {
        areas: Vec<Rect>,
    }

    impl ViewportDirtyMarker for RecordingMarker {
        fn mark_all_viewports_dirty(&mut self, area: Rect) -> bool {
            self.areas.push(area);
            true
        }
    }

    fn store_with_sprites() -> (SpriteStore, SpriteId, SpriteId) {
        let mut store = SpriteStore::new(&Palette::standard());
        let small = store
            .insert("vehicle/small", Sprite::filled(16, 16, -8, -8, 5).expect("sprite"))
            .expect("insert");
        let large = store
            .insert("vehicle/large", Sprite::filled(24, 20, -12, -10, 6).expect("sprite"))
            .expect("insert");
        (store, small, large)
    }

    fn place(pool: &mut VehiclePool, store: &SpriteStore, sprite: SpriteId, x: i32, y: i32) -> VehicleId {
        let id = pool.spawn(Vehicle::new(x, y, 0, SpriteSeq::single(sprite)));
        pool.update_position_and_viewport(id, store, &mut RecordingMarker::default());
        id
    }

    #[test]
    fn bounds_follow_the_sprite_and_the_projection() {
        let (store, small, _) = store_with_sprites();
        let mut vehicle = Vehicle::new(32, 16, 0, SpriteSeq::single(small));
        vehicle.update_bounding_box_coordinates(&store, true);
        assert_eq!(vehicle.coord(), Some(Rect::new(-136, 184, -113, 207)));
        assert_eq!(vehicle.old_coord(), vehicle.coord());
    }

    #[test]
    fn bounds_without_cache_update_grow_the_old_bounds() {
        let (store, small, _) = store_with_sprites();
        let mut vehicle = Vehicle::new(0, 10, 0, SpriteSeq::single(small));
        vehicle.update_bounding_box_coordinates(&store, true);
        let first = vehicle.coord().expect("bounds");
        vehicle.x_pos = -5;
        vehicle.update_bounding_box_coordinates(&store, false);
        let second = vehicle.coord().expect("bounds");
        assert_eq!(vehicle.old_coord(), Some(first));
        assert!(second.left > first.left);

        vehicle.x_pos = -10;
        vehicle.update_bounding_box_coordinates(&store, false);
        assert_eq!(vehicle.old_coord(), Some(first.union(&second)));
    }

    #[test]
    fn first_viewport_update_marks_only_the_new_bounds() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = pool.spawn(Vehicle::new(0, 10, 0, SpriteSeq::single(small)));
        let mut marker = RecordingMarker::default();
        pool.update_position_and_viewport(id, &store, &mut marker);
        let coord = pool.get(id).and_then(Vehicle::coord).expect("bounds");
        assert_eq!(
            marker.areas,
            vec![Rect::new(coord.left, coord.top, coord.right + ZOOM_BASE, coord.bottom + ZOOM_BASE)]
        );
        assert!(pool.get(id).expect("vehicle").is_viewport_candidate());
    }

    #[test]
    fn moving_marks_the_union_of_old_and_new_bounds() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = place(&mut pool, &store, small, 0, 10);
        let before = pool.get(id).and_then(Vehicle::coord).expect("bounds");

        pool.get_mut(id).expect("vehicle").y_pos = 14;
        let mut marker = RecordingMarker::default();
        pool.update_position_and_viewport(id, &store, &mut marker);
        let after = pool.get(id).and_then(Vehicle::coord).expect("bounds");
        assert_eq!(marker.areas, vec![before.union(&after)]);
    }

    #[test]
    fn hash_buckets_follow_every_move() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(512, 512));
        let id = place(&mut pool, &store, small, 40, 300);
        assert_eq!(pool.tile_bucket(id), Some(tile_hash(2, 18)));

        pool.get_mut(id).expect("vehicle").x_pos = 4000;
        pool.update_position_and_viewport(id, &store, &mut RecordingMarker::default());
        assert_eq!(pool.tile_bucket(id), Some(tile_hash(250, 18)));
        let coord = pool.get(id).and_then(Vehicle::coord).expect("bounds");
        assert_eq!(pool.viewport_bucket(id), Some(viewport_hash(coord.left, coord.top)));

        pool.get_mut(id).expect("vehicle").x_pos = -20;
        pool.update_position(id);
        assert_eq!(pool.tile_bucket(id), None);
        assert_eq!(pool.get(id).and_then(Vehicle::tile), None);
    }

    #[test]
    fn near_lookup_matches_a_full_scan() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(256, 256));
        let mut seed = 0x9e37_79b9_u32;
        let mut next = move |bound: u32| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed % bound) as i32
        };
        for _ in 0..200 {
            let x = next(256 * TILE_SIZE as u32);
            let y = next(256 * TILE_SIZE as u32);
            place(&mut pool, &store, small, x, y);
        }

        for &(x, y, dist) in &[(100, 100, 40), (2048, 2048, 300), (4000, 10, 64), (0, 0, 5000)] {
            let hashed: BTreeSet<_> = pool.vehicles_near_tile_xy(x, y, dist).collect();
            let scanned: BTreeSet<_> = pool
                .iter()
                .filter(|(_, vehicle)| {
                    (vehicle.x_pos - x).abs() <= dist && (vehicle.y_pos - y).abs() <= dist
                })
                .map(|(id, _)| id)
                .collect();
            assert_eq!(hashed, scanned, "near ({x}, {y}) within {dist}");
        }
    }

    #[test]
    fn on_tile_filters_out_bucket_neighbours() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(512, 512));
        let here = place(&mut pool, &store, small, 3 * TILE_SIZE + 1, 5 * TILE_SIZE + 1);
        place(&mut pool, &store, small, 131 * TILE_SIZE + 1, 5 * TILE_SIZE + 1);
        let found: Vec<_> = pool.vehicles_on_tile(TileCoord::new(3, 5)).collect();
        assert_eq!(found, vec![here]);
        assert!(pool.has_vehicle_near_tile_xy(3 * TILE_SIZE, 5 * TILE_SIZE, 8, |_, _| true));
        assert!(!pool.has_vehicle_near_tile_xy(3 * TILE_SIZE, 5 * TILE_SIZE, 8, |id, _| id != here));
    }

    #[test]
    fn destroy_unhashes_marks_and_frees_the_id() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = place(&mut pool, &store, small, 20, 20);
        let coord = pool.get(id).and_then(Vehicle::coord).expect("bounds");

        let mut marker = RecordingMarker::default();
        assert!(pool.destroy(id, &mut marker).is_some());
        assert_eq!(
            marker.areas,
            vec![Rect::new(coord.left, coord.top, coord.right + ZOOM_BASE, coord.bottom + ZOOM_BASE)]
        );
        assert_eq!(pool.tile_bucket(id), None);
        assert_eq!(pool.viewport_bucket(id), None);
        assert_eq!(pool.vehicles_on_tile(TileCoord::new(1, 1)).count(), 0);
        assert!(pool.is_empty());

        let reused = pool.spawn(Vehicle::new(0, 0, 0, SpriteSeq::single(small)));
        assert_eq!(reused, id);
    }

    #[test]
    fn hidden_vehicle_is_destroyed_without_marking() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = place(&mut pool, &store, small, 20, 20);
        pool.get_mut(id).expect("vehicle").state |= VehicleState::HIDDEN;
        let mut marker = RecordingMarker::default();
        pool.destroy(id, &mut marker);
        assert!(marker.areas.is_empty());
    }

    #[test]
    fn click_picks_the_vehicle_with_the_nearest_centre() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let first = place(&mut pool, &store, small, 0, 10);
        let second = place(&mut pool, &store, small, 0, 11);
        let viewport = Viewport::new(0, 0, 200, 200, ZoomLevel::MIN);

        assert_eq!(pool.check_click_on_vehicle(&viewport, 90, 46), Some(second));

        pool.get_mut(second).expect("vehicle").state |= VehicleState::UNCLICKABLE;
        assert_eq!(pool.check_click_on_vehicle(&viewport, 90, 46), Some(first));

        pool.get_mut(first).expect("vehicle").state |= VehicleState::HIDDEN;
        assert_eq!(pool.check_click_on_vehicle(&viewport, 90, 46), None);
        assert_eq!(pool.check_click_on_vehicle(&viewport, 250, 46), None);
    }

    #[test]
    fn viewport_draw_skips_hidden_and_distant_vehicles() {
        let (store, small, _) = store_with_sprites();
        let (_, font) = assets_fixture();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        place(&mut pool, &store, small, 0, 10);
        place(&mut pool, &store, small, 0, 200);
        let hidden = place(&mut pool, &store, small, 0, 12);
        pool.get_mut(hidden).expect("vehicle").state |= VehicleState::HIDDEN;

        let mut blitter = RecordingBlitter::new(200);
        let mut gfx = Gfx::new(
            &mut blitter,
            GfxAssets {
                sprites: &store,
                layouter: &font,
            },
            PixelSurface::screen(200, 200, 200),
        );
        pool.viewport_add_vehicles(&mut gfx, &mut |_, _| None);
        drop(gfx);

        assert_eq!(blitter.calls.len(), 1);
        assert!(matches!(
            blitter.calls[0],
            BlitterCall::Sprite {
                x: 72,
                y: 32,
                width: 16,
                height: 16,
                ..
            }
        ));
    }

    #[test]
    fn flagged_vehicles_are_revalidated_before_drawing() {
        let (store, small, large) = store_with_sprites();
        let (_, font) = assets_fixture();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = place(&mut pool, &store, small, 0, 10);
        let bucket = pool.viewport_bucket(id);
        pool.get_mut(id).expect("vehicle").revalidate_before_draw = true;

        let mut blitter = RecordingBlitter::new(200);
        let mut gfx = Gfx::new(
            &mut blitter,
            GfxAssets {
                sprites: &store,
                layouter: &font,
            },
            PixelSurface::screen(200, 200, 200),
        );
        let mut asked = 0;
        pool.viewport_add_vehicles(&mut gfx, &mut |_, _| {
            asked += 1;
            Some(SpriteSeq::single(large))
        });
        pool.viewport_add_vehicles(&mut gfx, &mut |_, _| {
            asked += 1;
            None
        });
        drop(gfx);

        assert_eq!(asked, 1);
        let vehicle = pool.get(id).expect("vehicle");
        assert_eq!(vehicle.sprite_seq, SpriteSeq::single(large));
        assert!(!vehicle.revalidate_before_draw);
        assert_eq!(vehicle.coord().map(|coord| coord.left), Some(80 - 12));
        assert_eq!(pool.viewport_bucket(id), bucket);
        assert!(blitter
            .calls
            .iter()
            .all(|call| matches!(call, BlitterCall::Sprite { width: 24, .. })));
    }

    #[test]
    fn reset_empties_both_hashes() {
        let (store, small, _) = store_with_sprites();
        let mut pool = VehiclePool::new(MapSize::new(64, 64));
        let id = place(&mut pool, &store, small, 20, 20);
        pool.reset_hashes();
        assert_eq!(pool.tile_bucket(id), None);
        assert_eq!(pool.viewport_bucket(id), None);
        assert!(pool.get(id).is_some());
    }

    #[test]
    fn crashed_vehicles_draw_with_the_crash_palette() {
        let (store, small, _) = store_with_sprites();
        let (_, font) = assets_fixture();
        let mut vehicle = Vehicle::new(0, 10, 0, SpriteSeq::single(small));
        vehicle.state |= VehicleState::CRASHED;
        let mut blitter = RecordingBlitter::new(200);
        let mut gfx = Gfx::new(
            &mut blitter,
            GfxAssets {
                sprites: &store,
                layouter: &font,
            },
            PixelSurface::screen(200, 200, 200),
        );
        vehicle.draw(&mut gfx);
        drop(gfx);
        assert!(matches!(
            blitter.calls[0],
            BlitterCall::Sprite {
                mode: crate::blitter::BlitterMode::CrashRemap,
                ..
            }
        ));
    }

    #[test]
    fn tile_centre_is_half_a_tile_in() {
        assert_eq!(tile_centre(TileCoord::new(2, 3)), Point::new(40, 56));
    }
}
