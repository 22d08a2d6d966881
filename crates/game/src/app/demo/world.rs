//! Terrain layout, visible-tile search and the looping vehicle routes.

use rand::rngs::StdRng;
use rand::Rng;
use tilegfx::vehicle::tile_centre;
use tilegfx::{remap_coords, MapSize, Point, Rect, TileCoord, TILE_SIZE};

use super::sprites::{Heading, TerrainKind, TILE_SPRITE_HEIGHT, TILE_SPRITE_WIDTH};

const LAKES_PER_THOUSAND_TILES: u32 = 3;
const MAX_LAKE_RADIUS: i32 = 6;
const MAX_ROUTE_SIDE_TILES: u32 = 10;

#[derive(Debug, Clone)]
pub(crate) struct Terrain {
    map: MapSize,
    kinds: Vec<TerrainKind>,
}

impl Terrain {
    /// Grass and meadow patches with a few sand-rimmed lakes.
    pub(crate) fn generate(map: MapSize, rng: &mut StdRng) -> Self {
        let mut kinds: Vec<TerrainKind> = (0..map.width * map.height)
            .map(|_| {
                if rng.gen_ratio(1, 5) {
                    TerrainKind::Meadow
                } else {
                    TerrainKind::Grass
                }
            })
            .collect();

        let lakes = (map.width * map.height * LAKES_PER_THOUSAND_TILES / 1000).max(1);
        for _ in 0..lakes {
            let centre_x = rng.gen_range(0..map.width) as i32;
            let centre_y = rng.gen_range(0..map.height) as i32;
            let radius = rng.gen_range(2..=MAX_LAKE_RADIUS);
            for y in (centre_y - radius - 1).max(0)..(centre_y + radius + 2).min(map.height as i32) {
                for x in (centre_x - radius - 1).max(0)..(centre_x + radius + 2).min(map.width as i32) {
                    let distance_sq = (x - centre_x).pow(2) + (y - centre_y).pow(2);
                    let index = (y as u32 * map.width + x as u32) as usize;
                    if distance_sq <= radius * radius {
                        kinds[index] = TerrainKind::Water;
                    } else if distance_sq <= (radius + 1) * (radius + 1) && kinds[index] != TerrainKind::Water {
                        kinds[index] = TerrainKind::Sand;
                    }
                }
            }
        }
        Self { map, kinds }
    }

    pub(crate) fn map(&self) -> MapSize {
        self.map
    }

    pub(crate) fn kind_at(&self, tile: TileCoord) -> TerrainKind {
        if tile.x >= self.map.width || tile.y >= self.map.height {
            return TerrainKind::Water;
        }
        self.kinds[(tile.y * self.map.width + tile.x) as usize]
    }
}

/// Virtual position of the north corner of a tile, where its ground
/// sprite is drawn.
pub(crate) fn tile_north_corner(tile: TileCoord) -> Point {
    remap_coords(tile.x as i32 * TILE_SIZE, tile.y as i32 * TILE_SIZE, 0)
}

/// Tiles whose ground sprite may touch the virtual `area` (right and
/// bottom exclusive), back to front.
pub(crate) fn visible_tiles(area: Rect, map: MapSize) -> Vec<TileCoord> {
    let step_x = TILE_SPRITE_WIDTH as i32 / 2;
    let step_y = TILE_SPRITE_HEIGHT as i32 / 2;
    // North corner at ((y - x) * step_x, (y + x) * step_y).
    let min_diff = (area.left - step_x).div_euclid(step_x);
    let max_diff = (area.right + step_x - 1).div_euclid(step_x);
    let min_sum = (area.top - 2 * step_y).div_euclid(step_y).max(0);
    let max_sum = (area.bottom - 1).div_euclid(step_y);

    let mut tiles = Vec::new();
    for sum in min_sum..=max_sum {
        for diff in min_diff..=max_diff {
            if (sum + diff).rem_euclid(2) != 0 {
                continue;
            }
            let y = (sum + diff) / 2;
            let x = (sum - diff) / 2;
            if x < 0 || y < 0 || x as u32 >= map.width || y as u32 >= map.height {
                continue;
            }
            let tile = TileCoord::new(x as u32, y as u32);
            let corner = tile_north_corner(tile);
            let sprite = Rect::new(
                corner.x - step_x,
                corner.y,
                corner.x + step_x,
                corner.y + 2 * step_y,
            );
            if sprite.overlaps(&area) {
                tiles.push(tile);
            }
        }
    }
    tiles
}

/// Virtual extent of the whole map, right and bottom exclusive.
pub(crate) fn map_extent(map: MapSize) -> Rect {
    let step_x = TILE_SPRITE_WIDTH as i32 / 2;
    let step_y = TILE_SPRITE_HEIGHT as i32 / 2;
    Rect::new(
        -(map.width as i32) * step_x,
        0,
        map.height as i32 * step_x,
        (map.width + map.height) as i32 * step_y,
    )
}

/// Rectangular loop through tile centres, driven clockwise on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Route {
    pub(crate) origin: Point,
    /// Side lengths in world units.
    pub(crate) width: i32,
    pub(crate) height: i32,
}

impl Route {
    pub(crate) fn random(map: MapSize, rng: &mut StdRng) -> Self {
        let tile_x = rng.gen_range(0..map.width);
        let tile_y = rng.gen_range(0..map.height);
        let width = rng.gen_range(0..=(map.width - 1 - tile_x).min(MAX_ROUTE_SIDE_TILES));
        let height = rng.gen_range(0..=(map.height - 1 - tile_y).min(MAX_ROUTE_SIDE_TILES));
        Self {
            origin: tile_centre(TileCoord::new(tile_x, tile_y)),
            width: width as i32 * TILE_SIZE,
            height: height as i32 * TILE_SIZE,
        }
    }

    pub(crate) fn perimeter(&self) -> i32 {
        2 * (self.width + self.height)
    }

    /// World position and heading after travelling `distance` from the
    /// origin.
    pub(crate) fn position_at(&self, distance: i32) -> (Point, Heading) {
        let perimeter = self.perimeter();
        if perimeter == 0 {
            return (self.origin, Heading::SouthWest);
        }
        let Point { x, y } = self.origin;
        let mut travelled = distance.rem_euclid(perimeter);
        if travelled < self.width {
            return (Point::new(x + travelled, y), Heading::SouthWest);
        }
        travelled -= self.width;
        if travelled < self.height {
            return (Point::new(x + self.width, y + travelled), Heading::SouthEast);
        }
        travelled -= self.height;
        if travelled < self.width {
            return (Point::new(x + self.width - travelled, y + self.height), Heading::NorthEast);
        }
        travelled -= self.width;
        (Point::new(x, y + self.height - travelled), Heading::NorthWest)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn tile_corners_step_half_a_sprite() {
        assert_eq!(tile_north_corner(TileCoord::new(0, 0)), Point::new(0, 0));
        assert_eq!(tile_north_corner(TileCoord::new(1, 0)), Point::new(-128, 64));
        assert_eq!(tile_north_corner(TileCoord::new(0, 1)), Point::new(128, 64));
    }

    #[test]
    fn visible_tiles_cover_the_area_back_to_front() {
        let map = MapSize::new(8, 8);
        let tiles = visible_tiles(Rect::new(-10, 0, 10, 20), map);
        assert_eq!(tiles, vec![TileCoord::new(0, 0)]);

        let tiles = visible_tiles(Rect::new(-200, 100, 200, 140), map);
        assert!(tiles.contains(&TileCoord::new(0, 0)));
        assert!(tiles.contains(&TileCoord::new(1, 0)));
        assert!(tiles.contains(&TileCoord::new(0, 1)));
        assert!(tiles.contains(&TileCoord::new(1, 1)));
        let depth = |tile: &TileCoord| tile.x + tile.y;
        assert!(tiles.windows(2).all(|pair| depth(&pair[0]) <= depth(&pair[1])));
    }

    #[test]
    fn visible_tiles_stay_on_the_map() {
        let map = MapSize::new(2, 3);
        let tiles = visible_tiles(map_extent(map).expand(500, 500), map);
        assert_eq!(tiles.len(), 6);
        assert!(visible_tiles(Rect::new(5_000, 5_000, 6_000, 6_000), map).is_empty());
    }

    #[test]
    fn route_walks_its_rectangle_and_wraps() {
        let route = Route {
            origin: Point::new(8, 8),
            width: 32,
            height: 16,
        };
        assert_eq!(route.perimeter(), 96);
        assert_eq!(route.position_at(0), (Point::new(8, 8), Heading::SouthWest));
        assert_eq!(route.position_at(40), (Point::new(40, 16), Heading::SouthEast));
        assert_eq!(route.position_at(50), (Point::new(38, 24), Heading::NorthEast));
        assert_eq!(route.position_at(90), (Point::new(8, 14), Heading::NorthWest));
        assert_eq!(route.position_at(96 + 40), route.position_at(40));
    }

    #[test]
    fn empty_route_stands_still() {
        let route = Route {
            origin: Point::new(24, 24),
            width: 0,
            height: 0,
        };
        assert_eq!(route.position_at(77).0, Point::new(24, 24));
    }

    #[test]
    fn random_routes_stay_on_the_map() {
        let map = MapSize::new(12, 5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let route = Route::random(map, &mut rng);
            let far = Point::new(route.origin.x + route.width, route.origin.y + route.height);
            assert!(map.tile_at(route.origin.x, route.origin.y).is_some());
            assert!(map.tile_at(far.x, far.y).is_some());
        }
    }

    #[test]
    fn terrain_is_reproducible_from_the_seed() {
        let map = MapSize::new(20, 20);
        let first = Terrain::generate(map, &mut StdRng::seed_from_u64(3));
        let second = Terrain::generate(map, &mut StdRng::seed_from_u64(3));
        assert_eq!(first.kinds, second.kinds);
        assert!(first.kinds.contains(&TerrainKind::Water));
        assert_eq!(first.kind_at(TileCoord::new(99, 0)), TerrainKind::Water);
    }
}
