use crate::geometry::Rect;

use super::{wrapping_steps, BucketIndex, TileCoord, TILE_SIZE};

pub const TILE_HASH_BITS: u32 = 7;
pub const TILE_HASH_SIZE: usize = 1 << TILE_HASH_BITS;
pub const TILE_HASH_MASK: usize = TILE_HASH_SIZE - 1;
const TILE_HASH_TOTAL: usize = TILE_HASH_SIZE * TILE_HASH_SIZE;

const fn tile_hash_1d(value: u32) -> usize {
    value as usize & TILE_HASH_MASK
}

/// Bucket of a tile: the low bits of both coordinates, so tiles 128 apart
/// share a bucket.
pub const fn tile_hash(x: u32, y: u32) -> usize {
    tile_hash_1d(y) << TILE_HASH_BITS | tile_hash_1d(x)
}

/// Vehicles bucketed by the tile they stand on.
#[derive(Debug, Clone)]
pub struct TileHash {
    index: BucketIndex,
}

impl Default for TileHash {
    fn default() -> Self {
        Self::new()
    }
}

impl TileHash {
    pub fn new() -> Self {
        Self {
            index: BucketIndex::new(TILE_HASH_TOTAL),
        }
    }

    pub fn bucket_of(&self, slot: usize) -> Option<usize> {
        self.index.bucket_of(slot)
    }

    /// Files `slot` under `tile`, or takes it out for `None`. Returns false
    /// when the bucket did not change.
    pub fn update(&mut self, slot: usize, tile: Option<TileCoord>) -> bool {
        let bucket = tile.map(|tile| tile_hash(tile.x, tile.y));
        self.index.move_to(slot, bucket)
    }

    pub fn remove(&mut self, slot: usize) {
        self.index.remove(slot);
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Slots sharing a bucket with `tile`; callers filter for the exact tile.
    pub fn candidates_on(&self, tile: TileCoord) -> impl Iterator<Item = usize> + '_ {
        self.index.iter_bucket(tile_hash(tile.x, tile.y))
    }

    /// Slots whose bucket intersects the world area `area` (inclusive), which
    /// was built from a centre and `max_dist`. Large areas scan every bucket.
    pub fn candidates_near(&self, area: Rect, max_dist: i32) -> impl Iterator<Item = usize> + '_ {
        let (x_first, x_last, y_first, y_last) = if 2 * max_dist < TILE_HASH_MASK as i32 * TILE_SIZE {
            (
                tile_hash_1d((area.left / TILE_SIZE) as u32),
                tile_hash_1d((area.right / TILE_SIZE) as u32),
                tile_hash_1d((area.top / TILE_SIZE) as u32) << TILE_HASH_BITS,
                tile_hash_1d((area.bottom / TILE_SIZE) as u32) << TILE_HASH_BITS,
            )
        } else {
            (0, TILE_HASH_MASK, 0, TILE_HASH_MASK << TILE_HASH_BITS)
        };

        wrapping_steps(y_first, y_last, TILE_HASH_SIZE, TILE_HASH_MASK << TILE_HASH_BITS)
            .flat_map(move |y| {
                wrapping_steps(x_first, x_last, 1, TILE_HASH_MASK).map(move |x| x + y)
            })
            .filter(move |&bucket| !self.index.is_bucket_empty(bucket))
            .flat_map(move |bucket| self.index.iter_bucket(bucket))
    }
}
