//! Hashed buckets for finding vehicles by map tile or by screen position.
//!
//! Each index is an arena of intrusive doubly-linked lists: entities are
//! addressed by slot number and every slot records the bucket it sits in,
//! so moving or removing one never scans a bucket.

mod tile_hash;
mod viewport_hash;

pub use tile_hash::{tile_hash, TileHash, TILE_HASH_BITS, TILE_HASH_MASK, TILE_HASH_SIZE};
pub use viewport_hash::{
    viewport_hash, ViewportHash, MAX_VEHICLE_PIXEL_X, MAX_VEHICLE_PIXEL_Y, VIEWPORT_HASH_X_SIZE,
    VIEWPORT_HASH_Y_SIZE,
};

/// World units per tile along each axis.
pub const TILE_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Map dimensions in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl MapSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Tile under the world position, `None` off the map.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileCoord> {
        if x < 0 || y < 0 {
            return None;
        }
        let tile = TileCoord::new((x / TILE_SIZE) as u32, (y / TILE_SIZE) as u32);
        (tile.x < self.width && tile.y < self.height).then_some(tile)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    bucket: Option<usize>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BucketIndex {
    heads: Vec<Option<usize>>,
    links: Vec<Link>,
}

impl BucketIndex {
    pub fn new(buckets: usize) -> Self {
        Self {
            heads: vec![None; buckets],
            links: Vec::new(),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    pub fn bucket_of(&self, slot: usize) -> Option<usize> {
        self.links.get(slot).and_then(|link| link.bucket)
    }

    /// Moves `slot` to the front of `bucket`, or out of the index for
    /// `None`. Returns false when it already was there.
    pub fn move_to(&mut self, slot: usize, bucket: Option<usize>) -> bool {
        debug_assert!(bucket.map_or(true, |bucket| bucket < self.heads.len()));
        if slot >= self.links.len() {
            self.links.resize(slot + 1, Link::default());
        }
        if self.links[slot].bucket == bucket {
            return false;
        }

        self.unlink(slot);
        if let Some(bucket) = bucket {
            let head = self.heads[bucket];
            self.links[slot] = Link {
                bucket: Some(bucket),
                prev: None,
                next: head,
            };
            if let Some(head) = head {
                self.links[head].prev = Some(slot);
            }
            self.heads[bucket] = Some(slot);
        }
        true
    }

    pub fn remove(&mut self, slot: usize) {
        self.move_to(slot, None);
    }

    pub fn is_bucket_empty(&self, bucket: usize) -> bool {
        self.heads[bucket].is_none()
    }

    pub fn iter_bucket(&self, bucket: usize) -> BucketIter<'_> {
        BucketIter {
            index: self,
            next: self.heads[bucket],
        }
    }

    pub fn clear(&mut self) {
        self.heads.fill(None);
        self.links.clear();
    }

    fn unlink(&mut self, slot: usize) {
        let Link { bucket, prev, next } = self.links[slot];
        let Some(bucket) = bucket else {
            return;
        };
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.heads[bucket] = next,
        }
        if let Some(next) = next {
            self.links[next].prev = prev;
        }
        self.links[slot] = Link::default();
    }
}

pub struct BucketIter<'a> {
    index: &'a BucketIndex,
    next: Option<usize>,
}

impl Iterator for BucketIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let slot = self.next?;
        self.next = self.index.links[slot].next;
        Some(slot)
    }
}

/// Bucket numbers from `first` to `last` inclusive, stepping by `step` and
/// wrapping inside `mask`.
pub(crate) fn wrapping_steps(
    first: usize,
    last: usize,
    step: usize,
    mask: usize,
) -> impl Iterator<Item = usize> + Clone {
    let count = (last.wrapping_sub(first) & mask) / step + 1;
    (0..count).map(move |i| (first + i * step) & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(index: &BucketIndex, bucket: usize) -> Vec<usize> {
        index.iter_bucket(bucket).collect()
    }

    #[test]
    fn slots_move_between_buckets() {
        let mut index = BucketIndex::new(4);
        assert!(index.move_to(0, Some(1)));
        assert!(index.move_to(1, Some(1)));
        assert!(index.move_to(2, Some(1)));
        assert_eq!(members(&index, 1), vec![2, 1, 0]);

        assert!(index.move_to(1, Some(3)));
        assert_eq!(members(&index, 1), vec![2, 0]);
        assert_eq!(members(&index, 3), vec![1]);
        assert_eq!(index.bucket_of(1), Some(3));
        assert!(!index.move_to(1, Some(3)));
    }

    #[test]
    fn removing_head_middle_and_tail_keeps_lists_linked() {
        let mut index = BucketIndex::new(2);
        for slot in 0..5 {
            index.move_to(slot, Some(0));
        }
        index.remove(4);
        index.remove(2);
        index.remove(0);
        assert_eq!(members(&index, 0), vec![3, 1]);
        assert_eq!(index.bucket_of(2), None);
        index.remove(2);
        assert_eq!(members(&index, 0), vec![3, 1]);
    }

    #[test]
    fn clear_empties_every_bucket() {
        let mut index = BucketIndex::new(3);
        index.move_to(0, Some(0));
        index.move_to(7, Some(2));
        index.clear();
        assert!((0..3).all(|bucket| index.is_bucket_empty(bucket)));
        assert_eq!(index.bucket_of(7), None);
    }

    #[test]
    fn wrapping_steps_cross_the_end() {
        assert_eq!(wrapping_steps(126, 1, 1, 127).collect::<Vec<_>>(), vec![126, 127, 0, 1]);
        assert_eq!(wrapping_steps(5, 5, 1, 127).collect::<Vec<_>>(), vec![5]);
        assert_eq!(
            wrapping_steps(62 << 6, 1 << 6, 1 << 6, 63 << 6).collect::<Vec<_>>(),
            vec![62 << 6, 63 << 6, 0, 1 << 6]
        );
    }

    #[test]
    fn tile_lookup_rejects_positions_off_the_map() {
        let map = MapSize::new(4, 4);
        assert_eq!(map.tile_at(17, 33), Some(TileCoord::new(1, 2)));
        assert_eq!(map.tile_at(-1, 0), None);
        assert_eq!(map.tile_at(64, 0), None);
    }
}
