use crate::geometry::{Point, Rect};
use crate::zoom::{ZOOM_BASE, ZOOM_BASE_SHIFT};

use super::{wrapping_steps, BucketIndex};

const HASH_X_BITS: u32 = 6;
const HASH_Y_BITS: u32 = 6;
/// Virtual pixels per bucket column, before the zoom base factor.
const HASH_X_BUCKET_BITS: u32 = 7;
const HASH_Y_BUCKET_BITS: u32 = 6;

/// Virtual width covered by one sweep of bucket columns.
pub const VIEWPORT_HASH_X_SIZE: i32 = 1 << (HASH_X_BUCKET_BITS + HASH_X_BITS + ZOOM_BASE_SHIFT);
pub const VIEWPORT_HASH_Y_SIZE: i32 = 1 << (HASH_Y_BUCKET_BITS + HASH_Y_BITS + ZOOM_BASE_SHIFT);

const HASH_X_INC: usize = 1;
const HASH_Y_INC: usize = 1 << HASH_X_BITS;
const HASH_X_MASK: usize = (1 << HASH_X_BITS) - 1;
const HASH_Y_MASK: usize = ((1 << HASH_Y_BITS) - 1) << HASH_X_BITS;
const HASH_TOTAL: usize = 1 << (HASH_X_BITS + HASH_Y_BITS);

/// Largest vehicle sprite extent in normal-zoom pixels; vehicles are hashed
/// by their top-left corner, so lookups widen the area by this much.
pub const MAX_VEHICLE_PIXEL_X: i32 = 192;
pub const MAX_VEHICLE_PIXEL_Y: i32 = 96;

fn hash_x(x: i32) -> usize {
    (x >> (HASH_X_BUCKET_BITS + ZOOM_BASE_SHIFT)) as usize & HASH_X_MASK
}

fn hash_y(y: i32) -> usize {
    ((y >> (HASH_Y_BUCKET_BITS + ZOOM_BASE_SHIFT)) as usize & (HASH_Y_MASK >> HASH_X_BITS)) << HASH_X_BITS
}

/// Bucket of a virtual position.
pub fn viewport_hash(x: i32, y: i32) -> usize {
    hash_x(x) + hash_y(y)
}

/// Vehicles bucketed by the top-left corner of their screen bounds.
#[derive(Debug, Clone)]
pub struct ViewportHash {
    index: BucketIndex,
}

impl Default for ViewportHash {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportHash {
    pub fn new() -> Self {
        Self {
            index: BucketIndex::new(HASH_TOTAL),
        }
    }

    pub fn bucket_of(&self, slot: usize) -> Option<usize> {
        self.index.bucket_of(slot)
    }

    /// Files `slot` under the bucket of `top_left`, or takes it out for
    /// `None`. Returns false when the bucket did not change.
    pub fn update(&mut self, slot: usize, top_left: Option<Point>) -> bool {
        let bucket = top_left.map(|point| viewport_hash(point.x, point.y));
        self.index.move_to(slot, bucket)
    }

    pub fn remove(&mut self, slot: usize) {
        self.index.remove(slot);
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Slots that may have bounds intersecting the virtual `area`
    /// (right/bottom exclusive).
    pub fn candidates_in(&self, area: Rect) -> impl Iterator<Item = usize> + '_ {
        let xb = MAX_VEHICLE_PIXEL_X * ZOOM_BASE;
        let yb = MAX_VEHICLE_PIXEL_Y * ZOOM_BASE;
        let (x_first, x_last) = if area.width() + xb < VIEWPORT_HASH_X_SIZE {
            (hash_x(area.left - xb), hash_x(area.right))
        } else {
            (0, HASH_X_MASK)
        };
        let (y_first, y_last) = if area.height() + yb < VIEWPORT_HASH_Y_SIZE {
            (hash_y(area.top - yb), hash_y(area.bottom))
        } else {
            (0, HASH_Y_MASK)
        };
        self.scan(x_first, x_last, y_first, y_last)
    }

    /// Slots that may have bounds containing the virtual `point`.
    pub fn candidates_at(&self, point: Point) -> impl Iterator<Item = usize> + '_ {
        let xb = MAX_VEHICLE_PIXEL_X * ZOOM_BASE;
        let yb = MAX_VEHICLE_PIXEL_Y * ZOOM_BASE;
        self.scan(
            hash_x(point.x - xb),
            hash_x(point.x),
            hash_y(point.y - yb),
            hash_y(point.y),
        )
    }

    fn scan(
        &self,
        x_first: usize,
        x_last: usize,
        y_first: usize,
        y_last: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        wrapping_steps(y_first, y_last, HASH_Y_INC, HASH_Y_MASK)
            .flat_map(move |y| {
                wrapping_steps(x_first, x_last, HASH_X_INC, HASH_X_MASK).map(move |x| x + y)
            })
            .flat_map(move |bucket| self.index.iter_bucket(bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_the_bucket_layout() {
        assert_eq!(VIEWPORT_HASH_X_SIZE, 32768);
        assert_eq!(VIEWPORT_HASH_Y_SIZE, 16384);
    }

    #[test]
    fn negative_positions_wrap_into_range() {
        let bucket = viewport_hash(-1, -1);
        assert_eq!(bucket, HASH_X_MASK + HASH_Y_MASK);
        assert_eq!(viewport_hash(0, 0), 0);
        assert_eq!(viewport_hash(512, 256), 1 + (1 << HASH_X_BITS));
    }

    #[test]
    fn area_lookup_includes_entries_left_of_and_above_the_area() {
        let mut hash = ViewportHash::new();
        hash.update(0, Some(Point::new(1000 - 700, 1000 - 300)));
        hash.update(1, Some(Point::new(20_000, 1000)));
        let found: Vec<_> = hash.candidates_in(Rect::new(1000, 1000, 1200, 1100)).collect();
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn point_lookup_scans_up_and_left() {
        let mut hash = ViewportHash::new();
        hash.update(3, Some(Point::new(4000, 2000)));
        assert_eq!(hash.candidates_at(Point::new(4100, 2100)).collect::<Vec<_>>(), vec![3]);
        assert_eq!(hash.candidates_at(Point::new(3000, 2100)).count(), 0);
    }
}
