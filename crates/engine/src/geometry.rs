#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. Whether `right`/`bottom` are inclusive depends on
/// the operation consuming it; each call site documents which.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    /// Width when `right` is exclusive.
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height when `bottom` is exclusive.
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Inclusive containment on all four edges.
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }

    /// Overlap test for exclusive right/bottom edges.
    pub const fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }

    /// Grows every edge outwards by the given amounts.
    pub const fn expand(&self, horizontal: i32, vertical: i32) -> Rect {
        Rect {
            left: self.left - horizontal,
            top: self.top - vertical,
            right: self.right + horizontal,
            bottom: self.bottom + vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum.
    pub fn max(self, other: Dimension) -> Dimension {
        Dimension {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

/// Division rounding up, for non-negative numerators and positive divisors.
pub const fn ceil_div(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

/// Signed division by a positive divisor, rounding halves away from zero.
pub const fn round_div_su(a: i32, b: i32) -> i32 {
    if a > 0 {
        (a + b / 2) / b
    } else {
        (a - (b - 1) / 2) / b
    }
}

/// Start coordinate that centres `size` between `min` and `max` (both inclusive).
pub const fn centre_bounds(min: i32, max: i32, size: i32) -> i32 {
    (min + max - size + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_div_rounds_partial_blocks_up() {
        assert_eq!(ceil_div(0, 64), 0);
        assert_eq!(ceil_div(1, 64), 1);
        assert_eq!(ceil_div(64, 64), 1);
        assert_eq!(ceil_div(65, 64), 2);
    }

    #[test]
    fn round_div_su_rounds_away_from_zero_on_halves() {
        assert_eq!(round_div_su(5, 2), 3);
        assert_eq!(round_div_su(4, 2), 2);
        assert_eq!(round_div_su(-5, 2), -2);
        assert_eq!(round_div_su(-4, 2), -2);
    }

    #[test]
    fn centre_bounds_places_odd_sizes_towards_the_right() {
        assert_eq!(centre_bounds(0, 9, 4), 3);
        assert_eq!(centre_bounds(0, 9, 3), 3);
    }

    #[test]
    fn rect_contains_is_inclusive_on_every_edge() {
        let rect = Rect::new(0, 0, 10, 10);
        assert!(rect.contains(Point::new(0, 0)));
        assert!(rect.contains(Point::new(10, 10)));
        assert!(!rect.contains(Point::new(11, 10)));
        assert!(!rect.contains(Point::new(-1, 5)));
    }

    #[test]
    fn overlap_treats_shared_edges_as_disjoint() {
        let a = Rect::from_size(0, 0, 10, 10);
        let b = Rect::from_size(10, 0, 10, 10);
        let c = Rect::from_size(9, 9, 10, 10);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }
}
