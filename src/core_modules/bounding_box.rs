// THEORY:
// The `BoundingBox` is the leaf of the detection core: a plain, copyable,
// axis-aligned rectangle in pixel coordinates. It knows its own size, how far
// it is from another box, and how to grow into the smallest box enclosing
// both. It has no identity beyond its four coordinates.
//
// Key architectural principles:
// 1.  **Corner Invariant**: `x1 <= x2` and `y1 <= y2`. The constructors
//     establish it (`new` normalizes, `try_new` rejects); a box built by
//     struct literal must uphold it itself.
// 2.  **Conservative Proximity**: `distance` is the larger of the two per-axis
//     gaps. Two boxes are only "close" when they are close on both axes at the
//     same time; overlap on an axis yields a gap of zero or less.
// 3.  **Exclusive Far Edge**: a box built from a pixel rectangle at `(x, y)` of
//     size `w x h` spans `(x, y, x + w, y + h)`, so `width()` is the pixel count.

use crate::error::{Error, Result};
use imageproc::rect::Rect;

/// An axis-aligned rectangle with top-left corner `(x1, y1)` and bottom-right
/// corner `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Builds a box from two opposite corners, swapping coordinates as needed so
    /// the result always satisfies the corner invariant.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Strict constructor: inverted corners are rejected instead of repaired.
    pub fn try_new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 > x2 || y1 > y2 {
            return Err(Error::InvalidArgument(format!(
                "inverted box corners ({x1}, {y1}) -> ({x2}, {y2})"
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Converts a pixel rectangle into a box with exclusive right and bottom edges.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x1: rect.left(),
            y1: rect.top(),
            x2: rect.left() + rect.width() as i32,
            y2: rect.top() + rect.height() as i32,
        }
    }

    /// Widened to `i64` so boxes spanning the whole `i32` range cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    /// Separation between two boxes: `max(dw, dh)` where `dw` is the gap between
    /// their x-projections and `dh` the gap between their y-projections.
    ///
    /// Zero or negative on an axis means the projections touch or overlap there.
    /// This is not a Euclidean distance: a box level with another but far below
    /// it is far away.
    pub fn distance(&self, other: &BoundingBox) -> i64 {
        let dw = i64::from(self.x1.max(other.x1)) - i64::from(self.x2.min(other.x2));
        let dh = i64::from(self.y1.max(other.y1)) - i64::from(self.y2.min(other.y2));
        dw.max(dh)
    }

    /// The smallest box enclosing both `self` and `other`.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Multiplies every coordinate by `factor`, rounding to the nearest pixel.
    /// Used to map boxes found on a downscaled mask back to source resolution.
    pub fn scale(&self, factor: f64) -> BoundingBox {
        let mul = |v: i32| (v as f64 * factor).round() as i32;
        BoundingBox::new(mul(self.x1), mul(self.y1), mul(self.x2), mul(self.y2))
    }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_and_height() {
        let b = BoundingBox::new(10, 20, 40, 25);
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 5);
    }

    #[test]
    fn new_normalizes_inverted_corners() {
        let b = BoundingBox::new(40, 25, 10, 20);
        assert_eq!(b, BoundingBox { x1: 10, y1: 20, x2: 40, y2: 25 });
    }

    #[test]
    fn try_new_rejects_inverted_corners() {
        assert!(matches!(
            BoundingBox::try_new(5, 0, 4, 10),
            Err(Error::InvalidArgument(_))
        ));
        assert!(BoundingBox::try_new(5, 0, 5, 10).is_ok());
    }

    #[test]
    fn distance_is_negative_when_overlapping() {
        let a = BoundingBox::new(0, 0, 40, 40);
        let b = BoundingBox::new(35, 0, 80, 40);
        // dw = 35 - 40, dh = 0 - 40
        assert_eq!(a.distance(&b), -5);
        assert_eq!(b.distance(&a), -5);
    }

    #[test]
    fn distance_is_zero_when_touching() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(10, 0, 20, 10);
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn distance_takes_the_larger_axis_gap() {
        let a = BoundingBox::new(0, 0, 20, 20);
        let b = BoundingBox::new(100, 100, 120, 120);
        assert_eq!(a.distance(&b), 80);

        // Side by side horizontally but far apart vertically.
        let c = BoundingBox::new(25, 500, 45, 520);
        assert_eq!(a.distance(&c), 480);
    }

    #[test]
    fn merge_is_the_enclosing_rectangle() {
        let a = BoundingBox::new(0, 5, 40, 40);
        let b = BoundingBox::new(35, 0, 80, 30);
        assert_eq!(a.merge(&b), BoundingBox::new(0, 0, 80, 40));
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn degenerate_boxes_are_handled() {
        let point = BoundingBox::new(7, 7, 7, 7);
        assert_eq!(point.width(), 0);
        assert_eq!(point.distance(&point), 0);
        assert_eq!(point.merge(&point), point);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let wide = BoundingBox::new(i32::MIN, 0, i32::MAX, 10);
        assert_eq!(wide.width(), u32::MAX as i64);
        assert_eq!(wide.height(), 10);

        let far = BoundingBox::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX);
        let near = BoundingBox::new(i32::MIN, i32::MIN, i32::MIN, i32::MIN);
        assert_eq!(far.distance(&near), u32::MAX as i64);
        assert_eq!(wide.distance(&wide), -10);
    }

    #[test]
    fn from_rect_uses_exclusive_far_edge() {
        let rect = Rect::at(3, 4).of_size(10, 20);
        assert_eq!(BoundingBox::from_rect(rect), BoundingBox::new(3, 4, 13, 24));
    }

    #[test]
    fn scale_rounds_each_coordinate() {
        let b = BoundingBox::new(1, 2, 11, 13);
        assert_eq!(b.scale(4.0), BoundingBox::new(4, 8, 44, 52));
        assert_eq!(b.scale(0.5), BoundingBox::new(1, 1, 6, 7));
    }
}
