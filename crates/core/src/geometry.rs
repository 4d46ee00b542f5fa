//! Axis-aligned geometry primitives.
//!
//! All coordinates are millimetres in container-local space: X runs along the
//! plan width, Y along the plan length, and the origin is the lower-left corner
//! of the usable plan.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance used by every geometric predicate.
pub const EPSILON: f64 = 1e-6;

/// Orientation of a rectangular piece on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// The footprint as declared (width along X).
    #[default]
    Declared,
    /// Rotated by 90 degrees (width and height swapped).
    Rotated,
}

impl Orientation {
    /// Returns true for the rotated orientation.
    pub fn is_rotated(self) -> bool {
        matches!(self, Self::Rotated)
    }

    /// Returns the other orientation.
    pub fn flipped(self) -> Self {
        match self {
            Self::Declared => Self::Rotated,
            Self::Rotated => Self::Declared,
        }
    }

    /// Applies the orientation to a declared `(width, height)` footprint.
    pub fn apply(self, width: f64, height: f64) -> (f64, f64) {
        match self {
            Self::Declared => (width, height),
            Self::Rotated => (height, width),
        }
    }
}

/// Axis-aligned rectangle given by its lower-left corner and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// Lower-left X coordinate.
    pub x: f64,
    /// Lower-left Y coordinate.
    pub y: f64,
    /// Extent along X.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle anchored at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Minimum X.
    pub fn min_x(&self) -> f64 {
        self.x
    }

    /// Minimum Y.
    pub fn min_y(&self) -> f64 {
        self.y
    }

    /// Maximum X.
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Maximum Y.
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Projection of the rectangle onto the X axis.
    pub fn x_span(&self) -> Span {
        Span::new(self.x, self.max_x())
    }

    /// Projection of the rectangle onto the Y axis.
    pub fn y_span(&self) -> Span {
        Span::new(self.y, self.max_y())
    }

    /// Strict intersection test: rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x() - EPSILON
            && other.x < self.max_x() - EPSILON
            && self.y < other.max_y() - EPSILON
            && other.y < self.max_y() - EPSILON
    }

    /// Returns true if the two rectangles are closer than `gap` on both axes.
    ///
    /// This is the margin-aware overlap predicate: `self` inflated by `gap`
    /// intersecting `other`.
    pub fn conflicts_with(&self, other: &Rect, gap: f64) -> bool {
        self.expand(gap).intersects(other)
    }

    /// Returns true if `other` lies fully inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.max_x() <= self.max_x() + EPSILON
            && other.max_y() <= self.max_y() + EPSILON
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x - EPSILON
            && x <= self.max_x() + EPSILON
            && y >= self.y - EPSILON
            && y <= self.max_y() + EPSILON
    }

    /// Returns the intersection rectangle, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min_x = self.x.max(other.x);
        let min_y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());

        if max_x - min_x > EPSILON && max_y - min_y > EPSILON {
            Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
        } else {
            None
        }
    }

    /// Area shared by both rectangles.
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        self.intersection(other).map(|r| r.area()).unwrap_or(0.0)
    }

    /// Inflates the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Shrinks the rectangle by `margin` on every side.
    ///
    /// Returns `None` if nothing is left.
    pub fn inset(&self, margin: f64) -> Option<Rect> {
        let width = self.width - 2.0 * margin;
        let height = self.height - 2.0 * margin;
        if width > EPSILON && height > EPSILON {
            Some(Rect::new(self.x + margin, self.y + margin, width, height))
        } else {
            None
        }
    }

    /// Returns true if a `width` x `height` footprint fits inside this rectangle.
    pub fn can_hold(&self, width: f64, height: f64) -> bool {
        width <= self.width + EPSILON && height <= self.height + EPSILON
    }
}

/// Closed interval along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Start coordinate.
    pub start: f64,
    /// End coordinate.
    pub end: f64,
}

impl Span {
    /// Creates a new span. The bounds are reordered if needed.
    pub fn new(start: f64, end: f64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a span from its start and length.
    pub fn with_length(start: f64, length: f64) -> Self {
        Self::new(start, start + length)
    }

    /// Creates a span centred on `center`.
    pub fn centered(center: f64, length: f64) -> Self {
        Self::new(center - length / 2.0, center + length / 2.0)
    }

    /// Length of the span.
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Midpoint of the span.
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Strict overlap test: touching spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end - EPSILON && other.start < self.end - EPSILON
    }

    /// Returns true if `other` lies fully inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        other.start >= self.start - EPSILON && other.end <= self.end + EPSILON
    }

    /// Returns true if the coordinate lies inside or on the span.
    pub fn contains_value(&self, value: f64) -> bool {
        value >= self.start - EPSILON && value <= self.end + EPSILON
    }

    /// Free distance between two spans (0 when they overlap or touch).
    pub fn gap_to(&self, other: &Span) -> f64 {
        if self.overlaps(other) {
            0.0
        } else if self.end <= other.start {
            other.start - self.end
        } else {
            self.start - other.end
        }
    }

    /// Lower half of the span.
    pub fn lower_half(&self) -> Span {
        Span::new(self.start, self.center())
    }

    /// Upper half of the span.
    pub fn upper_half(&self) -> Span {
        Span::new(self.center(), self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_touching_is_not_intersecting() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn test_rect_margin_conflict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(13.0, 0.0, 10.0, 10.0);
        assert!(a.conflicts_with(&b, 5.0));
        assert!(!a.conflicts_with(&b, 3.0));
    }

    #[test]
    fn test_rect_contains_and_inset() {
        let plan = Rect::from_size(100.0, 50.0);
        let usable = plan.inset(5.0).unwrap();
        assert_eq!(usable, Rect::new(5.0, 5.0, 90.0, 40.0));
        assert!(plan.contains(&usable));
        assert!(!usable.contains(&plan));
        assert!(plan.inset(30.0).is_none());
    }

    #[test]
    fn test_rect_intersection_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!((a.overlap_area(&b) - 25.0).abs() < 1e-9);
        assert_eq!(a.overlap_area(&Rect::new(20.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_orientation_apply() {
        assert_eq!(Orientation::Declared.apply(4.0, 2.0), (4.0, 2.0));
        assert_eq!(Orientation::Rotated.apply(4.0, 2.0), (2.0, 4.0));
        assert_eq!(Orientation::Rotated.flipped(), Orientation::Declared);
    }

    #[test]
    fn test_span_relations() {
        let a = Span::new(0.0, 100.0);
        let b = Span::with_length(20.0, 10.0);
        assert!(a.contains(&b));
        assert!(a.overlaps(&b));
        assert_eq!(Span::new(0.0, 10.0).gap_to(&Span::new(15.0, 20.0)), 5.0);
        assert_eq!(Span::new(15.0, 20.0).gap_to(&Span::new(0.0, 10.0)), 5.0);
        assert_eq!(a.lower_half(), Span::new(0.0, 50.0));
        assert_eq!(Span::centered(50.0, 20.0), Span::new(40.0, 60.0));
    }
}
