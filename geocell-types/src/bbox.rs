use geo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in geographic degrees.
///
/// `x` is longitude and `y` is latitude. The box always satisfies
/// `min <= max` on both axes; constructors normalise swapped corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum longitude
    pub min_x: f64,
    /// Minimum latitude
    pub min_y: f64,
    /// Maximum longitude
    pub max_x: f64,
    /// Maximum latitude
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// Corners given in the wrong order are swapped, the same way
    /// `geo::Rect::new` treats its arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocell_types::bbox::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(103.2504, 26.4297, 103.3028, 26.4747);
    /// assert!(bbox.width() > 0.0);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let (min_x, max_x) = ordered(min_x, max_x);
        let (min_y, max_y) = ordered(min_y, max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Like [`BoundingBox::new`] but returns `None` when any coordinate is
    /// NaN or infinite.
    pub fn checked(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Self> {
        if [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            Some(Self::new(min_x, min_y, max_x, max_y))
        } else {
            None
        }
    }

    /// Create a bounding box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Convert into a `geo::Rect`.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            geo::coord! { x: self.min_x, y: self.min_y },
            geo::coord! { x: self.max_x, y: self.max_y },
        )
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Get the center point of the bounding box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Check if a point is contained within this bounding box (edges included).
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x() >= self.min_x
            && point.x() <= self.max_x
            && point.y() >= self.min_y
            && point.y() <= self.max_y
    }

    /// Check if this bounding box overlaps another.
    ///
    /// Boxes that only share an edge or a corner overlap.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }
}

// NaN is kept rather than dropped so `is_finite` still reports it.
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if b < a { (b, a) } else { (a, b) }
}

impl From<Rect> for BoundingBox {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<BoundingBox> for Rect {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_rect()
    }
}
