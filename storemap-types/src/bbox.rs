use geo::{Point, Rect, coord};
use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// `west > east` describes a box that crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole world in longitude, clamped to the Web Mercator latitude limits.
    pub fn world() -> Self {
        Self::new(-180.0, -85.0, 180.0, 85.0)
    }

    /// True when every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
    }

    /// True when the box wraps across the 180th meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Inclusive containment test, aware of antimeridian wrapping.
    ///
    /// # Examples
    ///
    /// ```
    /// use storemap_types::bbox::BoundingBox;
    ///
    /// let pacific = BoundingBox::new(170.0, -10.0, -170.0, 10.0);
    /// assert!(pacific.contains(179.5, 0.0));
    /// assert!(pacific.contains(-175.0, 0.0));
    /// assert!(!pacific.contains(0.0, 0.0));
    /// ```
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }

    /// Center of the box, wrapping longitude into [-180, 180].
    pub fn center(&self) -> Point<f64> {
        let mut east = self.east;
        if self.crosses_antimeridian() {
            east += 360.0;
        }
        let mut lon = (self.west + east) / 2.0;
        if lon > 180.0 {
            lon -= 360.0;
        }
        Point::new(lon, (self.south + self.north) / 2.0)
    }

    /// Convert to a `geo::Rect`. Not meaningful for antimeridian-crossing boxes.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}
