//! # Polygon data model
//!
//! Wire-compatible types for the polygon endpoint and the final report.
//!
//! - [`Point`] / [`WeightedPoint`] - integer coordinates, real weight
//! - [`Polygon`] - an ordered list of weighted points
//! - [`BoundingBox`] - inclusive axis-aligned box with a union operation
//! - [`PolygonSummary`] - the reduced form of one polygon
//! - [`Report`] - the merged result of a whole run
//!
//! A bounding box only exists once a point has been observed, so "no points"
//! is modelled as `Option::<BoundingBox>::None` rather than a sentinel box.

use serde::{Deserialize, Serialize};

/// Total weight at or above which a polygon is considered heavy.
pub const HEAVY_WEIGHT_THRESHOLD: f64 = 100.0;

/// An integer coordinate pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// A point carrying a real-valued weight.
///
/// Serialized flat (`{"x": .., "y": .., "weight": ..}`) to match the polygon
/// endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    pub x: i64,
    pub y: i64,
    pub weight: f64,
}

impl WeightedPoint {
    pub const fn new(x: i64, y: i64, weight: f64) -> Self {
        Self { x, y, weight }
    }

    pub const fn point(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }
}

/// An ordered sequence of weighted points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<WeightedPoint>,
}

impl Polygon {
    pub const fn new(points: Vec<WeightedPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Inclusive axis-aligned bounding box.
///
/// `(x1, y1)` is the minimum corner and `(x2, y2)` the maximum corner. Boxes
/// built through [`BoundingBox::from_point`], [`BoundingBox::extend`] and
/// [`BoundingBox::union`] always satisfy `x1 <= x2 && y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub const fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A degenerate box covering exactly one point.
    pub const fn from_point(point: Point) -> Self {
        Self {
            x1: point.x,
            y1: point.y,
            x2: point.x,
            y2: point.y,
        }
    }

    /// Grows the box in place so that it covers `point`.
    #[inline]
    pub fn extend(&mut self, point: Point) {
        self.x1 = self.x1.min(point.x);
        self.y1 = self.y1.min(point.y);
        self.x2 = self.x2.max(point.x);
        self.y2 = self.y2.max(point.y);
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Union where either side may be the empty (identity) box.
    #[must_use]
    pub fn merge(lhs: Option<Self>, rhs: Option<Self>) -> Option<Self> {
        match (lhs, rhs) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// The reduced form of a single polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonSummary {
    /// `None` when the polygon has no points.
    pub bbox: Option<BoundingBox>,
    pub weight: f64,
    pub heavy: bool,
}

impl PolygonSummary {
    pub const EMPTY: Self = Self {
        bbox: None,
        weight: 0.0,
        heavy: false,
    };
}

/// Final output of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Union of every polygon's bounding box; `null` when no polygon had a
    /// point.
    pub bbox: Option<BoundingBox>,
    pub max_weight: f64,
    /// Heavy polygons in the order their outcomes arrived.
    pub heavy_polygons: Vec<Polygon>,
}
