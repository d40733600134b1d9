//! Input module - pressure-tagged points and stroke ingestion

mod processor;

pub use processor::{SegmentRequest, SmoothingFilter, StrokePhase, StrokeProcessor};

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A pressure-tagged input point
///
/// Pressure is conceptually 0.0 - 1.0 but is not clamped here; out-of-range
/// values are only clamped when they become ink alpha.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in surface pixels
    pub x: f32,
    /// Y coordinate in surface pixels
    pub y: f32,
    /// Pressure
    pub p: f32,
}

impl Point {
    /// Create a new input point
    pub const fn new(x: f32, y: f32, p: f32) -> Self {
        Self { x, y, p }
    }

    /// Midpoint of `self` and `other`, pressure included
    pub fn midpoint(self, other: Point) -> Point {
        Point::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.p + other.p) / 2.0,
        )
    }

    /// Reflect `self` about `pivot`
    pub fn mirrored_about(self, pivot: Point) -> Point {
        self + (pivot - self) * 2.0
    }

    /// Linear interpolation toward `other`
    pub fn lerp(self, other: Point, t: f32) -> Point {
        self + (other - self) * t
    }

    /// Euclidean distance in the plane (pressure ignored)
    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Length of the (x, y) part when the point is used as a vector
    pub fn planar_length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.p + rhs.p)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.p - rhs.p)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs, self.p * rhs)
    }
}

/// Immutable snapshot of one recorded stroke
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeRecord(pub Vec<Point>);

impl StrokeRecord {
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Point>> for StrokeRecord {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let point = Point::new(100.0, 200.0, 0.5);

        assert_eq!(point.x, 100.0);
        assert_eq!(point.y, 200.0);
        assert_eq!(point.p, 0.5);
    }

    #[test]
    fn test_pressure_not_clamped() {
        let point = Point::new(0.0, 0.0, 1.5);
        assert_eq!(point.p, 1.5);

        let point = Point::new(0.0, 0.0, -0.5);
        assert_eq!(point.p, -0.5);
    }

    #[test]
    fn test_mirror_and_midpoint() {
        let a = Point::new(1.0, 2.0, 0.25);
        let pivot = Point::new(3.0, 3.0, 0.5);

        let mirrored = a.mirrored_about(pivot);
        assert_eq!(mirrored, Point::new(5.0, 4.0, 0.75));
        assert_eq!(a.midpoint(mirrored), pivot);
    }

    #[test]
    fn test_distance_ignores_pressure() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 1.0);
        assert_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn test_stroke_record_serializes_as_array() {
        let record = StrokeRecord(vec![Point::new(1.0, 2.0, 0.5)]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"[{"x":1.0,"y":2.0,"p":0.5}]"#);
    }
}
