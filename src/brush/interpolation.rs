//! Curve construction and arc-length stepping for smooth pen strokes

use crate::input::Point;

/// Lower bound for the curve's speed `|dP/dt|` while stepping.
///
/// Near-stationary derivatives (cusps, coincident control points) would
/// otherwise produce unbounded or non-finite parameter steps.
pub const DERIVATIVE_EPSILON: f32 = 1e-3;

/// A cubic Bezier over (x, y, pressure)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicBezier {
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Monomial coefficients `(A, B, C)` such that
    /// `P(t) = ((A t + B) t + C) t + P0`.
    pub fn coefficients(&self) -> (Point, Point, Point) {
        let (p0, p1, p2, p3) = (self.p0, self.p1, self.p2, self.p3);
        let a = p3 - p2 * 3.0 + p1 * 3.0 - p0;
        let b = p2 * 3.0 - p1 * 6.0 + p0 * 3.0;
        let c = p1 * 3.0 - p0 * 3.0;
        (a, b, c)
    }

    /// Evaluate the curve at `t`
    pub fn point_at(&self, t: f32) -> Point {
        let (a, b, c) = self.coefficients();
        eval(a, b, c, self.p0, t)
    }

    /// Axis-aligned bounds of the control hull as `(min_x, min_y, max_x, max_y)`
    pub fn hull_bounds(&self) -> (f32, f32, f32, f32) {
        let pts = [self.p0, self.p1, self.p2, self.p3];
        pts.iter().fold(
            (f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        )
    }
}

#[inline]
fn eval(a: Point, b: Point, c: Point, p0: Point, t: f32) -> Point {
    Point::new(
        t * (t * (t * a.x + b.x) + c.x) + p0.x,
        t * (t * (t * a.y + b.y) + c.y) + p0.y,
        t * (t * (t * a.p + b.p) + c.p) + p0.p,
    )
}

/// Builds look-ahead Bezier segments with tangent continuity between them.
///
/// The second control point of each segment is kept so the next segment's
/// first control point can mirror it about the shared endpoint.
#[derive(Debug, Clone, Default)]
pub struct CurveBuilder {
    last_control_point: Option<Point>,
}

impl CurveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the segment from `pt0` to `pt1`, anticipating curvature with
    /// `look_ahead` when one is available.
    pub fn build(&mut self, pt0: Point, pt1: Point, look_ahead: Option<Point>) -> CubicBezier {
        let p0 = pt0;
        let p3 = pt1;

        let p1 = match self.last_control_point {
            Some(previous) => previous.mirrored_about(p0),
            None => p0.lerp(p3, 0.33),
        };

        let p2 = match look_ahead {
            Some(pt2) => p3 - ((p3 - p0) + (pt2 - p3)) * (1.0 / 6.0),
            None => p0.lerp(p3, 0.66),
        };

        self.last_control_point = Some(p2);
        CubicBezier::new(p0, p1, p2, p3)
    }

    /// Forget the previous segment; the next one starts with a default tangent.
    pub fn reset(&mut self) {
        self.last_control_point = None;
    }

    pub fn last_control_point(&self) -> Option<Point> {
        self.last_control_point
    }
}

/// Walks a Bezier emitting points roughly `interval` pixels apart.
///
/// First-order arc-length reparameterization: each step advances `t` by
/// `interval / |dP/dt|`. The leftover distance to the segment end is carried
/// into the next segment through [`ArcLengthStepper::finish`].
#[derive(Debug, Clone)]
pub struct ArcLengthStepper {
    a: Point,
    b: Point,
    c: Point,
    p0: Point,
    p3: Point,
    interval: f32,
    offset: f32,
    t: f32,
    last: Option<Point>,
}

impl ArcLengthStepper {
    /// Start stepping `curve` with `offset` pixels already covered since the
    /// last emitted step.
    pub fn new(curve: &CubicBezier, interval: f32, offset: f32) -> Self {
        let (a, b, c) = curve.coefficients();
        let initial_speed = c.planar_length().max(DERIVATIVE_EPSILON);
        Self {
            a,
            b,
            c,
            p0: curve.p0,
            p3: curve.p3,
            interval,
            offset,
            t: (interval - offset) / initial_speed,
            last: None,
        }
    }

    fn speed_at(&self, t: f32) -> f32 {
        let dx = t * (t * 3.0 * self.a.x + 2.0 * self.b.x) + self.c.x;
        let dy = t * (t * 3.0 * self.a.y + 2.0 * self.b.y) + self.c.y;
        (dx * dx + dy * dy).sqrt().max(DERIVATIVE_EPSILON)
    }

    /// Offset to carry into the next segment.
    ///
    /// Without any emitted step the chord length is added to the incoming
    /// offset; otherwise it is the distance from the last step to the end.
    pub fn finish(&self) -> f32 {
        match self.last {
            Some(last) => last.distance(self.p3),
            None => self.offset + self.p0.distance(self.p3),
        }
    }
}

impl Iterator for ArcLengthStepper {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.t.is_nan() || self.t > 1.0 {
            return None;
        }

        let point = eval(self.a, self.b, self.c, self.p0, self.t);
        let next_t = self.t + self.interval / self.speed_at(self.t);
        // steps below the f32 resolution of `t` would repeat this point forever
        self.t = if next_t > self.t { next_t } else { f32::INFINITY };
        self.last = Some(point);
        Some(point)
    }
}
