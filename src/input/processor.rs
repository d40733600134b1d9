//! Input processor - samples, filters, and windows points into curve segments

use super::Point;

/// Three-tap low-pass filter applied to consecutive sampled points.
///
/// The filtered point approximates the middle sample, pulled toward the
/// midpoint of its neighbours. This costs one sample of latency.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingFilter {
    weight: f32,
}

impl SmoothingFilter {
    /// Create a filter with the weight given to the middle sample.
    pub fn new(weight: f32) -> Self {
        Self { weight }
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Filter `p2` using its neighbours `p1` and `p3`.
    pub fn apply(&self, p1: Point, p2: Point, p3: Point) -> Point {
        let mid = p1.midpoint(p3);
        let inverse = 1.0 - self.weight;
        Point::new(
            self.weight * p2.x + inverse * mid.x,
            self.weight * p2.y + inverse * mid.y,
            self.weight * p2.p + inverse * mid.p,
        )
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Lifecycle of the stroke being ingested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokePhase {
    #[default]
    Idle,
    Active,
}

/// One curve segment ready for the curve builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRequest {
    /// Segment start
    pub from: Point,
    /// Segment end
    pub to: Point,
    /// Point after `to`, absent for the closing segment of a stroke
    pub look_ahead: Option<Point>,
}

/// Stroke ingestion state machine.
///
/// Keeps the raw stroke history plus the sampled and filtered sequences of the
/// stroke in progress, and reports which segments became drawable after each
/// call. Drawing is left to the caller.
#[derive(Debug, Clone)]
pub struct StrokeProcessor {
    sample_rate: u32,
    filter: SmoothingFilter,
    strokes: Vec<Vec<Point>>,
    sampled: Vec<Point>,
    filtered: Vec<Point>,
    point_counter: u64,
    phase: StrokePhase,
}

impl StrokeProcessor {
    /// Create a processor. A sample rate of 0 is treated as 1.
    pub fn new(sample_rate: u32, filter: SmoothingFilter) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            filter,
            strokes: Vec::new(),
            sampled: Vec::new(),
            filtered: Vec::new(),
            point_counter: 0,
            phase: StrokePhase::Idle,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_filter(&mut self, filter: SmoothingFilter) {
        self.filter = filter;
    }

    pub fn phase(&self) -> StrokePhase {
        self.phase
    }

    /// Start a new stroke seeded with `point`.
    pub fn begin(&mut self, point: Point) {
        if self.phase == StrokePhase::Active {
            tracing::warn!("begin while a stroke is active; previous stroke left open");
        }
        self.point_counter += 1;
        self.strokes.push(vec![point]);
        self.sampled = vec![point];
        self.filtered = vec![point];
        self.phase = StrokePhase::Active;
    }

    /// Add a point to the active stroke.
    ///
    /// Returns the segment to draw when a new filtered point completed a
    /// three-point window.
    pub fn extend(&mut self, point: Point) -> Option<SegmentRequest> {
        if self.phase != StrokePhase::Active {
            tracing::warn!("extend ignored: no active stroke");
            return None;
        }

        self.point_counter += 1;
        if let Some(raw) = self.strokes.last_mut() {
            raw.push(point);
        }

        if self.point_counter % u64::from(self.sample_rate) != 0 {
            return None;
        }

        self.sampled.push(point);
        let len = self.sampled.len();
        if len < 3 {
            return None;
        }

        let filtered = self.filter.apply(
            self.sampled[len - 3],
            self.sampled[len - 2],
            self.sampled[len - 1],
        );
        self.filtered.push(filtered);
        self.latest_window()
    }

    /// Finish the active stroke with `point`.
    ///
    /// The terminal point is appended unfiltered. Returns the look-ahead
    /// segment plus the closing segment, or nothing for strokes too short to
    /// form a three-point window.
    pub fn end(&mut self, point: Point) -> Vec<SegmentRequest> {
        if self.phase != StrokePhase::Active {
            tracing::warn!("end ignored: no active stroke");
            return Vec::new();
        }

        if let Some(raw) = self.strokes.last_mut() {
            raw.push(point);
        }
        self.sampled.push(point);
        self.filtered.push(point);
        self.phase = StrokePhase::Idle;

        let mut segments = Vec::with_capacity(2);
        if let Some(window) = self.latest_window() {
            segments.push(window);
            segments.push(SegmentRequest {
                from: window.to,
                to: point,
                look_ahead: None,
            });
        }
        segments
    }

    fn latest_window(&self) -> Option<SegmentRequest> {
        let len = self.filtered.len();
        if len < 3 {
            return None;
        }
        Some(SegmentRequest {
            from: self.filtered[len - 3],
            to: self.filtered[len - 2],
            look_ahead: Some(self.filtered[len - 1]),
        })
    }

    /// Drop every stroke and reset the point counter.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.sampled.clear();
        self.filtered.clear();
        self.point_counter = 0;
        self.phase = StrokePhase::Idle;
    }

    /// All recorded strokes, including the one in progress
    pub fn strokes(&self) -> &[Vec<Point>] {
        &self.strokes
    }

    /// Raw points of the most recent stroke
    pub fn current(&self) -> &[Point] {
        self.strokes.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sampled points of the most recent stroke
    pub fn sampled(&self) -> &[Point] {
        &self.sampled
    }

    /// Filtered points of the most recent stroke
    pub fn filtered(&self) -> &[Point] {
        &self.filtered
    }

    pub fn point_counter(&self) -> u64 {
        self.point_counter
    }
}

impl Default for StrokeProcessor {
    fn default() -> Self {
        Self::new(2, SmoothingFilter::default())
    }
}
