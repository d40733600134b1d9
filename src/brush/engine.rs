//! Pen renderer - drives ingestion, curve building, stepping and stamping

use std::sync::Arc;

use super::interpolation::{ArcLengthStepper, CurveBuilder};
use super::pen_dab::{stamp, StampContext};
use super::texture::TextureSampleTable;
use super::PenSettings;
use crate::core::{BallpointError, Result};
use crate::input::{
    Point, SegmentRequest, SmoothingFilter, StrokePhase, StrokeProcessor, StrokeRecord,
};
use crate::surface::{DirtyRect, NullSurface, PixelBuffer, Surface};

/// Renders ballpoint strokes into a persistent pixel buffer.
///
/// Every call runs the whole pipeline synchronously:
/// filter -> curve -> arc-length steps -> stamps -> dirty-rect flush.
pub struct PenRenderer {
    settings: PenSettings,
    texture: Arc<TextureSampleTable>,
    processor: StrokeProcessor,
    curve: CurveBuilder,
    pixels: PixelBuffer,
    surface: Box<dyn Surface + Send>,
    dirty: Vec<DirtyRect>,
    step_offset: f32,
    texture_step: usize,
}

impl PenRenderer {
    /// Create a renderer over a `width` x `height` surface cleared to the
    /// paper colour.
    pub fn new(
        width: u32,
        height: u32,
        settings: PenSettings,
        texture: Arc<TextureSampleTable>,
    ) -> Result<Self> {
        let pixels = PixelBuffer::filled(width, height, settings.paper_color);
        Self::with_pixels(pixels, settings, texture)
    }

    /// Create a renderer drawing onto existing pixels (e.g. a transparent
    /// buffer). The pixels are kept as they are.
    pub fn with_pixels(
        pixels: PixelBuffer,
        settings: PenSettings,
        texture: Arc<TextureSampleTable>,
    ) -> Result<Self> {
        settings.validate()?;
        if texture.is_empty() {
            return Err(BallpointError::InvalidTexture("texture walk is empty".into()));
        }

        tracing::debug!(
            "Pen renderer created: {}x{}, sample rate {}, step {}px",
            pixels.width(),
            pixels.height(),
            settings.sample_rate,
            settings.step_interval
        );

        Ok(Self {
            processor: StrokeProcessor::new(
                settings.sample_rate,
                SmoothingFilter::new(settings.filter_weight),
            ),
            step_offset: settings.step_interval,
            settings,
            texture,
            curve: CurveBuilder::new(),
            pixels,
            surface: Box::new(NullSurface),
            dirty: Vec::new(),
            texture_step: 0,
        })
    }

    /// Attach the surface that receives flushed regions.
    pub fn set_surface(&mut self, surface: Box<dyn Surface + Send>) {
        self.surface = surface;
    }

    pub fn settings(&self) -> &PenSettings {
        &self.settings
    }

    pub fn texture(&self) -> &Arc<TextureSampleTable> {
        &self.texture
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn phase(&self) -> StrokePhase {
        self.processor.phase()
    }

    /// Replace the pixel content between strokes (e.g. after an external
    /// edit of the visible surface).
    pub fn load_pixels(&mut self, data: &[u8]) -> Result<()> {
        if !self.pixels.load(data) {
            return Err(BallpointError::InvalidInput(format!(
                "expected {} bytes, got {}",
                self.pixels.as_raw().len(),
                data.len()
            )));
        }
        self.flush(DirtyRect::full(self.width(), self.height()));
        Ok(())
    }

    /// Drain the regions flushed since the last call.
    pub fn take_dirty_rects(&mut self) -> Vec<DirtyRect> {
        std::mem::take(&mut self.dirty)
    }

    // === Input feed ===

    pub fn begin_stroke(&mut self, x: f32, y: f32, pressure: f32) {
        self.processor.begin(Point::new(x, y, pressure));
        self.step_offset = self.settings.step_interval;
        self.curve.reset();
        tracing::debug!("Stroke {} begin at ({x:.1}, {y:.1})", self.processor.strokes().len());
    }

    pub fn extend_stroke(&mut self, x: f32, y: f32, pressure: f32) {
        if let Some(segment) = self.processor.extend(Point::new(x, y, pressure)) {
            self.draw_segment(segment);
        }
    }

    pub fn end_stroke(&mut self, x: f32, y: f32, pressure: f32) {
        let segments = self.processor.end(Point::new(x, y, pressure));
        for segment in segments {
            self.draw_segment(segment);
        }
        self.curve.reset();
        tracing::debug!(
            "Stroke end: {} raw points",
            self.processor.current().len()
        );
    }

    fn draw_segment(&mut self, segment: SegmentRequest) {
        let curve = self
            .curve
            .build(segment.from, segment.to, segment.look_ahead);

        let ctx = StampContext {
            settings: &self.settings,
            texture: &self.texture,
        };
        let mut stepper =
            ArcLengthStepper::new(&curve, self.settings.step_interval, self.step_offset);
        let mut stamps = 0usize;
        for point in stepper.by_ref() {
            stamp(&mut self.pixels, point, &ctx, &mut self.texture_step);
            stamps += 1;
        }
        self.step_offset = stepper.finish();

        tracing::trace!(
            "Segment ({:.1}, {:.1}) -> ({:.1}, {:.1}): {} stamps, carry {:.2}",
            curve.p0.x,
            curve.p0.y,
            curve.p3.x,
            curve.p3.y,
            stamps,
            self.step_offset
        );

        let (min_x, min_y, max_x, max_y) = curve.hull_bounds();
        let (origin_x, origin_y) = self.pixels.origin();
        let (ox, oy) = (origin_x as f32, origin_y as f32);
        if let Some(rect) = DirtyRect::from_bounds(
            (min_x - ox, min_y - oy, max_x - ox, max_y - oy),
            self.settings.dirty_margin,
            self.width(),
            self.height(),
        ) {
            self.flush(rect);
        }
    }

    fn flush(&mut self, rect: DirtyRect) {
        self.surface.present(&self.pixels, rect);
        self.dirty.push(rect);
    }

    // === Surface lifecycle ===

    /// Drop all strokes and repaint the paper colour.
    pub fn clear(&mut self) {
        self.processor.clear();
        self.curve.reset();
        self.step_offset = 0.0;
        self.texture_step = 0;

        let [r, g, b] = self.settings.paper_color;
        self.pixels.fill([r, g, b, 255]);
        self.dirty.clear();
        self.flush(DirtyRect::full(self.width(), self.height()));
        tracing::debug!("Renderer cleared");
    }

    /// Reallocate the pixel buffer and clear it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixels = PixelBuffer::new(width, height);
        self.surface.resize(width, height);
        tracing::debug!("Renderer resized to {}x{}", width, height);
        self.clear();
    }

    // === Queries ===

    /// Every recorded stroke, including the one in progress
    pub fn strokes(&self) -> Vec<StrokeRecord> {
        self.processor
            .strokes()
            .iter()
            .map(|stroke| StrokeRecord(stroke.clone()))
            .collect()
    }

    /// The most recent stroke
    pub fn cur_stroke(&self) -> StrokeRecord {
        StrokeRecord(self.processor.current().to_vec())
    }

    // === Tuning ===

    /// Replace the settings and redraw every recorded stroke with them.
    pub fn set_settings(&mut self, settings: PenSettings) -> Result<()> {
        settings.validate()?;
        self.processor.set_sample_rate(settings.sample_rate);
        self.processor
            .set_filter(SmoothingFilter::new(settings.filter_weight));
        self.settings = settings;
        self.rerender();
        Ok(())
    }

    /// Change the sample rate for subsequent input. Existing ink is kept.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let sample_rate = sample_rate.max(1);
        self.processor.set_sample_rate(sample_rate);
        self.settings.sample_rate = sample_rate;
    }

    /// Switch grain modulation on or off; returns the new state.
    pub fn toggle_texture(&mut self) -> bool {
        self.settings.texture_enabled = !self.settings.texture_enabled;
        self.settings.texture_enabled
    }

    /// Clear and replay every recorded stroke through the pipeline.
    ///
    /// A stroke still in progress is replayed without its end, so it can be
    /// continued afterwards.
    pub fn rerender(&mut self) {
        let strokes = self.processor.strokes().to_vec();
        let open_last = self.processor.phase() == StrokePhase::Active;
        self.clear();

        let count = strokes.len();
        for (idx, stroke) in strokes.iter().enumerate() {
            let Some((first, rest)) = stroke.split_first() else {
                continue;
            };
            self.begin_stroke(first.x, first.y, first.p);

            if open_last && idx + 1 == count {
                for point in rest {
                    self.extend_stroke(point.x, point.y, point.p);
                }
                continue;
            }

            match rest.split_last() {
                Some((last, inner)) => {
                    for point in inner {
                        self.extend_stroke(point.x, point.y, point.p);
                    }
                    self.end_stroke(last.x, last.y, last.p);
                }
                None => self.end_stroke(first.x, first.y, first.p),
            }
        }
        tracing::debug!("Rerendered {} strokes", count);
    }
}
