//! Standalone stroke bitmaps
//!
//! Renders a finished stroke on its own transparent buffer, sized to the
//! stroke's bounds plus a small margin.

use std::sync::Arc;

use rayon::prelude::*;

use crate::brush::{PenRenderer, PenSettings, TextureSampleTable};
use crate::core::{BallpointError, Result};
use crate::input::{Point, StrokeRecord};
use crate::surface::PixelBuffer;

/// Padding between the stroke's bounds and the bitmap edge
pub const EXTRACT_MARGIN: f32 = 4.0;

/// Largest bitmap side `extract_stroke` will allocate
pub const MAX_EXTRACT_SIDE: u32 = 16_384;

/// One stroke rendered in isolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedStroke {
    pub width: u32,
    pub height: u32,
    /// Surface coordinate of the bitmap's top-left pixel
    pub origin_x: i64,
    pub origin_y: i64,
    /// RGBA bytes, straight alpha, transparent where there is no ink
    pub pixels: Vec<u8>,
}

/// Render `points` onto a fresh transparent bitmap covering the stroke's
/// bounds plus `EXTRACT_MARGIN` pixels.
///
/// The bitmap's origin is snapped to whole pixels and the stroke is drawn in
/// surface coordinates, so its ink is byte-identical to the same stroke drawn
/// by a fresh renderer on a transparent surface.
pub fn extract_stroke(
    points: &[Point],
    settings: &PenSettings,
    texture: Arc<TextureSampleTable>,
) -> Result<ExtractedStroke> {
    let (first, rest) = points.split_first().ok_or(BallpointError::EmptyStroke)?;

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return Err(BallpointError::InvalidInput(
            "stroke has non-finite coordinates".into(),
        ));
    }

    let origin_x = (f64::from(min_x) - f64::from(EXTRACT_MARGIN)).floor();
    let origin_y = (f64::from(min_y) - f64::from(EXTRACT_MARGIN)).floor();
    let span_x = (f64::from(max_x) + f64::from(EXTRACT_MARGIN)).ceil() - origin_x;
    let span_y = (f64::from(max_y) + f64::from(EXTRACT_MARGIN)).ceil() - origin_y;
    let limit = f64::from(MAX_EXTRACT_SIDE);
    if span_x > limit || span_y > limit {
        return Err(BallpointError::InvalidInput(format!(
            "stroke bounds {}x{} exceed the {}px extraction limit",
            span_x, span_y, MAX_EXTRACT_SIDE
        )));
    }
    let (width, height) = (span_x as u32, span_y as u32);
    let (origin_x, origin_y) = (origin_x as i64, origin_y as i64);

    let pixels = PixelBuffer::new(width, height).with_origin(origin_x, origin_y);
    let mut renderer = PenRenderer::with_pixels(pixels, settings.clone(), texture)?;

    renderer.begin_stroke(first.x, first.y, first.p);
    match rest.split_last() {
        Some((last, inner)) => {
            for point in inner {
                renderer.extend_stroke(point.x, point.y, point.p);
            }
            renderer.end_stroke(last.x, last.y, last.p);
        }
        None => renderer.end_stroke(first.x, first.y, first.p),
    }

    tracing::debug!(
        "Extracted stroke of {} points into {}x{} bitmap at ({}, {})",
        points.len(),
        width,
        height,
        origin_x,
        origin_y
    );

    Ok(ExtractedStroke {
        width,
        height,
        origin_x,
        origin_y,
        pixels: renderer.pixels().as_raw().to_vec(),
    })
}

/// Extract many strokes in parallel, sharing one texture table.
pub fn extract_strokes(
    strokes: &[StrokeRecord],
    settings: &PenSettings,
    texture: Arc<TextureSampleTable>,
) -> Result<Vec<ExtractedStroke>> {
    strokes
        .par_iter()
        .map(|stroke| extract_stroke(stroke.points(), settings, Arc::clone(&texture)))
        .collect()
}
