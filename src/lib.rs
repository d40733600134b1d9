//! Ballpoint - high-fidelity ballpoint pen rendering for pressure-sensitive input
//!
//! Feed `(x, y, pressure)` samples into a [`PenRenderer`] as they arrive; each
//! call smooths the input, extends a C1-continuous Bezier path, steps along it
//! at even spacing and stamps antialiased, grain-textured ink into the
//! renderer's pixel buffer.

pub mod brush;
pub mod core;
pub mod extract;
pub mod input;
pub mod surface;

pub use brush::{PenRenderer, PenSettings, TextureSampleTable, TextureSettings, WidthMode};
pub use crate::core::{BallpointError, Result};
pub use extract::{extract_stroke, extract_strokes, ExtractedStroke};
pub use input::{Point, StrokeRecord};
pub use surface::{DirtyRect, ImageSurface, NullSurface, PixelBuffer, Surface};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ballpoint=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Ballpoint logging initialized");
    }
}
