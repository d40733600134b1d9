//! Pen engine module - turns ingested strokes into ink on a pixel buffer

mod engine;
mod interpolation;
mod pen_dab;
mod texture;

pub use engine::PenRenderer;
pub use interpolation::{ArcLengthStepper, CubicBezier, CurveBuilder, DERIVATIVE_EPSILON};
pub use pen_dab::{composite_over, ink_alpha, stamp, StampContext};
pub use texture::{mirror_wrap, TextureSampleTable, TextureSettings};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{BallpointError, Result};

/// How the ink width offset is chosen for each stamp
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "value")]
pub enum WidthMode {
    /// Width follows pressure through [`pressure_to_width`]
    #[default]
    Pressure,
    /// Constant width offset regardless of pressure.
    ///
    /// The offset goes through the same [`Falloff`] as pressure widths, so a
    /// fixed width only gives a constant stroke weight. It does not recreate
    /// the older falloff curve that was evaluated on raw distance.
    Fixed(f32),
}

impl WidthMode {
    /// Width offset for a stamp with pressure `p`
    pub fn width(&self, p: f32) -> f32 {
        match self {
            WidthMode::Pressure => pressure_to_width(p),
            WidthMode::Fixed(width) => *width,
        }
    }
}

/// Quadratic falloff `slope * (d - k1) * (d - k2) - shift`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Falloff {
    pub slope: f32,
    pub k1: f32,
    pub k2: f32,
    pub shift: f32,
}

impl Default for Falloff {
    fn default() -> Self {
        Self {
            slope: 0.12,
            k1: 3.4,
            k2: 3.8,
            shift: 0.26,
        }
    }
}

/// Pen settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenSettings {
    /// Every Nth raw point becomes a sample
    pub sample_rate: u32,
    /// Spacing between stamps along the curve, in pixels
    pub step_interval: f32,
    /// Weight of the middle sample in the smoothing filter (0.0 - 1.0)
    pub filter_weight: f32,
    /// Ink RGB
    pub ink_color: [u8; 3],
    /// Paper RGB used by `clear`
    pub paper_color: [u8; 3],
    pub width_mode: WidthMode,
    pub falloff: Falloff,
    /// Alpha above which grain shading applies
    pub shade_threshold: f32,
    /// Alpha multiplier for shaded pixels where the grain is empty
    pub shade_floor: f32,
    /// Pixels farther than this from the stamp centre get no ink
    pub cutoff_radius: f32,
    /// Padding around a segment's control hull when flushing
    pub dirty_margin: f32,
    pub texture_enabled: bool,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            sample_rate: 2,
            step_interval: 2.0,
            filter_weight: 0.5,
            ink_color: [17, 3, 37],
            paper_color: [240, 238, 220],
            width_mode: WidthMode::Pressure,
            falloff: Falloff::default(),
            shade_threshold: 0.85,
            shade_floor: 0.9,
            cutoff_radius: 2.17,
            dirty_margin: 5.0,
            texture_enabled: true,
        }
    }
}

impl PenSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: PenSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("Loading pen settings from {:?}", path);
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BallpointError::InvalidSettings(
                "sample_rate must be at least 1".into(),
            ));
        }
        if !self.step_interval.is_finite() || self.step_interval <= 0.0 {
            return Err(BallpointError::InvalidSettings(format!(
                "step_interval must be positive, got {}",
                self.step_interval
            )));
        }
        if !(0.0..=1.0).contains(&self.filter_weight) {
            return Err(BallpointError::InvalidSettings(format!(
                "filter_weight must be within 0..=1, got {}",
                self.filter_weight
            )));
        }
        if !self.cutoff_radius.is_finite() || self.cutoff_radius <= 0.0 {
            return Err(BallpointError::InvalidSettings(format!(
                "cutoff_radius must be positive, got {}",
                self.cutoff_radius
            )));
        }
        if !self.dirty_margin.is_finite() || self.dirty_margin < 0.0 {
            return Err(BallpointError::InvalidSettings(format!(
                "dirty_margin must be non-negative, got {}",
                self.dirty_margin
            )));
        }
        Ok(())
    }
}

/// Map pressure to a width offset in the range [-50, 0.8].
///
/// Piecewise linear and non-decreasing. Pressure overshoot from the spline
/// (below 0 or above 1) saturates at the ends.
pub fn pressure_to_width(p: f32) -> f32 {
    if p.is_nan() || p < 0.0 {
        -50.0
    } else if p < 0.2 {
        remap(p, 0.0, 0.2, -50.0, -3.0)
    } else if p < 0.45 {
        remap(p, 0.2, 0.45, -3.0, -1.0)
    } else if p < 0.8 {
        remap(p, 0.45, 0.8, -1.0, 0.1)
    } else if p < 0.95 {
        remap(p, 0.8, 0.95, 0.1, 0.55)
    } else if p <= 1.0 {
        remap(p, 0.95, 1.0, 0.55, 0.8)
    } else {
        0.8
    }
}

fn remap(value: f32, value_min: f32, value_max: f32, from: f32, to: f32) -> f32 {
    let ratio = (value - value_min) / (value_max - value_min);
    from + ratio * (to - from)
}
