//! Paper-grain texture table
//!
//! Holds the grayscale grain grid and a seeded random walk over it. Each stamp
//! advances one step along the walk, so neighbouring stamps read neighbouring
//! but never identical patches of grain.

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::{BallpointError, Result};

/// Walk generation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Number of locations in the walk before it cycles
    pub sample_count: usize,
    /// Seed for the walk; equal seeds give equal walks
    pub seed: u64,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            sample_count: 100_000,
            seed: 0x5eed_1e55,
        }
    }
}

/// Reflect-wrap `coord` into `0..extent` (mirrored tiling).
///
/// Works on the coordinate normalized by `extent - 1` with
/// `|(|s - 1| mod 2) - 1|`, so the grid repeats as a mirror image instead of
/// jumping at its edges.
pub fn mirror_wrap(coord: f32, extent: u32) -> u32 {
    if extent <= 1 {
        return 0;
    }
    let span = (extent - 1) as f32;
    let s = coord / span;
    let s = ((s - 1.0).abs() % 2.0 - 1.0).abs();
    // nudge so exact grid coordinates survive the f32 round trip
    ((s * span + 1e-4).floor() as u32).min(extent - 1)
}

/// Immutable grain grid plus its sample walk
#[derive(Debug, Clone)]
pub struct TextureSampleTable {
    width: u32,
    height: u32,
    grays: Vec<f32>,
    walk: Vec<(u32, u32)>,
}

impl TextureSampleTable {
    /// Build from a row-major grid of grain values in [0, 1] (0 = no ink).
    pub fn new(width: u32, height: u32, grays: Vec<f32>, settings: &TextureSettings) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BallpointError::InvalidTexture(format!(
                "texture must not be empty ({}x{})",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if grays.len() != expected {
            return Err(BallpointError::InvalidTexture(format!(
                "expected {} samples for {}x{}, got {}",
                expected,
                width,
                height,
                grays.len()
            )));
        }
        if settings.sample_count == 0 {
            return Err(BallpointError::InvalidTexture(
                "sample_count must be at least 1".into(),
            ));
        }

        let walk = generate_walk(width, height, settings);
        tracing::debug!(
            "Texture table built: {}x{} grid, {} walk samples (seed {:#x})",
            width,
            height,
            walk.len(),
            settings.seed
        );

        Ok(Self {
            width,
            height,
            grays,
            walk,
        })
    }

    /// Build from a decoded grayscale image; dark pixels become grain.
    pub fn from_gray_image(image: &GrayImage, settings: &TextureSettings) -> Result<Self> {
        let grays = image
            .pixels()
            .map(|pixel| 1.0 - f32::from(pixel.0[0]) / 255.0)
            .collect();
        Self::new(image.width(), image.height(), grays, settings)
    }

    /// A uniform grid, for texture-free rendering and tests.
    pub fn flat(value: f32) -> Self {
        const SIZE: u32 = 16;
        let settings = TextureSettings {
            sample_count: 1024,
            ..Default::default()
        };
        let grays = vec![value.clamp(0.0, 1.0); (SIZE * SIZE) as usize];
        let walk = generate_walk(SIZE, SIZE, &settings);
        Self {
            width: SIZE,
            height: SIZE,
            grays,
            walk,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of walk locations
    pub fn len(&self) -> usize {
        self.walk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walk.is_empty()
    }

    /// Walk index following `step`, wrapping to 0 after the last one.
    pub fn next_step(&self, step: usize) -> usize {
        if step + 1 >= self.walk.len() {
            0
        } else {
            step + 1
        }
    }

    /// Walk location at `step` (taken modulo the walk length)
    pub fn location(&self, step: usize) -> (u32, u32) {
        self.walk[step % self.walk.len()]
    }

    /// Grain at `(x, y)` with mirrored-tile addressing outside the grid.
    pub fn sample(&self, x: i64, y: i64) -> f32 {
        let tx = mirror_wrap(x as f32, self.width);
        let ty = mirror_wrap(y as f32, self.height);
        self.grays[(tx + ty * self.width) as usize]
    }
}

fn generate_walk(width: u32, height: u32, settings: &TextureSettings) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut offset_x: i64 = 0;
    let mut offset_y: i64 = 0;

    (0..settings.sample_count)
        .map(|_| {
            let location = (
                mirror_wrap(offset_x as f32, width),
                mirror_wrap(offset_y as f32, height),
            );
            offset_x += if rng.gen_bool(0.5) { -1 } else { 1 };
            offset_y += if rng.gen_bool(0.5) { -1 } else { 1 };
            location
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_settings(seed: u64) -> TextureSettings {
        TextureSettings {
            sample_count: 500,
            seed,
        }
    }

    fn gradient(width: u32, height: u32) -> Vec<f32> {
        (0..width * height)
            .map(|i| i as f32 / (width * height) as f32)
            .collect()
    }

    #[test]
    fn test_mirror_wrap_inside_grid_is_identity() {
        for coord in 0..10 {
            assert_eq!(mirror_wrap(coord as f32, 10), coord);
        }
    }

    #[test]
    fn test_mirror_wrap_reflects_past_edges() {
        // one past the far edge reflects back inside
        assert!(mirror_wrap(10.0, 10) < 10);
        assert!(mirror_wrap(12.0, 10) <= 7);
        // negative coordinates mirror into the grid
        assert!(mirror_wrap(-3.0, 10) <= 3);
        assert_eq!(mirror_wrap(-9.0, 10), 9);
        assert_eq!(mirror_wrap(18.0, 10), 0);
    }

    #[test]
    fn test_mirror_wrap_degenerate_extent() {
        assert_eq!(mirror_wrap(42.0, 1), 0);
        assert_eq!(mirror_wrap(-42.0, 0), 0);
    }

    #[test]
    fn test_walk_is_seeded() {
        let a = TextureSampleTable::new(8, 8, gradient(8, 8), &small_settings(7)).unwrap();
        let b = TextureSampleTable::new(8, 8, gradient(8, 8), &small_settings(7)).unwrap();
        let c = TextureSampleTable::new(8, 8, gradient(8, 8), &small_settings(8)).unwrap();

        assert_eq!(a.walk, b.walk);
        assert_ne!(a.walk, c.walk);
        assert_eq!(a.len(), 500);
    }

    #[test]
    fn test_walk_stays_in_grid() {
        let table = TextureSampleTable::new(5, 3, gradient(5, 3), &small_settings(1)).unwrap();
        for step in 0..table.len() {
            let (x, y) = table.location(step);
            assert!(x < 5 && y < 3);
        }
        // walk starts at the origin
        assert_eq!(table.location(0), (0, 0));
    }

    #[test]
    fn test_next_step_cycles() {
        let table = TextureSampleTable::new(4, 4, gradient(4, 4), &small_settings(1)).unwrap();
        assert_eq!(table.next_step(0), 1);
        assert_eq!(table.next_step(498), 499);
        assert_eq!(table.next_step(499), 0);
    }

    #[test]
    fn test_rejects_mismatched_grid() {
        let err = TextureSampleTable::new(4, 4, vec![0.0; 15], &small_settings(1)).unwrap_err();
        assert!(matches!(err, BallpointError::InvalidTexture(_)));
        assert!(TextureSampleTable::new(0, 4, vec![], &small_settings(1)).is_err());
    }

    #[test]
    fn test_from_gray_image_inverts_luma() {
        let mut image = GrayImage::new(2, 1);
        image.put_pixel(0, 0, image::Luma([255]));
        image.put_pixel(1, 0, image::Luma([0]));

        let table = TextureSampleTable::from_gray_image(&image, &small_settings(1)).unwrap();
        assert_eq!(table.sample(0, 0), 0.0);
        assert_eq!(table.sample(1, 0), 1.0);
    }

    #[test]
    fn test_flat_table_is_uniform() {
        let table = TextureSampleTable::flat(0.25);
        assert_eq!(table.sample(-100, 37), 0.25);
        assert_eq!(table.sample(3, 3), 0.25);
    }
}
