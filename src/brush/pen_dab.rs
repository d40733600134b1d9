//! Pen Dab Renderer - antialiased, grain-modulated ink stamps
//!
//! Each step point along a curve deposits a 5x5 pixel stamp:
//! - Quadratic alpha falloff around the unrounded centre, widened by pressure
//! - Grain shading from one coherent patch of the texture walk
//! - Straight-alpha "over" compositing into the pixel buffer

use super::texture::TextureSampleTable;
use super::{Falloff, PenSettings};
use crate::input::Point;
use crate::surface::PixelBuffer;

/// Half the stamp size; stamps cover `centre - 2 ..= centre + 2`
const STAMP_RADIUS: i64 = 2;

/// Read-only inputs shared by every stamp of a renderer
#[derive(Debug, Clone, Copy)]
pub struct StampContext<'a> {
    pub settings: &'a PenSettings,
    pub texture: &'a TextureSampleTable,
}

/// Ink coverage of a pixel `dist` pixels from the stamp centre.
///
/// `width` shifts the falloff outward; larger widths never reduce coverage.
/// Outside `cutoff` the pixel gets no ink.
#[inline]
pub fn ink_alpha(dist: f32, width: f32, falloff: &Falloff, cutoff: f32) -> f32 {
    if dist.is_nan() || dist > cutoff {
        return 0.0;
    }
    let d = dist - width;
    if d.is_nan() || d >= falloff.k1.min(falloff.k2) {
        return 0.0;
    }
    let alpha = falloff.slope * (d - falloff.k1) * (d - falloff.k2) - falloff.shift;
    alpha.clamp(0.0, 1.0)
}

/// Composite `ink` with coverage `alpha` over the straight-alpha pixel `dst`.
///
/// Opaque destinations take a plain linear blend and keep their alpha;
/// translucent ones use the full over operator.
#[inline]
pub fn composite_over(dst: [u8; 4], ink: [u8; 3], alpha: f32) -> [u8; 4] {
    let inv = 1.0 - alpha;
    let [old_r, old_g, old_b, old_a] = dst;
    let (ink_r, ink_g, ink_b) = (f32::from(ink[0]), f32::from(ink[1]), f32::from(ink[2]));

    if old_a == 255 {
        return [
            to_channel(ink_r * alpha + f32::from(old_r) * inv),
            to_channel(ink_g * alpha + f32::from(old_g) * inv),
            to_channel(ink_b * alpha + f32::from(old_b) * inv),
            255,
        ];
    }

    let old_alpha = f32::from(old_a) / 255.0;
    let new_alpha = alpha + old_alpha * inv;
    if new_alpha <= 0.0 {
        return dst;
    }
    let keep = old_alpha * inv;
    [
        to_channel((ink_r * alpha + f32::from(old_r) * keep) / new_alpha),
        to_channel((ink_g * alpha + f32::from(old_g) * keep) / new_alpha),
        to_channel((ink_b * alpha + f32::from(old_b) * keep) / new_alpha),
        to_channel(new_alpha * 255.0),
    ]
}

#[inline]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Stamp one step point into `buffer`.
///
/// Advances `texture_step` once; the whole 5x5 neighbourhood reads the grain
/// patch at that walk location. Non-finite points are skipped without
/// advancing the walk.
pub fn stamp(
    buffer: &mut PixelBuffer,
    point: Point,
    ctx: &StampContext<'_>,
    texture_step: &mut usize,
) {
    if !(point.x.is_finite() && point.y.is_finite()) {
        return;
    }

    let settings = ctx.settings;
    let width = settings.width_mode.width(point.p);
    let center_x = point.x.round() as i64;
    let center_y = point.y.round() as i64;

    *texture_step = ctx.texture.next_step(*texture_step);
    let (grain_x, grain_y) = ctx.texture.location(*texture_step);

    for i in center_x - STAMP_RADIUS..=center_x + STAMP_RADIUS {
        let dx = point.x - i as f32;
        for j in center_y - STAMP_RADIUS..=center_y + STAMP_RADIUS {
            let Some(dst) = buffer.get_pixel(i, j) else {
                continue;
            };

            let dy = point.y - j as f32;
            let dist = (dx * dx + dy * dy).sqrt();
            let mut alpha = ink_alpha(dist, width, &settings.falloff, settings.cutoff_radius);

            if alpha > settings.shade_threshold {
                let shade = if settings.texture_enabled {
                    let grain = ctx.texture.sample(
                        i64::from(grain_x) + (i - center_x),
                        i64::from(grain_y) + (j - center_y),
                    );
                    settings.shade_floor + (1.0 - settings.shade_floor) * grain
                } else {
                    settings.shade_floor
                };
                alpha *= shade;
            }

            if alpha <= 0.0 {
                continue;
            }

            buffer.set_pixel(i, j, composite_over(dst, settings.ink_color, alpha));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const INK: [u8; 3] = [17, 3, 37];

    #[test]
    fn test_alpha_is_full_at_centre_and_zero_past_cutoff() {
        let falloff = Falloff::default();
        assert_eq!(ink_alpha(0.0, 0.8, &falloff, 2.17), 1.0);
        assert_eq!(ink_alpha(2.2, 0.8, &falloff, 2.17), 0.0);
        assert_eq!(ink_alpha(f32::NAN, 0.8, &falloff, 2.17), 0.0);
        assert_eq!(ink_alpha(1.0, f32::NAN, &falloff, 2.17), 0.0);
    }

    #[test]
    fn test_alpha_falls_off_with_distance() {
        let falloff = Falloff::default();
        let mut previous = 1.0;
        for i in 0..=21 {
            let alpha = ink_alpha(i as f32 * 0.1, 0.0, &falloff, 2.17);
            assert!(alpha <= previous + 1e-6);
            previous = alpha;
        }
    }

    #[test]
    fn test_alpha_grows_with_width() {
        let falloff = Falloff::default();
        for dist in [0.0, 0.5, 1.0, 1.5, 2.0] {
            let thin = ink_alpha(dist, -1.0, &falloff, 2.17);
            let thick = ink_alpha(dist, 0.8, &falloff, 2.17);
            assert!(thick >= thin, "dist {dist}: {thin} > {thick}");
        }
        // very light pressure leaves no ink at all
        assert_eq!(ink_alpha(0.0, -50.0, &falloff, 2.17), 0.0);
    }

    #[test]
    fn test_composite_over_opaque_uses_linear_blend() {
        let out = composite_over([240, 238, 220, 255], INK, 0.5);
        // (17 + 240) / 2 = 128.5, (3 + 238) / 2 = 120.5, (37 + 220) / 2 = 128.5
        assert_eq!(out, [129, 121, 129, 255]);
    }

    #[test]
    fn test_composite_over_translucent_updates_alpha() {
        let dst = [240, 238, 220, 128];
        let out = composite_over(dst, INK, 0.5);

        let old_a = 128.0 / 255.0;
        let new_a: f32 = 0.5 + old_a * 0.5;
        let expected_r = ((17.0 * 0.5 + 240.0 * old_a * 0.5) / new_a).round() as u8;
        assert_eq!(out[0], expected_r);
        assert_eq!(out[3], (new_a * 255.0).round() as u8);
        assert!(out[3] > 128);
    }

    #[test]
    fn test_composite_over_transparent_takes_ink() {
        let out = composite_over([0, 0, 0, 0], INK, 0.6);
        assert_eq!(&out[..3], &INK);
        assert_eq!(out[3], 153);

        assert_eq!(composite_over([0, 0, 0, 0], INK, 0.0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_stamp_marks_neighbourhood_only() {
        let settings = PenSettings::default();
        let texture = TextureSampleTable::flat(1.0);
        let ctx = StampContext {
            settings: &settings,
            texture: &texture,
        };
        let mut buffer = PixelBuffer::filled(20, 20, settings.paper_color);
        let mut step = 0;

        stamp(&mut buffer, Point::new(10.0, 10.0, 1.0), &ctx, &mut step);

        assert_eq!(step, 1);
        let centre = buffer.get_pixel(10, 10).unwrap();
        assert!(centre[0] < 100);
        for (x, y) in [(7, 10), (13, 10), (10, 7), (10, 13), (0, 0)] {
            assert_eq!(buffer.get_pixel(x, y).unwrap(), [240, 238, 220, 255]);
        }
    }

    #[test]
    fn test_stamp_at_edge_is_clipped() {
        let settings = PenSettings::default();
        let texture = TextureSampleTable::flat(1.0);
        let ctx = StampContext {
            settings: &settings,
            texture: &texture,
        };
        let mut buffer = PixelBuffer::new(4, 4);
        let mut step = 0;

        stamp(&mut buffer, Point::new(0.0, 0.0, 1.0), &ctx, &mut step);
        stamp(&mut buffer, Point::new(f32::NAN, 1.0, 1.0), &ctx, &mut step);

        assert_eq!(step, 1);
        assert!(buffer.get_pixel(0, 0).unwrap()[3] > 0);
    }

    #[test]
    fn test_grain_only_affects_shaded_pixels() {
        let settings = PenSettings::default();
        let inked = TextureSampleTable::flat(1.0);
        let blank = TextureSampleTable::flat(0.0);
        let mut full = PixelBuffer::new(9, 9);
        let mut grained = PixelBuffer::new(9, 9);
        let (mut a, mut b) = (0, 0);

        let point = Point::new(4.0, 4.0, 1.0);
        stamp(
            &mut full,
            point,
            &StampContext {
                settings: &settings,
                texture: &inked,
            },
            &mut a,
        );
        stamp(
            &mut grained,
            point,
            &StampContext {
                settings: &settings,
                texture: &blank,
            },
            &mut b,
        );

        // centre is fully covered, so the empty grain pulls it down to the floor
        assert_eq!(full.get_pixel(4, 4).unwrap()[3], 255);
        let shaded = grained.get_pixel(4, 4).unwrap()[3];
        assert!((228..=231).contains(&shaded), "alpha {shaded}");
    }
}
