//! Pixel storage and presentation
//!
//! [`PixelBuffer`] is the renderer's persistent RGBA raster (straight alpha).
//! A [`Surface`] receives the regions that changed after each curve segment.

use image::RgbaImage;

/// Row-major RGBA8 raster with straight alpha.
///
/// Pixel accessors take surface coordinates. A buffer created with
/// [`PixelBuffer::with_origin`] covers the window starting at its origin, so
/// the same stroke geometry can be drawn into a smaller bitmap unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    origin_x: i64,
    origin_y: i64,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a fully transparent buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            origin_x: 0,
            origin_y: 0,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Move the buffer's top-left pixel to surface coordinate
    /// `(origin_x, origin_y)`.
    pub fn with_origin(mut self, origin_x: i64, origin_y: i64) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    /// Surface coordinate of the top-left pixel
    pub fn origin(&self) -> (i64, i64) {
        (self.origin_x, self.origin_y)
    }

    /// Create a buffer filled with one opaque colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.fill([rgb[0], rgb[1], rgb[2], 255]);
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = x - self.origin_x;
        let y = y - self.origin_y;
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(y as usize * self.stride() + x as usize * 4)
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer
    pub fn get_pixel(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        self.index(x, y).map(|idx| {
            [
                self.data[idx],
                self.data[idx + 1],
                self.data[idx + 2],
                self.data[idx + 3],
            ]
        })
    }

    /// Write the pixel at `(x, y)`; writes outside the buffer are dropped.
    pub fn set_pixel(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        if let Some(idx) = self.index(x, y) {
            self.data[idx..idx + 4].copy_from_slice(&rgba);
        }
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.data.chunks_exact_mut(4) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// Raw RGBA bytes
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Replace the content with `data`, which must match the buffer size.
    ///
    /// Returns `false` (leaving the buffer untouched) on a size mismatch.
    pub fn load(&mut self, data: &[u8]) -> bool {
        if data.len() != self.data.len() {
            return false;
        }
        self.data.copy_from_slice(data);
        true
    }

    /// Copy into an `image` buffer, e.g. for encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        image.copy_from_slice(&self.data);
        image
    }
}

/// Pixel-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRect {
    /// Whole-surface rectangle
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Expand float bounds by `margin` and clip them to a `width` x `height`
    /// surface. Returns `None` when nothing of the region is visible.
    pub fn from_bounds(
        (min_x, min_y, max_x, max_y): (f32, f32, f32, f32),
        margin: f32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let left = (min_x - margin).floor().max(0.0);
        let top = (min_y - margin).floor().max(0.0);
        let right = (max_x + margin).ceil().min(width as f32);
        let bottom = (max_y + margin).ceil().min(height as f32);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Destination for finished pixel regions
pub trait Surface {
    /// Copy `rect` of `pixels` to the visible output.
    fn present(&mut self, pixels: &PixelBuffer, rect: DirtyRect);

    /// The pixel buffer was reallocated to `width` x `height`.
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Surface that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn present(&mut self, _pixels: &PixelBuffer, _rect: DirtyRect) {}
}

/// Surface backed by an `image::RgbaImage`, updated one dirty rect at a time
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: RgbaImage,
    presented: usize,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            presented: 0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Number of rects presented so far
    pub fn presented(&self) -> usize {
        self.presented
    }
}

impl Surface for ImageSurface {
    fn present(&mut self, pixels: &PixelBuffer, rect: DirtyRect) {
        let width = rect.width.min(self.image.width().saturating_sub(rect.x));
        let height = rect.height.min(self.image.height().saturating_sub(rect.y));
        if width == 0 || height == 0 {
            return;
        }

        let src_stride = pixels.stride();
        let dst_stride = self.image.width() as usize * 4;
        let row_bytes = width as usize * 4;
        let src = pixels.as_raw();
        let dst: &mut [u8] = &mut self.image;

        for row in rect.y..rect.y + height {
            let src_start = row as usize * src_stride + rect.x as usize * 4;
            let dst_start = row as usize * dst_stride + rect.x as usize * 4;
            if src_start + row_bytes > src.len() {
                break;
            }
            dst[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }
        self.presented += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_transparent() {
        let buffer = PixelBuffer::new(4, 3);
        assert_eq!(buffer.stride(), 16);
        assert_eq!(buffer.as_raw().len(), 48);
        assert!(buffer.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_get_set_pixel() {
        let mut buffer = PixelBuffer::new(4, 3);
        buffer.set_pixel(3, 2, [1, 2, 3, 4]);
        assert_eq!(buffer.get_pixel(3, 2), Some([1, 2, 3, 4]));
        // last pixel of the raw data
        assert_eq!(&buffer.as_raw()[44..], &[1, 2, 3, 4]);

        assert_eq!(buffer.get_pixel(4, 0), None);
        assert_eq!(buffer.get_pixel(-1, 0), None);
        buffer.set_pixel(-1, 5, [9, 9, 9, 9]);
        assert_eq!(buffer.as_raw().iter().filter(|&&b| b == 9).count(), 0);
    }

    #[test]
    fn test_origin_shifts_addressing() {
        let mut buffer = PixelBuffer::new(4, 3).with_origin(10, -2);
        assert_eq!(buffer.origin(), (10, -2));

        buffer.set_pixel(10, -2, [1, 2, 3, 4]);
        buffer.set_pixel(13, 0, [5, 6, 7, 8]);
        assert_eq!(&buffer.as_raw()[..4], &[1, 2, 3, 4]);
        assert_eq!(&buffer.as_raw()[44..], &[5, 6, 7, 8]);

        assert_eq!(buffer.get_pixel(0, 0), None);
        assert_eq!(buffer.get_pixel(14, 0), None);
        assert_eq!(buffer.get_pixel(12, 1), None);
    }

    #[test]
    fn test_filled_buffer_is_opaque() {
        let buffer = PixelBuffer::filled(2, 2, [240, 238, 220]);
        assert_eq!(buffer.get_pixel(1, 1), Some([240, 238, 220, 255]));
    }

    #[test]
    fn test_load_checks_size() {
        let mut buffer = PixelBuffer::new(1, 1);
        assert!(!buffer.load(&[1, 2, 3]));
        assert!(buffer.load(&[1, 2, 3, 4]));
        assert_eq!(buffer.get_pixel(0, 0), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_dirty_rect_expands_and_clips() {
        let rect = DirtyRect::from_bounds((10.0, 10.0, 20.5, 12.0), 5.0, 100, 100).unwrap();
        assert_eq!(
            rect,
            DirtyRect {
                x: 5,
                y: 5,
                width: 21,
                height: 12
            }
        );

        let clipped = DirtyRect::from_bounds((1.0, 1.0, 98.0, 98.0), 5.0, 100, 100).unwrap();
        assert_eq!(clipped, DirtyRect::full(100, 100));

        assert!(DirtyRect::from_bounds((200.0, 200.0, 210.0, 210.0), 5.0, 100, 100).is_none());
    }

    #[test]
    fn test_image_surface_copies_only_rect() {
        let buffer = PixelBuffer::filled(8, 8, [10, 20, 30]);
        let mut surface = ImageSurface::new(8, 8);
        let rect = DirtyRect {
            x: 2,
            y: 3,
            width: 2,
            height: 2,
        };
        surface.present(&buffer, rect);

        assert_eq!(surface.presented(), 1);
        assert_eq!(surface.image().get_pixel(2, 3).0, [10, 20, 30, 255]);
        assert_eq!(surface.image().get_pixel(3, 4).0, [10, 20, 30, 255]);
        assert_eq!(surface.image().get_pixel(4, 4).0, [0, 0, 0, 0]);
        assert_eq!(surface.image().get_pixel(1, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_to_rgba_image_matches_buffer() {
        let mut buffer = PixelBuffer::new(3, 2);
        buffer.set_pixel(1, 1, [5, 6, 7, 8]);
        let image = buffer.to_rgba_image();
        assert_eq!(image.get_pixel(1, 1).0, [5, 6, 7, 8]);
        assert_eq!(image.as_raw().as_slice(), buffer.as_raw());
    }
}
