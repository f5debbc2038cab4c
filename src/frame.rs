//! Frames and detection geometry.
//!
//! - `Frame`: one captured image plus the position the source reported for it.
//! - `BoundingBox`: axis-aligned detection rectangle in pixel coordinates.
//!
//! A frame is owned by a single loop iteration. Detectors borrow it; only the
//! annotator mutates it; it is dropped once displayed.

use image::{imageops, RgbImage};

/// A captured video frame.
pub struct Frame {
    image: RgbImage,
    /// Capture position as reported by the source (frames read so far).
    position: f64,
}

impl Frame {
    pub fn new(image: RgbImage, position: f64) -> Self {
        Self { image, position }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// An empty frame marks the end of the stream.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable pixels. Reserved for the annotator.
    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Copy of the full-width horizontal strip `[offset, offset + height)`.
    ///
    /// The strip is clamped to the frame.
    pub fn strip(&self, offset: u32, height: u32) -> RgbImage {
        let offset = offset.min(self.height());
        let height = height.min(self.height() - offset);
        imageops::crop_imm(&self.image, 0, offset, self.width(), height).to_image()
    }
}

/// Detection rectangle. Coordinates are non-negative by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from signed coordinates (as returned by native detectors),
    /// clipping anything left of or above the origin.
    pub fn from_signed(x: i32, y: i32, width: i32, height: i32) -> Self {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(width).max(x0);
        let y1 = y.saturating_add(height).max(y0);
        Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Map a box found on a half-resolution band back to full-frame coordinates.
    pub fn upscaled_into_band(self, band_offset: u32) -> Self {
        Self {
            x: self.x.saturating_mul(2),
            y: self.y.saturating_mul(2).saturating_add(band_offset),
            width: self.width.saturating_mul(2),
            height: self.height.saturating_mul(2),
        }
    }

    /// Clip to the rectangle `[0, max_x) x [min_y, max_y)`.
    pub fn clipped(self, max_x: u32, min_y: u32, max_y: u32) -> Self {
        let x0 = self.x.min(max_x);
        let y0 = self.y.clamp(min_y, max_y.max(min_y));
        let x1 = self.right().min(max_x).max(x0);
        let y1 = self.bottom().min(max_y).max(y0);
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// The HOG window includes a margin around the person; shrink it to the
    /// body before drawing and logging.
    pub fn tightened(self) -> Self {
        let w = self.width as f64;
        let h = self.height as f64;
        Self {
            x: self.x + (w * 0.1).round_ties_even() as u32,
            y: self.y + (h * 0.07).round_ties_even() as u32,
            width: (w * 0.8).round_ties_even() as u32,
            height: (h * 0.8).round_ties_even() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn from_signed_clips_negative_origin() {
        let b = BoundingBox::from_signed(-4, -2, 10, 8);
        assert_eq!(b, BoundingBox::new(0, 0, 6, 6));

        let gone = BoundingBox::from_signed(-20, 3, 10, 5);
        assert!(gone.is_empty());
    }

    #[test]
    fn upscale_doubles_and_offsets() {
        let b = BoundingBox::new(3, 5, 10, 20).upscaled_into_band(80);
        assert_eq!(b, BoundingBox::new(6, 90, 20, 40));
    }

    #[test]
    fn clipped_stays_inside_band() {
        let b = BoundingBox::new(300, 70, 40, 30).clipped(320, 80, 160);
        assert_eq!(b.x, 300);
        assert_eq!(b.y, 80);
        assert_eq!(b.right(), 320);
        assert_eq!(b.bottom(), 100);
    }

    #[test]
    fn tightened_matches_display_margins() {
        let b = BoundingBox::new(100, 50, 64, 128).tightened();
        // 6.4 -> 6, 8.96 -> 9, 51.2 -> 51, 102.4 -> 102
        assert_eq!(b, BoundingBox::new(106, 59, 51, 102));
    }

    #[test]
    fn strip_is_clamped_to_frame() {
        let frame = Frame::new(RgbImage::from_pixel(8, 10, Rgb([1, 2, 3])), 1.0);
        let s = frame.strip(6, 10);
        assert_eq!(s.dimensions(), (8, 4));
        assert!(!frame.is_empty());
        assert!(Frame::new(RgbImage::new(0, 0), 0.0).is_empty());
    }
}
