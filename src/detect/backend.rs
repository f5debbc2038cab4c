use anyhow::Result;
use image::RgbImage;

use crate::frame::BoundingBox;
use crate::lanes::{LineSegment, Roi};

/// Pedestrian detector adapter.
///
/// Implementations wrap an external classifier. They are shared by all band
/// workers at once, so `detect` takes `&self`; any per-call scratch state must
/// be managed internally.
pub trait PedestrianBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Find pedestrians in `image`. Boxes are in `image` coordinates.
    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>>;
}

/// Line segment detector adapter (edge detection + line voting).
pub trait LineBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect line segments inside `roi` of `image`.
    ///
    /// Returned coordinates are relative to the ROI's top-left corner.
    fn segments(&self, image: &RgbImage, roi: Roi) -> Result<Vec<LineSegment>>;
}
