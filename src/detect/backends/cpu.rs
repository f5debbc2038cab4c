//! Pure-Rust backends.
//!
//! These stand in for the OpenCV adapters when the `opencv` feature is off:
//! - `BlobBackend`: bright, upright connected regions count as pedestrians.
//! - `HoughBackend`: Canny edges + standard Hough voting, with each voted
//!   line clipped to the ROI to form a segment.

use anyhow::Result;
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::BTreeMap;

use crate::config::{BlobSettings, EdgeSettings, HoughSettings};
use crate::detect::backend::{LineBackend, PedestrianBackend};
use crate::frame::BoundingBox;
use crate::lanes::{LineSegment, Roi};

const SUPPRESSION_RADIUS: u32 = 8;

/// Pedestrian backend that reports bright upright regions.
pub struct BlobBackend {
    settings: BlobSettings,
}

impl BlobBackend {
    pub fn new(settings: BlobSettings) -> Self {
        Self { settings }
    }
}

impl PedestrianBackend for BlobBackend {
    fn name(&self) -> &'static str {
        "cpu-blob"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        let gray = imageops::grayscale(image);
        let threshold = self.settings.luma_threshold;
        let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] >= threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));

        // label -> (min_x, min_y, max_x, max_y)
        let mut extents: BTreeMap<u32, (u32, u32, u32, u32)> = BTreeMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            extents
                .entry(label)
                .and_modify(|e| {
                    e.0 = e.0.min(x);
                    e.1 = e.1.min(y);
                    e.2 = e.2.max(x);
                    e.3 = e.3.max(y);
                })
                .or_insert((x, y, x, y));
        }

        let mut found: Vec<BoundingBox> = extents
            .values()
            .map(|&(x0, y0, x1, y1)| BoundingBox::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
            .filter(|b| {
                b.height >= self.settings.min_height
                    && b.height as f32 >= b.width as f32 * self.settings.min_aspect
            })
            .collect();
        found.sort_by_key(|b| (b.y, b.x));
        Ok(found)
    }
}

/// Line backend built on imageproc's Canny and Hough transforms.
pub struct HoughBackend {
    edges: EdgeSettings,
    hough: HoughSettings,
}

impl HoughBackend {
    pub fn new(edges: EdgeSettings, hough: HoughSettings) -> Self {
        Self { edges, hough }
    }
}

impl LineBackend for HoughBackend {
    fn name(&self) -> &'static str {
        "cpu-hough"
    }

    fn segments(&self, image: &RgbImage, roi: Roi) -> Result<Vec<LineSegment>> {
        if roi.is_empty() {
            return Ok(Vec::new());
        }
        let gray = imageops::grayscale(image);
        let edges = imageproc::edges::canny(&gray, self.edges.low as f32, self.edges.high as f32);
        let window = imageops::crop_imm(&edges, roi.x, roi.y, roi.width, roi.height).to_image();

        let options = LineDetectionOptions {
            vote_threshold: self.hough.threshold.max(1) as u32,
            suppression_radius: SUPPRESSION_RADIUS,
        };
        let min_length = self.hough.min_line_length;
        Ok(detect_lines(&window, options)
            .into_iter()
            .filter_map(|line| clip_polar_line(line, window.width(), window.height()))
            .filter(|segment| segment.length() >= min_length)
            .collect())
    }
}

/// Clip the infinite line `x cos(t) + y sin(t) = r` to a `width x height`
/// image, returning the segment between its two farthest border crossings.
fn clip_polar_line(line: PolarLine, width: u32, height: u32) -> Option<LineSegment> {
    let (sin, cos) = (line.angle_in_degrees as f32).to_radians().sin_cos();
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;

    let mut points: Vec<(f32, f32)> = Vec::with_capacity(4);
    if cos.abs() > f32::EPSILON {
        for y in [0.0, max_y] {
            let x = (line.r - y * sin) / cos;
            if (0.0..=max_x).contains(&x) {
                points.push((x, y));
            }
        }
    }
    if sin.abs() > f32::EPSILON {
        for x in [0.0, max_x] {
            let y = (line.r - x * cos) / sin;
            if (0.0..=max_y).contains(&y) {
                points.push((x, y));
            }
        }
    }

    let mut best: Option<((f32, f32), (f32, f32))> = None;
    let mut best_len = -1.0f32;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let len = (a.0 - b.0).hypot(a.1 - b.1);
            if len > best_len {
                best_len = len;
                best = Some((*a, *b));
            }
        }
    }
    best.map(|(a, b)| {
        LineSegment::new(
            a.0.round() as i32,
            a.1.round() as i32,
            b.0.round() as i32,
            b.1.round() as i32,
        )
    })
}
