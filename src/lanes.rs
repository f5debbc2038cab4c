//! Lane-line post-processing.
//!
//! The line backend only sees a fixed band of the frame (by default the
//! strip from half-height down to three-quarter height). Segments come back in
//! ROI-local coordinates; they are shifted into frame coordinates and
//! near-horizontal ones are dropped as noise.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::Arc;

use crate::config::LaneSettings;
use crate::detect::LineBackend;
use crate::frame::Frame;

/// Rectangular region of interest in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Full-width strip starting at `top` (fraction of height) spanning
    /// `height` (fraction of height). Fractional rows are truncated.
    pub fn horizontal_strip(frame_width: u32, frame_height: u32, top: f64, height: f64) -> Self {
        let y = (frame_height as f64 * top) as u32;
        let h = (frame_height as f64 * height) as u32;
        Self {
            x: 0,
            y: y.min(frame_height),
            width: frame_width,
            height: h.min(frame_height.saturating_sub(y)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer line segment, as produced by a probabilistic Hough transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Shift vertically by `dy` rows.
    pub fn translated(self, dy: i32) -> Self {
        Self {
            y1: self.y1 + dy,
            y2: self.y2 + dy,
            ..self
        }
    }

    /// Direction from the first to the second endpoint, in degrees (-180, 180].
    pub fn angle_degrees(&self) -> f64 {
        let dy = (self.y2 - self.y1) as f64;
        let dx = (self.x2 - self.x1) as f64;
        dy.atan2(dx).to_degrees()
    }

    pub fn length(&self) -> f64 {
        let dy = (self.y2 - self.y1) as f64;
        let dx = (self.x2 - self.x1) as f64;
        dx.hypot(dy)
    }
}

/// Keeps segments whose absolute angle lies in `[min_deg, max_deg]`.
#[derive(Clone, Copy, Debug)]
pub struct AngleFilter {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl Default for AngleFilter {
    fn default() -> Self {
        Self {
            min_deg: 25.0,
            max_deg: 165.0,
        }
    }
}

impl AngleFilter {
    pub fn accepts_angle(&self, angle_deg: f64) -> bool {
        let a = angle_deg.abs();
        a >= self.min_deg && a <= self.max_deg
    }

    pub fn accepts(&self, segment: &LineSegment) -> bool {
        self.accepts_angle(segment.angle_degrees())
    }
}

/// Runs the line backend on the lane ROI and post-processes its output.
pub struct LaneFinder {
    backend: Arc<dyn LineBackend>,
    filter: AngleFilter,
    roi_top: f64,
    roi_height: f64,
}

impl LaneFinder {
    pub fn new(backend: Arc<dyn LineBackend>, settings: &LaneSettings) -> Self {
        Self {
            backend,
            filter: AngleFilter {
                min_deg: settings.min_angle_deg,
                max_deg: settings.max_angle_deg,
            },
            roi_top: settings.roi_top,
            roi_height: settings.roi_height,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn roi_for(&self, frame: &Frame) -> Roi {
        Roi::horizontal_strip(frame.width(), frame.height(), self.roi_top, self.roi_height)
    }

    /// Lane segments in frame coordinates, in backend order.
    pub fn find(&self, frame: &Frame, pool: &rayon::ThreadPool) -> Result<Vec<LineSegment>> {
        let roi = self.roi_for(frame);
        if roi.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self
            .backend
            .segments(frame.image(), roi)
            .context("lane segment detection")?;
        let dy = roi.y as i32;
        let filter = self.filter;
        let kept = pool.install(|| {
            raw.par_iter()
                .map(|segment| segment.translated(dy))
                .filter(|segment| filter.accepts(segment))
                .collect::<Vec<_>>()
        });
        log::trace!("lanes: {} raw segments, {} kept", raw.len(), kept.len());
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn angle_boundaries_are_inclusive() {
        let f = AngleFilter::default();
        assert!(f.accepts_angle(25.0));
        assert!(f.accepts_angle(165.0));
        assert!(f.accepts_angle(-25.0));
        assert!(f.accepts_angle(-165.0));
        assert!(!f.accepts_angle(24.999));
        assert!(!f.accepts_angle(-24.999));
        assert!(!f.accepts_angle(165.001));
        assert!(!f.accepts_angle(180.0));
        assert!(!f.accepts_angle(0.0));
    }

    #[test]
    fn near_horizontal_segments_are_dropped() {
        let f = AngleFilter::default();
        assert!(!f.accepts(&LineSegment::new(0, 0, 100, 5)));
        assert!(!f.accepts(&LineSegment::new(100, 5, 0, 0)));
        assert!(f.accepts(&LineSegment::new(0, 0, 0, 10)));
        assert!(f.accepts(&LineSegment::new(0, 0, 10, -10)));
        assert!(f.accepts(&LineSegment::new(10, 0, 0, 10)));
    }

    #[test]
    fn roi_strip_is_half_to_three_quarters() {
        let roi = Roi::horizontal_strip(640, 480, 0.5, 0.25);
        assert_eq!(roi, Roi { x: 0, y: 240, width: 640, height: 120 });

        let odd = Roi::horizontal_strip(10, 7, 0.5, 0.25);
        assert_eq!((odd.y, odd.height), (3, 1));
    }

    struct Fixed(Vec<LineSegment>);

    impl LineBackend for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn segments(&self, _image: &RgbImage, _roi: Roi) -> Result<Vec<LineSegment>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn finder_translates_then_filters() {
        let backend = Arc::new(Fixed(vec![
            LineSegment::new(10, 0, 40, 50),
            LineSegment::new(0, 10, 200, 12),
            LineSegment::new(300, 50, 260, 0),
        ]));
        let finder = LaneFinder::new(backend, &crate::config::DetectionConfig::default().lanes);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let frame = Frame::new(RgbImage::new(320, 240), 1.0);

        let kept = finder.find(&frame, &pool).unwrap();
        assert_eq!(
            kept,
            vec![
                LineSegment::new(10, 120, 40, 170),
                LineSegment::new(300, 170, 260, 120),
            ]
        );
    }
}
