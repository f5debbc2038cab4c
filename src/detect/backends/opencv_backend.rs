//! OpenCV-backed adapters (feature: opencv).
//!
//! - `HogBackend`: HOG descriptor with OpenCV's default people SVM.
//! - `HoughPBackend`: Canny edges + probabilistic Hough transform.

use anyhow::{anyhow, Result};
use image::RgbImage;
use opencv::{
    core::{Mat, Rect, Size, Vec4i, Vector},
    imgproc,
    objdetect::HOGDescriptor,
    prelude::*,
};
use std::sync::Mutex;

use crate::config::{EdgeSettings, HogSettings, HoughSettings};
use crate::cv::bgr_mat_from_rgb;
use crate::detect::backend::{LineBackend, PedestrianBackend};
use crate::frame::BoundingBox;
use crate::lanes::{LineSegment, Roi};

/// HOG + linear SVM people detector.
///
/// `HOGDescriptor` is not shareable across threads, so each concurrent call
/// checks a descriptor out of a small pool and returns it afterwards.
pub struct HogBackend {
    settings: HogSettings,
    spare: Mutex<Vec<HOGDescriptor>>,
}

impl HogBackend {
    pub fn new(settings: HogSettings) -> Result<Self> {
        let first = Self::build_descriptor()?;
        Ok(Self {
            settings,
            spare: Mutex::new(vec![first]),
        })
    }

    fn build_descriptor() -> Result<HOGDescriptor> {
        let mut hog = HOGDescriptor::default()?;
        hog.set_svm_detector(&HOGDescriptor::get_default_people_detector()?)?;
        Ok(hog)
    }

    fn checkout(&self) -> Result<HOGDescriptor> {
        let pooled = self
            .spare
            .lock()
            .map_err(|_| anyhow!("hog descriptor pool lock poisoned"))?
            .pop();
        match pooled {
            Some(hog) => Ok(hog),
            None => Self::build_descriptor(),
        }
    }

    fn checkin(&self, hog: HOGDescriptor) {
        if let Ok(mut spare) = self.spare.lock() {
            spare.push(hog);
        }
    }
}

impl PedestrianBackend for HogBackend {
    fn name(&self) -> &'static str {
        "opencv-hog"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        let mat = bgr_mat_from_rgb(image)?;
        let hog = self.checkout()?;
        let mut found = Vector::<Rect>::new();
        let stride = self.settings.win_stride;
        let outcome = hog.detect_multi_scale(
            &mat,
            &mut found,
            self.settings.hit_threshold,
            Size::new(stride, stride),
            Size::default(),
            self.settings.scale,
            self.settings.group_threshold,
            false,
        );
        self.checkin(hog);
        outcome?;

        Ok(found
            .iter()
            .map(|r| BoundingBox::from_signed(r.x, r.y, r.width, r.height))
            .filter(|b| !b.is_empty())
            .collect())
    }
}

/// Canny + `HoughLinesP` line segment detector.
pub struct HoughPBackend {
    edges: EdgeSettings,
    hough: HoughSettings,
}

impl HoughPBackend {
    pub fn new(edges: EdgeSettings, hough: HoughSettings) -> Self {
        Self { edges, hough }
    }
}

impl LineBackend for HoughPBackend {
    fn name(&self) -> &'static str {
        "opencv-houghp"
    }

    fn segments(&self, image: &RgbImage, roi: Roi) -> Result<Vec<LineSegment>> {
        if roi.is_empty() {
            return Ok(Vec::new());
        }
        let mat = bgr_mat_from_rgb(image)?;
        let mut edges = Mat::default();
        imgproc::canny(
            &mat,
            &mut edges,
            self.edges.low,
            self.edges.high,
            self.edges.aperture,
            false,
        )?;

        let window = Rect::new(
            roi.x as i32,
            roi.y as i32,
            roi.width as i32,
            roi.height as i32,
        );
        let lower = Mat::roi(&edges, window)?.try_clone()?;

        let mut lines = Vector::<Vec4i>::new();
        imgproc::hough_lines_p(
            &lower,
            &mut lines,
            self.hough.rho,
            self.hough.theta_deg.to_radians(),
            self.hough.threshold,
            self.hough.min_line_length,
            self.hough.max_line_gap,
        )?;

        Ok(lines
            .iter()
            .map(|l| LineSegment::new(l[0], l[1], l[2], l[3]))
            .collect())
    }
}
