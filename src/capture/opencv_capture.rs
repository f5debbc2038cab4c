//! OpenCV `VideoCapture` source (video files and camera devices).

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::SourceStats;
use crate::cv::rgb_from_bgr_mat;
use crate::frame::Frame;

pub(crate) struct OpenCvSource {
    capture: VideoCapture,
    description: String,
    frames_read: u64,
    frame_count: Option<u64>,
}

impl OpenCvSource {
    pub(crate) fn open_file(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("open video {path}"))?;
        Self::from_capture(capture, path.to_string())
    }

    pub(crate) fn open_camera(index: i32) -> Result<Self> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("open camera {index}"))?;
        Self::from_capture(capture, format!("camera {index}"))
    }

    fn from_capture(capture: VideoCapture, description: String) -> Result<Self> {
        if !capture.is_opened()? {
            return Err(anyhow!("capture device did not open: {description}"));
        }
        let reported = capture.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
        let frame_count = (reported > 0.0).then_some(reported as u64);
        log::info!("capture: connected to {description} (opencv)");
        Ok(Self {
            capture,
            description,
            frames_read: 0,
            frame_count,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let mut mat = Mat::default();
        let got = self.capture.read(&mut mat)?;
        let position = self.capture.get(videoio::CAP_PROP_POS_FRAMES)?;
        if !got || mat.empty() {
            return Ok(Frame::new(RgbImage::new(0, 0), position));
        }
        self.frames_read += 1;
        Ok(Frame::new(rgb_from_bgr_mat(&mat)?, position))
    }

    pub(crate) fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            description: self.description.clone(),
        }
    }
}
