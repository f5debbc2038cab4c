use anyhow::Result;
use opencv::{
    core::{Point, Scalar},
    highgui, imgproc,
};
use std::time::Duration;

use super::Display;
use crate::annotate::Caption;
use crate::cv::bgr_mat_from_rgb;
use crate::frame::Frame;

/// Interactive OpenCV window.
pub struct HighguiWindow {
    title: String,
}

impl HighguiWindow {
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl Display for HighguiWindow {
    fn show(&mut self, frame: &Frame, caption: &Caption) -> Result<()> {
        let mut mat = bgr_mat_from_rgb(frame.image())?;
        let [r, g, b] = caption.color.0;
        imgproc::put_text(
            &mut mat,
            &caption.text,
            Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            Scalar::new(b as f64, g as f64, r as f64, 0.0),
            2,
            imgproc::LINE_8,
            false,
        )?;
        highgui::imshow(&self.title, &mat)?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
        let ms = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(ms)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((key & 0xff) as u32))
    }

    fn close(&mut self) -> Result<()> {
        highgui::destroy_all_windows()?;
        Ok(())
    }
}
