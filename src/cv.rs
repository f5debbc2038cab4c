//! Conversions between `image` buffers and OpenCV matrices.
//!
//! The crate works in RGB; OpenCV works in BGR. Every crossing goes through
//! these two functions.

use anyhow::{anyhow, Result};
use image::RgbImage;
use opencv::{core::Mat, imgproc, prelude::*};

/// Copy an RGB image into a freshly allocated BGR `Mat`.
pub(crate) fn bgr_mat_from_rgb(image: &RgbImage) -> Result<Mat> {
    let flat = Mat::from_slice(image.as_raw())?;
    let rgb = flat.reshape(3, image.height() as i32)?.try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Copy a BGR `Mat` into an RGB image.
pub(crate) fn rgb_from_bgr_mat(mat: &Mat) -> Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let data = rgb.data_bytes()?.to_vec();
    RgbImage::from_raw(rgb.cols() as u32, rgb.rows() as u32, data)
        .ok_or_else(|| anyhow!("decoded frame buffer does not match its dimensions"))
}
