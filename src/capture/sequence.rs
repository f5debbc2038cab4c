//! Image-sequence source: a directory of PNG/JPEG stills played in lexical
//! file-name order.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

use super::SourceStats;
use crate::frame::Frame;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub(crate) struct SequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl SequenceSource {
    pub(crate) fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!("no PNG or JPEG images in {}", dir.display()));
        }
        files.sort();
        log::info!(
            "capture: {} images from {}",
            files.len(),
            dir.display()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            next: 0,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(Frame::new(RgbImage::new(0, 0), self.next as f64));
        };
        let image = image::open(path)
            .with_context(|| format!("decode {}", path.display()))?
            .to_rgb8();
        self.next += 1;
        Ok(Frame::new(image, self.next as f64))
    }

    pub(crate) fn frame_count(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.next as u64,
            description: self.dir.display().to_string(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
