//! Synthetic (`stub://`) sources for tests and demos.
//!
//! - `stub://blank`: ten black frames.
//! - `stub://walkers`: ten black frames; frame 5 carries two upright white
//!   figures that the blob detector reports as pedestrians.
//!
//! Frames are 320x240. After the last frame the source yields empty frames.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use super::SourceStats;
use crate::frame::Frame;

pub const STUB_SCHEME: &str = "stub://";

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u64 = 10;
const WALKER_FRAME: u64 = 5;
/// (x, y, width, height) of each figure on the walker frame.
const WALKERS: [(u32, u32, u32, u32); 2] = [(60, 90, 20, 60), (200, 90, 20, 60)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scene {
    Blank,
    Walkers,
}

pub(crate) struct SyntheticSource {
    path: String,
    scene: Scene,
    frames_read: u64,
}

impl SyntheticSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        let name = path
            .strip_prefix(STUB_SCHEME)
            .ok_or_else(|| anyhow!("not a synthetic source: {path}"))?;
        let scene = match name {
            "blank" => Scene::Blank,
            "walkers" => Scene::Walkers,
            other => return Err(anyhow!("unknown synthetic scene '{other}'")),
        };
        log::info!("capture: connected to {path} (synthetic)");
        Ok(Self {
            path: path.to_string(),
            scene,
            frames_read: 0,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        if self.frames_read >= FRAMES {
            return Ok(Frame::new(RgbImage::new(0, 0), self.frames_read as f64));
        }
        self.frames_read += 1;
        let mut image = RgbImage::new(WIDTH, HEIGHT);
        if self.scene == Scene::Walkers && self.frames_read == WALKER_FRAME {
            for (x, y, w, h) in WALKERS {
                for yy in y..y + h {
                    for xx in x..x + w {
                        image.put_pixel(xx, yy, Rgb([255, 255, 255]));
                    }
                }
            }
        }
        Ok(Frame::new(image, self.frames_read as f64))
    }

    pub(crate) fn frame_count(&self) -> Option<u64> {
        Some(FRAMES)
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            description: self.path.clone(),
        }
    }
}
