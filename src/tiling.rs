//! Parallel pedestrian detection over horizontal bands.
//!
//! A frame is cut into horizontal bands, each band is downsampled to half
//! resolution and handed to the pedestrian backend on its own worker. Every
//! worker returns an owned list of boxes already mapped back to full-frame
//! coordinates; the lists are concatenated once all workers have joined.
//!
//! Overlapping detections from adjacent bands are not merged.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use rayon::prelude::*;
use std::sync::Arc;

use crate::detect::PedestrianBackend;
use crate::frame::{BoundingBox, Frame};

/// What happens to the rows left over when the frame height is not a
/// multiple of the worker count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemainderPolicy {
    /// The last band grows to cover the leftover rows.
    Absorb,
    /// Fixed-step bands only; a thin strip at the bottom is never scanned.
    Truncate,
}

impl RemainderPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "absorb" => Ok(Self::Absorb),
            "truncate" => Ok(Self::Truncate),
            other => Err(anyhow!(
                "unknown band policy '{}' (expected absorb or truncate)",
                other
            )),
        }
    }
}

/// A horizontal slice of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Band {
    pub index: usize,
    pub offset: u32,
    pub height: u32,
}

/// Split `rows` into bands for `workers` workers.
pub fn plan_bands(rows: u32, workers: usize, policy: RemainderPolicy) -> Vec<Band> {
    if rows == 0 || workers == 0 {
        return Vec::new();
    }
    let step = rows / workers as u32;
    if step == 0 {
        return vec![Band {
            index: 0,
            offset: 0,
            height: rows,
        }];
    }

    match policy {
        RemainderPolicy::Absorb => (0..workers)
            .map(|index| {
                let offset = step * index as u32;
                let height = if index + 1 == workers {
                    rows - offset
                } else {
                    step
                };
                Band {
                    index,
                    offset,
                    height,
                }
            })
            .collect(),
        RemainderPolicy::Truncate => {
            let mut bands = Vec::with_capacity(workers);
            let mut offset = 0u32;
            while offset + step <= rows {
                bands.push(Band {
                    index: bands.len(),
                    offset,
                    height: step,
                });
                offset += step;
            }
            bands
        }
    }
}

/// Runs a pedestrian backend across bands on a fixed-size worker pool.
pub struct TiledDetector {
    backend: Arc<dyn PedestrianBackend>,
    pool: rayon::ThreadPool,
    workers: usize,
    policy: RemainderPolicy,
}

impl TiledDetector {
    pub fn new(
        backend: Arc<dyn PedestrianBackend>,
        workers: usize,
        policy: RemainderPolicy,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(anyhow!("tiled detector needs at least one worker"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("band-worker-{i}"))
            .build()
            .context("build band worker pool")?;
        log::debug!(
            "tiled detector: backend={}, workers={}, policy={:?}",
            backend.name(),
            workers,
            policy
        );
        Ok(Self {
            backend,
            pool,
            workers,
            policy,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Worker pool shared with other per-frame parallel steps.
    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }

    pub fn bands_for(&self, frame: &Frame) -> Vec<Band> {
        plan_bands(frame.height(), self.workers, self.policy)
    }

    /// Detect pedestrians in `frame`, returning full-frame boxes.
    pub fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let bands = self.bands_for(frame);
        let per_band: Vec<Vec<BoundingBox>> = self.pool.install(|| {
            bands
                .par_iter()
                .map(|band| self.detect_band(frame, band))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(per_band.into_iter().flatten().collect())
    }

    fn detect_band(&self, frame: &Frame, band: &Band) -> Result<Vec<BoundingBox>> {
        let strip = frame.strip(band.offset, band.height);
        let half_w = strip.width() / 2;
        let half_h = strip.height() / 2;
        if half_w == 0 || half_h == 0 {
            return Ok(Vec::new());
        }
        let small = imageops::resize(&strip, half_w, half_h, FilterType::Triangle);
        let found = self
            .backend
            .detect(&small)
            .with_context(|| format!("pedestrian detection in band {}", band.index))?;

        let band_bottom = band.offset + half_h * 2;
        Ok(found
            .into_iter()
            .map(|b| {
                b.upscaled_into_band(band.offset)
                    .clipped(frame.width(), band.offset, band_bottom)
            })
            .filter(|b| !b.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    #[test]
    fn absorb_covers_every_row() {
        for rows in [1u32, 2, 3, 10, 11, 239, 240, 241, 481, 1080] {
            for workers in 1..=7usize {
                let bands = plan_bands(rows, workers, RemainderPolicy::Absorb);
                let total: u32 = bands.iter().map(|b| b.height).sum();
                assert_eq!(total, rows, "rows={rows} workers={workers}");
                let mut expected_offset = 0;
                for band in &bands {
                    assert_eq!(band.offset, expected_offset);
                    expected_offset += band.height;
                }
            }
        }
    }

    #[test]
    fn truncate_drops_at_most_the_remainder() {
        for rows in [3u32, 10, 11, 239, 240, 241, 481, 1080] {
            for workers in 1..=7usize {
                let bands = plan_bands(rows, workers, RemainderPolicy::Truncate);
                let total: u32 = bands.iter().map(|b| b.height).sum();
                let step = rows / workers as u32;
                assert!(total <= rows);
                if step > 0 {
                    assert!(rows - total <= rows % step, "rows={rows} workers={workers}");
                }
            }
        }
    }

    #[test]
    fn truncate_leaves_bottom_strip_on_uneven_height() {
        let bands = plan_bands(481, 3, RemainderPolicy::Truncate);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands.last().unwrap().offset + bands.last().unwrap().height, 480);

        let absorbed = plan_bands(481, 3, RemainderPolicy::Absorb);
        assert_eq!(absorbed.last().unwrap().height, 161);
    }

    #[test]
    fn fewer_rows_than_workers_is_one_band() {
        assert_eq!(
            plan_bands(2, 3, RemainderPolicy::Absorb),
            vec![Band {
                index: 0,
                offset: 0,
                height: 2
            }]
        );
        assert!(plan_bands(0, 3, RemainderPolicy::Absorb).is_empty());
    }

    #[test]
    fn policy_parse() {
        assert_eq!(RemainderPolicy::parse("Truncate").unwrap(), RemainderPolicy::Truncate);
        assert!(RemainderPolicy::parse("pad").is_err());
    }

    /// Reports one box per call covering its whole input, and records the
    /// input sizes it saw.
    struct WholeImage {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl PedestrianBackend for WholeImage {
        fn name(&self) -> &'static str {
            "whole-image"
        }

        fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
            self.seen.lock().unwrap().push(image.dimensions());
            Ok(vec![BoundingBox::new(0, 0, image.width(), image.height())])
        }
    }

    #[test]
    fn boxes_map_back_into_their_band() {
        let backend = Arc::new(WholeImage {
            seen: Mutex::new(Vec::new()),
        });
        let detector =
            TiledDetector::new(backend.clone(), 3, RemainderPolicy::Absorb).unwrap();
        let frame = Frame::new(RgbImage::from_pixel(320, 240, Rgb([0, 0, 0])), 1.0);

        let boxes = detector.detect(&frame).unwrap();
        assert_eq!(boxes.len(), 3);

        let mut seen = backend.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![(160, 40); 3]);

        for band in detector.bands_for(&frame) {
            let b = boxes.iter().find(|b| b.y == band.offset).unwrap();
            assert!(b.y >= band.offset);
            assert!(b.y < band.offset + band.height);
            assert_eq!(*b, BoundingBox::new(0, band.offset, 320, 80));
        }
    }

    struct OffBand;

    impl PedestrianBackend for OffBand {
        fn name(&self) -> &'static str {
            "off-band"
        }

        fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
            Ok(vec![BoundingBox::new(
                image.width() - 2,
                image.height() - 4,
                20,
                20,
            )])
        }
    }

    #[test]
    fn oversized_boxes_are_clipped_to_band_extent() {
        let detector = TiledDetector::new(Arc::new(OffBand), 2, RemainderPolicy::Absorb).unwrap();
        let frame = Frame::new(RgbImage::new(100, 101), 1.0);
        let boxes = detector.detect(&frame).unwrap();
        for band in detector.bands_for(&frame) {
            let b = boxes.iter().find(|b| b.y >= band.offset && b.y < band.offset + band.height);
            let b = b.expect("box for band");
            assert!(b.bottom() <= band.offset + band.height);
            assert!(b.right() <= 100);
        }
    }

    struct Failing;

    impl PedestrianBackend for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn detect(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>> {
            Err(anyhow!("detector exploded"))
        }
    }

    #[test]
    fn backend_errors_propagate() {
        let detector = TiledDetector::new(Arc::new(Failing), 3, RemainderPolicy::Absorb).unwrap();
        let frame = Frame::new(RgbImage::new(64, 64), 1.0);
        assert!(detector.detect(&frame).is_err());
    }
}
