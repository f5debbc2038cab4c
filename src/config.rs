use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::tiling::RemainderPolicy;

const DEFAULT_WORKERS: usize = 3;
const DEFAULT_LOG_BATCH: usize = 50;
const DEFAULT_KEY_POLL_MS: u32 = 1;

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    workers: Option<usize>,
    log_batch: Option<usize>,
    band_policy: Option<String>,
    backend: Option<String>,
    key_poll_ms: Option<u32>,
    hog: Option<HogConfigFile>,
    edges: Option<EdgeConfigFile>,
    hough: Option<HoughConfigFile>,
    lanes: Option<LaneConfigFile>,
    blob: Option<BlobConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct HogConfigFile {
    hit_threshold: Option<f64>,
    win_stride: Option<i32>,
    scale: Option<f64>,
    group_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct EdgeConfigFile {
    low: Option<f64>,
    high: Option<f64>,
    aperture: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
struct HoughConfigFile {
    rho: Option<f64>,
    theta_deg: Option<f64>,
    threshold: Option<i32>,
    min_line_length: Option<f64>,
    max_line_gap: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct LaneConfigFile {
    roi_top: Option<f64>,
    roi_height: Option<f64>,
    min_angle_deg: Option<f64>,
    max_angle_deg: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct BlobConfigFile {
    luma_threshold: Option<u8>,
    min_height: Option<u32>,
    min_aspect: Option<f32>,
}

/// Which implementation backs the detector adapters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    /// OpenCV when compiled in, CPU otherwise.
    Auto,
    Cpu,
    OpenCv,
}

impl BackendChoice {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "opencv" => Ok(Self::OpenCv),
            other => Err(anyhow!(
                "unknown backend '{}' (expected auto, cpu or opencv)",
                other
            )),
        }
    }
}

/// HOG multi-scale detection parameters.
#[derive(Clone, Debug)]
pub struct HogSettings {
    pub hit_threshold: f64,
    pub win_stride: i32,
    pub scale: f64,
    pub group_threshold: f64,
}

/// Canny thresholds.
#[derive(Clone, Debug)]
pub struct EdgeSettings {
    pub low: f64,
    pub high: f64,
    pub aperture: i32,
}

/// Probabilistic Hough parameters.
#[derive(Clone, Debug)]
pub struct HoughSettings {
    pub rho: f64,
    pub theta_deg: f64,
    pub threshold: i32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

/// Lane region of interest (fractions of frame height) and accepted angles.
#[derive(Clone, Debug)]
pub struct LaneSettings {
    pub roi_top: f64,
    pub roi_height: f64,
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
}

/// CPU pedestrian backend: bright upright regions.
#[derive(Clone, Debug)]
pub struct BlobSettings {
    pub luma_threshold: u8,
    pub min_height: u32,
    pub min_aspect: f32,
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub workers: usize,
    pub log_batch: usize,
    pub band_policy: RemainderPolicy,
    pub backend: BackendChoice,
    pub key_poll_ms: u32,
    pub hog: HogSettings,
    pub edges: EdgeSettings,
    pub hough: HoughSettings,
    pub lanes: LaneSettings,
    pub blob: BlobSettings,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            log_batch: DEFAULT_LOG_BATCH,
            band_policy: RemainderPolicy::Absorb,
            backend: BackendChoice::Auto,
            key_poll_ms: DEFAULT_KEY_POLL_MS,
            hog: HogSettings {
                hit_threshold: 0.0,
                win_stride: 8,
                scale: 1.05,
                group_threshold: 2.0,
            },
            edges: EdgeSettings {
                low: 70.0,
                high: 200.0,
                aperture: 3,
            },
            hough: HoughSettings {
                rho: 1.0,
                theta_deg: 1.0,
                threshold: 80,
                min_line_length: 50.0,
                max_line_gap: 5.0,
            },
            lanes: LaneSettings {
                roi_top: 0.5,
                roi_height: 0.25,
                min_angle_deg: 25.0,
                max_angle_deg: 165.0,
            },
            blob: BlobSettings {
                luma_threshold: 200,
                min_height: 16,
                min_aspect: 1.5,
            },
        }
    }
}

impl DetectionConfig {
    /// Resolve configuration: file (explicit path or `LANESNPEDS_CONFIG`),
    /// then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("LANESNPEDS_CONFIG").ok();
        let path = path.or(env_path.as_deref().map(Path::new));
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DetectionConfigFile) -> Result<Self> {
        let d = Self::default();
        let band_policy = match file.band_policy.as_deref() {
            Some(value) => RemainderPolicy::parse(value)?,
            None => d.band_policy,
        };
        let backend = match file.backend.as_deref() {
            Some(value) => BackendChoice::parse(value)?,
            None => d.backend,
        };
        let hog = file.hog.unwrap_or_default();
        let edges = file.edges.unwrap_or_default();
        let hough = file.hough.unwrap_or_default();
        let lanes = file.lanes.unwrap_or_default();
        let blob = file.blob.unwrap_or_default();
        Ok(Self {
            workers: file.workers.unwrap_or(d.workers),
            log_batch: file.log_batch.unwrap_or(d.log_batch),
            band_policy,
            backend,
            key_poll_ms: file.key_poll_ms.unwrap_or(d.key_poll_ms),
            hog: HogSettings {
                hit_threshold: hog.hit_threshold.unwrap_or(d.hog.hit_threshold),
                win_stride: hog.win_stride.unwrap_or(d.hog.win_stride),
                scale: hog.scale.unwrap_or(d.hog.scale),
                group_threshold: hog.group_threshold.unwrap_or(d.hog.group_threshold),
            },
            edges: EdgeSettings {
                low: edges.low.unwrap_or(d.edges.low),
                high: edges.high.unwrap_or(d.edges.high),
                aperture: edges.aperture.unwrap_or(d.edges.aperture),
            },
            hough: HoughSettings {
                rho: hough.rho.unwrap_or(d.hough.rho),
                theta_deg: hough.theta_deg.unwrap_or(d.hough.theta_deg),
                threshold: hough.threshold.unwrap_or(d.hough.threshold),
                min_line_length: hough.min_line_length.unwrap_or(d.hough.min_line_length),
                max_line_gap: hough.max_line_gap.unwrap_or(d.hough.max_line_gap),
            },
            lanes: LaneSettings {
                roi_top: lanes.roi_top.unwrap_or(d.lanes.roi_top),
                roi_height: lanes.roi_height.unwrap_or(d.lanes.roi_height),
                min_angle_deg: lanes.min_angle_deg.unwrap_or(d.lanes.min_angle_deg),
                max_angle_deg: lanes.max_angle_deg.unwrap_or(d.lanes.max_angle_deg),
            },
            blob: BlobSettings {
                luma_threshold: blob.luma_threshold.unwrap_or(d.blob.luma_threshold),
                min_height: blob.min_height.unwrap_or(d.blob.min_height),
                min_aspect: blob.min_aspect.unwrap_or(d.blob.min_aspect),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(workers) = std::env::var("LANESNPEDS_WORKERS") {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|_| anyhow!("LANESNPEDS_WORKERS must be a positive integer"))?;
        }
        if let Ok(batch) = std::env::var("LANESNPEDS_LOG_BATCH") {
            self.log_batch = batch
                .trim()
                .parse()
                .map_err(|_| anyhow!("LANESNPEDS_LOG_BATCH must be a positive integer"))?;
        }
        if let Ok(backend) = std::env::var("LANESNPEDS_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = BackendChoice::parse(&backend)?;
            }
        }
        if let Ok(policy) = std::env::var("LANESNPEDS_BAND_POLICY") {
            if !policy.trim().is_empty() {
                self.band_policy = RemainderPolicy::parse(&policy)?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow!("workers must be greater than zero"));
        }
        if self.log_batch == 0 {
            return Err(anyhow!("log_batch must be greater than zero"));
        }
        let lanes = &self.lanes;
        if !(0.0..1.0).contains(&lanes.roi_top)
            || lanes.roi_height <= 0.0
            || lanes.roi_top + lanes.roi_height > 1.0
        {
            return Err(anyhow!(
                "lane roi must lie inside the frame (top={}, height={})",
                lanes.roi_top,
                lanes.roi_height
            ));
        }
        if lanes.min_angle_deg < 0.0
            || lanes.max_angle_deg > 180.0
            || lanes.min_angle_deg > lanes.max_angle_deg
        {
            return Err(anyhow!(
                "lane angle limits must satisfy 0 <= min <= max <= 180"
            ));
        }
        if self.hog.scale <= 1.0 {
            return Err(anyhow!("hog scale must be greater than 1.0"));
        }
        if self.hog.win_stride <= 0 {
            return Err(anyhow!("hog win_stride must be positive"));
        }
        if self.blob.min_aspect <= 0.0 {
            return Err(anyhow!("blob min_aspect must be positive"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DetectionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_programs() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.log_batch, 50);
        assert_eq!(cfg.band_policy, RemainderPolicy::Absorb);
        assert_eq!(cfg.backend, BackendChoice::Auto);
        assert_eq!(cfg.edges.low, 70.0);
        assert_eq!(cfg.edges.high, 200.0);
        assert_eq!(cfg.hough.threshold, 80);
        assert_eq!(cfg.lanes.min_angle_deg, 25.0);
        assert_eq!(cfg.lanes.max_angle_deg, 165.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_roi_outside_frame() {
        let mut cfg = DetectionConfig::default();
        cfg.lanes.roi_top = 0.9;
        cfg.lanes.roi_height = 0.25;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(BackendChoice::parse("cuda").is_err());
        assert_eq!(BackendChoice::parse(" OpenCV ").unwrap(), BackendChoice::OpenCv);
    }
}
