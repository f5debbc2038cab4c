use anyhow::Result;
use std::sync::Arc;

use crate::config::{BackendChoice, DetectionConfig};
use crate::detect::backend::{LineBackend, PedestrianBackend};

mod cpu;
#[cfg(feature = "opencv")]
mod opencv_backend;

pub use cpu::{BlobBackend, HoughBackend};
#[cfg(feature = "opencv")]
pub use opencv_backend::{HogBackend, HoughPBackend};

/// The pair of adapters a session runs with.
#[derive(Clone)]
pub struct Backends {
    pub pedestrians: Arc<dyn PedestrianBackend>,
    pub lines: Arc<dyn LineBackend>,
}

/// Build the adapters requested by `config.backend`.
pub fn select_backends(config: &DetectionConfig) -> Result<Backends> {
    let backends = match config.backend {
        BackendChoice::Cpu => cpu_backends(config),
        BackendChoice::OpenCv => opencv_backends(config)?,
        BackendChoice::Auto if cfg!(feature = "opencv") => opencv_backends(config)?,
        BackendChoice::Auto => cpu_backends(config),
    };
    log::info!(
        "detector backends: pedestrians={}, lines={}",
        backends.pedestrians.name(),
        backends.lines.name()
    );
    Ok(backends)
}

fn cpu_backends(config: &DetectionConfig) -> Backends {
    Backends {
        pedestrians: Arc::new(BlobBackend::new(config.blob.clone())),
        lines: Arc::new(HoughBackend::new(
            config.edges.clone(),
            config.hough.clone(),
        )),
    }
}

#[cfg(feature = "opencv")]
fn opencv_backends(config: &DetectionConfig) -> Result<Backends> {
    Ok(Backends {
        pedestrians: Arc::new(HogBackend::new(config.hog.clone())?),
        lines: Arc::new(HoughPBackend::new(
            config.edges.clone(),
            config.hough.clone(),
        )),
    })
}

#[cfg(not(feature = "opencv"))]
fn opencv_backends(_config: &DetectionConfig) -> Result<Backends> {
    anyhow::bail!("the opencv backend requires the opencv feature")
}
