//! Frame sources.
//!
//! `VideoSource` hides which backend delivers frames:
//! - `stub://<scene>`: synthetic frames (always available)
//! - a directory: PNG/JPEG image sequence (always available)
//! - a video file or camera index: OpenCV `VideoCapture` (feature `opencv`)
//!
//! Every backend signals end of stream by returning an empty frame.

#[cfg(feature = "opencv")]
mod opencv_capture;
mod sequence;
mod synthetic;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::frame::Frame;
#[cfg(feature = "opencv")]
use opencv_capture::OpenCvSource;
use sequence::SequenceSource;
use synthetic::SyntheticSource;

pub use synthetic::STUB_SCHEME;

/// What the user asked to read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Camera(i32),
    Path(String),
}

impl Input {
    /// A non-empty video path wins over the camera index.
    pub fn from_args(camera: i32, video: Option<&str>) -> Self {
        match video {
            Some(path) if !path.is_empty() => Input::Path(path.to_string()),
            _ => Input::Camera(camera),
        }
    }

    /// Name used in the open-failure message: the path, or `<camera>`.
    pub fn display_name(&self) -> &str {
        match self {
            Input::Camera(_) => "<camera>",
            Input::Path(path) => path,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub description: String,
}

pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    Sequence(SequenceSource),
    #[cfg(feature = "opencv")]
    OpenCv(OpenCvSource),
}

impl VideoSource {
    pub fn open(input: &Input) -> Result<Self> {
        let backend = match input {
            Input::Path(path) if path.starts_with(STUB_SCHEME) => {
                SourceBackend::Synthetic(SyntheticSource::open(path)?)
            }
            Input::Path(path) if path.contains("://") => {
                return Err(anyhow!("only local paths are supported: {path}"));
            }
            Input::Path(path) if Path::new(path).is_dir() => {
                SourceBackend::Sequence(SequenceSource::open(Path::new(path))?)
            }
            Input::Path(path) => open_video_file(path)?,
            Input::Camera(index) => open_camera(*index)?,
        };
        Ok(Self { backend })
    }

    /// Read the next frame. An empty frame means the stream has ended.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            SourceBackend::Sequence(source) => source.next_frame(),
            #[cfg(feature = "opencv")]
            SourceBackend::OpenCv(source) => source.next_frame(),
        }
    }

    /// Total frames, when the backend knows it up front.
    pub fn frame_count(&self) -> Option<u64> {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.frame_count(),
            SourceBackend::Sequence(source) => source.frame_count(),
            #[cfg(feature = "opencv")]
            SourceBackend::OpenCv(source) => source.frame_count(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            SourceBackend::Sequence(source) => source.stats(),
            #[cfg(feature = "opencv")]
            SourceBackend::OpenCv(source) => source.stats(),
        }
    }
}

#[cfg(feature = "opencv")]
fn open_video_file(path: &str) -> Result<SourceBackend> {
    Ok(SourceBackend::OpenCv(OpenCvSource::open_file(path)?))
}

#[cfg(not(feature = "opencv"))]
fn open_video_file(path: &str) -> Result<SourceBackend> {
    Err(anyhow!(
        "decoding video file {path} requires the opencv feature"
    ))
}

#[cfg(feature = "opencv")]
fn open_camera(index: i32) -> Result<SourceBackend> {
    Ok(SourceBackend::OpenCv(OpenCvSource::open_camera(index)?))
}

#[cfg(not(feature = "opencv"))]
fn open_camera(index: i32) -> Result<SourceBackend> {
    Err(anyhow!("camera {index} capture requires the opencv feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_overrides_camera() {
        assert_eq!(
            Input::from_args(2, Some("clip.mp4")),
            Input::Path("clip.mp4".into())
        );
        assert_eq!(Input::from_args(2, Some("")), Input::Camera(2));
        assert_eq!(Input::from_args(0, None), Input::Camera(0));
    }

    #[test]
    fn display_names() {
        assert_eq!(Input::Camera(0).display_name(), "<camera>");
        assert_eq!(Input::Path("a.avi".into()).display_name(), "a.avi");
    }

    #[test]
    fn opens_stub_source() {
        let mut source = VideoSource::open(&Input::Path("stub://blank".into())).unwrap();
        assert_eq!(source.frame_count(), Some(10));
        assert!(!source.next_frame().unwrap().is_empty());
        assert_eq!(source.stats().frames_read, 1);
    }

    #[test]
    fn rejects_network_urls() {
        assert!(VideoSource::open(&Input::Path("rtsp://cam/stream".into())).is_err());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn missing_file_without_opencv_fails() {
        assert!(VideoSource::open(&Input::Path("/nonexistent/clip.mp4".into())).is_err());
        assert!(VideoSource::open(&Input::Camera(0)).is_err());
    }
}
