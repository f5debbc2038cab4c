//! Lane and pedestrian detection on video streams.
//!
//! The crate reads frames from a capture source, runs a pedestrian detector
//! across horizontal bands of each frame on a fixed worker pool, finds lane
//! line segments in a band of interest, draws the results, batches pedestrian
//! detections into a text log and shows the annotated frames.
//!
//! # Module Structure
//!
//! - `capture`: frame sources (synthetic `stub://`, image directories, OpenCV)
//! - `detect`: detector adapter traits and their CPU / OpenCV backends
//! - `tiling`: band planning and the parallel tile-and-merge detector
//! - `lanes`: lane ROI, segment translation and angle filtering
//! - `mode`: keyboard-driven detector selection
//! - `annotate`, `detection_log`, `display`: output side of the loop
//! - `session`: per-run state and the frame loop
//! - `cli`: argument parsing and exit codes shared by the binaries

pub mod annotate;
pub mod capture;
pub mod cli;
pub mod config;
#[cfg(feature = "opencv")]
mod cv;
pub mod detect;
pub mod detection_log;
pub mod display;
pub mod fps;
pub mod frame;
pub mod lanes;
pub mod mode;
pub mod session;
pub mod tiling;
pub mod ui;

pub use capture::{Input, VideoSource};
pub use config::{BackendChoice, DetectionConfig};
pub use detect::{select_backends, Backends, LineBackend, PedestrianBackend};
pub use detection_log::DetectionLog;
pub use frame::{BoundingBox, Frame};
pub use lanes::{AngleFilter, LaneFinder, LineSegment, Roi};
pub use mode::{KeyOutcome, Mode, ModeController};
pub use session::{Program, RunSummary, Session, StopReason};
pub use tiling::{plan_bands, Band, RemainderPolicy, TiledDetector};
