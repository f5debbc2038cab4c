//! Per-run state and the frame loop.
//!
//! A `Session` is built once at startup, borrowed mutably by the loop for
//! every frame, and finished at shutdown so that buffered log entries reach
//! the file. Frames are processed strictly one after another; parallelism
//! lives inside the detectors.

use anyhow::Result;
use std::fmt;
use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::annotate::{Annotator, Caption, CaptionStyle, Palette, BLUE, GREEN, RED};
use crate::capture::VideoSource;
use crate::config::DetectionConfig;
use crate::detect::Backends;
use crate::detection_log::DetectionLog;
use crate::display::Display;
use crate::fps::FpsMeter;
use crate::frame::{BoundingBox, Frame};
use crate::lanes::LaneFinder;
use crate::mode::{KeyOutcome, Mode, ModeController};
use crate::tiling::TiledDetector;

/// The three front-ends built on this library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Program {
    /// Lanes and pedestrians with keyboard mode switching.
    Merged,
    /// Pedestrians only.
    Pedestrians,
    /// Lanes only.
    Lanes,
}

impl Program {
    pub fn window_title(self) -> &'static str {
        match self {
            Program::Merged => "Lane & Pedestrian Detector",
            Program::Pedestrians => "People detector",
            Program::Lanes => "Lane Detector",
        }
    }

    pub fn about(self) -> &'static str {
        match self {
            Program::Merged => "Merged lane and pedestrian detection. Press 'l' for lanes, 'p' for pedestrians, 'b' for both, 'q'/ESC to quit.",
            Program::Pedestrians => "Pedestrian detection with a HOG people detector.",
            Program::Lanes => "Lane line detection with Canny edges and a probabilistic Hough transform.",
        }
    }

    /// Console hint printed once the source is open.
    pub fn key_hint(self) -> &'static str {
        match self {
            Program::Merged => {
                "Press 'l' for lanes, 'p' for pedestrians, 'b' for both, 'q' or <ESC> to quit."
            }
            Program::Pedestrians | Program::Lanes => "Press 'q' or <ESC> to quit.",
        }
    }

    pub fn controller(self) -> ModeController {
        match self {
            Program::Merged => ModeController::new(),
            Program::Pedestrians => ModeController::locked(Mode::Pedestrian),
            Program::Lanes => ModeController::locked(Mode::Lane),
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Program::Merged => Palette {
                pedestrians: RED,
                lanes: GREEN,
                caption: BLUE,
            },
            Program::Pedestrians => Palette {
                pedestrians: GREEN,
                lanes: GREEN,
                caption: RED,
            },
            Program::Lanes => Palette {
                pedestrians: GREEN,
                lanes: GREEN,
                caption: GREEN,
            },
        }
    }

    pub fn caption_style(self) -> CaptionStyle {
        match self {
            Program::Merged => CaptionStyle::FpsAndMode,
            Program::Pedestrians => CaptionStyle::Fps,
            Program::Lanes => CaptionStyle::RollingFps,
        }
    }

    /// Whether the program keeps a pedestrian log file.
    pub fn writes_log(self) -> bool {
        !matches!(self, Program::Lanes)
    }
}

/// What one frame produced.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub mode: Mode,
    /// Display boxes, as drawn and logged.
    pub pedestrians: Vec<BoundingBox>,
    pub lane_segments: usize,
    pub caption: Caption,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    QuitKey,
    Interrupted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub stop: StopReason,
    pub frames: u64,
    pub frames_with_pedestrians: u64,
    pub pedestrians: u64,
    pub lane_segments: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} frames: {} with pedestrians ({} total), {} lane segments",
            self.frames, self.frames_with_pedestrians, self.pedestrians, self.lane_segments
        )
    }
}

pub struct Session {
    program: Program,
    controller: ModeController,
    pedestrians: TiledDetector,
    lanes: LaneFinder,
    annotator: Annotator,
    log: Option<DetectionLog<File>>,
    fps: FpsMeter,
    key_timeout: Duration,
    frames: u64,
    frames_with_pedestrians: u64,
    pedestrian_total: u64,
    lane_segment_total: u64,
}

impl Session {
    pub fn new(
        program: Program,
        config: &DetectionConfig,
        backends: Backends,
        log: Option<DetectionLog<File>>,
    ) -> Result<Self> {
        let pedestrians =
            TiledDetector::new(backends.pedestrians, config.workers, config.band_policy)?;
        let lanes = LaneFinder::new(backends.lines, &config.lanes);
        Ok(Self {
            program,
            controller: program.controller(),
            pedestrians,
            lanes,
            annotator: Annotator::new(program.palette()),
            log,
            fps: FpsMeter::new(),
            key_timeout: Duration::from_millis(config.key_poll_ms as u64),
            frames: 0,
            frames_with_pedestrians: 0,
            pedestrian_total: 0,
            lane_segment_total: 0,
        })
    }

    pub fn program(&self) -> Program {
        self.program
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn key_timeout(&self) -> Duration {
        self.key_timeout
    }

    /// Detect, annotate and log one frame. The mode is read once up front.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<FrameReport> {
        self.fps.begin_frame(Instant::now());
        let mode = self.controller.mode();

        let found = if mode.runs_pedestrians() {
            self.pedestrians.detect(frame)?
        } else {
            Vec::new()
        };
        let segments = if mode.runs_lanes() {
            self.lanes.find(frame, self.pedestrians.pool())?
        } else {
            Vec::new()
        };

        let shown: Vec<BoundingBox> = found.iter().map(|b| b.tightened()).collect();
        self.annotator.draw_lanes(frame, &segments);
        self.annotator.draw_boxes(frame, &shown);

        if !shown.is_empty() {
            if let Some(log) = self.log.as_mut() {
                log.record(frame.position(), &shown)?;
            }
            self.frames_with_pedestrians += 1;
            self.pedestrian_total += shown.len() as u64;
        }
        self.frames += 1;
        self.lane_segment_total += segments.len() as u64;

        self.fps.end_frame(Instant::now());
        let caption = self
            .annotator
            .caption(self.program.caption_style(), &self.fps, mode);
        Ok(FrameReport {
            mode,
            pedestrians: shown,
            lane_segments: segments.len(),
            caption,
        })
    }

    /// Apply a key press, announcing mode changes on the console.
    pub fn handle_key(&mut self, key: char) -> KeyOutcome {
        let outcome = self.controller.on_key(key);
        match outcome {
            KeyOutcome::Switched(mode) => {
                println!("{}", mode.announcement());
                log::debug!("mode -> {}", mode.label());
            }
            KeyOutcome::Quit => println!("Exit requested"),
            KeyOutcome::Ignored => {}
        }
        outcome
    }

    /// Flush the log and report totals.
    pub fn finish(&mut self, stop: StopReason) -> Result<RunSummary> {
        if let Some(log) = self.log.take() {
            log.finish()?;
        }
        Ok(RunSummary {
            stop,
            frames: self.frames,
            frames_with_pedestrians: self.frames_with_pedestrians,
            pedestrians: self.pedestrian_total,
            lane_segments: self.lane_segment_total,
        })
    }
}

/// Drive `session` until the stream ends, a quit key arrives or `stop` is set.
///
/// On a detector or display error the session is still finished (log flushed)
/// before the error is returned.
pub fn run(
    source: &mut VideoSource,
    display: &mut dyn Display,
    session: &mut Session,
    stop: &AtomicBool,
) -> Result<RunSummary> {
    let outcome = run_frames(source, display, session, stop);
    let closed = display.close();
    match outcome {
        Ok(reason) => {
            closed?;
            session.finish(reason)
        }
        Err(err) => {
            if let Err(flush_err) = session.finish(StopReason::Interrupted) {
                log::warn!("detection log flush after failure: {flush_err:#}");
            }
            Err(err)
        }
    }
}

fn run_frames(
    source: &mut VideoSource,
    display: &mut dyn Display,
    session: &mut Session,
    stop: &AtomicBool,
) -> Result<StopReason> {
    loop {
        if stop.load(Ordering::SeqCst) {
            log::info!("stop requested");
            return Ok(StopReason::Interrupted);
        }
        let mut frame = source.next_frame()?;
        if frame.is_empty() {
            println!("Finished reading: empty frame");
            return Ok(StopReason::EndOfStream);
        }
        let report = session.process_frame(&mut frame)?;
        if !report.pedestrians.is_empty() {
            log::debug!(
                "frame {}: {} pedestrians",
                frame.position(),
                report.pedestrians.len()
            );
        }
        display.show(&frame, &report.caption)?;
        if let Some(key) = display.poll_key(session.key_timeout())? {
            if session.handle_key(key) == KeyOutcome::Quit {
                return Ok(StopReason::QuitKey);
            }
        }
    }
}
