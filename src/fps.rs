//! Frame-rate measurement for the caption overlay.
//!
//! Two readings are kept: the instantaneous rate of the last frame
//! (processing time only) and a rolling average recomputed once per second.

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct FpsMeter {
    frame_start: Option<Instant>,
    instant: f64,
    window_start: Option<Instant>,
    window_frames: u32,
    rolling: u32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            frame_start: None,
            instant: 0.0,
            window_start: None,
            window_frames: 0,
            rolling: 0,
        }
    }

    pub fn begin_frame(&mut self, now: Instant) {
        self.frame_start = Some(now);
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
    }

    /// Close the current frame and update both readings.
    pub fn end_frame(&mut self, now: Instant) {
        if let Some(start) = self.frame_start.take() {
            let secs = now.saturating_duration_since(start).as_secs_f64();
            self.instant = if secs > 0.0 { 1.0 / secs } else { 0.0 };
        }
        self.window_frames += 1;
        if let Some(window_start) = self.window_start {
            let elapsed = now.saturating_duration_since(window_start);
            if elapsed >= WINDOW {
                self.rolling =
                    (self.window_frames as f64 / elapsed.as_secs_f64()).round() as u32;
                self.window_frames = 0;
                self.window_start = Some(now);
            }
        }
    }

    /// Rate implied by the last frame's processing time.
    pub fn instant(&self) -> f64 {
        self.instant
    }

    /// Average over the last completed one-second window (0 until one has elapsed).
    pub fn rolling(&self) -> u32 {
        self.rolling
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}
