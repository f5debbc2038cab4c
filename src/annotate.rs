//! Overlay drawing on the display frame.
//!
//! Boxes and lane segments are burned into the frame pixels here. The caption
//! text is handed to the display along with the frame, since rendering glyphs
//! needs a font that only the window backend carries.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::fps::FpsMeter;
use crate::frame::{BoundingBox, Frame};
use crate::lanes::LineSegment;
use crate::mode::Mode;

const BOX_THICKNESS: u32 = 2;
const LANE_THICKNESS: i32 = 3;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Colours used by one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub pedestrians: Rgb<u8>,
    pub lanes: Rgb<u8>,
    pub caption: Rgb<u8>,
}

/// How the caption line reports frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionStyle {
    /// `FPS: 12.3 Mode: BOTH`
    FpsAndMode,
    /// `FPS: 12.3`
    Fps,
    /// `FPS: 12` (one-second rolling average)
    RollingFps,
}

impl CaptionStyle {
    pub fn render(self, fps: &FpsMeter, mode: Mode) -> String {
        match self {
            CaptionStyle::FpsAndMode => {
                format!("FPS: {:.1} Mode: {}", fps.instant(), mode.label())
            }
            CaptionStyle::Fps => format!("FPS: {:.1}", fps.instant()),
            CaptionStyle::RollingFps => format!("FPS: {}", fps.rolling()),
        }
    }
}

/// Text overlay drawn by the display at (10, 30).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub color: Rgb<u8>,
}

#[derive(Clone, Copy, Debug)]
pub struct Annotator {
    palette: Palette,
}

impl Annotator {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Draw pedestrian boxes as given (callers pass the tightened boxes).
    pub fn draw_boxes(&self, frame: &mut Frame, boxes: &[BoundingBox]) {
        let image = frame.image_mut();
        for b in boxes {
            draw_thick_rect(image, *b, BOX_THICKNESS, self.palette.pedestrians);
        }
    }

    pub fn draw_lanes(&self, frame: &mut Frame, segments: &[LineSegment]) {
        let image = frame.image_mut();
        for s in segments {
            draw_thick_segment(image, *s, self.palette.lanes);
        }
    }

    pub fn caption(&self, style: CaptionStyle, fps: &FpsMeter, mode: Mode) -> Caption {
        Caption {
            text: style.render(fps, mode),
            color: self.palette.caption,
        }
    }
}

fn draw_thick_rect(image: &mut RgbImage, b: BoundingBox, thickness: u32, color: Rgb<u8>) {
    for inset in 0..thickness {
        let w = b.width.saturating_sub(2 * inset);
        let h = b.height.saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((b.x + inset) as i32, (b.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(image, rect, color);
    }
}

fn draw_thick_segment(image: &mut RgbImage, s: LineSegment, color: Rgb<u8>) {
    let half = LANE_THICKNESS / 2;
    // Offset across the dominant axis so the stroke widens sideways.
    let steep = (s.y2 - s.y1).abs() > (s.x2 - s.x1).abs();
    for d in -half..=half {
        let (dx, dy) = if steep { (d, 0) } else { (0, d) };
        draw_line_segment_mut(
            image,
            ((s.x1 + dx) as f32, (s.y1 + dy) as f32),
            ((s.x2 + dx) as f32, (s.y2 + dy) as f32),
            color,
        );
    }
}
