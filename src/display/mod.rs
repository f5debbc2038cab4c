//! Display and keyboard input.
//!
//! The frame loop shows one annotated frame, then polls for a key with a short
//! timeout. `HeadlessDisplay` replaces the window for unattended runs and
//! tests; `HighguiWindow` (feature `opencv`) is the interactive window.

mod headless;
#[cfg(feature = "opencv")]
mod highgui_window;

use anyhow::Result;
use std::time::Duration;

use crate::annotate::Caption;
use crate::frame::Frame;

pub use headless::{parse_key_script, HeadlessDisplay};
#[cfg(feature = "opencv")]
pub use highgui_window::HighguiWindow;

pub trait Display {
    /// Present an annotated frame with its caption.
    fn show(&mut self, frame: &Frame, caption: &Caption) -> Result<()>;

    /// Wait up to `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>>;

    /// Tear down any window or progress output.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
