use anyhow::{anyhow, Result};
use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::time::Duration;

use super::Display;
use crate::annotate::Caption;
use crate::frame::Frame;
use crate::mode::ESCAPE;

/// Window-less display.
///
/// Keys are replayed from a script of `(frame, key)` pairs: the key is
/// delivered by the poll that follows the given (1-based) shown frame.
pub struct HeadlessDisplay {
    script: VecDeque<(u64, char)>,
    frames_shown: u64,
    last_caption: Option<Caption>,
    progress: Option<ProgressBar>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            frames_shown: 0,
            last_caption: None,
            progress: None,
        }
    }

    pub fn with_keys(mut self, mut keys: Vec<(u64, char)>) -> Self {
        keys.sort_by_key(|(frame, _)| *frame);
        self.script = keys.into();
        self
    }

    /// Advance `bar` once per shown frame.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn last_caption(&self) -> Option<&Caption> {
        self.last_caption.as_ref()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame, caption: &Caption) -> Result<()> {
        self.frames_shown += 1;
        log::trace!("frame {}: {}", self.frames_shown, caption.text);
        if let Some(bar) = &self.progress {
            bar.inc(1);
            bar.set_message(caption.text.clone());
        }
        self.last_caption = Some(caption.clone());
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<char>> {
        match self.script.front() {
            Some(&(frame, key)) if frame <= self.frames_shown => {
                self.script.pop_front();
                Ok(Some(key))
            }
            _ => Ok(None),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(bar) = self.progress.take() {
            bar.finish();
        }
        Ok(())
    }
}

/// Parse a key script such as `3:l,6:p,9:q`. `esc` names the escape key.
pub fn parse_key_script(script: &str) -> Result<Vec<(u64, char)>> {
    script
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (frame, key) = item
                .split_once(':')
                .ok_or_else(|| anyhow!("key script entry '{item}' is not <frame>:<key>"))?;
            let frame: u64 = frame
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid frame number in '{item}'"))?;
            let key = match key.trim() {
                "esc" => ESCAPE,
                k if k.chars().count() == 1 => k.chars().next().unwrap_or(ESCAPE),
                _ => return Err(anyhow!("key in '{item}' must be one character or 'esc'")),
            };
            Ok((frame, key))
        })
        .collect()
}
