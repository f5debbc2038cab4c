//! Batched pedestrian detection log.
//!
//! Entries accumulate in memory and are written out in append order once the
//! batch is full, followed by a flush. Whatever is still pending is written by
//! `finish()` (or, failing that, when the log is dropped). Nothing from an
//! incomplete batch reaches the writer early.

use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::frame::BoundingBox;

pub const DEFAULT_LOG_PATH: &str = "pedestrian_log.txt";

/// Render one frame's detections as a log entry.
pub fn format_entry(position: f64, boxes: &[BoundingBox]) -> String {
    let mut entry = format!("Frame {}: {} pedestrians detected\n", position, boxes.len());
    for b in boxes {
        // Writing into a String cannot fail.
        let _ = writeln!(
            entry,
            "Coordinates: {}, {}, {}, {}",
            b.x, b.y, b.width, b.height
        );
    }
    entry
}

pub struct DetectionLog<W: Write> {
    writer: Option<W>,
    pending: Vec<String>,
    batch_size: usize,
    entries_written: u64,
}

impl DetectionLog<File> {
    /// Create (or truncate) the log file at `path`.
    pub fn create(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("create detection log {}", path.display()))?;
        log::info!("detection log: {} (batch of {})", path.display(), batch_size);
        Ok(Self::new(file, batch_size))
    }
}

impl<W: Write> DetectionLog<W> {
    pub fn new(writer: W, batch_size: usize) -> Self {
        Self {
            writer: Some(writer),
            pending: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            entries_written: 0,
        }
    }

    /// Queue an entry for a frame. Frames without detections are not logged.
    ///
    /// Returns `true` when this call filled the batch and it was written out.
    pub fn record(&mut self, position: f64, boxes: &[BoundingBox]) -> Result<bool> {
        if boxes.is_empty() {
            return Ok(false);
        }
        self.pending.push(format_entry(position, boxes));
        if self.pending.len() >= self.batch_size {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Write all pending entries in order, clear the buffer and flush.
    pub fn flush(&mut self) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("detection log already finished"))?;
        for entry in &self.pending {
            writer
                .write_all(entry.as_bytes())
                .context("write detection log entry")?;
        }
        writer.flush().context("flush detection log")?;
        self.entries_written += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    /// Flush the remainder and hand back the writer.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        self.writer
            .take()
            .ok_or_else(|| anyhow!("detection log already finished"))
    }
}

impl<W: Write> Drop for DetectionLog<W> {
    fn drop(&mut self) {
        if self.writer.is_some() && !self.pending.is_empty() {
            if let Err(err) = self.flush() {
                log::warn!(
                    "detection log: lost {} pending entries: {:#}",
                    self.pending.len(),
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Writer whose contents stay observable after the log takes ownership.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn one_box() -> Vec<BoundingBox> {
        vec![BoundingBox::new(1, 2, 3, 4)]
    }

    #[test]
    fn entry_format() {
        let entry = format_entry(
            5.0,
            &[BoundingBox::new(10, 20, 30, 60), BoundingBox::new(100, 20, 30, 60)],
        );
        assert_eq!(
            entry,
            "Frame 5: 2 pedestrians detected\n\
             Coordinates: 10, 20, 30, 60\n\
             Coordinates: 100, 20, 30, 60\n"
        );
    }

    #[test]
    fn empty_frames_are_not_logged() {
        let sink = Shared::default();
        let mut log = DetectionLog::new(sink.clone(), 50);
        assert!(!log.record(1.0, &[]).unwrap());
        assert_eq!(log.pending(), 0);
        log.finish().unwrap();
        assert!(sink.text().is_empty());
    }

    #[test]
    fn batch_writes_exactly_at_threshold() {
        let sink = Shared::default();
        let mut log = DetectionLog::new(sink.clone(), 50);
        for i in 1..50 {
            assert!(!log.record(i as f64, &one_box()).unwrap());
        }
        assert_eq!(log.pending(), 49);
        assert!(sink.text().is_empty(), "no partial batch may reach the file");

        assert!(log.record(50.0, &one_box()).unwrap());
        assert_eq!(log.pending(), 0);
        assert_eq!(log.entries_written(), 50);

        let text = sink.text();
        assert!(text.starts_with("Frame 1: 1 pedestrians detected\n"));
        assert!(text.ends_with("Frame 50: 1 pedestrians detected\nCoordinates: 1, 2, 3, 4\n"));
        assert_eq!(text.matches("Frame ").count(), 50);
    }

    #[test]
    fn finish_writes_remainder_in_order() {
        let sink = Shared::default();
        let mut log = DetectionLog::new(sink.clone(), 50);
        log.record(3.0, &one_box()).unwrap();
        log.record(7.0, &one_box()).unwrap();
        log.finish().unwrap();
        let text = sink.text();
        let first = text.find("Frame 3:").unwrap();
        let second = text.find("Frame 7:").unwrap();
        assert!(first < second);
    }

    #[test]
    fn drop_flushes_pending_entries() {
        let sink = Shared::default();
        {
            let mut log = DetectionLog::new(sink.clone(), 10);
            log.record(2.0, &one_box()).unwrap();
        }
        assert!(sink.text().starts_with("Frame 2: 1 pedestrians detected"));
    }

    #[test]
    fn fractional_positions_keep_their_digits() {
        assert!(format_entry(12.5, &one_box()).starts_with("Frame 12.5: 1"));
    }
}
