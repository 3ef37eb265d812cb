// src/sink.rs

//! The consumer side of the pipeline.
//!
//! A [`FrameSink`] receives resize notifications and per-frame dirty rows.
//! Calls arrive synchronously on the thread driving the update pipeline.
//! Handlers must not call back into the [`VideoOutput`](crate::VideoOutput)
//! that is calling them.
//!
//! Three sinks ship with the crate:
//! - [`RecordingSink`] keeps every event, for tests and debugging.
//! - [`LoggingSink`] only logs.
//! - [`MirrorSink`] rebuilds the surface from the deltas, the way a
//!   remote presenter would.

use log::{debug, trace, warn};

use crate::pixel::BYTES_PER_PIXEL;

pub trait FrameSink {
    /// The surface was reallocated. Any previous buffer is invalid.
    fn on_resize(&mut self, width: usize, height: usize);

    /// A frame with at least one change run begins.
    fn on_frame_open(&mut self);

    /// Rows `[start_row, start_row + row_count)` changed. `pixels` holds
    /// exactly `row_count * pitch` bytes in row-major order.
    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]);

    /// The frame opened by the last `on_frame_open` is complete.
    fn on_frame_close(&mut self);
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn on_resize(&mut self, width: usize, height: usize) {
        (**self).on_resize(width, height)
    }

    fn on_frame_open(&mut self) {
        (**self).on_frame_open()
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        (**self).on_frame_rows(start_row, row_count, pixels)
    }

    fn on_frame_close(&mut self) {
        (**self).on_frame_close()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn on_resize(&mut self, width: usize, height: usize) {
        (**self).on_resize(width, height)
    }

    fn on_frame_open(&mut self) {
        (**self).on_frame_open()
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        (**self).on_frame_rows(start_row, row_count, pixels)
    }

    fn on_frame_close(&mut self) {
        (**self).on_frame_close()
    }
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Resize { width: usize, height: usize },
    FrameOpen,
    FrameRows {
        start_row: usize,
        row_count: usize,
        bytes: Vec<u8>,
    },
    FrameClose,
}

/// Records every call, copying the row bytes.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn resizes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.events.iter().filter_map(|e| match e {
            SinkEvent::Resize { width, height } => Some((*width, *height)),
            _ => None,
        })
    }
}

impl FrameSink for RecordingSink {
    fn on_resize(&mut self, width: usize, height: usize) {
        self.events.push(SinkEvent::Resize { width, height });
    }

    fn on_frame_open(&mut self) {
        self.events.push(SinkEvent::FrameOpen);
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        self.events.push(SinkEvent::FrameRows {
            start_row,
            row_count,
            bytes: pixels.to_vec(),
        });
    }

    fn on_frame_close(&mut self) {
        self.events.push(SinkEvent::FrameClose);
    }
}

#[derive(Debug, Default)]
pub struct LoggingSink;

impl FrameSink for LoggingSink {
    fn on_resize(&mut self, width: usize, height: usize) {
        debug!("Sink: resize to {}x{}", width, height);
    }

    fn on_frame_open(&mut self) {
        trace!("Sink: frame open");
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        trace!(
            "Sink: rows {}..{} ({} bytes)",
            start_row,
            start_row + row_count,
            pixels.len()
        );
    }

    fn on_frame_close(&mut self) {
        trace!("Sink: frame close");
    }
}

/// Keeps a full copy of the surface, patched by each frame's dirty rows.
#[derive(Debug, Default)]
pub struct MirrorSink {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    frames: u64,
    rows_received: u64,
    in_frame: bool,
}

impl MirrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pitch(&self) -> usize {
        self.width * BYTES_PER_PIXEL
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Frames closed since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total rows patched since creation.
    pub fn rows_received(&self) -> u64 {
        self.rows_received
    }
}

impl FrameSink for MirrorSink {
    fn on_resize(&mut self, width: usize, height: usize) {
        // The old contents belong to a buffer that no longer exists.
        let Some(len) = width
            .checked_mul(BYTES_PER_PIXEL)
            .and_then(|pitch| pitch.checked_mul(height))
        else {
            warn!("MirrorSink: {}x{} is too large to mirror", width, height);
            self.width = 0;
            self.height = 0;
            self.pixels = Vec::new();
            return;
        };
        self.width = width;
        self.height = height;
        self.pixels = vec![0; len];
    }

    fn on_frame_open(&mut self) {
        if self.in_frame {
            warn!("MirrorSink: frame opened twice without a close");
        }
        self.in_frame = true;
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        let pitch = self.pitch();
        let range = start_row.checked_mul(pitch).and_then(|start| {
            let end = row_count.checked_mul(pitch)?.checked_add(start)?;
            Some(start..end)
        });
        match range.and_then(|r| self.pixels.get_mut(r)) {
            Some(dst) if dst.len() == pixels.len() => {
                dst.copy_from_slice(pixels);
                self.rows_received += row_count as u64;
            }
            _ => warn!(
                "MirrorSink: dropping rows {}..{} ({} bytes) that do not fit a {}x{} mirror",
                start_row,
                start_row.saturating_add(row_count),
                pixels.len(),
                self.width,
                self.height
            ),
        }
    }

    fn on_frame_close(&mut self) {
        self.in_frame = false;
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn mirror_patches_rows_in_place() {
        let mut mirror = MirrorSink::new();
        mirror.on_resize(1, 3);
        assert_eq!(mirror.pixels(), &[0u8; 12]);

        mirror.on_frame_open();
        mirror.on_frame_rows(1, 2, &[1, 1, 1, 0, 2, 2, 2, 0]);
        mirror.on_frame_close();

        assert_eq!(mirror.pixels(), &[0, 0, 0, 0, 1, 1, 1, 0, 2, 2, 2, 0]);
        assert_eq!(mirror.frames(), 1);
        assert_eq!(mirror.rows_received(), 2);
    }

    #[test]
    fn mirror_drops_rows_outside_its_surface() {
        let mut mirror = MirrorSink::new();
        mirror.on_resize(1, 1);
        mirror.on_frame_rows(1, 1, &[9, 9, 9, 0]);
        mirror.on_frame_rows(0, 1, &[9, 9]);
        mirror.on_frame_rows(usize::MAX, 1, &[9, 9, 9, 0]);
        mirror.on_frame_rows(0, usize::MAX, &[9, 9, 9, 0]);
        assert_eq!(mirror.pixels(), &[0u8; 4]);
        assert_eq!(mirror.rows_received(), 0);

        mirror.on_resize(usize::MAX, 2);
        assert_eq!(mirror.dimensions(), (0, 0));
        assert!(mirror.pixels().is_empty());
    }

    fn announce<S: FrameSink>(mut sink: S) {
        sink.on_resize(4, 2);
        sink.on_frame_open();
    }

    #[test]
    fn sinks_can_be_lent_by_reference() {
        let mut recorder = RecordingSink::default();
        announce(&mut recorder);
        announce(Box::new(LoggingSink));
        assert_eq!(recorder.resizes().collect::<Vec<_>>(), vec![(4, 2)]);
        assert_eq!(recorder.events.len(), 2);
    }
}
