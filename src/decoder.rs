// src/decoder.rs

//! Turns the host's change-run sequence into dirty row spans and forwards
//! them to a [`FrameSink`].
//!
//! The host describes a frame as alternating counts: even positions are
//! rows to skip, odd positions are rows that changed. Decoding happens in
//! two steps so each can be tested alone:
//!
//! 1. [`ChangeRuns`] tags each count as [`ChangeRun::Skip`] or
//!    [`ChangeRun::Copy`] by position.
//! 2. [`DirtyRows`] walks a row cursor over the surface and yields a
//!    [`RowSpan`] for every non-empty copy run that starts inside it.
//!
//! [`publish`] then slices the buffer for each span and drives the sink.

use log::{debug, trace};

use crate::sink::FrameSink;

/// One entry of the change-run sequence, tagged by its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeRun {
    /// Rows unchanged since the previous frame.
    Skip(usize),
    /// Rows that changed and must be forwarded.
    Copy(usize),
}

/// Tags a raw change-run sequence by position parity.
#[derive(Debug, Clone)]
pub struct ChangeRuns<'a> {
    raw: std::iter::Enumerate<std::slice::Iter<'a, u16>>,
}

impl<'a> ChangeRuns<'a> {
    pub fn new(raw: &'a [u16]) -> Self {
        Self {
            raw: raw.iter().enumerate(),
        }
    }
}

impl Iterator for ChangeRuns<'_> {
    type Item = ChangeRun;

    fn next(&mut self) -> Option<ChangeRun> {
        let (index, &count) = self.raw.next()?;
        let count = usize::from(count);
        Some(if index % 2 == 0 {
            ChangeRun::Skip(count)
        } else {
            ChangeRun::Copy(count)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

/// A contiguous block of changed rows: `[start_row, start_row + row_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub start_row: usize,
    pub row_count: usize,
}

impl RowSpan {
    pub fn end_row(&self) -> usize {
        self.start_row + self.row_count
    }

    /// Byte range of this span in a buffer with the given pitch, or `None`
    /// if it does not fit in `usize`.
    pub fn byte_range(&self, pitch: usize) -> Option<std::ops::Range<usize>> {
        let start = self.start_row.checked_mul(pitch)?;
        let end = self.end_row().checked_mul(pitch)?;
        Some(start..end)
    }
}

/// Row-cursor state machine over a tagged run sequence.
///
/// Stops when the cursor reaches `height` (remaining runs are ignored) or
/// the runs run out (the rest of the surface counts as unchanged). Every
/// run consumes its slot, zero-length ones included, so the walk always
/// terminates. A copy run that crosses the bottom edge is clipped to it.
#[derive(Debug, Clone)]
pub struct DirtyRows<I> {
    runs: I,
    height: usize,
    y: usize,
    consumed: usize,
}

impl<I: Iterator<Item = ChangeRun>> DirtyRows<I> {
    pub fn new(runs: I, height: usize) -> Self {
        Self {
            runs,
            height,
            y: 0,
            consumed: 0,
        }
    }

    /// Current row cursor.
    pub fn cursor(&self) -> usize {
        self.y
    }

    /// Number of run entries consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl<I: Iterator<Item = ChangeRun>> Iterator for DirtyRows<I> {
    type Item = RowSpan;

    fn next(&mut self) -> Option<RowSpan> {
        while self.y < self.height {
            let run = self.runs.next()?;
            self.consumed += 1;
            match run {
                ChangeRun::Skip(count) => {
                    self.y = self.y.saturating_add(count);
                }
                ChangeRun::Copy(count) => {
                    let start_row = self.y;
                    let row_count = count.min(self.height - start_row);
                    self.y = self.y.saturating_add(count);
                    if row_count > 0 {
                        return Some(RowSpan {
                            start_row,
                            row_count,
                        });
                    }
                }
            }
        }
        None
    }
}

/// Convenience: dirty spans of a raw sequence over a surface `height` rows
/// tall.
pub fn dirty_rows(raw: &[u16], height: usize) -> DirtyRows<ChangeRuns<'_>> {
    DirtyRows::new(ChangeRuns::new(raw), height)
}

/// What one [`publish`] call forwarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub spans: usize,
    pub rows: usize,
    pub bytes: usize,
    /// `true` when the runs ran out before covering every row.
    pub short: bool,
}

/// Decodes `raw` against `pixels` and drives `sink` with one
/// open / rows... / close frame.
///
/// An empty sequence produces no sink calls at all. A non-empty one always
/// produces the open/close pair, even if no row turned out dirty.
pub fn publish(
    pixels: &[u8],
    pitch: usize,
    height: usize,
    raw: &[u16],
    sink: &mut dyn FrameSink,
) -> PublishStats {
    let mut stats = PublishStats::default();
    if raw.is_empty() {
        return stats;
    }

    sink.on_frame_open();
    let mut rows = dirty_rows(raw, height);
    for span in rows.by_ref() {
        let Some(range) = span.byte_range(pitch) else {
            debug!("Span {:?} overflows the byte range; stopping", span);
            break;
        };
        let Some(bytes) = pixels.get(range) else {
            debug!(
                "Span {:?} lies outside a {} byte buffer; stopping",
                span,
                pixels.len()
            );
            break;
        };
        trace!(
            "Frame rows {}..{} ({} bytes)",
            span.start_row,
            span.end_row(),
            bytes.len()
        );
        sink.on_frame_rows(span.start_row, span.row_count, bytes);
        stats.spans += 1;
        stats.rows += span.row_count;
        stats.bytes += bytes.len();
    }
    sink.on_frame_close();

    if rows.cursor() < height {
        stats.short = true;
        debug!(
            "Change runs covered {} of {} rows ({} entries); treating the rest as unchanged",
            rows.cursor(),
            height,
            rows.consumed()
        );
    } else if rows.consumed() < raw.len() {
        debug!(
            "Ignoring {} change-run entries past the bottom row",
            raw.len() - rows.consumed()
        );
    }
    stats
}
