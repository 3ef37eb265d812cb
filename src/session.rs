// src/session.rs

//! The update guard and the writable view handed out by `begin_update`.
//!
//! The guard is a plain flag, not a lock. It rejects a second logical
//! `begin_update` before the matching `end_update` on the same thread of
//! control; callers driving the pipeline from several threads must
//! serialise access themselves.

use crate::error::{BusyReason, SurfaceError, SurfaceResult};
use crate::pixel::{Rgb, BYTES_PER_PIXEL};
use crate::surface::{Generation, PixelSurface};

/// Tracks whether an update session is open.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    open: bool,
}

impl UpdateGuard {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Opens a session, or reports `Busy` if one is already open.
    pub fn open(&mut self) -> SurfaceResult<()> {
        if self.open {
            return Err(SurfaceError::Busy(BusyReason::SessionOpen));
        }
        self.open = true;
        Ok(())
    }

    /// Closes the session. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }
}

/// Writable view over the current surface for the duration of a session.
///
/// The view borrows the surface, so the buffer cannot be resized while it
/// is alive. Rows are `pitch` bytes apart with no padding.
#[derive(Debug)]
pub struct FrameView<'a> {
    pixels: &'a mut [u8],
    width: usize,
    height: usize,
    pitch: usize,
    generation: Generation,
}

impl<'a> FrameView<'a> {
    pub(crate) fn new(surface: &'a mut PixelSurface) -> Self {
        let (width, height, pitch, generation) = (
            surface.width(),
            surface.height(),
            surface.pitch(),
            surface.generation(),
        );
        Self {
            pixels: surface.pixels_mut(),
            width,
            height,
            pitch,
            generation,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Identity of the buffer this view writes into.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The whole buffer, `height * pitch` bytes.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixels
    }

    /// Row `y`, or `None` past the bottom of the surface.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.pitch;
        self.pixels.get_mut(start..start + self.pitch)
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        if x >= self.width {
            return;
        }
        if let Some(row) = self.row_mut(y) {
            color.write_into(row, x);
        }
    }

    /// Fills row `y` with one colour.
    pub fn fill_row(&mut self, y: usize, color: Rgb) {
        let bytes = color.to_bytes();
        if let Some(row) = self.row_mut(y) {
            for px in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    pub fn fill(&mut self, color: Rgb) {
        for y in 0..self.height {
            self.fill_row(y, color);
        }
    }
}
