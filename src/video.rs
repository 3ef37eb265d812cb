// src/video.rs

//! `VideoOutput` ties the surface, the update guard and the change decoder
//! to a [`FrameSink`].
//!
//! The host renderer drives it strictly in sequence on one thread:
//!
//! ```text
//! ensure_size -> begin_update -> write pixels -> end_update(runs)
//! ```
//!
//! `end_update` decodes the change runs against the buffer that was just
//! written and forwards the dirty rows to the sink. Nothing is queued and
//! nothing runs in the background.

use log::{debug, error, info, trace};

use crate::decoder::{publish, PublishStats};
use crate::error::{BusyReason, SurfaceError, SurfaceResult};
use crate::pixel::{self, ModeFlags, Rgb, GRANTED_MODE};
use crate::session::{FrameView, UpdateGuard};
use crate::sink::FrameSink;
use crate::surface::{Generation, PixelSurface, SurfaceStore};

/// What `ensure_size` hands back to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGrant {
    pub generation: Generation,
    pub pitch: usize,
    pub mode: ModeFlags,
}

pub struct VideoOutput<S: FrameSink> {
    store: SurfaceStore,
    guard: UpdateGuard,
    sink: S,
    frames_published: u64,
}

impl<S: FrameSink> VideoOutput<S> {
    pub fn new(sink: S) -> Self {
        Self {
            store: SurfaceStore::new(),
            guard: UpdateGuard::default(),
            sink,
            frames_published: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn surface(&self) -> Option<&PixelSurface> {
        self.store.surface()
    }

    pub fn is_updating(&self) -> bool {
        self.guard.is_open()
    }

    /// Frames for which the sink saw an open/close pair.
    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    /// The presentation mode this output supports for any request.
    pub fn best_mode(&self, requested: ModeFlags) -> ModeFlags {
        pixel::best_mode(requested)
    }

    /// Makes sure the surface is `width` x `height`.
    ///
    /// The sink hears `on_resize` exactly once per actual reallocation.
    /// Resizing while a session is open is refused with `Busy`, since the
    /// renderer may still hold row offsets into the current buffer.
    pub fn ensure_size(&mut self, width: usize, height: usize) -> SurfaceResult<SizeGrant> {
        if self.guard.is_open() && self.store.dimensions() != Some((width, height)) {
            debug!(
                "Refusing resize to {}x{} during an open update session",
                width, height
            );
            return Err(SurfaceError::Busy(BusyReason::SessionOpen));
        }

        let outcome = self.store.ensure_size(width, height).map_err(|err| {
            error!("Surface allocation failed: {}", err);
            err
        })?;
        if outcome.resized {
            self.sink.on_resize(width, height);
        }
        Ok(SizeGrant {
            generation: outcome.generation,
            pitch: outcome.pitch,
            mode: GRANTED_MODE,
        })
    }

    /// Opens an update session and returns a writable view of the surface.
    pub fn begin_update(&mut self) -> SurfaceResult<FrameView<'_>> {
        if self.guard.is_open() {
            debug!("begin_update while a session is open");
            return Err(SurfaceError::Busy(BusyReason::SessionOpen));
        }
        let Some(surface) = self.store.surface_mut() else {
            debug!("begin_update before any surface exists");
            return Err(SurfaceError::Busy(BusyReason::NoSurface));
        };
        self.guard.open()?;
        trace!("Update session opened on generation {:?}", surface.generation());
        Ok(FrameView::new(surface))
    }

    /// Closes the open session, publishing the rows named by `change_runs`.
    ///
    /// Returns `None` when no session was open; that call does nothing.
    /// Absent or empty runs publish nothing. The session is closed in every
    /// case.
    pub fn end_update(&mut self, change_runs: Option<&[u16]>) -> Option<PublishStats> {
        if !self.guard.is_open() {
            trace!("end_update without an open session ignored");
            return None;
        }

        let stats = match (change_runs, self.store.surface()) {
            (Some(runs), Some(surface)) if !runs.is_empty() => {
                let stats = publish(
                    surface.pixels(),
                    surface.pitch(),
                    surface.height(),
                    runs,
                    &mut self.sink,
                );
                self.frames_published += 1;
                stats
            }
            _ => PublishStats::default(),
        };

        self.guard.close();
        trace!(
            "Update session closed: {} spans, {} rows",
            stats.spans,
            stats.rows
        );
        Some(stats)
    }

    /// Palette (indexed colour) updates are not supported by a 32-bit
    /// surface. Always fails.
    pub fn set_palette(&mut self, start: usize, entries: &[Rgb]) -> SurfaceResult<()> {
        error!(
            "Palette update for {} entries at {} refused: indexed colour is unsupported",
            entries.len(),
            start
        );
        Err(SurfaceError::UnsupportedFormat(format!(
            "palette mode ({} entries at index {})",
            entries.len(),
            start
        )))
    }

    /// Host request to reset the screen. The surface keeps its contents.
    pub fn reset_screen(&mut self) {
        info!("Screen reset requested; nothing to do");
    }
}
