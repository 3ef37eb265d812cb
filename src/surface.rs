// src/surface.rs

//! The `SurfaceStore` owns the pixel buffer the host renderer writes into.
//!
//! A surface is replaced wholesale whenever the requested dimensions change.
//! The previous buffer is released before the new one is allocated, so two
//! generations of the surface are never alive at the same time. Each
//! allocation gets a fresh [`Generation`] that callers can compare to tell
//! buffers apart.

use log::{debug, info};

use crate::error::{AllocationCause, SurfaceError, SurfaceResult};
use crate::pixel::{pitch_for, BYTES_PER_PIXEL};

/// Identity of one allocation of the surface buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One allocation of the surface: dimensions plus the raw bytes.
///
/// `pitch == width * 4` and `pixels.len() == height * pitch` always hold.
#[derive(Debug)]
pub struct PixelSurface {
    width: usize,
    height: usize,
    pitch: usize,
    generation: Generation,
    pixels: Box<[u8]>,
}

impl PixelSurface {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// Outcome of [`SurfaceStore::ensure_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeOutcome {
    pub generation: Generation,
    pub pitch: usize,
    /// `true` when a new buffer was installed by this call.
    pub resized: bool,
}

#[derive(Debug, Default)]
pub struct SurfaceStore {
    surface: Option<PixelSurface>,
    next_generation: u64,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self) -> Option<&PixelSurface> {
        self.surface.as_ref()
    }

    pub(crate) fn surface_mut(&mut self) -> Option<&mut PixelSurface> {
        self.surface.as_mut()
    }

    /// Current `(width, height)`, if a surface exists.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.surface.as_ref().map(|s| (s.width, s.height))
    }

    /// Makes sure a `width` x `height` surface exists.
    ///
    /// Same dimensions as the current surface is the per-frame fast path and
    /// returns the existing buffer untouched. Anything else drops the current
    /// buffer and allocates a zeroed replacement. On failure the store is
    /// left without a surface and the error is returned.
    pub fn ensure_size(&mut self, width: usize, height: usize) -> SurfaceResult<SizeOutcome> {
        if let Some(current) = &self.surface {
            if current.width == width && current.height == height {
                return Ok(SizeOutcome {
                    generation: current.generation,
                    pitch: current.pitch,
                    resized: false,
                });
            }
        }

        // Release the old generation before sizing the new one. A failed
        // resize leaves the store empty so no stale buffer can be updated.
        if let Some(old) = self.surface.take() {
            debug!(
                "Releasing {}x{} surface (generation {})",
                old.width, old.height, old.generation.0
            );
        }

        let alloc_error = |cause| SurfaceError::Allocation {
            width,
            height,
            cause,
        };
        if width == 0 || height == 0 {
            return Err(alloc_error(AllocationCause::ZeroSized));
        }
        let pitch = pitch_for(width).ok_or(alloc_error(AllocationCause::Overflow))?;
        let len = height
            .checked_mul(pitch)
            .ok_or(alloc_error(AllocationCause::Overflow))?;

        let pixels = allocate_zeroed(len).ok_or(alloc_error(AllocationCause::OutOfMemory))?;
        let generation = Generation(self.next_generation);
        self.next_generation += 1;

        info!(
            "Allocated {}x{} surface: pitch {} bytes, {} bytes total, generation {}",
            width, height, pitch, len, generation.0
        );
        debug_assert_eq!(pitch, width * BYTES_PER_PIXEL);

        self.surface = Some(PixelSurface {
            width,
            height,
            pitch,
            generation,
            pixels,
        });
        Ok(SizeOutcome {
            generation,
            pitch,
            resized: true,
        })
    }
}

/// Allocates `len` zero bytes, reporting failure instead of aborting.
fn allocate_zeroed(len: usize) -> Option<Box<[u8]>> {
    let mut bytes: Vec<u8> = Vec::new();
    bytes.try_reserve_exact(len).ok()?;
    bytes.resize(len, 0);
    Some(bytes.into_boxed_slice())
}
