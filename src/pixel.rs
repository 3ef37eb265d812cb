// src/pixel.rs

//! Pixel format and presentation-mode flags shared by the surface and its
//! consumers.
//!
//! The surface stores 4 bytes per pixel in the order red, green, blue, pad.
//! Read as a little-endian `u32`, that is `red | green << 8 | blue << 16`,
//! which is what [`rgb`] composes.

use bitflags::bitflags;

/// Bytes per pixel. Fixed; indexed colour is not supported.
pub const BYTES_PER_PIXEL: usize = 4;

bitflags! {
    /// Capabilities exchanged with the host renderer when it picks a
    /// presentation mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u32 {
        /// 8-bit indexed colour. Never granted.
        const CAN_8      = 1 << 0;
        /// 32-bit RGB pixels.
        const CAN_32     = 1 << 3;
        /// Rows may be written in any order within a session.
        const CAN_RANDOM = 1 << 4;
        /// The surface is owned by the output rather than the renderer.
        const HARDWARE   = 1 << 7;
    }
}

/// The only mode this output can offer, whatever the renderer asks for.
pub fn best_mode(_requested: ModeFlags) -> ModeFlags {
    ModeFlags::CAN_32 | ModeFlags::CAN_RANDOM
}

/// Mode reported back once a surface of the requested size exists.
pub const GRANTED_MODE: ModeFlags = ModeFlags::CAN_32
    .union(ModeFlags::CAN_RANDOM)
    .union(ModeFlags::HARDWARE);

/// Composes a packed pixel value from its channels.
pub fn rgb(red: u8, green: u8, blue: u8) -> u32 {
    u32::from(red) | (u32::from(green) << 8) | (u32::from(blue) << 16)
}

/// Row pitch for a surface `width` pixels wide, or `None` on overflow.
pub fn pitch_for(width: usize) -> Option<usize> {
    width.checked_mul(BYTES_PER_PIXEL)
}

/// A single pixel in surface byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn packed(self) -> u32 {
        rgb(self.red, self.green, self.blue)
    }

    pub fn to_bytes(self) -> [u8; BYTES_PER_PIXEL] {
        self.packed().to_le_bytes()
    }

    /// Writes this pixel at column `x` of `row`. Out of range columns are
    /// ignored.
    pub fn write_into(self, row: &mut [u8], x: usize) {
        let start = x * BYTES_PER_PIXEL;
        if let Some(dst) = row.get_mut(start..start + BYTES_PER_PIXEL) {
            dst.copy_from_slice(&self.to_bytes());
        }
    }
}
