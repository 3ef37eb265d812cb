// src/error.rs

//! Error taxonomy for the video surface pipeline.
//!
//! Every fallible operation in the library returns [`SurfaceResult`]. The
//! binary wraps these in `anyhow` with context, the library never does.

use thiserror::Error;

/// Why a buffer of the requested size could not be installed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationCause {
    /// Width or height was zero.
    #[error("dimensions must be positive")]
    ZeroSized,
    /// `width * height * 4` does not fit in `usize`.
    #[error("buffer size overflows")]
    Overflow,
    /// The allocator refused the request.
    #[error("out of memory")]
    OutOfMemory,
}

/// Why `begin_update` refused to open a session.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    /// A previous session has not been closed with `end_update` yet.
    #[error("an update session is already open")]
    SessionOpen,
    /// No surface exists: `ensure_size` was never called or it failed.
    #[error("no surface has been allocated")]
    NoSurface,
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The pixel buffer could not be sized. Fatal to the rendering path.
    #[error("cannot allocate {width}x{height} surface: {cause}")]
    Allocation {
        width: usize,
        height: usize,
        cause: AllocationCause,
    },

    /// An update session could not be opened, or a resize was attempted
    /// while one is open.
    #[error("surface busy: {0}")]
    Busy(BusyReason),

    /// The host asked for a pixel format this surface cannot hold
    /// (indexed colour / palette mode).
    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid video configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    Unsupported,
    Transient,
    Fatal,
}

impl SurfaceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidConfig(_) => ErrorClass::InvalidInput,
            Self::UnsupportedFormat(_) => ErrorClass::Unsupported,
            Self::Busy(_) => ErrorClass::Transient,
            Self::Allocation { .. } => ErrorClass::Fatal,
        }
    }

    /// A busy surface can be retried next frame; nothing else can.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;
