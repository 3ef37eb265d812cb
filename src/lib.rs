// src/lib.rs

//! Delta-publishing video surface for an emulator host.
//!
//! A renderer writes full frames into a surface owned by [`VideoOutput`];
//! on `end_update` the host's change-run sequence is decoded into dirty row
//! spans and forwarded to a [`FrameSink`]. See [`video`] for the call
//! sequence and [`decoder`] for the run format.

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod pixel;
pub mod session;
pub mod sink;
pub mod surface;
pub mod video;

pub use decoder::{ChangeRun, PublishStats, RowSpan};
pub use error::{BusyReason, ErrorClass, SurfaceError, SurfaceResult};
pub use pixel::{ModeFlags, Rgb};
pub use session::FrameView;
pub use sink::{FrameSink, LoggingSink, MirrorSink, RecordingSink, SinkEvent};
pub use surface::Generation;
pub use video::{SizeGrant, VideoOutput};
