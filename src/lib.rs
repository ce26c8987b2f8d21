//! QR lap logger
//!
//! Polls a network camera for still frames, decodes QR codes in each frame,
//! and appends every decoded payload with a UTC timestamp to a text log. Built
//! for lap timing at a hobby race track: each car carries a QR plate, the
//! camera watches the start/finish line.
//!
//! # Module Structure
//!
//! - `frame`: captured still image (opaque luma raster)
//! - `ingest`: frame sources (HTTP snapshot/MJPEG, local image file)
//! - `detect`: code readers (QR via rqrr)
//! - `lap_log`: log entry format, append-only writer, reader
//! - `runner`: the poll/decode/log loop and its cancellation
//! - `config`: file + env + CLI configuration
//! - `report`: lap times derived from an existing log

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod lap_log;
pub mod report;
pub mod runner;

pub use detect::{CodeReader, QrCodeReader};
pub use error::{CaptureError, LapError};
pub use frame::Frame;
pub use ingest::{open_source, FileSource, FrameSource};
#[cfg(feature = "ingest-http")]
pub use ingest::HttpSnapshotSource;
pub use lap_log::{read_log, DecodedPayload, LapLog, LogEntry};
pub use report::{build_report, LapReport};
pub use runner::{
    CancelToken, Clock, IterationOutcome, LapLogger, LoggerSettings, LoggerState, LoggerStats,
    SystemClock,
};
