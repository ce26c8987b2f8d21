//! Frame sources.
//!
//! This module provides sources for still frames:
//! - HTTP snapshot / MJPEG endpoints (feature: ingest-http), e.g. an ESP32-CAM
//! - Local image files refreshed by some other process
//!
//! A source opens and releases its underlying resource on every capture.
//! Nothing is kept open between calls, so each capture pays the full
//! reconnect cost.

mod file;
#[cfg(feature = "ingest-http")]
pub mod http;

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::CaptureError;
use crate::frame::Frame;

pub use file::FileSource;
#[cfg(feature = "ingest-http")]
pub use http::HttpSnapshotSource;

/// Produces one still frame per call.
pub trait FrameSource {
    /// Endpoint this source captures from, for operator messages.
    fn endpoint(&self) -> &str;

    /// Capture the most recent frame available at the endpoint.
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}

/// Pick a source for `endpoint` based on its scheme.
///
/// `http(s)://` goes to the HTTP source; `file://` URLs and plain paths go to
/// the file source. Anything else is rejected at startup.
pub fn open_source(endpoint: &str, capture_timeout: Duration) -> Result<Box<dyn FrameSource>> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(anyhow!("capture endpoint is empty"));
    }
    if !endpoint.contains("://") {
        return Ok(Box::new(FileSource::new(PathBuf::from(endpoint))));
    }

    let url = Url::parse(endpoint).with_context(|| format!("parse endpoint {}", endpoint))?;
    match url.scheme() {
        "http" | "https" => open_http(url, capture_timeout),
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| anyhow!("file endpoint {} is not a local path", endpoint))?;
            Ok(Box::new(FileSource::new(path)))
        }
        other => Err(anyhow!(
            "unsupported endpoint scheme '{}'; expected http(s), file, or a local path",
            other
        )),
    }
}

#[cfg(feature = "ingest-http")]
fn open_http(url: Url, capture_timeout: Duration) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(HttpSnapshotSource::new(url, capture_timeout)))
}

#[cfg(not(feature = "ingest-http"))]
fn open_http(_url: Url, _capture_timeout: Duration) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!("http endpoints require the ingest-http feature"))
}
