//! Error taxonomy for the lap logging loop.
//!
//! The loop distinguishes two kinds of non-fatal failure:
//! - `CaptureError`: no frame could be obtained this iteration.
//! - `LapError::Unclassified`: anything else raised while decoding or logging.
//!
//! Cancellation is not an error. Startup failures (bad config, log file not
//! writable) are plain `anyhow::Error`s returned before the loop starts.

use std::fmt;

use thiserror::Error;

/// No frame could be obtained from the capture endpoint.
#[derive(Debug, Error)]
#[error("failed to capture frame from {endpoint}: {reason}")]
pub struct CaptureError {
    pub endpoint: String,
    pub reason: String,
}

impl CaptureError {
    pub fn new(endpoint: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single loop iteration.
#[derive(Debug, Error)]
pub enum LapError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("{0:#}")]
    Unclassified(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_error_names_endpoint() {
        let err = CaptureError::new("http://cam/capture", "connection refused");
        assert_eq!(
            err.to_string(),
            "failed to capture frame from http://cam/capture: connection refused"
        );
    }

    #[test]
    fn anyhow_errors_become_unclassified() {
        use anyhow::Context;

        fn write_entry() -> Result<(), LapError> {
            let io: anyhow::Result<()> = Err(anyhow::anyhow!("disk full"));
            io.context("append lap entry")?;
            Ok(())
        }
        let err = write_entry().unwrap_err();
        assert!(matches!(err, LapError::Unclassified(_)));
        assert_eq!(err.to_string(), "append lap entry: disk full");
    }
}
