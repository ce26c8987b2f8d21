//! Local image file source.
//!
//! `FileSource` re-reads a still image from disk on every capture. This covers
//! cameras (or capture daemons) that drop their latest snapshot into a shared
//! directory, and replaying a saved frame when testing a track setup.
//!
//! The file is opened and closed inside each `capture` call.

use std::path::PathBuf;

use crate::error::CaptureError;
use crate::frame::Frame;

use super::FrameSource;

/// Largest image file accepted from disk.
const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub struct FileSource {
    path: PathBuf,
    endpoint: String,
    frame_count: u64,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        let endpoint = path.display().to_string();
        Self {
            path,
            endpoint,
            frame_count: 0,
        }
    }
}

impl FrameSource for FileSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let metadata = std::fs::metadata(&self.path)
            .map_err(|e| CaptureError::new(&self.endpoint, format!("stat image: {}", e)))?;
        if metadata.len() > MAX_IMAGE_BYTES {
            return Err(CaptureError::new(
                &self.endpoint,
                format!("image is {} bytes; max {}", metadata.len(), MAX_IMAGE_BYTES),
            ));
        }
        let bytes = std::fs::read(&self.path)
            .map_err(|e| CaptureError::new(&self.endpoint, format!("read image: {}", e)))?;
        let frame =
            Frame::decode(&bytes).map_err(|e| CaptureError::new(&self.endpoint, format!("{:#}", e)))?;
        self.frame_count += 1;
        log::debug!(
            "captured {}x{} frame #{} from {}",
            frame.width,
            frame.height,
            self.frame_count,
            self.endpoint
        );
        Ok(frame)
    }
}
