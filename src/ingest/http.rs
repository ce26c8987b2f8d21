//! HTTP snapshot frame source.
//!
//! This module provides `HttpSnapshotSource` for capturing stills from network
//! cameras such as the ESP32-CAM, which serve either a single JPEG
//! (`/capture`) or a multipart MJPEG stream (`/stream`).
//!
//! Each capture is one GET request:
//! - `multipart/*` responses: the first complete JPEG is cut from the stream,
//!   then the connection is dropped.
//! - anything else: the body is read whole as one encoded image.
//!
//! No connection is kept between captures. The request timeout belongs to the
//! HTTP agent; the loop itself never times a capture out.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::error::CaptureError;
use crate::frame::Frame;

use super::FrameSource;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// Network camera snapshot source.
pub struct HttpSnapshotSource {
    url: String,
    agent: ureq::Agent,
    frame_count: u64,
}

impl HttpSnapshotSource {
    pub fn new(url: Url, timeout: Duration) -> Self {
        // No pooled connections: every capture reconnects.
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .max_idle_connections(0)
            .build();
        Self {
            url: url.to_string(),
            agent,
            frame_count: 0,
        }
    }

    fn fetch_jpeg(&self) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .with_context(|| format!("GET {}", self.url))?;
        let content_type = response.header("Content-Type").unwrap_or("").to_lowercase();
        let reader = response.into_reader();
        if content_type.contains("multipart") {
            // Reader is dropped on return, closing the stream.
            MjpegStream::new(reader).read_next_jpeg()
        } else {
            read_single_image(reader)
        }
    }
}

impl FrameSource for HttpSnapshotSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let bytes = self
            .fetch_jpeg()
            .map_err(|e| CaptureError::new(&self.url, format!("{:#}", e)))?;
        let frame =
            Frame::decode(&bytes).map_err(|e| CaptureError::new(&self.url, format!("{:#}", e)))?;
        self.frame_count += 1;
        log::debug!(
            "captured {}x{} frame #{} from {}",
            frame.width,
            frame.height,
            self.frame_count,
            self.url
        );
        Ok(frame)
    }
}

fn read_single_image<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_JPEG_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .context("read snapshot body")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty snapshot"));
    }
    if bytes.len() > MAX_JPEG_BYTES {
        return Err(anyhow!("snapshot exceeded {} bytes", MAX_JPEG_BYTES));
    }
    Ok(bytes)
}

struct MjpegStream<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: Read> MjpegStream<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended before a complete frame"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                return Err(anyhow!(
                    "no complete jpeg within {} bytes of mjpeg stream",
                    MAX_JPEG_BYTES * 2
                ));
            }
        }
    }
}

/// Locate the first SOI..EOI span in `buffer`.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w[0] == 0xFF && w[1] == 0xD8)?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w[0] == 0xFF && w[1] == 0xD9)?;
    Some((start, start + 2 + end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn finds_first_complete_jpeg() {
        let data = b"--frame\r\n\xFF\xD8abc\xFF\xD9--frame\r\n\xFF\xD8def\xFF\xD9";
        let (start, end) = find_jpeg_bounds(data).expect("bounds");
        assert_eq!(&data[start..end], b"\xFF\xD8abc\xFF\xD9");
    }

    #[test]
    fn incomplete_jpeg_has_no_bounds() {
        assert_eq!(find_jpeg_bounds(b"\xFF\xD8abc"), None);
        assert_eq!(find_jpeg_bounds(b"\xFF\xD9\xFF\xD8"), None);
        assert_eq!(find_jpeg_bounds(b""), None);
    }

    #[test]
    fn mjpeg_stream_yields_frames_in_order() {
        let body = b"--b\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD81\xFF\xD9\r\n--b\r\n\r\n\xFF\xD822\xFF\xD9";
        let mut stream = MjpegStream::new(Cursor::new(body.to_vec()));
        assert_eq!(stream.read_next_jpeg().expect("first"), b"\xFF\xD81\xFF\xD9");
        assert_eq!(stream.read_next_jpeg().expect("second"), b"\xFF\xD822\xFF\xD9");
        assert!(stream.read_next_jpeg().is_err());
    }

    #[test]
    fn single_image_rejects_empty_and_oversized_bodies() {
        assert!(read_single_image(Cursor::new(Vec::new())).is_err());
        assert!(read_single_image(Cursor::new(vec![0u8; MAX_JPEG_BYTES + 1])).is_err());
        assert_eq!(
            read_single_image(Cursor::new(vec![1u8, 2, 3])).expect("body"),
            vec![1, 2, 3]
        );
    }
}
