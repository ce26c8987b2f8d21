//! Captured frames.
//!
//! - `Frame`: one still image from a capture endpoint, held as 8-bit luma.
//!
//! A frame is owned by a single loop iteration and dropped after decoding.
//! Pixel bytes are private; code readers sample them through `luma_at`.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;

/// Upper bound on frame dimensions accepted from a source.
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// One captured still image.
///
/// Deliberately not `Clone`: a frame lives for exactly one iteration.
pub struct Frame {
    /// Row-major luma samples, `width * height` bytes.
    luma: Vec<u8>,
    pub width: u32,
    pub height: u32,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from row-major 8-bit luma samples.
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame has zero dimension ({}x{})", width, height));
        }
        if width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
            return Err(anyhow!(
                "frame {}x{} exceeds max dimension {}",
                width,
                height,
                MAX_FRAME_DIMENSION
            ));
        }
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(anyhow!(
                "luma buffer has {} bytes; expected {} for {}x{}",
                luma.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            luma,
            width,
            height,
            captured_at: Instant::now(),
        })
    }

    /// Convert a decoded image of any colour type to a luma frame.
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        let gray = image.into_luma8();
        let (width, height) = gray.dimensions();
        Self::from_luma(width, height, gray.into_raw())
    }

    /// Decode an encoded still image (JPEG or PNG) held in memory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("empty image"));
        }
        let image = image::load_from_memory(bytes).context("decode image")?;
        Self::from_image(image)
    }

    /// Luma sample at (x, y). Out-of-range coordinates read as black.
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        if x >= self.width as usize || y >= self.height as usize {
            return 0;
        }
        self.luma
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or(0)
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Time since the frame was captured.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.luma.len()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixels are never printed.
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.byte_len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
