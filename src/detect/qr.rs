//! QR code reader backed by `rqrr`.

use anyhow::Result;

use crate::frame::Frame;
use crate::lap_log::DecodedPayload;

use super::reader::CodeReader;

/// Finds and decodes QR symbols in a luma frame.
///
/// A grid that is located but fails to decode (motion blur, partial
/// occlusion) is skipped rather than failing the whole frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrCodeReader;

impl QrCodeReader {
    pub fn new() -> Self {
        Self
    }
}

impl CodeReader for QrCodeReader {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn decode(&self, frame: &Frame) -> Result<Vec<DecodedPayload>> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width as usize,
            frame.height as usize,
            |x, y| frame.luma_at(x, y),
        );
        let grids = prepared.detect_grids();
        let mut payloads = Vec::with_capacity(grids.len());
        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => payloads.push(DecodedPayload::new(content)),
                Err(err) => log::debug!("skipping undecodable qr grid: {}", err),
            }
        }
        Ok(payloads)
    }
}
