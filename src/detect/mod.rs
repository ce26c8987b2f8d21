//! Code readers: turn a captured frame into decoded text payloads.

mod qr;
mod reader;

pub use qr::QrCodeReader;
pub use reader::CodeReader;
