use anyhow::Result;

use crate::frame::Frame;
use crate::lap_log::DecodedPayload;

/// Code reader trait.
///
/// Implementations are pure functions of the frame: no side effects and no
/// state carried between calls. An empty result means no recognizable code
/// was in view, which is not an error.
pub trait CodeReader {
    /// Reader identifier.
    fn name(&self) -> &'static str;

    /// Decode every code symbol found in `frame`.
    ///
    /// Ordering of multiple payloads is whatever the underlying scan produces.
    fn decode(&self, frame: &Frame) -> Result<Vec<DecodedPayload>>;
}

impl<R: CodeReader + ?Sized> CodeReader for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, frame: &Frame) -> Result<Vec<DecodedPayload>> {
        (**self).decode(frame)
    }
}
