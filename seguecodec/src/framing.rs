//! Frame header detection for self-synchronizing bitstreams.
//!
//! A [`FrameFormat`] knows how to recognize one bitstream family from a
//! frame header alone: where the sync word sits, how big the frame is
//! and what stream parameters the header declares. Detectors are pure
//! parsers. Walking a file with them is the job of
//! [`FrameSource`](crate::source::FrameSource).

use crate::format::StreamFormat;

/// What one parsed frame header declares about its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Stream parameters carried by the header.
    pub format: StreamFormat,
    /// Whole frame size in bytes, header included.
    pub frame_size: usize,
    /// PCM samples per channel encoded in the frame.
    pub samples: usize,
    /// Nominal bitrate in bits per second, when the header declares one.
    pub bitrate: Option<u32>,
}

/// Header parser for one frame-oriented bitstream format.
///
/// `parse_header` must answer from the header bytes alone, without
/// looking at the payload, and must reject anything that is not a
/// plausible frame start. False positives cost a wasted confirmation
/// read during scanning; false negatives lose the stream entirely.
pub trait FrameFormat: Send + Sync {
    /// Short lower-case name, also used to look up a decoder.
    fn name(&self) -> &'static str;

    /// Bytes of header `parse_header` needs to see.
    fn header_size(&self) -> usize;

    /// Upper bound on `frame_size` this format can declare.
    fn max_frame_size(&self) -> usize;

    /// Parses one frame header, `None` when `header` does not start a frame.
    fn parse_header(&self, header: &[u8]) -> Option<FrameInfo>;
}
