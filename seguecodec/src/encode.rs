//! Encoder-facing surface of the write path.
//!
//! The crate does not pick an encoder itself; hosts register a factory
//! with the [`CodecRegistry`](crate::registry::CodecRegistry) and the
//! writer configures whatever it produces. The contract is small:
//! bitrate first, then input format, then chunks of linear audio in
//! whole-frame blocks.

use crate::format::StreamFormat;
use crate::error::CodecError;
use crate::pipeline::Stage;

/// Bitrate used when the settings store has nothing better.
pub const DEFAULT_BITRATE: u32 = 448_000;

/// Samples per channel the conversion stage feeds an encoder per chunk.
pub const ENCODE_FRAME_SAMPLES: usize = 1536;

/// The nominal bitrate ladder, in bits per second.
///
/// This is a UI allow-list, not a hard limit; an encoder that accepts
/// an off-ladder bitrate is free to use it.
pub const STANDARD_BITRATES: [u32; 19] = [
    32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000, 384_000, 448_000, 512_000, 576_000, 640_000,
];

pub fn is_standard_bitrate(bitrate: u32) -> bool {
    STANDARD_BITRATES.contains(&bitrate)
}

/// A compressing stage with the two knobs the write path turns.
///
/// Both setters run before the first chunk and never after it; a
/// rejected value fails the stream open, leaving no output behind.
pub trait FrameEncoder: Stage {
    /// Sets the target bitrate in bits per second.
    fn set_bitrate(&mut self, bitrate: u32) -> Result<(), CodecError>;

    /// Sets the linear input format the encoder will be fed.
    fn set_input(&mut self, format: StreamFormat) -> Result<(), CodecError>;
}
