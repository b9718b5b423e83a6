//! # seguecodec
//!
//! Byte-stream adapters for frame-oriented audio codecs.
//!
//! Compressed audio formats like AC-3 and DTS move in whole frames;
//! most file APIs move in bytes. This library bridges the two: it
//! probes files for a recognized frame chain, then serves reads and
//! writes of any size from a frame-at-a-time codec pipeline, with
//! nothing duplicated and nothing dropped at the seams.
//!
//! ## Features
//!
//! - **Size-agnostic I/O**: callers pick their own buffer sizes, the
//!   adapters handle frame and sample alignment
//! - **Ordered probing**: detectors are tried front to back, accepted
//!   only after a confirmed sync lock and a statistics pass
//! - **Pluggable codecs**: decoders and encoders are registered by the
//!   host, the crate ships the framing, probing and plumbing
//! - **Header-only detection**: AC-3 and DTS frame parsers built in
//!
//! ## Example: decode a file in fixed slices
//!
//! ```no_run
//! use std::sync::Arc;
//! use seguecodec::{CodecRegistry, SampleFormat, StreamReader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Hosts add their decoder factories with register_decoder().
//!     let registry = Arc::new(CodecRegistry::with_default_formats());
//!
//!     let mut reader = StreamReader::new(registry, SampleFormat::Pcm16);
//!     reader.open("movie.ac3")?;
//!     println!("{}", reader.description());
//!
//!     let mut buf = vec![0u8; reader.preferred_chunk_size()];
//!     loop {
//!         let n = reader.read(&mut buf)?;
//!         if n == 0 {
//!             break;
//!         }
//!         // hand buf[..n] on
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example: encode PCM pushed in arbitrary pieces
//!
//! ```no_run
//! use std::sync::Arc;
//! use seguecodec::{CodecRegistry, StreamFormat, StreamWriter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Hosts add their encoder factory with set_encoder().
//!     let registry = Arc::new(CodecRegistry::with_default_formats());
//!     let mut writer = StreamWriter::new(registry);
//!
//!     let format = StreamFormat::from_pcm_params(16, 2, 48_000).ok_or("bad format")?;
//!     writer.open("out.ac3", format, None)?;
//!
//!     let pcm: &[u8] = &[/* interleaved samples */];
//!     writer.write(pcm)?;
//!     writer.close();
//!     Ok(())
//! }
//! ```

pub mod ac3;
pub mod chunk;
pub mod convert;
pub mod dts;
pub mod encode;
pub mod error;
pub mod format;
pub mod framing;
pub mod pipeline;
pub mod reader;
pub mod registry;
pub mod sink;
pub mod source;
pub mod writer;
mod probe;
mod util;

pub use ac3::Ac3Format;
pub use chunk::Chunk;
pub use convert::Converter;
pub use dts::DtsFormat;
pub use encode::{
    is_standard_bitrate, FrameEncoder, DEFAULT_BITRATE, ENCODE_FRAME_SAMPLES, STANDARD_BITRATES,
};
pub use error::CodecError;
pub use format::{ChannelLayout, SampleFormat, StreamFormat};
pub use framing::{FrameFormat, FrameInfo};
pub use pipeline::{Pipeline, Stage};
pub use reader::StreamReader;
pub use registry::{CodecRegistry, DecoderFactory, EncoderFactory, BITRATE_KEY};
pub use sink::RawSink;
pub use source::{FrameSource, StreamStats, DEFAULT_SCAN_WINDOW};
pub use writer::StreamWriter;
