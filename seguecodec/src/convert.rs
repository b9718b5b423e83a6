//! Integer PCM to linear float conversion.
//!
//! The write path hands the encoder interleaved `f32` in fixed blocks.
//! [`Converter`] takes arbitrarily-cut PCM byte chunks, converts whole
//! sample frames and re-blocks them, carrying bytes of a split sample
//! across calls so callers never have to align their writes.

use tracing::trace;

use crate::chunk::Chunk;
use crate::error::CodecError;
use crate::format::{SampleFormat, StreamFormat};
use crate::pipeline::Stage;

/// Converts integer PCM chunks to interleaved `f32` blocks.
///
/// Emits chunks of exactly `block_samples` samples per channel; a
/// trailing partial block stays buffered until more input arrives and
/// is dropped by [`reset`](Stage::reset).
pub struct Converter {
    block_samples: usize,
    input: Option<StreamFormat>,
    tail: Vec<u8>,
    ready: Vec<f32>,
}

impl Converter {
    pub fn new(block_samples: usize) -> Self {
        Converter {
            block_samples,
            input: None,
            tail: Vec::new(),
            ready: Vec::new(),
        }
    }

    fn block_len(&self) -> usize {
        let channels = self.input.map(|f| f.channels()).unwrap_or(0);
        self.block_samples * channels
    }

    fn convert_tail(&mut self) {
        let Some(input) = self.input else {
            return;
        };
        let bytes_per_frame = input.sample_size() * input.channels();
        let complete = self.tail.len() / bytes_per_frame * bytes_per_frame;
        if complete == 0 {
            return;
        }
        match input.format {
            SampleFormat::Pcm16 => {
                for pair in self.tail[..complete].chunks_exact(2) {
                    let v = i16::from_le_bytes([pair[0], pair[1]]);
                    self.ready.push(f32::from(v) / 32_768.0);
                }
            }
            SampleFormat::Pcm24 => {
                for triple in self.tail[..complete].chunks_exact(3) {
                    let v = (i32::from(triple[2] as i8) << 16)
                        | (i32::from(triple[1]) << 8)
                        | i32::from(triple[0]);
                    self.ready.push(v as f32 / 8_388_608.0);
                }
            }
            SampleFormat::Pcm32 => {
                for quad in self.tail[..complete].chunks_exact(4) {
                    let v = i32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    self.ready.push(v as f32 / 2_147_483_648.0);
                }
            }
            _ => {}
        }
        self.tail.drain(..complete);
    }
}

impl Stage for Converter {
    fn process(&mut self, chunk: Chunk) -> Result<(), CodecError> {
        let format = chunk.format();
        if !format.format.is_pcm() || format.channels() == 0 {
            return Err(CodecError::Unsupported(format!(
                "cannot convert {} to linear",
                format.format.name()
            )));
        }
        match self.input {
            None => self.input = Some(format),
            Some(expected) if expected != format => {
                return Err(CodecError::Unsupported(
                    "input format changed mid-stream".into(),
                ));
            }
            Some(_) => {}
        }

        self.tail.extend_from_slice(chunk.data());
        self.convert_tail();
        trace!(
            bytes = chunk.len(),
            ready = self.ready.len(),
            "converted to linear"
        );
        Ok(())
    }

    fn is_empty(&self) -> bool {
        let block = self.block_len();
        block == 0 || self.ready.len() < block
    }

    fn pull(&mut self) -> Result<Option<Chunk>, CodecError> {
        let block = self.block_len();
        if block == 0 || self.ready.len() < block {
            return Ok(None);
        }
        let input = self.input.ok_or_else(|| {
            CodecError::Unsupported("converter pulled before any input".into())
        })?;
        let samples: Vec<f32> = self.ready.drain(..block).collect();
        let chunk = Chunk::from_slice(
            input.with_format(SampleFormat::Linear),
            bytemuck::cast_slice(&samples),
        );
        Ok(Some(chunk))
    }

    fn reset(&mut self) {
        self.input = None;
        self.tail.clear();
        self.ready.clear();
    }
}
