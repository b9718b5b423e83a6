//! Fixed-buffer reads from compressed audio files.
//!
//! [`StreamReader`] adapts the frame-at-a-time decode pipeline to
//! callers that pull arbitrary byte counts: probe the file, lock a
//! source and decoder, then serve `read` calls from one pending chunk
//! at a time. No decoded byte is produced twice and none is skipped,
//! however the call sizes fall.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::error::CodecError;
use crate::format::{SampleFormat, StreamFormat};
use crate::pipeline::Stage;
use crate::registry::CodecRegistry;
use crate::source::FrameSource;

/// Chunk size hint for pull callers, in samples per channel.
const PREFERRED_CHUNK_SAMPLES: usize = 8192;

struct OpenStream {
    source: FrameSource,
    decoder: Box<dyn Stage>,
    source_format: StreamFormat,
    pending: Chunk,
    description: String,
}

/// Decodes one compressed file into a caller-paced byte stream.
///
/// A reader is bound to a registry and a target PCM format at
/// construction and can open any number of files over its lifetime,
/// one at a time. While closed, reads return 0 and the format
/// accessors report unknown.
pub struct StreamReader {
    registry: Arc<CodecRegistry>,
    target: SampleFormat,
    state: Option<OpenStream>,
}

impl StreamReader {
    /// Creates a closed reader that decodes to `target` PCM.
    pub fn new(registry: Arc<CodecRegistry>, target: SampleFormat) -> Self {
        StreamReader {
            registry,
            target,
            state: None,
        }
    }

    /// Probes `path`, picks its decoder and positions at the first frame.
    ///
    /// Any previously open stream is closed first, even when the open
    /// fails. Fails when no detector accepts the file, when no decoder
    /// is registered for the detected format or when the target PCM
    /// format is not an integer one.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        let path = path.as_ref();
        self.close();

        if !self.target.is_pcm() {
            return Err(CodecError::Unsupported(format!(
                "cannot decode to {}",
                self.target.name()
            )));
        }

        let mut source = self.registry.open_source(path)?;
        let first = source
            .load_frame()?
            .ok_or_else(|| CodecError::Decode("stream has no loadable frame".into()))?;
        let source_format = first.format();
        let decoder =
            self.registry
                .make_decoder(source.format_name(), source_format, self.target)?;
        let description = source.describe();
        source.rewind();

        debug!(
            path = %path.display(),
            format = source.format_name(),
            description,
            "input stream open"
        );
        self.state = Some(OpenStream {
            source,
            decoder,
            source_format,
            pending: Chunk::default(),
            description,
        });
        Ok(())
    }

    /// Fills `buf` with the next decoded bytes.
    ///
    /// Returns the count actually written: `buf.len()` in the steady
    /// state, less at end of stream, 0 once the stream is exhausted or
    /// the reader closed. An error mid-call does not acknowledge bytes
    /// already copied.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let Some(stream) = self.state.as_mut() else {
            return Ok(0);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        let mut out = 0usize;
        loop {
            // Drain the pending chunk first.
            if !stream.pending.is_empty() {
                let n = stream.pending.len().min(buf.len() - out);
                buf[out..out + n].copy_from_slice(&stream.pending.data()[..n]);
                stream.pending.advance(n);
                out += n;
                if out == buf.len() {
                    trace!(requested = buf.len(), returned = out, "read filled");
                    return Ok(out);
                }
            }

            // Then whatever the decoder already has.
            if !stream.decoder.is_empty() {
                if let Some(chunk) = stream.decoder.pull()? {
                    stream.pending = chunk;
                    continue;
                }
            }

            // Then feed it another frame.
            if stream.source.is_eof() {
                trace!(requested = buf.len(), returned = out, "read at end of stream");
                return Ok(out);
            }
            if let Some(frame) = stream.source.load_frame()? {
                stream.decoder.process(frame)?;
            }
        }
    }

    /// Closes the current stream, if any. The reader stays usable.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            debug!("input stream closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Format of the bytes `read` produces, unknown while closed.
    pub fn output_format(&self) -> StreamFormat {
        match &self.state {
            Some(stream) => stream.source_format.with_format(self.target),
            None => StreamFormat::UNKNOWN,
        }
    }

    /// Format of the compressed stream, unknown while closed.
    pub fn source_format(&self) -> StreamFormat {
        match &self.state {
            Some(stream) => stream.source_format,
            None => StreamFormat::UNKNOWN,
        }
    }

    pub fn channels(&self) -> usize {
        self.output_format().channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.output_format().sample_rate
    }

    /// Bit width of the target PCM format.
    pub fn bits_per_sample(&self) -> usize {
        self.target.bits_per_sample()
    }

    /// One-line stream description, empty while closed.
    pub fn description(&self) -> &str {
        self.state
            .as_ref()
            .map(|s| s.description.as_str())
            .unwrap_or("")
    }

    /// Estimated total decoded size in bytes.
    ///
    /// Derived from measured frame averages; treat it as a progress
    /// hint, not a promise.
    pub fn approx_output_size(&self) -> u64 {
        let Some(stream) = &self.state else {
            return 0;
        };
        let spk = self.output_format();
        let samples = (stream.source.duration() * f64::from(spk.sample_rate)) as u64;
        samples * spk.channels() as u64 * spk.sample_size() as u64
    }

    /// Byte count that keeps per-call overhead low for pull callers.
    pub fn preferred_chunk_size(&self) -> usize {
        if self.state.is_none() {
            return 0;
        }
        let spk = self.output_format();
        PREFERRED_CHUNK_SAMPLES * spk.sample_size() * spk.channels()
    }
}
