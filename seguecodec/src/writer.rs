//! Fixed-buffer writes into an encoded audio file.
//!
//! [`StreamWriter`] is the push-side twin of
//! [`StreamReader`](crate::reader::StreamReader): callers hand it PCM
//! bytes in whatever sizes they like, it converts, encodes in whole
//! frames and appends to a raw sink. The output file is only created
//! once the encoder has accepted the stream parameters, so a rejected
//! open leaves nothing behind.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::convert::Converter;
use crate::encode::ENCODE_FRAME_SAMPLES;
use crate::error::CodecError;
use crate::format::{SampleFormat, StreamFormat};
use crate::pipeline::{Pipeline, Stage};
use crate::registry::CodecRegistry;
use crate::sink::RawSink;

struct OpenOutput {
    format: StreamFormat,
    chain: Pipeline,
    sink: RawSink,
}

/// Encodes a caller-paced PCM byte stream into a file.
pub struct StreamWriter {
    registry: Arc<CodecRegistry>,
    state: Option<OpenOutput>,
}

impl StreamWriter {
    /// Creates a closed writer bound to `registry`.
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        StreamWriter {
            registry,
            state: None,
        }
    }

    /// Opens `path` for encoding a stream of `format` PCM.
    ///
    /// `bitrate` overrides the configured default; `None` consults the
    /// registry's settings store and falls back to
    /// [`DEFAULT_BITRATE`](crate::encode::DEFAULT_BITRATE). The encoder
    /// is built and configured before the file is created, so an
    /// unsupported format or rejected bitrate fails without touching
    /// the filesystem.
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        format: StreamFormat,
        bitrate: Option<u32>,
    ) -> Result<(), CodecError> {
        let path = path.as_ref();
        self.close();

        if !format.format.is_pcm() || format.channels() == 0 || format.sample_rate == 0 {
            return Err(CodecError::Unsupported(format!(
                "cannot encode from {} {} at {} Hz",
                format.format.name(),
                format.mask.mode_name(),
                format.sample_rate
            )));
        }

        let bitrate = bitrate.unwrap_or_else(|| self.registry.bitrate_setting());
        let mut encoder = self.registry.make_encoder()?;
        encoder.set_bitrate(bitrate)?;
        encoder.set_input(format.with_format(SampleFormat::Linear))?;

        let sink = RawSink::create(path)?;
        let mut chain = Pipeline::new();
        chain.add_back("convert", Converter::new(ENCODE_FRAME_SAMPLES));
        chain.add_back("encode", encoder);

        debug!(
            path = %path.display(),
            bitrate,
            channels = format.channels(),
            sample_rate = format.sample_rate,
            "output stream open"
        );
        self.state = Some(OpenOutput {
            format,
            chain,
            sink,
        });
        Ok(())
    }

    /// Accepts the next `buf.len()` PCM bytes.
    ///
    /// Buffers need not align with samples or frames. The return value
    /// counts the encoded bytes that reached the sink during this call,
    /// 0 both for calls that only buffered and for a closed writer. An
    /// error mid-call does not acknowledge bytes already flushed.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, CodecError> {
        let Some(out) = self.state.as_mut() else {
            return Ok(0);
        };
        if buf.is_empty() {
            return Ok(0);
        }

        out.chain.process(Chunk::from_slice(out.format, buf))?;
        let mut flushed = 0usize;
        while let Some(chunk) = out.chain.pull()? {
            out.sink.process(&chunk)?;
            flushed += chunk.len();
        }
        trace!(accepted = buf.len(), flushed, "write");
        Ok(flushed)
    }

    /// Finishes the file and closes the writer.
    ///
    /// Audio still short of a whole encoder frame is dropped; the
    /// output only ever contains complete frames.
    pub fn close(&mut self) {
        if let Some(mut out) = self.state.take() {
            out.chain.reset();
            out.sink.close();
            debug!(bytes = out.sink.bytes_written(), "output stream closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// PCM format this writer accepts, unknown while closed.
    pub fn input_format(&self) -> StreamFormat {
        self.state
            .as_ref()
            .map(|s| s.format)
            .unwrap_or(StreamFormat::UNKNOWN)
    }

    /// Encoded bytes written to the current file so far.
    pub fn bytes_written(&self) -> u64 {
        self.state.as_ref().map(|s| s.sink.bytes_written()).unwrap_or(0)
    }
}
