//! The codec registry: which formats are recognized, which codecs
//! serve them and where settings come from.
//!
//! A [`CodecRegistry`] is built once by the host and shared by every
//! [`StreamReader`](crate::reader::StreamReader) and
//! [`StreamWriter`](crate::writer::StreamWriter) hanging off it. The
//! detector list is ordered; probing tries candidates front to back.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use segueconfig::Settings;
use tracing::debug;

use crate::ac3::Ac3Format;
use crate::dts::DtsFormat;
use crate::encode::{FrameEncoder, DEFAULT_BITRATE};
use crate::error::CodecError;
use crate::format::{SampleFormat, StreamFormat};
use crate::framing::FrameFormat;
use crate::pipeline::Stage;
use crate::probe::{probe_source, quick_probe};
use crate::source::{FrameSource, DEFAULT_SCAN_WINDOW};

/// Settings key holding the default encode bitrate.
pub const BITRATE_KEY: &str = "bitrate";

/// Builds a decoder for a given source format and integer PCM target.
pub type DecoderFactory =
    Box<dyn Fn(StreamFormat, SampleFormat) -> Result<Box<dyn Stage>, CodecError> + Send + Sync>;

/// Builds a fresh, unconfigured encoder.
pub type EncoderFactory = Box<dyn Fn() -> Result<Box<dyn FrameEncoder>, CodecError> + Send + Sync>;

/// Format detectors, codec factories and settings for one deployment.
pub struct CodecRegistry {
    formats: Vec<Arc<dyn FrameFormat>>,
    decoders: HashMap<&'static str, DecoderFactory>,
    encoder: Option<EncoderFactory>,
    settings: Option<Arc<dyn Settings>>,
    scan_window: usize,
}

impl CodecRegistry {
    /// An empty registry: no detectors, no codecs.
    pub fn new() -> Self {
        CodecRegistry {
            formats: Vec::new(),
            decoders: HashMap::new(),
            encoder: None,
            settings: None,
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }

    /// A registry with the built-in detectors, AC-3 before DTS.
    pub fn with_default_formats() -> Self {
        let mut registry = Self::new();
        registry.push_format(Arc::new(Ac3Format));
        registry.push_format(Arc::new(DtsFormat));
        registry
    }

    /// Appends a detector at the end of the probe order.
    pub fn push_format(&mut self, format: Arc<dyn FrameFormat>) {
        self.formats.push(format);
    }

    /// Registers the decoder factory for the detector named `format`.
    pub fn register_decoder<F>(&mut self, format: &'static str, factory: F)
    where
        F: Fn(StreamFormat, SampleFormat) -> Result<Box<dyn Stage>, CodecError>
            + Send
            + Sync
            + 'static,
    {
        self.decoders.insert(format, Box::new(factory));
    }

    /// Registers the encoder factory used by the write path.
    pub fn set_encoder<F>(&mut self, factory: F)
    where
        F: Fn() -> Result<Box<dyn FrameEncoder>, CodecError> + Send + Sync + 'static,
    {
        self.encoder = Some(Box::new(factory));
    }

    /// Attaches a settings store, consulted for the default bitrate.
    pub fn set_settings(&mut self, settings: Arc<dyn Settings>) {
        self.settings = Some(settings);
    }

    /// Bounds the initial sync scan of every probe.
    pub fn set_scan_window(&mut self, bytes: usize) {
        self.scan_window = bytes;
    }

    /// True when some detector recognizes the file.
    ///
    /// Cheaper than an open: one sync lock and one loaded frame, no
    /// statistics and no decoder lookup.
    pub fn probe(&self, path: impl AsRef<Path>) -> bool {
        self.detect(path).is_some()
    }

    /// Name of the first detector that recognizes the file.
    pub fn detect(&self, path: impl AsRef<Path>) -> Option<&'static str> {
        quick_probe(path.as_ref(), &self.formats, self.scan_window)
    }

    pub(crate) fn open_source(&self, path: &Path) -> Result<FrameSource, CodecError> {
        probe_source(path, &self.formats, self.scan_window)
    }

    pub(crate) fn make_decoder(
        &self,
        format: &'static str,
        source: StreamFormat,
        target: SampleFormat,
    ) -> Result<Box<dyn Stage>, CodecError> {
        let factory = self
            .decoders
            .get(format)
            .ok_or(CodecError::NoDecoder(format))?;
        factory(source, target)
    }

    pub(crate) fn make_encoder(&self) -> Result<Box<dyn FrameEncoder>, CodecError> {
        let factory = self.encoder.as_ref().ok_or(CodecError::NoEncoder)?;
        factory()
    }

    /// The configured bitrate, or [`DEFAULT_BITRATE`] when the store is
    /// absent, the key is missing or the value is unusable.
    pub(crate) fn bitrate_setting(&self) -> u32 {
        let Some(settings) = &self.settings else {
            return DEFAULT_BITRATE;
        };
        let value = settings.get_int(BITRATE_KEY, i64::from(DEFAULT_BITRATE));
        match u32::try_from(value) {
            Ok(bitrate) if bitrate > 0 => bitrate,
            _ => {
                debug!(value, "configured bitrate unusable, using default");
                DEFAULT_BITRATE
            }
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_default_formats()
    }
}
