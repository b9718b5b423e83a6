//! Stream format descriptors shared by every part of the pipeline.
//!
//! A [`StreamFormat`] names what the bytes of a chunk are: how samples are
//! encoded, which channels are present and the sample rate. Compressed
//! streams carry the bitstream name of their framing instead of a sample
//! width.

use bitflags::bitflags;

/// Sample encoding of a stream.
///
/// Integer PCM is interleaved little-endian. `Linear` is interleaved
/// `f32` in the nominal -1.0..=1.0 range, the working format between
/// conversion and encoding. `Compressed` tags frames of the named
/// bitstream, sized by a frame header rather than a sample width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Unknown,
    Pcm16,
    Pcm24,
    Pcm32,
    Linear,
    Compressed(&'static str),
}

impl SampleFormat {
    /// Bytes per sample, or 0 when the encoding has no fixed width.
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::Pcm16 => 2,
            SampleFormat::Pcm24 => 3,
            SampleFormat::Pcm32 => 4,
            SampleFormat::Linear => 4,
            SampleFormat::Unknown | SampleFormat::Compressed(_) => 0,
        }
    }

    /// Bits per sample, or 0 when the encoding has no fixed width.
    pub fn bits_per_sample(&self) -> usize {
        match self {
            SampleFormat::Pcm16 => 16,
            SampleFormat::Pcm24 => 24,
            SampleFormat::Pcm32 | SampleFormat::Linear => 32,
            SampleFormat::Unknown | SampleFormat::Compressed(_) => 0,
        }
    }

    /// True for the integer PCM encodings.
    pub fn is_pcm(&self) -> bool {
        matches!(
            self,
            SampleFormat::Pcm16 | SampleFormat::Pcm24 | SampleFormat::Pcm32
        )
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, SampleFormat::Linear)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::Unknown => "unknown",
            SampleFormat::Pcm16 => "pcm16",
            SampleFormat::Pcm24 => "pcm24",
            SampleFormat::Pcm32 => "pcm32",
            SampleFormat::Linear => "linear",
            SampleFormat::Compressed(tag) => tag,
        }
    }
}

bitflags! {
    /// Channel mask. One bit per speaker position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelLayout: u16 {
        const FRONT_LEFT     = 1 << 0;
        const FRONT_CENTER   = 1 << 1;
        const FRONT_RIGHT    = 1 << 2;
        const SURROUND_LEFT  = 1 << 3;
        const SURROUND_RIGHT = 1 << 4;
        const BACK_CENTER    = 1 << 5;
        const LFE            = 1 << 6;

        const MONO     = Self::FRONT_CENTER.bits();
        const STEREO   = Self::FRONT_LEFT.bits() | Self::FRONT_RIGHT.bits();
        const QUADRO   = Self::STEREO.bits()
                       | Self::SURROUND_LEFT.bits()
                       | Self::SURROUND_RIGHT.bits();
        const SURROUND = Self::STEREO.bits() | Self::FRONT_CENTER.bits()
                       | Self::SURROUND_LEFT.bits()
                       | Self::SURROUND_RIGHT.bits();
        const MODE_5_1 = Self::SURROUND.bits() | Self::LFE.bits();
    }
}

impl ChannelLayout {
    /// Number of channels in the mask.
    pub fn count(&self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Front/surround notation for the mask, `3/2+SW` style.
    pub fn mode_name(&self) -> String {
        let front = ChannelLayout::FRONT_LEFT | ChannelLayout::FRONT_CENTER | ChannelLayout::FRONT_RIGHT;
        let rear = ChannelLayout::SURROUND_LEFT | ChannelLayout::SURROUND_RIGHT | ChannelLayout::BACK_CENTER;
        let f = self.intersection(front).count();
        let r = self.intersection(rear).count();
        if self.contains(ChannelLayout::LFE) {
            format!("{f}/{r}+SW")
        } else {
            format!("{f}/{r}")
        }
    }
}

/// Full description of a stream: encoding, channel mask and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub format: SampleFormat,
    pub mask: ChannelLayout,
    pub sample_rate: u32,
}

impl StreamFormat {
    /// Sentinel for "format not known yet".
    pub const UNKNOWN: StreamFormat = StreamFormat {
        format: SampleFormat::Unknown,
        mask: ChannelLayout::empty(),
        sample_rate: 0,
    };

    pub fn new(format: SampleFormat, mask: ChannelLayout, sample_rate: u32) -> Self {
        StreamFormat {
            format,
            mask,
            sample_rate,
        }
    }

    /// Builds an integer PCM format from a WAV-style parameter triple.
    ///
    /// Returns `None` for sample widths other than 16/24/32 bits, for
    /// channel counts without a standard layout (only 1, 2, 4, 5 and 6
    /// are mapped) and for a zero sample rate.
    pub fn from_pcm_params(bits: u16, channels: u16, sample_rate: u32) -> Option<Self> {
        let format = match bits {
            16 => SampleFormat::Pcm16,
            24 => SampleFormat::Pcm24,
            32 => SampleFormat::Pcm32,
            _ => return None,
        };
        let mask = match channels {
            1 => ChannelLayout::MONO,
            2 => ChannelLayout::STEREO,
            4 => ChannelLayout::QUADRO,
            5 => ChannelLayout::SURROUND,
            6 => ChannelLayout::MODE_5_1,
            _ => return None,
        };
        if sample_rate == 0 {
            return None;
        }
        Some(StreamFormat::new(format, mask, sample_rate))
    }

    pub fn is_unknown(&self) -> bool {
        self.format == SampleFormat::Unknown
    }

    pub fn channels(&self) -> usize {
        self.mask.count()
    }

    /// Bytes per sample of the encoding, 0 for compressed streams.
    pub fn sample_size(&self) -> usize {
        self.format.sample_size()
    }

    /// Same stream parameters with a different sample encoding.
    pub fn with_format(self, format: SampleFormat) -> Self {
        StreamFormat { format, ..self }
    }
}

impl Default for StreamFormat {
    fn default() -> Self {
        StreamFormat::UNKNOWN
    }
}
