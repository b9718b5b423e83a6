//! AC-3 (ATSC A/52) frame header detection.
//!
//! An AC-3 frame starts with the 16-bit sync word `0x0B77`, followed by
//! a CRC, the sample-rate and frame-size codes and the start of the
//! bit stream info block. Everything a scanner needs sits in the first
//! seven bytes. Frames are constant-size for a given stream and always
//! carry 1536 samples per channel.

use crate::format::{ChannelLayout, SampleFormat, StreamFormat};
use crate::framing::{FrameFormat, FrameInfo};
use crate::util::BitReader;

const SYNCWORD: [u8; 2] = [0x0B, 0x77];
const HEADER_SIZE: usize = 8;
/// 640 kbps at 32 kHz, the largest frame the size code can declare.
const MAX_FRAME_SIZE: usize = 3840;
const FRAME_SAMPLES: usize = 1536;

/// Nominal bitrates in kbps, indexed by `frmsizecod >> 1`.
const BITRATE_KBPS: [u32; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

/// AC-3 frame header detector.
pub struct Ac3Format;

impl FrameFormat for Ac3Format {
    fn name(&self) -> &'static str {
        "ac3"
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn max_frame_size(&self) -> usize {
        MAX_FRAME_SIZE
    }

    fn parse_header(&self, header: &[u8]) -> Option<FrameInfo> {
        if header.len() < HEADER_SIZE || header[..2] != SYNCWORD {
            return None;
        }

        let mut bits = BitReader::new(&header[2..]);
        bits.skip(16)?; // crc1
        let fscod = bits.read(2)?;
        let frmsizecod = bits.read(6)? as usize;
        let bsid = bits.read(5)?;
        let _bsmod = bits.read(3)?;
        let acmod = bits.read(3)?;

        // bsid 9 and 10 are the half and quarter sample-rate variants.
        if bsid > 10 || fscod == 3 || frmsizecod >= 38 {
            return None;
        }
        let shift = bsid.saturating_sub(8);

        if (acmod & 1) != 0 && acmod != 1 {
            bits.skip(2)?; // cmixlev
        }
        if (acmod & 4) != 0 {
            bits.skip(2)?; // surmixlev
        }
        if acmod == 2 {
            bits.skip(2)?; // dsurmod
        }
        let lfeon = bits.read(1)? != 0;

        let sample_rate = match fscod {
            0 => 48_000u32,
            1 => 44_100,
            _ => 32_000,
        } >> shift;

        let kbps = BITRATE_KBPS[frmsizecod >> 1] as usize;
        let words = match fscod {
            0 => kbps * 2,
            1 => kbps * 96_000 / 44_100 + (frmsizecod & 1),
            _ => kbps * 3,
        };

        let mut mask = match acmod {
            0 => ChannelLayout::STEREO, // dual mono
            1 => ChannelLayout::MONO,
            2 => ChannelLayout::STEREO,
            3 => ChannelLayout::STEREO | ChannelLayout::FRONT_CENTER,
            4 => ChannelLayout::STEREO | ChannelLayout::BACK_CENTER,
            5 => {
                ChannelLayout::STEREO | ChannelLayout::FRONT_CENTER | ChannelLayout::BACK_CENTER
            }
            6 => ChannelLayout::QUADRO,
            _ => ChannelLayout::SURROUND,
        };
        if lfeon {
            mask |= ChannelLayout::LFE;
        }

        Some(FrameInfo {
            format: StreamFormat::new(SampleFormat::Compressed("ac3"), mask, sample_rate),
            frame_size: words * 2,
            samples: FRAME_SAMPLES,
            bitrate: Some((BITRATE_KBPS[frmsizecod >> 1] * 1000) >> shift),
        })
    }
}
