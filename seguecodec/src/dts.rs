//! DTS coherent-acoustics core frame header detection.
//!
//! The core stream is a sequence of frames opened by the 32-bit sync
//! word `0x7FFE8001`. Both 16-bit byte orders are handled; the word-
//! swapped variant found in byte-swapped captures is normalized before
//! parsing. The 14-bits-in-16 packings used on some DVD-Audio rips are
//! not recognized.

use crate::format::{ChannelLayout, SampleFormat, StreamFormat};
use crate::framing::{FrameFormat, FrameInfo};
use crate::util::BitReader;

const SYNC_BE: [u8; 4] = [0x7F, 0xFE, 0x80, 0x01];
const SYNC_LE: [u8; 4] = [0xFE, 0x7F, 0x01, 0x80];
const HEADER_SIZE: usize = 12;
/// FSIZE is 14 bits of `bytes - 1`.
const MAX_FRAME_SIZE: usize = 16_384;

const SAMPLE_RATES: [u32; 16] = [
    0, 8_000, 16_000, 32_000, 0, 0, 11_025, 22_050, 44_100, 0, 0, 12_000, 24_000, 48_000, 0, 0,
];

/// Core bitrates in bits per second, indexed by the 5-bit RATE field.
/// The open, variable and lossless codes carry no usable number.
const BITRATES: [u32; 29] = [
    32_000, 56_000, 64_000, 96_000, 112_000, 128_000, 192_000, 224_000, 256_000, 320_000, 384_000,
    448_000, 512_000, 576_000, 640_000, 768_000, 896_000, 1_024_000, 1_152_000, 1_280_000,
    1_344_000, 1_408_000, 1_411_200, 1_472_000, 1_536_000, 1_920_000, 2_048_000, 3_072_000,
    3_840_000,
];

/// DTS core frame header detector.
pub struct DtsFormat;

impl DtsFormat {
    fn parse_core(header: &[u8]) -> Option<FrameInfo> {
        let mut bits = BitReader::new(header);
        bits.skip(32)?; // sync word
        let _ftype = bits.read(1)?;
        let _deficit = bits.read(5)?;
        let _cpf = bits.read(1)?;
        let nblks = bits.read(7)? as usize;
        let fsize = bits.read(14)? as usize;
        let amode = bits.read(6)?;
        let sfreq = bits.read(4)? as usize;
        let rate = bits.read(5)? as usize;
        bits.skip(10)?; // mixing thru aspf flags
        let lff = bits.read(2)?;

        // Fewer than six PCM blocks or a sub-minimal frame is noise.
        if nblks < 5 || fsize < 95 {
            return None;
        }
        let sample_rate = SAMPLE_RATES[sfreq];
        if sample_rate == 0 {
            return None;
        }

        let mut mask = match amode {
            0 => ChannelLayout::MONO,
            1..=4 => ChannelLayout::STEREO,
            5 => ChannelLayout::STEREO | ChannelLayout::FRONT_CENTER,
            6 => ChannelLayout::STEREO | ChannelLayout::BACK_CENTER,
            7 => {
                ChannelLayout::STEREO | ChannelLayout::FRONT_CENTER | ChannelLayout::BACK_CENTER
            }
            8 => ChannelLayout::QUADRO,
            9 => ChannelLayout::SURROUND,
            _ => return None, // user-defined layouts
        };
        match lff {
            0 => {}
            1 | 2 => mask |= ChannelLayout::LFE,
            _ => return None, // reserved
        }

        Some(FrameInfo {
            format: StreamFormat::new(SampleFormat::Compressed("dts"), mask, sample_rate),
            frame_size: fsize + 1,
            samples: (nblks + 1) * 32,
            bitrate: BITRATES.get(rate).copied(),
        })
    }
}

impl FrameFormat for DtsFormat {
    fn name(&self) -> &'static str {
        "dts"
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn max_frame_size(&self) -> usize {
        MAX_FRAME_SIZE
    }

    fn parse_header(&self, header: &[u8]) -> Option<FrameInfo> {
        if header.len() < HEADER_SIZE {
            return None;
        }
        if header[..4] == SYNC_BE {
            return Self::parse_core(header);
        }
        if header[..4] == SYNC_LE {
            let mut swapped = [0u8; HEADER_SIZE];
            for i in (0..HEADER_SIZE).step_by(2) {
                swapped[i] = header[i + 1];
                swapped[i + 1] = header[i];
            }
            return Self::parse_core(&swapped);
        }
        None
    }
}
