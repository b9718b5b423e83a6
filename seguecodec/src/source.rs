//! File-backed frame walker for compressed streams.
//!
//! A [`FrameSource`] pairs a file with one [`FrameFormat`] detector. On
//! open it scans a bounded window for the first frame header and locks
//! on only after a second header confirms the stream, so stray sync
//! words in junk do not pass. After that it hands out whole frames in
//! order, rescanning for sync when the chain breaks mid-file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::error::CodecError;
use crate::format::StreamFormat;
use crate::framing::{FrameFormat, FrameInfo};

/// Default bound on the initial sync scan, in bytes.
pub const DEFAULT_SCAN_WINDOW: usize = 1_000_000;

const READ_CHUNK: usize = 64 * 1024;
const STAT_MAX_FRAMES: usize = 32;
const STAT_MIN_FRAMES: usize = 4;
const MAX_DESCRIPTION: usize = 1024;

/// Averages measured over the first frames of a stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamStats {
    /// Frames the measurement walked.
    pub frames: usize,
    /// Mean frame size in bytes, fractional for padded streams.
    pub avg_frame_size: f64,
    /// Samples per channel per frame.
    pub samples_per_frame: usize,
    /// Measured bitrate in bits per second.
    pub bitrate: u32,
}

/// Reads one compressed stream frame by frame.
pub struct FrameSource {
    file: File,
    detector: Arc<dyn FrameFormat>,
    scan_window: usize,
    file_size: u64,
    start_offset: u64,
    pos: u64,
    first_info: FrameInfo,
    stats: Option<StreamStats>,
    frame_buf: Vec<u8>,
    eof: bool,
}

impl FrameSource {
    /// Opens `path` and locks onto the first confirmed frame of the
    /// detector's format within the first `scan_window` bytes.
    pub fn open(
        path: &Path,
        detector: Arc<dyn FrameFormat>,
        scan_window: usize,
    ) -> Result<Self, CodecError> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let (start_offset, first_info) =
            Self::sync_scan(&mut file, detector.as_ref(), file_size, scan_window)?;
        debug!(
            format = detector.name(),
            offset = start_offset,
            "frame sync locked"
        );
        Ok(FrameSource {
            file,
            detector,
            scan_window,
            file_size,
            start_offset,
            pos: start_offset,
            first_info,
            stats: None,
            frame_buf: Vec::new(),
            eof: false,
        })
    }

    /// Stream parameters declared by the first frame.
    pub fn format(&self) -> StreamFormat {
        self.first_info.format
    }

    /// Name of the detector this source was opened with.
    pub fn format_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Samples per channel in one frame.
    pub fn frame_samples(&self) -> usize {
        self.first_info.samples
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// True once a load has run out of frames. Cleared by [`rewind`](Self::rewind).
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn stats(&self) -> Option<&StreamStats> {
        self.stats.as_ref()
    }

    /// Walks the first frames of the stream and records size and rate
    /// averages, then rewinds. Fails when the stream is too short to
    /// measure, which is what keeps sync flukes out of the probe.
    pub fn collect_stats(&mut self) -> Result<(), CodecError> {
        let header_size = self.detector.header_size();
        let mut header = vec![0u8; header_size];
        let mut pos = self.start_offset;
        let mut frames = 0usize;
        let mut bytes = 0u64;
        let mut samples = 0u64;

        while frames < STAT_MAX_FRAMES {
            let n = Self::read_at(&mut self.file, pos, &mut header)?;
            if n < header_size {
                break;
            }
            let Some(info) = self.detector.parse_header(&header) else {
                break;
            };
            if info.format.sample_rate != self.first_info.format.sample_rate {
                break;
            }
            frames += 1;
            bytes += info.frame_size as u64;
            samples += info.samples as u64;
            pos += info.frame_size as u64;
        }

        if frames < STAT_MIN_FRAMES {
            return Err(CodecError::Decode(format!(
                "only {frames} {} frames found, {STAT_MIN_FRAMES} needed for a stable estimate",
                self.detector.name()
            )));
        }
        if samples == 0 {
            return Err(CodecError::Decode(format!(
                "{} frames declare no samples",
                self.detector.name()
            )));
        }

        let rate = self.first_info.format.sample_rate;
        let stats = StreamStats {
            frames,
            avg_frame_size: bytes as f64 / frames as f64,
            samples_per_frame: (samples / frames as u64) as usize,
            bitrate: (bytes * 8 * u64::from(rate) / samples) as u32,
        };
        debug!(
            format = self.detector.name(),
            frames,
            avg_frame_size = stats.avg_frame_size,
            bitrate = stats.bitrate,
            "stream statistics"
        );
        self.stats = Some(stats);
        self.rewind();
        Ok(())
    }

    /// Loads the next whole frame as a tagged chunk.
    ///
    /// Returns `Ok(None)` at end of stream. A truncated trailing frame
    /// counts as end of stream, not as an error. Garbage between frames
    /// is skipped by rescanning for a header with the locked sample
    /// rate.
    pub fn load_frame(&mut self) -> Result<Option<Chunk>, CodecError> {
        if self.eof {
            return Ok(None);
        }
        let header_size = self.detector.header_size();
        loop {
            self.frame_buf.resize(header_size, 0);
            let pos = self.pos;
            let n = Self::read_at(&mut self.file, pos, &mut self.frame_buf)?;
            if n < header_size {
                self.eof = true;
                return Ok(None);
            }

            let info = self
                .detector
                .parse_header(&self.frame_buf)
                .filter(|i| i.format.sample_rate == self.first_info.format.sample_rate);
            let Some(info) = info else {
                match self.resync()? {
                    Some(found) => {
                        self.pos = found;
                        continue;
                    }
                    None => {
                        self.eof = true;
                        return Ok(None);
                    }
                }
            };

            self.frame_buf.resize(info.frame_size, 0);
            let n = Self::read_at(&mut self.file, pos, &mut self.frame_buf)?;
            if n < info.frame_size {
                // Trailing partial frame, nothing decodable in it.
                self.eof = true;
                return Ok(None);
            }
            self.pos = pos + info.frame_size as u64;
            trace!(
                format = self.detector.name(),
                offset = pos,
                size = info.frame_size,
                "frame loaded"
            );
            return Ok(Some(Chunk::from_slice(info.format, &self.frame_buf)));
        }
    }

    /// Moves the cursor back to the first frame.
    pub fn rewind(&mut self) {
        self.pos = self.start_offset;
        self.eof = false;
    }

    /// Stream length in seconds, estimated from the measured averages.
    /// Zero until [`collect_stats`](Self::collect_stats) has run.
    pub fn duration(&self) -> f64 {
        let Some(stats) = &self.stats else {
            return 0.0;
        };
        let rate = self.first_info.format.sample_rate;
        if rate == 0 || stats.avg_frame_size <= 0.0 {
            return 0.0;
        }
        let payload = (self.file_size - self.start_offset) as f64;
        payload / stats.avg_frame_size * stats.samples_per_frame as f64 / f64::from(rate)
    }

    /// One-line description of the stream, capped at 1024 bytes.
    pub fn describe(&self) -> String {
        let spk = self.first_info.format;
        let mut text = format!(
            "{} {} {} Hz",
            self.detector.name().to_uppercase(),
            spk.mask.mode_name(),
            spk.sample_rate
        );
        let bitrate = self
            .first_info
            .bitrate
            .or_else(|| self.stats.map(|s| s.bitrate));
        if let Some(bps) = bitrate {
            text.push_str(&format!(" {} kbps", bps / 1000));
        }
        let secs = self.duration();
        if secs > 0.0 {
            let minutes = (secs / 60.0) as u64;
            text.push_str(&format!(" {}:{:04.1}", minutes, secs % 60.0));
        }
        if text.len() > MAX_DESCRIPTION {
            let mut end = MAX_DESCRIPTION;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        text
    }

    fn read_at(file: &mut File, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        file.seek(SeekFrom::Start(pos))?;
        let mut total = 0;
        while total < buf.len() {
            let n = file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn fill(file: &mut File, window: &mut Vec<u8>) -> io::Result<usize> {
        let old = window.len();
        window.resize(old + READ_CHUNK, 0);
        let n = file.read(&mut window[old..])?;
        window.truncate(old + n);
        Ok(n)
    }

    fn sync_scan(
        file: &mut File,
        detector: &dyn FrameFormat,
        file_size: u64,
        scan_window: usize,
    ) -> Result<(u64, FrameInfo), CodecError> {
        let header_size = detector.header_size();
        let mut window: Vec<u8> = Vec::new();
        let mut offset = 0usize;
        loop {
            while offset < scan_window && offset + header_size <= window.len() {
                if let Some(locked) =
                    Self::try_lock_at(file, detector, file_size, &mut window, offset)?
                {
                    return Ok(locked);
                }
                offset += 1;
            }
            if offset >= scan_window || window.len() as u64 >= file_size {
                break;
            }
            if Self::fill(file, &mut window)? == 0 {
                break;
            }
        }
        Err(CodecError::Decode(format!(
            "no {} frame sync in the first {} bytes",
            detector.name(),
            scan_window
        )))
    }

    /// Checks whether `offset` starts a frame whose successor confirms
    /// the same stream. Grows the window as needed to see the successor.
    fn try_lock_at(
        file: &mut File,
        detector: &dyn FrameFormat,
        file_size: u64,
        window: &mut Vec<u8>,
        offset: usize,
    ) -> Result<Option<(u64, FrameInfo)>, CodecError> {
        let header_size = detector.header_size();
        let Some(info) = detector.parse_header(&window[offset..]) else {
            return Ok(None);
        };
        if info.frame_size < header_size || info.frame_size > detector.max_frame_size() {
            return Ok(None);
        }

        let next = offset + info.frame_size;
        while window.len() < next + header_size && (window.len() as u64) < file_size {
            if Self::fill(file, window)? == 0 {
                break;
            }
        }

        if next + header_size <= window.len() {
            if let Some(confirm) = detector.parse_header(&window[next..]) {
                if confirm.format.sample_rate == info.format.sample_rate {
                    return Ok(Some((offset as u64, info)));
                }
            }
            Ok(None)
        } else if next as u64 <= file_size {
            // The frame runs to the end of a short file, nothing left
            // to confirm against.
            Ok(Some((offset as u64, info)))
        } else {
            Ok(None)
        }
    }

    fn resync(&mut self) -> Result<Option<u64>, CodecError> {
        debug!(
            format = self.detector.name(),
            pos = self.pos,
            "lost frame sync, rescanning"
        );
        let header_size = self.detector.header_size();
        let rate = self.first_info.format.sample_rate;
        let limit = self.pos + self.scan_window as u64;
        let mut window = vec![0u8; READ_CHUNK];
        let mut pos = self.pos + 1;

        while pos < limit {
            let n = Self::read_at(&mut self.file, pos, &mut window)?;
            if n < header_size {
                return Ok(None);
            }
            for off in 0..=n - header_size {
                if let Some(info) = self.detector.parse_header(&window[off..n]) {
                    if info.format.sample_rate == rate {
                        return Ok(Some(pos + off as u64));
                    }
                }
            }
            pos += (n - header_size + 1) as u64;
        }
        Ok(None)
    }
}
