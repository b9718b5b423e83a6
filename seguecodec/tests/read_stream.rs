use std::collections::VecDeque;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::tempdir;

use seguecodec::{
    ChannelLayout, Chunk, CodecError, CodecRegistry, FrameFormat, FrameInfo, SampleFormat, Stage,
    StreamFormat, StreamReader,
};

/// A toy frame format: 2-byte magic, big-endian payload length, frame
/// counter, then a payload that already is little-endian stereo pcm16.
struct PulseFormat;

const PULSE_MAGIC: [u8; 2] = [0x9C, 0x51];
const PULSE_HEADER: usize = 6;

impl FrameFormat for PulseFormat {
    fn name(&self) -> &'static str {
        "pulse"
    }

    fn header_size(&self) -> usize {
        PULSE_HEADER
    }

    fn max_frame_size(&self) -> usize {
        PULSE_HEADER + 8192
    }

    fn parse_header(&self, header: &[u8]) -> Option<FrameInfo> {
        if header.len() < PULSE_HEADER || header[..2] != PULSE_MAGIC {
            return None;
        }
        let len = u16::from_be_bytes([header[2], header[3]]) as usize;
        if len < 8 || len > 8192 || len % 4 != 0 {
            return None;
        }
        Some(FrameInfo {
            format: StreamFormat::new(
                SampleFormat::Compressed("pulse"),
                ChannelLayout::STEREO,
                48_000,
            ),
            frame_size: PULSE_HEADER + len,
            samples: len / 4,
            bitrate: None,
        })
    }
}

/// Decoding a pulse frame is stripping its header. The payload comes
/// out in two uneven chunks to exercise the reader's pending buffer.
struct PulseDecoder {
    out_format: StreamFormat,
    fail_after: Option<usize>,
    frames: usize,
    out: VecDeque<Chunk>,
}

impl PulseDecoder {
    fn boxed(
        target: SampleFormat,
        fail_after: Option<usize>,
    ) -> Result<Box<dyn Stage>, CodecError> {
        if target != SampleFormat::Pcm16 {
            return Err(CodecError::Unsupported(format!(
                "pulse decodes to pcm16 only, not {}",
                target.name()
            )));
        }
        Ok(Box::new(PulseDecoder {
            out_format: StreamFormat::from_pcm_params(16, 2, 48_000).unwrap(),
            fail_after,
            frames: 0,
            out: VecDeque::new(),
        }))
    }
}

impl Stage for PulseDecoder {
    fn process(&mut self, chunk: Chunk) -> Result<(), CodecError> {
        if chunk.format().format != SampleFormat::Compressed("pulse") {
            return Err(CodecError::Decode("not a pulse frame".into()));
        }
        if self.fail_after.is_some_and(|limit| self.frames >= limit) {
            return Err(CodecError::Decode("injected decoder fault".into()));
        }
        self.frames += 1;
        let payload = &chunk.data()[PULSE_HEADER..];
        let split = payload.len() / 3;
        self.out
            .push_back(Chunk::from_slice(self.out_format, &payload[..split]));
        self.out
            .push_back(Chunk::from_slice(self.out_format, &payload[split..]));
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    fn pull(&mut self) -> Result<Option<Chunk>, CodecError> {
        Ok(self.out.pop_front())
    }

    fn reset(&mut self) {
        self.frames = 0;
        self.out.clear();
    }
}

/// A detector that recognises nothing but counts how often it was asked.
struct CountingFormat {
    hits: Arc<AtomicUsize>,
}

impl FrameFormat for CountingFormat {
    fn name(&self) -> &'static str {
        "counted"
    }

    fn header_size(&self) -> usize {
        4
    }

    fn max_frame_size(&self) -> usize {
        64
    }

    fn parse_header(&self, _header: &[u8]) -> Option<FrameInfo> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        None
    }
}

const LENS_CYCLE: [usize; 8] = [512, 1024, 2048, 4096, 1536, 768, 3072, 2560];

fn cycle_lens(count: usize) -> Vec<usize> {
    LENS_CYCLE.iter().cycle().take(count).copied().collect()
}

/// Assembles a pulse file and the pcm16 bytes decoding it must yield.
fn build_pulse(lens: &[usize], salt: u8) -> (Vec<u8>, Vec<u8>) {
    let mut file = Vec::new();
    let mut decoded = Vec::new();
    for (i, &len) in lens.iter().enumerate() {
        file.extend_from_slice(&PULSE_MAGIC);
        file.extend_from_slice(&(len as u16).to_be_bytes());
        file.extend_from_slice(&(i as u16).to_be_bytes());
        for j in 0..len {
            let b = ((i * 31 + j) as u8) ^ salt;
            file.push(b);
            decoded.push(b);
        }
    }
    (file, decoded)
}

fn pulse_registry(fail_after: Option<usize>) -> Arc<CodecRegistry> {
    let mut registry = CodecRegistry::new();
    registry.push_format(Arc::new(PulseFormat));
    registry.register_decoder("pulse", move |_, target| {
        PulseDecoder::boxed(target, fail_after)
    });
    Arc::new(registry)
}

fn read_all(reader: &mut StreamReader, buf_len: usize) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![0u8; buf_len];
    let mut out = Vec::new();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn decodes_the_whole_file_across_odd_reads() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, decoded) = build_pulse(&cycle_lens(64), 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    reader.open(&path)?;

    let mut buf = vec![0u8; 333];
    let mut out = Vec::new();
    let mut short_reads = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if n < buf.len() {
            short_reads += 1;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out.len(), decoded.len());
    assert_eq!(out, decoded);
    assert_eq!(short_reads, 1, "only the final read may come up short");
    assert_eq!(reader.read(&mut buf)?, 0);
    assert_eq!(reader.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn accessors_report_the_locked_stream() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, decoded) = build_pulse(&cycle_lens(64), 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    reader.open(&path)?;

    assert!(reader.is_open());
    assert_eq!(reader.channels(), 2);
    assert_eq!(reader.sample_rate(), 48_000);
    assert_eq!(reader.bits_per_sample(), 16);
    assert_eq!(reader.output_format().format, SampleFormat::Pcm16);
    assert_eq!(
        reader.source_format().format,
        SampleFormat::Compressed("pulse")
    );
    assert_eq!(reader.source_format().mask, ChannelLayout::STEREO);
    assert_eq!(reader.preferred_chunk_size(), 8192 * 2 * 2);
    assert!(reader.description().starts_with("PULSE 2/0 48000 Hz"));
    assert!(reader.description().contains("kbps"));

    // The size estimate comes from measured frame averages; on this
    // periodic stream it should land within a percent of the truth.
    let approx = reader.approx_output_size() as f64;
    let chunk = reader.preferred_chunk_size();
    let out = read_all(&mut reader, chunk)?;
    assert_eq!(out, decoded);
    assert!((approx / decoded.len() as f64 - 1.0).abs() < 0.01);
    Ok(())
}

#[test]
fn reopening_discards_the_previous_stream() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let first = dir.path().join("first.pls");
    let second = dir.path().join("second.pls");
    let (file_a, _) = build_pulse(&cycle_lens(16), 0);
    let (file_b, decoded_b) = build_pulse(&[2048; 12], 0x5A);
    fs::write(&first, &file_a)?;
    fs::write(&second, &file_b)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    reader.open(&first)?;
    let mut buf = vec![0u8; 1000];
    assert_eq!(reader.read(&mut buf)?, 1000);

    // Nothing of the first stream may leak into the second.
    reader.open(&second)?;
    let out = read_all(&mut reader, 4096)?;
    assert_eq!(out, decoded_b);
    Ok(())
}

#[test]
fn decode_errors_do_not_acknowledge_partial_reads() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("faulty.pls");
    let (file, decoded) = build_pulse(&[1024; 8], 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(Some(3)), SampleFormat::Pcm16);
    reader.open(&path)?;

    let mut collected = Vec::new();
    let mut buf = vec![0u8; 512];
    let err = loop {
        match reader.read(&mut buf) {
            Ok(0) => panic!("stream ended without surfacing the decoder fault"),
            Ok(n) => collected.extend_from_slice(&buf[..n]),
            Err(err) => break err,
        }
    };

    // The three good frames came through untouched, the failing call
    // acknowledged nothing.
    assert!(matches!(err, CodecError::Decode(_)));
    assert_eq!(collected.len(), 3 * 1024);
    assert_eq!(collected.as_slice(), &decoded[..3 * 1024]);
    assert!(reader.read(&mut buf).is_err());
    Ok(())
}

#[test]
fn probing_falls_through_rejecting_detectors_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, _) = build_pulse(&cycle_lens(8), 0);
    fs::write(&path, &file)?;

    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = CodecRegistry::new();
    registry.push_format(Arc::new(CountingFormat { hits: hits.clone() }));
    registry.push_format(Arc::new(PulseFormat));
    registry.register_decoder("pulse", |_, target| PulseDecoder::boxed(target, None));

    let mut reader = StreamReader::new(Arc::new(registry), SampleFormat::Pcm16);
    reader.open(&path)?;

    assert!(hits.load(Ordering::Relaxed) > 0, "first candidate was never consulted");
    assert_eq!(
        reader.source_format().format,
        SampleFormat::Compressed("pulse")
    );
    Ok(())
}

#[test]
fn too_short_a_stream_is_not_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("stub.pls");
    let (file, _) = build_pulse(&[1024; 2], 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    assert!(matches!(
        reader.open(&path),
        Err(CodecError::UnknownFormat)
    ));
    assert!(!reader.is_open());
    Ok(())
}

#[test]
fn unrecognised_bytes_are_an_unknown_format() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("noise.bin");
    fs::write(&path, vec![0xAA; 8192])?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    assert!(matches!(
        reader.open(&path),
        Err(CodecError::UnknownFormat)
    ));
    Ok(())
}

#[test]
fn missing_files_surface_as_io_errors() {
    let dir = tempdir().unwrap();
    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    assert!(matches!(
        reader.open(dir.path().join("absent.pls")),
        Err(CodecError::Io(_))
    ));
    assert!(!reader.is_open());
}

#[test]
fn a_format_without_a_decoder_is_a_named_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, _) = build_pulse(&cycle_lens(8), 0);
    fs::write(&path, &file)?;

    let mut registry = CodecRegistry::new();
    registry.push_format(Arc::new(PulseFormat));
    let mut reader = StreamReader::new(Arc::new(registry), SampleFormat::Pcm16);
    assert!(matches!(
        reader.open(&path),
        Err(CodecError::NoDecoder("pulse"))
    ));
    Ok(())
}

#[test]
fn closed_readers_answer_without_a_stream() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, _) = build_pulse(&cycle_lens(8), 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Pcm16);
    let mut buf = [0u8; 16];
    assert!(!reader.is_open());
    assert_eq!(reader.read(&mut buf)?, 0);
    assert!(reader.output_format().is_unknown());
    assert_eq!(reader.description(), "");
    assert_eq!(reader.preferred_chunk_size(), 0);
    assert_eq!(reader.approx_output_size(), 0);
    assert_eq!(reader.bits_per_sample(), 16);

    reader.open(&path)?;
    assert!(reader.is_open());
    reader.close();
    assert!(!reader.is_open());
    assert_eq!(reader.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn non_integer_targets_are_rejected_at_open() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("tone.pls");
    let (file, _) = build_pulse(&cycle_lens(8), 0);
    fs::write(&path, &file)?;

    let mut reader = StreamReader::new(pulse_registry(None), SampleFormat::Linear);
    assert!(matches!(
        reader.open(&path),
        Err(CodecError::Unsupported(_))
    ));
    Ok(())
}
