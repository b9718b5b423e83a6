//! Ordered format probing.
//!
//! Candidates are tried strictly in list order. A candidate is accepted
//! only after its source both locks onto a frame chain and survives the
//! statistics pass; anything less moves on to the next detector. I/O
//! errors are not a rejection, they abort the whole probe.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::CodecError;
use crate::framing::FrameFormat;
use crate::source::FrameSource;

/// Opens `path` with the first detector whose stream checks out.
pub(crate) fn probe_source(
    path: &Path,
    detectors: &[Arc<dyn FrameFormat>],
    scan_window: usize,
) -> Result<FrameSource, CodecError> {
    for detector in detectors {
        debug!(format = detector.name(), path = %path.display(), "probing");
        let mut source = match FrameSource::open(path, detector.clone(), scan_window) {
            Ok(source) => source,
            Err(CodecError::Io(err)) => return Err(CodecError::Io(err)),
            Err(err) => {
                debug!(format = detector.name(), error = %err, "candidate rejected");
                continue;
            }
        };
        match source.collect_stats() {
            Ok(()) => {
                debug!(format = detector.name(), "probe accepted");
                return Ok(source);
            }
            Err(CodecError::Io(err)) => return Err(CodecError::Io(err)),
            Err(err) => {
                debug!(format = detector.name(), error = %err, "candidate rejected");
            }
        }
    }
    Err(CodecError::UnknownFormat)
}

/// Answers "does any detector recognize this file" without the cost of
/// the statistics pass: sync lock plus one loadable frame is enough.
pub(crate) fn quick_probe(
    path: &Path,
    detectors: &[Arc<dyn FrameFormat>],
    scan_window: usize,
) -> Option<&'static str> {
    for detector in detectors {
        if let Ok(mut source) = FrameSource::open(path, detector.clone(), scan_window) {
            if let Ok(Some(_)) = source.load_frame() {
                return Some(detector.name());
            }
        }
    }
    None
}
