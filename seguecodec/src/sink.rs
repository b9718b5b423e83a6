//! Raw file sink for encoded output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, trace};

use crate::chunk::Chunk;
use crate::error::CodecError;

/// Appends chunk payloads to a file, as-is.
///
/// The sink writes exactly the bytes it is handed, no container and no
/// padding, which is the natural shipping format for self-framing
/// bitstreams.
pub struct RawSink {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl RawSink {
    /// Creates (or truncates) `path` and opens it for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        debug!(path = %path.display(), "output file created");
        Ok(RawSink {
            path,
            out: Some(BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.out.is_some()
    }

    /// Total payload bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes one chunk's payload.
    pub fn process(&mut self, chunk: &Chunk) -> Result<(), CodecError> {
        let Some(out) = self.out.as_mut() else {
            return Err(CodecError::Unsupported("sink is closed".into()));
        };
        out.write_all(chunk.data())?;
        self.bytes_written += chunk.len() as u64;
        trace!(bytes = chunk.len(), total = self.bytes_written, "sink write");
        Ok(())
    }

    /// Flushes and closes the file. Harmless to call twice.
    pub fn close(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(err) = out.flush() {
                error!(path = %self.path.display(), error = %err, "flush on close failed");
            }
            debug!(
                path = %self.path.display(),
                bytes = self.bytes_written,
                "output file closed"
            );
        }
    }
}

impl Drop for RawSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::StreamFormat;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_payloads_verbatim() -> Result<(), CodecError> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.raw");
        let mut sink = RawSink::create(&path)?;

        sink.process(&Chunk::from_slice(StreamFormat::UNKNOWN, &[1, 2, 3]))?;
        sink.process(&Chunk::from_slice(StreamFormat::UNKNOWN, &[4, 5]))?;
        assert_eq!(sink.bytes_written(), 5);
        sink.close();
        assert!(!sink.is_open());

        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn writing_after_close_is_an_error() -> Result<(), CodecError> {
        let dir = tempdir().unwrap();
        let mut sink = RawSink::create(dir.path().join("out.raw"))?;
        sink.close();
        assert!(sink
            .process(&Chunk::from_slice(StreamFormat::UNKNOWN, &[1]))
            .is_err());
        Ok(())
    }
}
