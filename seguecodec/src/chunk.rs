//! The unit of data exchanged between pipeline stages.

use bytes::{Buf, Bytes};

use crate::format::StreamFormat;

/// A run of bytes tagged with the format that describes them.
///
/// Chunks are cheap to clone and to shorten from the front: the payload
/// is reference-counted and [`advance`](Chunk::advance) only moves the
/// view, so a consumer can drain a chunk across several calls without
/// copying what remains.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    format: StreamFormat,
    data: Bytes,
}

impl Chunk {
    pub fn new(format: StreamFormat, data: Bytes) -> Self {
        Chunk { format, data }
    }

    /// An empty chunk carrying only a format tag.
    pub fn empty(format: StreamFormat) -> Self {
        Chunk {
            format,
            data: Bytes::new(),
        }
    }

    /// Copies `data` into a new chunk.
    pub fn from_slice(format: StreamFormat, data: &[u8]) -> Self {
        Chunk {
            format,
            data: Bytes::copy_from_slice(data),
        }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_unknown(&self) -> bool {
        self.format.is_unknown()
    }

    /// Drops the first `n` bytes from the front of the chunk.
    ///
    /// # Panics
    ///
    /// Panics if `n` is larger than [`len`](Chunk::len).
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.data.len(), "advance past end of chunk");
        self.data.advance(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{SampleFormat, StreamFormat};

    fn pcm_stereo() -> StreamFormat {
        StreamFormat::from_pcm_params(16, 2, 48_000).unwrap()
    }

    #[test]
    fn advance_narrows_the_view() {
        let mut chunk = Chunk::from_slice(pcm_stereo(), &[1, 2, 3, 4, 5]);
        chunk.advance(2);
        assert_eq!(chunk.data(), &[3, 4, 5]);
        assert_eq!(chunk.len(), 3);
        chunk.advance(3);
        assert!(chunk.is_empty());
        assert_eq!(chunk.format(), pcm_stereo());
    }

    #[test]
    #[should_panic(expected = "advance past end")]
    fn advance_past_end_panics() {
        let mut chunk = Chunk::from_slice(pcm_stereo(), &[1, 2]);
        chunk.advance(3);
    }

    #[test]
    fn clones_share_the_payload() {
        let chunk = Chunk::from_slice(pcm_stereo(), &[9; 64]);
        let mut other = chunk.clone();
        other.advance(60);
        assert_eq!(chunk.len(), 64);
        assert_eq!(other.len(), 4);
    }

    #[test]
    fn empty_chunk_keeps_its_tag() {
        let chunk = Chunk::empty(pcm_stereo());
        assert!(chunk.is_empty());
        assert!(!chunk.is_unknown());
        assert_eq!(chunk.format().format, SampleFormat::Pcm16);
    }
}
