//! Growable output buffer backed by fixed-size chunks.
//!
//! Bytes are appended into the current chunk until it is full; the full chunk
//! is then frozen into a `bytes::Bytes` and a new chunk of `chunk_size` bytes
//! is allocated. Frozen chunks are shared (not copied) by [`Snapshot`].
//!
//! # Example
//!
//! ```
//! use avro_binary::stream::OutputBuffer;
//!
//! let mut out = OutputBuffer::with_chunk_size(4);
//! out.append(b"hello world").unwrap();
//! out.flush();
//!
//! assert_eq!(out.byte_count(), 11);
//! assert_eq!(out.to_vec(), b"hello world");
//! ```

use bytes::Bytes;

use crate::error::{AvroError, Result};

/// Default chunk size for output buffers (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Append-only byte sink made of fixed-size memory chunks.
#[derive(Debug)]
pub struct OutputBuffer {
    /// Frozen chunks, in append order.
    chunks: Vec<Bytes>,
    /// Chunk currently being filled. Never holds more than `chunk_size` bytes.
    current: Vec<u8>,
    chunk_size: usize,
    byte_count: usize,
}

impl OutputBuffer {
    /// Create an empty buffer with the default 4 KiB chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an empty buffer growing in chunks of `chunk_size` bytes.
    ///
    /// A chunk size of 0 is treated as 1. No memory is allocated until the
    /// first append.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunks: Vec::new(),
            current: Vec::new(),
            chunk_size: chunk_size.max(1),
            byte_count: 0,
        }
    }

    /// The configured chunk size.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total bytes appended since construction or the last reset.
    #[inline]
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Check if nothing has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.byte_count == 0
    }

    /// Append `data` to the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::OutOfMemory`] if a new chunk cannot be allocated.
    /// Nothing of `data` is kept in that case.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.append_all(&[data])
    }

    /// Append several slices as one write: either all of them land or the
    /// buffer is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::OutOfMemory`] if a new chunk cannot be allocated.
    pub fn append_all(&mut self, parts: &[&[u8]]) -> Result<()> {
        let start = self.byte_count;
        for part in parts {
            if let Err(e) = self.extend(part) {
                self.truncate(start);
                return Err(e);
            }
        }
        Ok(())
    }

    fn extend(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            if self.current.capacity() == 0 || self.current.len() == self.chunk_size {
                self.grow()?;
            }

            let room = self.chunk_size - self.current.len();
            let take = room.min(data.len());
            self.current.extend_from_slice(&data[..take]);
            self.byte_count += take;
            data = &data[take..];
        }
        Ok(())
    }

    /// Drop everything appended after the first `len` bytes.
    ///
    /// Does nothing if `len` is not below the byte count. Snapshots taken
    /// earlier keep their contents.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.byte_count {
            return;
        }

        let mut committed = self.byte_count - self.current.len();
        if len >= committed {
            self.current.truncate(len - committed);
        } else {
            self.current = Vec::new();
            while let Some(mut chunk) = self.chunks.pop() {
                committed -= chunk.len();
                if len > committed {
                    chunk.truncate(len - committed);
                    self.chunks.push(chunk);
                    break;
                }
                if len == committed {
                    break;
                }
            }
        }

        tracing::trace!(from = self.byte_count, to = len, "truncated output buffer");
        self.byte_count = len;
    }

    /// Freeze the current chunk (if any) and allocate the next one.
    fn grow(&mut self) -> Result<()> {
        self.commit_current();

        let mut next = Vec::new();
        next.try_reserve_exact(self.chunk_size)
            .map_err(|_| AvroError::OutOfMemory {
                requested: self.chunk_size,
            })?;
        self.current = next;

        tracing::trace!(
            chunk_size = self.chunk_size,
            chunks = self.chunks.len() + 1,
            "allocated output chunk"
        );
        Ok(())
    }

    fn commit_current(&mut self) {
        if !self.current.is_empty() {
            let full = std::mem::take(&mut self.current);
            self.chunks.push(Bytes::from(full));
        }
    }

    /// Commit any partially filled chunk so snapshots can share it.
    ///
    /// Idempotent: a second call without intervening appends does nothing.
    pub fn flush(&mut self) {
        if !self.current.is_empty() {
            self.commit_current();
            tracing::trace!(bytes = self.byte_count, "flushed output buffer");
        }
    }

    /// Take an immutable view of everything appended so far.
    ///
    /// Committed chunks are shared; only an unflushed partial chunk is copied.
    pub fn snapshot(&self) -> Snapshot {
        let mut chunks = self.chunks.clone();
        if !self.current.is_empty() {
            chunks.push(Bytes::copy_from_slice(&self.current));
        }
        Snapshot {
            chunks,
            len: self.byte_count,
        }
    }

    /// Copy all appended bytes into one contiguous vector.
    ///
    /// Does not change the buffer; repeated calls return equal vectors.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.byte_count);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        data.extend_from_slice(&self.current);
        data
    }

    /// Discard all content, keeping the configured chunk size.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.current = Vec::new();
        self.byte_count = 0;
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of an [`OutputBuffer`]'s contents at one point in time.
///
/// Chunk boundaries are kept internally but never exposed.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    chunks: Vec<Bytes>,
    len: usize,
}

impl Snapshot {
    /// Total bytes in the snapshot.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the snapshot holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the snapshot into one contiguous vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }
        data
    }

    pub(crate) fn into_chunks(self) -> Vec<Bytes> {
        self.chunks
    }
}

impl From<Bytes> for Snapshot {
    fn from(bytes: Bytes) -> Self {
        let len = bytes.len();
        let chunks = if bytes.is_empty() { Vec::new() } else { vec![bytes] };
        Self { chunks, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let out = OutputBuffer::new();
        assert!(out.is_empty());
        assert_eq!(out.byte_count(), 0);
        assert_eq!(out.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(out.to_vec().is_empty());
    }

    #[test]
    fn test_append_within_one_chunk() {
        let mut out = OutputBuffer::with_chunk_size(16);
        out.append(b"abc").unwrap();
        out.append(b"def").unwrap();

        assert_eq!(out.byte_count(), 6);
        assert_eq!(out.to_vec(), b"abcdef");
    }

    #[test]
    fn test_append_spans_chunks() {
        let mut out = OutputBuffer::with_chunk_size(3);
        let data: Vec<u8> = (0..=255).collect();
        out.append(&data).unwrap();

        assert_eq!(out.byte_count(), 256);
        assert_eq!(out.to_vec(), data);
        // 85 full chunks frozen, 1 byte still pending
        assert_eq!(out.chunks.len(), 85);
        assert_eq!(out.current.len(), 1);
    }

    #[test]
    fn test_chunk_boundary_exact_fill() {
        let mut out = OutputBuffer::with_chunk_size(4);
        out.append(b"1234").unwrap();
        out.append(b"5678").unwrap();
        out.flush();

        assert_eq!(out.chunks.len(), 2);
        assert!(out.chunks.iter().all(|c| c.len() == 4));
        assert_eq!(out.to_vec(), b"12345678");
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let mut out = OutputBuffer::with_chunk_size(0);
        assert_eq!(out.chunk_size(), 1);
        out.append(b"xyz").unwrap();
        assert_eq!(out.to_vec(), b"xyz");
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut out = OutputBuffer::with_chunk_size(8);
        out.append(b"hello").unwrap();

        out.flush();
        let first = (out.to_vec(), out.byte_count(), out.chunks.len());
        out.flush();
        out.flush();
        let second = (out.to_vec(), out.byte_count(), out.chunks.len());

        assert_eq!(first, second);
    }

    #[test]
    fn test_append_after_flush_continues_stream() {
        let mut out = OutputBuffer::with_chunk_size(8);
        out.append(b"abc").unwrap();
        out.flush();
        out.append(b"def").unwrap();

        assert_eq!(out.byte_count(), 6);
        assert_eq!(out.to_vec(), b"abcdef");
    }

    #[test]
    fn test_snapshot_is_repeatable_and_non_destructive() {
        let mut out = OutputBuffer::with_chunk_size(4);
        out.append(b"snapshot me").unwrap();

        let a = out.snapshot();
        let b = out.snapshot();
        assert_eq!(a.to_vec(), b"snapshot me");
        assert_eq!(a.to_vec(), b.to_vec());
        assert_eq!(a.len(), 11);

        // Snapshot is frozen; later appends do not show up in it
        out.append(b"!").unwrap();
        assert_eq!(a.len(), 11);
        assert_eq!(out.byte_count(), 12);
    }

    #[test]
    fn test_snapshot_shares_committed_chunks() {
        let mut out = OutputBuffer::with_chunk_size(4);
        out.append(b"abcd").unwrap();
        out.flush();

        let snap = out.snapshot();
        let chunks = snap.into_chunks();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ptr(), out.chunks[0].as_ptr());
    }

    #[test]
    fn test_reset_keeps_chunk_size() {
        let mut out = OutputBuffer::with_chunk_size(5);
        out.append(b"some bytes").unwrap();
        out.reset();

        assert!(out.is_empty());
        assert_eq!(out.chunk_size(), 5);
        assert!(out.to_vec().is_empty());
        assert!(out.snapshot().is_empty());

        out.append(b"again").unwrap();
        assert_eq!(out.to_vec(), b"again");
    }

    #[test]
    fn test_truncate_within_current_chunk() {
        let mut out = OutputBuffer::with_chunk_size(8);
        out.append(b"abcdef").unwrap();
        out.truncate(2);

        assert_eq!(out.byte_count(), 2);
        assert_eq!(out.to_vec(), b"ab");
        out.append(b"xy").unwrap();
        assert_eq!(out.to_vec(), b"abxy");
    }

    #[test]
    fn test_truncate_across_committed_chunks() {
        let mut out = OutputBuffer::with_chunk_size(3);
        out.append(b"0123456789").unwrap();
        let before = out.snapshot();

        out.truncate(4);
        assert_eq!(out.byte_count(), 4);
        assert_eq!(out.to_vec(), b"0123");
        assert_eq!(out.snapshot().to_vec(), b"0123");
        assert_eq!(before.to_vec(), b"0123456789");

        out.truncate(3);
        assert_eq!(out.to_vec(), b"012");
        out.append(b"abcd").unwrap();
        assert_eq!(out.to_vec(), b"012abcd");

        out.truncate(100);
        assert_eq!(out.byte_count(), 7);
        out.truncate(0);
        assert!(out.is_empty());
        assert!(out.to_vec().is_empty());
    }

    #[test]
    fn test_failed_append_keeps_nothing() {
        let mut out = OutputBuffer::with_chunk_size(4);
        out.append(b"abc").unwrap();
        out.flush();

        // The next chunk can never be allocated
        out.chunk_size = usize::MAX;
        let err = out.append_all(&[b"d", b"efgh"]).unwrap_err();
        assert!(matches!(err, AvroError::OutOfMemory { .. }));
        assert_eq!(out.byte_count(), 3);
        assert_eq!(out.to_vec(), b"abc");
    }

    #[test]
    fn test_snapshot_from_bytes() {
        let snap = Snapshot::from(Bytes::from_static(b"raw"));
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.to_vec(), b"raw");

        let empty = Snapshot::from(Bytes::new());
        assert!(empty.is_empty());
    }
}
