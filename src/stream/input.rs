//! Read-only input buffer with a sequential cursor.
//!
//! An [`InputBuffer`] either borrows caller memory (`&'a [u8]`) or owns the
//! chunks of an output [`Snapshot`]. Reads never reorder or skip bytes, and a
//! read that asks for more than what remains fails without moving the cursor.

use bytes::Bytes;

use super::output::{OutputBuffer, Snapshot};
use crate::error::{AvroError, Result};

#[derive(Debug, Clone)]
enum Source<'a> {
    Borrowed(&'a [u8]),
    Shared(Vec<Bytes>),
}

/// Saved cursor position, used to undo a partially completed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    chunk: usize,
    offset: usize,
    consumed: usize,
}

/// Sequential byte source for the decoder.
#[derive(Debug, Clone)]
pub struct InputBuffer<'a> {
    source: Source<'a>,
    chunk: usize,
    offset: usize,
    consumed: usize,
    len: usize,
}

impl<'a> InputBuffer<'a> {
    /// Wrap caller-owned memory. The buffer cannot outlive `data`.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            len: data.len(),
            source: Source::Borrowed(data),
            chunk: 0,
            offset: 0,
            consumed: 0,
        }
    }

    /// Total length of the underlying data.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the underlying data is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.consumed
    }

    /// Number of unread bytes.
    #[inline]
    pub fn bytes_remaining(&self) -> usize {
        self.len - self.consumed
    }

    /// Save the cursor.
    #[inline]
    pub fn mark(&self) -> Mark {
        Mark {
            chunk: self.chunk,
            offset: self.offset,
            consumed: self.consumed,
        }
    }

    /// Move the cursor back to a previously saved mark.
    #[inline]
    pub fn restore(&mut self, mark: Mark) {
        self.chunk = mark.chunk;
        self.offset = mark.offset;
        self.consumed = mark.consumed;
    }

    fn current_chunk(&self) -> &[u8] {
        match &self.source {
            Source::Borrowed(data) if self.chunk == 0 => *data,
            Source::Borrowed(_) => &[][..],
            Source::Shared(chunks) => chunks.get(self.chunk).map_or(&[][..], |c| &c[..]),
        }
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.bytes_remaining();
        if needed > remaining {
            return Err(AvroError::TruncatedInput { needed, remaining });
        }
        Ok(())
    }

    /// Fill `dst` with the next `dst.len()` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::TruncatedInput`] if fewer bytes remain; the cursor
    /// is left untouched in that case.
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure(dst.len())?;

        let mut filled = 0;
        while filled < dst.len() {
            let (n, exhausted) = {
                let available = &self.current_chunk()[self.offset..];
                let n = available.len().min(dst.len() - filled);
                dst[filled..filled + n].copy_from_slice(&available[..n]);
                (n, n == available.len())
            };
            self.offset += n;
            self.consumed += n;
            filled += n;
            if exhausted {
                self.chunk += 1;
                self.offset = 0;
            }
        }
        Ok(())
    }

    /// Read exactly `n` bytes into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::TruncatedInput`] if fewer than `n` bytes remain.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut data = vec![0u8; n];
        self.read_into(&mut data)?;
        Ok(data)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_into(&mut byte)?;
        Ok(byte[0])
    }

    /// Advance the cursor by `n` bytes without copying them.
    pub fn skip(&mut self, mut n: usize) -> Result<()> {
        self.ensure(n)?;
        while n > 0 {
            let available = self.current_chunk().len() - self.offset;
            let step = available.min(n);
            self.offset += step;
            self.consumed += step;
            n -= step;
            if step == available {
                self.chunk += 1;
                self.offset = 0;
            }
        }
        Ok(())
    }
}

impl InputBuffer<'static> {
    /// Take ownership of a snapshot's chunks (no byte copies).
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let len = snapshot.len();
        Self {
            source: Source::Shared(snapshot.into_chunks()),
            chunk: 0,
            offset: 0,
            consumed: 0,
            len,
        }
    }

    /// Snapshot the current contents of an output buffer.
    pub fn from_output(out: &OutputBuffer) -> Self {
        Self::from_snapshot(out.snapshot())
    }
}

impl<'a> From<&'a [u8]> for InputBuffer<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<Snapshot> for InputBuffer<'static> {
    fn from(snapshot: Snapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}
