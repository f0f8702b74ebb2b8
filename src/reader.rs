// Fixed-size window reader.
//
// ChunkReader walks a ByteSource front to back in windows of at most
// `chunk_size` bytes. It owns the only offset counter of a run and a single
// reusable window buffer, so the read path never holds more than one chunk.

use std::io;

use crate::source::ByteSource;

/// Default window size: 64 KiB.
pub const CHUNK_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A source read failed.
#[derive(Debug, thiserror::Error)]
#[error("read failed at offset {offset}: {source}")]
pub struct ReadError {
    /// Offset of the window that could not be read.
    pub offset: u64,
    #[source]
    pub source: io::Error,
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One window of the source, borrowed from the reader's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Window contents. Shorter than the chunk size only for the last window.
    pub data: &'a [u8],
    /// Offset of the first byte of this window.
    pub start: u64,
    /// Offset after this window (the reader's new offset).
    pub end: u64,
    /// Index of this window within the run, starting at 0.
    pub index: u64,
    /// True when `end` has reached the source size.
    pub is_last: bool,
}

impl Chunk<'_> {
    /// Number of bytes in this window.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Sequential window reader over a `ByteSource`.
///
/// Invariants:
/// - the sum of all delivered chunk lengths equals `offset()`;
/// - `offset()` never decreases;
/// - exactly one chunk has `is_last == true`, and it is the final one
///   delivered (a zero-length source yields a single empty last chunk);
/// - after a read error, no further reads are attempted.
#[derive(Debug)]
pub struct ChunkReader<S: ByteSource> {
    source: S,
    size: u64,
    offset: u64,
    chunk_size: usize,
    chunks_read: u64,
    done: bool,
    buf: Vec<u8>,
}

impl<S: ByteSource> ChunkReader<S> {
    /// Create a reader that yields windows of `chunk_size` bytes.
    ///
    /// `chunk_size` must be non-zero; the pipeline validates this before
    /// constructing a reader.
    pub fn new(source: S, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk_size must be non-zero");
        let size = source.size();
        Self {
            source,
            size,
            offset: 0,
            chunk_size: chunk_size.max(1),
            chunks_read: 0,
            done: false,
            buf: Vec::new(),
        }
    }

    /// Total size of the underlying source.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of chunks delivered so far.
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// True once the last chunk was delivered or a read failed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Read the next window.
    ///
    /// Returns `Ok(None)` once the sequence has ended, either because the
    /// last chunk was already delivered or because an earlier read failed.
    pub fn read_next(&mut self) -> Result<Option<Chunk<'_>>, ReadError> {
        if self.done {
            return Ok(None);
        }

        let start = self.offset;
        let n = match read_window(&mut self.source, start, self.chunk_size, &mut self.buf) {
            Ok(n) => n,
            Err(source) => {
                self.done = true;
                return Err(ReadError {
                    offset: start,
                    source,
                });
            }
        };

        if n == 0 && start < self.size {
            self.done = true;
            return Err(ReadError {
                offset: start,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended at offset {start}, expected {} bytes", self.size),
                ),
            });
        }

        self.offset += n as u64;
        let is_last = self.offset >= self.size;
        self.done = is_last;
        let index = self.chunks_read;
        self.chunks_read += 1;

        log::trace!(
            "chunk {index}: [{start}, {}) of {} bytes{}",
            self.offset,
            self.size,
            if is_last { " (last)" } else { "" }
        );

        Ok(Some(Chunk {
            data: &self.buf[..n],
            start,
            end: self.offset,
            index,
            is_last,
        }))
    }

    /// Release the reader and return the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Read one window of at most `chunk_size` bytes at `offset` into `buf`.
///
/// `buf` is resized to `chunk_size` (or less near the end of the source) and
/// filled; the returned count is the number of valid bytes. Reading at or
/// past the end of the source yields `Ok(0)` rather than an error.
pub fn read_window<S: ByteSource + ?Sized>(
    source: &mut S,
    offset: u64,
    chunk_size: usize,
    buf: &mut Vec<u8>,
) -> io::Result<usize> {
    let remaining = source.size().saturating_sub(offset);
    let want = usize::try_from(remaining).map_or(chunk_size, |r| r.min(chunk_size));
    buf.resize(want, 0);

    let mut filled = 0;
    while filled < want {
        let n = source.read_at(offset + filled as u64, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
