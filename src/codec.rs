// Push-based stream codecs.
//
// A codec is fed the source one chunk at a time, in order, with an explicit
// flag on the final chunk. It becomes terminal exactly once: on the last
// push (success) or on the first push that fails. The completed output is
// taken by value through `finish()`, which consumes the codec.
//
// Built-in codecs wrap flate2:
//   - Deflater: zlib or raw deflate compression
//   - Inflater: zlib or raw deflate decompression with end-of-stream checks

use std::io::Write;

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::CodecError;
use crate::reader::CHUNK_SIZE;

// ---------------------------------------------------------------------------
// StreamCodec trait
// ---------------------------------------------------------------------------

/// An incremental, stateful byte transform.
///
/// # Implementing a custom codec
///
/// ```no_run
/// use chunkflate::codec::StreamCodec;
/// use chunkflate::error::CodecError;
///
/// #[derive(Default)]
/// struct Identity {
///     out: Vec<u8>,
///     done: bool,
/// }
///
/// impl StreamCodec for Identity {
///     fn push(&mut self, chunk: &[u8], is_last: bool) -> Result<(), CodecError> {
///         if self.done {
///             return Err(CodecError::AlreadyFinished);
///         }
///         self.out.extend_from_slice(chunk);
///         self.done = is_last;
///         Ok(())
///     }
///
///     fn is_finished(&self) -> bool {
///         self.done
///     }
///
///     fn finish(self) -> Result<Vec<u8>, CodecError> {
///         if self.done { Ok(self.out) } else { Err(CodecError::NotFinished) }
///     }
/// }
/// ```
pub trait StreamCodec {
    /// Feed the next chunk. `is_last` is true for exactly one call, the final
    /// one; an empty chunk is valid and is how an empty source is flushed.
    ///
    /// An `Err` is terminal: the codec accepts no further input.
    fn push(&mut self, chunk: &[u8], is_last: bool) -> Result<(), CodecError>;

    /// True once the last chunk has been accepted.
    fn is_finished(&self) -> bool;

    /// Take the completed output.
    ///
    /// Fails with `NotFinished` if the last chunk was never pushed.
    fn finish(self) -> Result<Vec<u8>, CodecError>
    where
        Self: Sized;
}

/// Compressed stream framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Deflate with a zlib header and Adler-32 trailer.
    #[default]
    Zlib,
    /// Bare deflate stream, no header or checksum.
    Raw,
}

/// Which way a run transforms its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deflate,
    Inflate,
}

// ---------------------------------------------------------------------------
// Deflater
// ---------------------------------------------------------------------------

enum Encoder {
    Zlib(ZlibEncoder<Vec<u8>>),
    Raw(DeflateEncoder<Vec<u8>>),
}

impl Encoder {
    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Zlib(e) => e.write_all(data),
            Self::Raw(e) => e.write_all(data),
        }
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Zlib(e) => e.finish(),
            Self::Raw(e) => e.finish(),
        }
    }
}

enum DeflateState {
    Active(Encoder),
    Done(Vec<u8>),
    Failed,
}

/// Streaming deflate compressor.
pub struct Deflater {
    state: DeflateState,
    bytes_in: u64,
}

impl Deflater {
    /// Create a compressor with the given level (0-9) and framing.
    pub fn new(level: u32, format: Format) -> Self {
        let level = Compression::new(level.min(9));
        let encoder = match format {
            Format::Zlib => Encoder::Zlib(ZlibEncoder::new(Vec::new(), level)),
            Format::Raw => Encoder::Raw(DeflateEncoder::new(Vec::new(), level)),
        };
        Self {
            state: DeflateState::Active(encoder),
            bytes_in: 0,
        }
    }

    /// Uncompressed bytes accepted so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6, Format::Zlib)
    }
}

impl StreamCodec for Deflater {
    fn push(&mut self, chunk: &[u8], is_last: bool) -> Result<(), CodecError> {
        let mut encoder = match std::mem::replace(&mut self.state, DeflateState::Failed) {
            DeflateState::Active(e) => e,
            other => {
                self.state = other;
                return Err(CodecError::AlreadyFinished);
            }
        };

        encoder.write_all(chunk)?;
        self.bytes_in += chunk.len() as u64;

        self.state = if is_last {
            DeflateState::Done(encoder.finish()?)
        } else {
            DeflateState::Active(encoder)
        };
        Ok(())
    }

    fn is_finished(&self) -> bool {
        matches!(self.state, DeflateState::Done(_))
    }

    fn finish(self) -> Result<Vec<u8>, CodecError> {
        match self.state {
            DeflateState::Done(out) => Ok(out),
            DeflateState::Active(_) => Err(CodecError::NotFinished),
            DeflateState::Failed => Err(CodecError::AlreadyFinished),
        }
    }
}

// ---------------------------------------------------------------------------
// Inflater
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InflateState {
    Active,
    /// End of stream seen, waiting for the caller's last push.
    StreamEnded,
    Done,
    Failed,
}

/// Streaming deflate decompressor.
///
/// Stricter than a plain `Read` adapter: the final push must coincide with
/// the end of the compressed stream, and nothing may follow it.
pub struct Inflater {
    inner: Decompress,
    output: Vec<u8>,
    state: InflateState,
}

impl Inflater {
    pub fn new(format: Format) -> Self {
        Self {
            inner: Decompress::new(format == Format::Zlib),
            output: Vec::new(),
            state: InflateState::Active,
        }
    }

    /// Compressed bytes consumed so far.
    pub fn bytes_in(&self) -> u64 {
        self.inner.total_in()
    }

    fn feed(&mut self, mut input: &[u8]) -> Result<(), CodecError> {
        if self.state == InflateState::StreamEnded {
            return if input.is_empty() {
                Ok(())
            } else {
                Err(CodecError::TrailingData(input.len()))
            };
        }

        loop {
            if self.output.len() == self.output.capacity() {
                self.output.reserve(CHUNK_SIZE);
            }
            let in_before = self.inner.total_in();
            let out_before = self.inner.total_out();
            let status = self
                .inner
                .decompress_vec(input, &mut self.output, FlushDecompress::None)
                .map_err(|e| CodecError::Corrupt(e.to_string()))?;
            let consumed = (self.inner.total_in() - in_before) as usize;
            let produced = self.inner.total_out() - out_before;
            input = &input[consumed..];

            if status == Status::StreamEnd {
                self.state = InflateState::StreamEnded;
                return if input.is_empty() {
                    Ok(())
                } else {
                    Err(CodecError::TrailingData(input.len()))
                };
            }

            // Output space left over means the decompressor has drained
            // everything it can from the input seen so far.
            let out_full = self.output.len() == self.output.capacity();
            if !out_full && (input.is_empty() || (consumed == 0 && produced == 0)) {
                return Ok(());
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new(Format::Zlib)
    }
}

impl StreamCodec for Inflater {
    fn push(&mut self, chunk: &[u8], is_last: bool) -> Result<(), CodecError> {
        match self.state {
            InflateState::Done | InflateState::Failed => return Err(CodecError::AlreadyFinished),
            InflateState::Active | InflateState::StreamEnded => {}
        }

        if let Err(e) = self.feed(chunk) {
            self.state = InflateState::Failed;
            self.output = Vec::new();
            return Err(e);
        }

        if is_last {
            if self.state != InflateState::StreamEnded {
                self.state = InflateState::Failed;
                self.output = Vec::new();
                return Err(CodecError::Truncated);
            }
            self.state = InflateState::Done;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.state == InflateState::Done
    }

    fn finish(self) -> Result<Vec<u8>, CodecError> {
        match self.state {
            InflateState::Done => Ok(self.output),
            InflateState::Active | InflateState::StreamEnded => Err(CodecError::NotFinished),
            InflateState::Failed => Err(CodecError::AlreadyFinished),
        }
    }
}

/// Compress `data` in one shot with the given framing.
pub fn deflate_all(data: &[u8], level: u32, format: Format) -> Result<Vec<u8>, CodecError> {
    let mut codec = Deflater::new(level, format);
    codec.push(data, true)?;
    codec.finish()
}

/// Decompress `data` in one shot with the given framing.
pub fn inflate_all(data: &[u8], format: Format) -> Result<Vec<u8>, CodecError> {
    let mut codec = Inflater::new(format);
    codec.push(data, true)?;
    codec.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        let text = b"the quick brown fox jumps over the lazy dog; ";
        (0..len).map(|i| text[i % text.len()] ^ (i / 997) as u8).collect()
    }

    fn push_chunked<C: StreamCodec>(codec: &mut C, data: &[u8], size: usize) {
        let mut chunks = data.chunks(size).peekable();
        if chunks.peek().is_none() {
            codec.push(&[], true).unwrap();
            return;
        }
        while let Some(chunk) = chunks.next() {
            codec.push(chunk, chunks.peek().is_none()).unwrap();
        }
    }

    #[test]
    fn chunked_roundtrip_zlib() {
        let data = sample(200_000);
        let mut d = Deflater::default();
        push_chunked(&mut d, &data, 4096);
        assert!(d.is_finished());
        assert_eq!(d.bytes_in(), data.len() as u64);
        let packed = d.finish().unwrap();
        assert!(packed.len() < data.len());

        let mut i = Inflater::default();
        push_chunked(&mut i, &packed, 333);
        assert_eq!(i.finish().unwrap(), data);
    }

    #[test]
    fn chunked_roundtrip_raw() {
        let data = sample(70_000);
        let packed = deflate_all(&data, 9, Format::Raw).unwrap();
        let mut i = Inflater::new(Format::Raw);
        push_chunked(&mut i, &packed, 1);
        assert_eq!(i.finish().unwrap(), data);
    }

    #[test]
    fn empty_input_roundtrip() {
        let packed = deflate_all(b"", 6, Format::Zlib).unwrap();
        assert!(!packed.is_empty());
        assert!(inflate_all(&packed, Format::Zlib).unwrap().is_empty());
    }

    #[test]
    fn highly_compressible_output_grows_past_one_chunk() {
        let data = vec![0u8; 10 * CHUNK_SIZE];
        let packed = deflate_all(&data, 6, Format::Zlib).unwrap();
        assert_eq!(inflate_all(&packed, Format::Zlib).unwrap(), data);
    }

    #[test]
    fn empty_inflate_input_is_truncated() {
        let err = inflate_all(b"", Format::Zlib).unwrap_err();
        assert!(matches!(err, CodecError::Truncated));
    }

    #[test]
    fn truncated_stream_fails_on_last_push() {
        let packed = deflate_all(&sample(10_000), 6, Format::Zlib).unwrap();
        let cut = &packed[..packed.len() / 2];
        let mut i = Inflater::default();
        assert!(matches!(i.push(cut, true), Err(CodecError::Truncated)));
        assert!(!i.is_finished());
        assert!(matches!(i.push(b"", true), Err(CodecError::AlreadyFinished)));
    }

    #[test]
    fn trailing_data_is_rejected() {
        let mut packed = deflate_all(b"payload", 6, Format::Zlib).unwrap();
        packed.extend_from_slice(b"junk");
        assert!(matches!(
            inflate_all(&packed, Format::Zlib),
            Err(CodecError::TrailingData(4))
        ));
    }

    #[test]
    fn trailing_data_in_a_later_chunk_is_rejected() {
        let packed = deflate_all(b"payload", 6, Format::Zlib).unwrap();
        let mut i = Inflater::default();
        i.push(&packed, false).unwrap();
        assert!(matches!(
            i.push(b"xy", true),
            Err(CodecError::TrailingData(2))
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        let mut i = Inflater::default();
        let err = i.push(b"definitely not zlib", true).unwrap_err();
        assert!(matches!(err, CodecError::Corrupt(_)));
    }

    #[test]
    fn push_after_last_is_rejected() {
        let mut d = Deflater::default();
        d.push(b"abc", true).unwrap();
        assert!(matches!(d.push(b"d", true), Err(CodecError::AlreadyFinished)));
        assert!(d.is_finished());
    }

    #[test]
    fn finish_before_last_push() {
        let mut d = Deflater::default();
        d.push(b"abc", false).unwrap();
        assert!(matches!(d.finish(), Err(CodecError::NotFinished)));

        let i = Inflater::default();
        assert!(matches!(i.finish(), Err(CodecError::NotFinished)));
    }

    #[test]
    fn output_matches_flate2_reader() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let data = sample(50_000);
        let packed = deflate_all(&data, 6, Format::Zlib).unwrap();
        let mut out = Vec::new();
        ZlibDecoder::new(&packed[..]).read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
