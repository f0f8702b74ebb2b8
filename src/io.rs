// File-level deflate/inflate helpers.
//
// `deflate_file()` and `inflate_file()` open the input as a FileSource,
// derive the output name, and run the pipeline into a FileSink rooted at
// the output directory. Optionally computes a SHA-256 of the written output
// (feature-gated behind `file-io`).

use std::io;
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::codec::{Deflater, Direction, Format, Inflater, StreamCodec};
use crate::error::PipelineError;
use crate::naming;
use crate::pipeline::{CancelToken, Completion, Pipeline, PipelineOptions};
use crate::progress::ProgressEvent;
use crate::reader::{CHUNK_SIZE, ReadError};
use crate::sink::{DiscardSink, FileSink, Sink};
use crate::source::FileSource;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for file-level runs.
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Window size in bytes.
    pub chunk_size: usize,
    /// Compressed stream framing.
    pub format: Format,
    /// Compression level (0-9). Ignored when inflating.
    pub level: u32,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Run the transform but write nothing.
    pub dry_run: bool,
    /// Optional cancel token for the run.
    pub cancel: Option<CancelToken>,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            format: Format::Zlib,
            level: 6,
            overwrite: false,
            dry_run: false,
            cancel: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `deflate_file()` and `inflate_file()`.
#[derive(Debug, Clone)]
pub struct FileStats {
    /// Input file size in bytes.
    pub input_size: u64,
    /// Output size in bytes.
    pub output_size: u64,
    /// Number of chunks read from the input.
    pub chunks: u64,
    /// Where the output was written; `None` for dry runs.
    pub output_path: Option<PathBuf>,
    /// SHA-256 of the output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compress `input` into `<out_dir>/<name>.deflate`.
pub fn deflate_file<P>(
    input: &Path,
    out_dir: &Path,
    opts: &FileOptions,
    on_progress: P,
) -> Result<FileStats, PipelineError>
where
    P: FnMut(ProgressEvent),
{
    transform_file(Direction::Deflate, input, out_dir, opts, on_progress)
}

/// Decompress `input` into `out_dir`, naming the output after `input`
/// with `.deflate` removed.
pub fn inflate_file<P>(
    input: &Path,
    out_dir: &Path,
    opts: &FileOptions,
    on_progress: P,
) -> Result<FileStats, PipelineError>
where
    P: FnMut(ProgressEvent),
{
    transform_file(Direction::Inflate, input, out_dir, opts, on_progress)
}

/// Run `direction` over `input`, writing into `out_dir`.
pub fn transform_file<P>(
    direction: Direction,
    input: &Path,
    out_dir: &Path,
    opts: &FileOptions,
    on_progress: P,
) -> Result<FileStats, PipelineError>
where
    P: FnMut(ProgressEvent),
{
    let source = open_source(input)?;
    let input_name = source.file_name().ok_or_else(|| {
        PipelineError::InvalidInput(format!("{} has no usable file name", input.display()))
    })?;
    let name = naming::output_name(direction, input_name);
    log::debug!("{direction:?} {} -> {name}", input.display());

    match direction {
        Direction::Deflate => {
            let codec = Deflater::new(opts.level, opts.format);
            run_into(source, codec, &name, out_dir, opts, on_progress)
        }
        Direction::Inflate => {
            let codec = Inflater::new(opts.format);
            run_into(source, codec, &name, out_dir, opts, on_progress)
        }
    }
}

fn open_source(input: &Path) -> Result<FileSource, PipelineError> {
    FileSource::open(input).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidInput => PipelineError::InvalidInput(e.to_string()),
        _ => PipelineError::Read(ReadError {
            offset: 0,
            source: e,
        }),
    })
}

fn run_into<C, P>(
    source: FileSource,
    codec: C,
    name: &str,
    out_dir: &Path,
    opts: &FileOptions,
    on_progress: P,
) -> Result<FileStats, PipelineError>
where
    C: StreamCodec,
    P: FnMut(ProgressEvent),
{
    if opts.dry_run {
        let done = run_pipeline(source, codec, DiscardSink, name, opts, on_progress)?;
        return Ok(stats(done, None));
    }

    let sink = FileSink::new(out_dir).overwrite(opts.overwrite);
    let path = sink.path_for(name);
    let done = run_pipeline(source, codec, sink, name, opts, on_progress)?;
    Ok(stats(done, Some(path)))
}

fn run_pipeline<C, K, P>(
    source: FileSource,
    codec: C,
    sink: K,
    name: &str,
    opts: &FileOptions,
    on_progress: P,
) -> Result<Completion, PipelineError>
where
    C: StreamCodec,
    K: Sink,
    P: FnMut(ProgressEvent),
{
    let mut pipeline = Pipeline::new(
        source,
        codec,
        sink,
        name,
        PipelineOptions {
            chunk_size: opts.chunk_size,
        },
    );
    if let Some(token) = &opts.cancel {
        pipeline = pipeline.with_cancel_token(token.clone());
    }
    pipeline.run_to_end(on_progress)
}

fn stats(done: Completion, output_path: Option<PathBuf>) -> FileStats {
    #[cfg(feature = "file-io")]
    let output_sha256 = Some(sha2::Sha256::digest(&done.output).into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    FileStats {
        input_size: done.bytes_read,
        output_size: done.output.len() as u64,
        chunks: done.chunks,
        output_path,
        output_sha256,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
