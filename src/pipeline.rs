// Chunked transformation pipeline.
//
// One run drives a ChunkReader, pushes every window into a StreamCodec,
// reports progress after each read, and on the last window writes the
// codec's output to a Sink. The run is strictly sequential:
//
//   Idle -> Reading -> Pushing -> (Reading | Finalizing) -> Done
//                 \          \
//                  +----------+--> Errored
//
// A cancel token, if attached, is checked before every read and ends the
// run in Cancelled.
//
// The next window is only read after the codec accepted the previous one,
// so the read path holds at most one chunk regardless of source size.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::StreamCodec;
use crate::error::PipelineError;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::reader::{CHUNK_SIZE, ChunkReader};
use crate::sink::{Sink, StreamOptions, WritableStream};
use crate::source::ByteSource;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Window size in bytes. Must be non-zero.
    pub chunk_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag that stops a run before its next read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Successful result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Codec output, as written to the sink.
    pub output: Vec<u8>,
    /// Bytes consumed from the source.
    pub bytes_read: u64,
    /// Number of chunks pushed into the codec.
    pub chunks: u64,
}

/// Terminal outcome of a run. Exactly one is produced per started run.
#[derive(Debug)]
pub enum Outcome {
    Completed(Completion),
    Failed(PipelineError),
    /// The cancel token was set; no result or error is reported.
    Cancelled,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Convert to a `Result`, mapping cancellation to `PipelineError::Cancelled`.
    pub fn into_result(self) -> Result<Completion, PipelineError> {
        match self {
            Self::Completed(c) => Ok(c),
            Self::Failed(e) => Err(e),
            Self::Cancelled => Err(PipelineError::Cancelled),
        }
    }
}

/// Where a run currently is. Exposed for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Reading,
    Pushing,
    Finalizing,
    Done,
    Errored,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A single-use run over one source, one codec and one sink.
///
/// All three are owned for the duration of the run and released when it
/// ends. Runs share nothing, so independent pipelines may execute on
/// different threads at the same time.
///
/// # Example
/// ```no_run
/// use chunkflate::codec::Deflater;
/// use chunkflate::pipeline::{Outcome, Pipeline, PipelineOptions};
/// use chunkflate::sink::DiscardSink;
///
/// let data = vec![0u8; 200_000];
/// let pipeline = Pipeline::new(
///     data,
///     Deflater::default(),
///     DiscardSink,
///     "zeros.deflate",
///     PipelineOptions::default(),
/// );
/// pipeline.run(
///     |ev| eprintln!("{}%", ev.percent),
///     |outcome| match outcome {
///         Outcome::Completed(c) => println!("{} bytes", c.output.len()),
///         Outcome::Failed(e) => eprintln!("error: {e}"),
///         Outcome::Cancelled => {}
///     },
/// );
/// ```
pub struct Pipeline<S, C, K> {
    source: S,
    codec: C,
    sink: K,
    output_name: String,
    opts: PipelineOptions,
    cancel: Option<CancelToken>,
    state: PipelineState,
}

impl<S, C, K> Pipeline<S, C, K>
where
    S: ByteSource,
    C: StreamCodec,
    K: Sink,
{
    pub fn new(
        source: S,
        codec: C,
        sink: K,
        output_name: impl Into<String>,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            source,
            codec,
            sink,
            output_name: output_name.into(),
            opts,
            cancel: None,
            state: PipelineState::Idle,
        }
    }

    /// Attach a cancel token, checked before every read.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run to completion, delivering the outcome to `on_done`.
    pub fn run<P, D>(self, on_progress: P, on_done: D)
    where
        P: FnMut(ProgressEvent),
        D: FnOnce(Outcome),
    {
        on_done(self.execute(on_progress));
    }

    /// Run to completion and return the result.
    pub fn run_to_end<P>(self, on_progress: P) -> Result<Completion, PipelineError>
    where
        P: FnMut(ProgressEvent),
    {
        self.execute(on_progress).into_result()
    }

    /// Run to completion and return the outcome.
    ///
    /// Progress events are emitted once per chunk, after the read and before
    /// the push. No progress is emitted after a failure or cancellation.
    pub fn execute<P>(self, mut on_progress: P) -> Outcome
    where
        P: FnMut(ProgressEvent),
    {
        if let Err(e) = self.validate() {
            log::warn!("rejecting run for {:?}: {e}", self.output_name);
            return Outcome::Failed(e);
        }

        let Self {
            source,
            mut codec,
            mut sink,
            output_name,
            opts,
            cancel,
            mut state,
        } = self;

        let mut reader = ChunkReader::new(source, opts.chunk_size);
        let mut tracker = ProgressTracker::new(reader.size());
        log::debug!(
            "starting run for {output_name:?}: {} bytes in chunks of {}",
            reader.size(),
            opts.chunk_size
        );

        loop {
            if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                log::debug!("run for {output_name:?} cancelled at offset {}", reader.offset());
                transition(&mut state, PipelineState::Cancelled);
                return Outcome::Cancelled;
            }

            transition(&mut state, PipelineState::Reading);
            let chunk = match reader.read_next() {
                Ok(Some(chunk)) => chunk,
                // The reader ends only after delivering a last chunk, which
                // leaves the loop below.
                Ok(None) => break,
                Err(e) => {
                    log::warn!("{e}");
                    transition(&mut state, PipelineState::Errored);
                    return Outcome::Failed(e.into());
                }
            };
            let is_last = chunk.is_last;
            let end = chunk.end;
            on_progress(tracker.advance(end));

            transition(&mut state, PipelineState::Pushing);
            if let Err(source) = codec.push(chunk.data, is_last) {
                log::warn!("codec rejected chunk ending at {end}: {source}");
                transition(&mut state, PipelineState::Errored);
                return Outcome::Failed(PipelineError::Codec {
                    offset: end,
                    source,
                });
            }

            if is_last {
                break;
            }
        }

        transition(&mut state, PipelineState::Finalizing);
        let bytes_read = reader.offset();
        let chunks = reader.chunks_read();
        drop(reader);

        let output = match codec.finish() {
            Ok(output) => output,
            Err(source) => {
                log::warn!("codec failed to finish: {source}");
                transition(&mut state, PipelineState::Errored);
                return Outcome::Failed(PipelineError::Codec {
                    offset: bytes_read,
                    source,
                });
            }
        };

        if let Err(source) = write_output(&mut sink, &output_name, &output) {
            log::warn!("sink failed for {output_name:?}: {source}");
            transition(&mut state, PipelineState::Errored);
            return Outcome::Failed(PipelineError::Sink {
                name: output_name,
                source,
            });
        }

        transition(&mut state, PipelineState::Done);
        log::debug!(
            "run for {output_name:?} done: {bytes_read} bytes in, {} bytes out, {chunks} chunks",
            output.len()
        );
        Outcome::Completed(Completion {
            output,
            bytes_read,
            chunks,
        })
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.opts.chunk_size == 0 {
            return Err(PipelineError::InvalidInput("chunk size must be non-zero".into()));
        }
        if self.output_name.is_empty() {
            return Err(PipelineError::InvalidInput("output name is empty".into()));
        }
        if matches!(self.output_name.as_str(), "." | "..") {
            return Err(PipelineError::InvalidInput(format!(
                "output name {:?} is not a file name",
                self.output_name
            )));
        }
        if self.output_name.contains(['/', '\\']) {
            return Err(PipelineError::InvalidInput(format!(
                "output name {:?} contains a path separator",
                self.output_name
            )));
        }
        Ok(())
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    debug_assert!(!state.is_terminal(), "transition out of terminal state {state:?}");
    log::trace!("{state:?} -> {next:?}");
    *state = next;
}

fn write_output<K: Sink>(sink: &mut K, name: &str, output: &[u8]) -> std::io::Result<()> {
    let mut stream = sink.create_stream(
        name,
        StreamOptions {
            size_hint: Some(output.len() as u64),
        },
    )?;
    stream.write(output)?;
    stream.close()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Deflater, Format, inflate_all};
    use crate::error::ErrorKind;
    use crate::sink::DiscardSink;

    #[test]
    fn deflates_in_memory_source() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i % 13) as u8).collect();
        let mut percents = Vec::new();
        let done = Pipeline::new(
            data.clone(),
            Deflater::default(),
            DiscardSink,
            "a.deflate",
            PipelineOptions::default(),
        )
        .run_to_end(|ev| percents.push(ev.percent))
        .unwrap();

        assert_eq!(percents, vec![43, 87, 100]);
        assert_eq!(done.chunks, 3);
        assert_eq!(done.bytes_read, 150_000);
        assert_eq!(inflate_all(&done.output, Format::Zlib).unwrap(), data);
    }

    #[test]
    fn zero_chunk_size_is_invalid_and_silent() {
        let mut events = 0;
        let outcome = Pipeline::new(
            vec![1u8; 10],
            Deflater::default(),
            DiscardSink,
            "x",
            PipelineOptions { chunk_size: 0 },
        )
        .execute(|_| events += 1);

        match outcome {
            Outcome::Failed(e) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert_eq!(events, 0);
    }

    #[test]
    fn output_name_with_separator_is_invalid() {
        let outcome = Pipeline::new(
            Vec::new(),
            Deflater::default(),
            DiscardSink,
            "../escape",
            PipelineOptions::default(),
        )
        .execute(|_| {});
        assert!(matches!(outcome, Outcome::Failed(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn pre_cancelled_run_reads_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let mut events = 0;
        let outcome = Pipeline::new(
            vec![0u8; 10],
            Deflater::default(),
            DiscardSink,
            "x",
            PipelineOptions::default(),
        )
        .with_cancel_token(token)
        .execute(|_| events += 1);
        assert!(matches!(outcome, Outcome::Cancelled));
        assert_eq!(events, 0);
    }

    #[test]
    fn new_pipeline_is_idle() {
        let p = Pipeline::new(
            Vec::new(),
            Deflater::default(),
            DiscardSink,
            "x",
            PipelineOptions::default(),
        );
        assert_eq!(p.state(), PipelineState::Idle);
    }
}
