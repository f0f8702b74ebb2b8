// Error types shared across the pipeline.

use std::io;

use crate::reader::ReadError;

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// A stream codec rejected its input or was driven out of order.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input is not a valid compressed stream.
    #[error("corrupt input: {0}")]
    Corrupt(String),
    /// The last chunk arrived before the compressed stream ended.
    #[error("compressed stream is truncated")]
    Truncated,
    /// Bytes follow the end of the compressed stream.
    #[error("{0} bytes of trailing data after end of stream")]
    TrailingData(usize),
    /// A chunk was pushed after the codec reached its terminal state.
    #[error("codec already finished")]
    AlreadyFinished,
    /// Output was requested before the last chunk was pushed.
    #[error("codec has not received its last chunk")]
    NotFinished,
    #[error("codec I/O error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Discriminant of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Read,
    Codec,
    Sink,
    InvalidInput,
    Cancelled,
}

/// Terminal failure of a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("codec failed at offset {offset}: {source}")]
    Codec {
        /// Bytes consumed from the source when the codec failed.
        offset: u64,
        #[source]
        source: CodecError,
    },
    #[error("sink failed writing {name:?}: {source}")]
    Sink {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Only produced by [`crate::pipeline::Pipeline::run_to_end`]; runs
    /// delivered through `Outcome` report cancellation separately.
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(_) => ErrorKind::Read,
            Self::Codec { .. } => ErrorKind::Codec,
            Self::Sink { .. } => ErrorKind::Sink,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
