//! Chunkflate: chunked streaming deflate/inflate.
//!
//! The crate provides:
//! - A bounded-memory window reader over any byte source (`source`, `reader`)
//! - Push-based stream codecs on top of flate2 (`codec`)
//! - Output sinks (`sink`)
//! - The sequential read/push/finalize pipeline with progress and a single
//!   terminal outcome (`pipeline`, `progress`, `error`)
//! - File-oriented helpers (`io`, `naming`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use chunkflate::codec::{Deflater, Format, inflate_all};
//! use chunkflate::pipeline::{Pipeline, PipelineOptions};
//! use chunkflate::sink::DiscardSink;
//!
//! let data = b"hello hello hello hello".to_vec();
//! let done = Pipeline::new(
//!     data.clone(),
//!     Deflater::default(),
//!     DiscardSink,
//!     "hello.deflate",
//!     PipelineOptions::default(),
//! )
//! .run_to_end(|ev| eprintln!("{}%", ev.percent))
//! .unwrap();
//! assert_eq!(inflate_all(&done.output, Format::Zlib).unwrap(), data);
//! ```

pub mod codec;
pub mod error;
pub mod io;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod sink;
pub mod source;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{Deflater, Format, Inflater, StreamCodec};
pub use error::{CodecError, ErrorKind, PipelineError};
pub use pipeline::{CancelToken, Completion, Outcome, Pipeline, PipelineOptions};
pub use progress::ProgressEvent;
pub use reader::CHUNK_SIZE;
