// Output sinks.
//
// A sink hands out one writable stream per output name. Both `write` and
// `close` may fail; the pipeline turns either failure into a run error.
// File output is staged next to its final path and only appears under the
// final name once `close` succeeds.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

const BUF_SIZE: usize = 64 * 1024;

/// Options for a new output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Expected total size of the output, if known.
    pub size_hint: Option<u64>,
}

/// A destination that accepts a finished buffer as a stream.
pub trait Sink {
    type Stream: WritableStream;

    /// Open a new stream named `name`.
    fn create_stream(&mut self, name: &str, opts: StreamOptions) -> io::Result<Self::Stream>;
}

/// An open output stream.
pub trait WritableStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush and release the stream. Data is only durable once this succeeds.
    fn close(self) -> io::Result<()>;
}

impl<K: Sink + ?Sized> Sink for &mut K {
    type Stream = K::Stream;

    fn create_stream(&mut self, name: &str, opts: StreamOptions) -> io::Result<Self::Stream> {
        (**self).create_stream(name, opts)
    }
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Writes each stream to a file in a fixed directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    overwrite: bool,
}

impl FileSink {
    /// Sink rooted at `dir`. Existing files are not replaced.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overwrite: false,
        }
    }

    /// Allow replacing files that already exist.
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a stream named `name` is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Sink for FileSink {
    type Stream = FileStream;

    fn create_stream(&mut self, name: &str, opts: StreamOptions) -> io::Result<FileStream> {
        let path = self.path_for(name);
        if !self.overwrite && path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        let staged = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        if let Some(hint) = opts.size_hint {
            // Best effort; filesystems without preallocation just grow.
            if let Err(e) = staged.as_file().set_len(hint) {
                log::debug!("could not presize {}: {e}", staged.path().display());
            }
        }
        log::debug!(
            "opened output stream {} (staged at {})",
            path.display(),
            staged.path().display()
        );
        Ok(FileStream {
            writer: BufWriter::with_capacity(BUF_SIZE, staged),
            path,
            written: 0,
            overwrite: self.overwrite,
        })
    }
}

/// A buffered file output stream.
///
/// Bytes go to a hidden temporary file in the target directory. `close`
/// moves it to the final path; dropping the stream without a successful
/// `close` removes it.
#[derive(Debug)]
pub struct FileStream {
    writer: BufWriter<NamedTempFile>,
    path: PathBuf,
    written: u64,
    overwrite: bool,
}

impl FileStream {
    /// Final path of the output.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WritableStream for FileStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let staged = self.writer.into_inner().map_err(|e| e.into_error())?;
        // Drop any presized tail that was never written.
        staged.as_file().set_len(self.written)?;
        staged.as_file().sync_all()?;
        let persisted = if self.overwrite {
            staged.persist(&self.path)
        } else {
            staged.persist_noclobber(&self.path)
        };
        persisted.map_err(|e| e.error)?;
        log::debug!("persisted {} ({} bytes)", self.path.display(), self.written);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DiscardSink
// ---------------------------------------------------------------------------

/// Accepts and drops all output. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

/// Stream returned by [`DiscardSink`]; counts bytes only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardStream {
    pub written: u64,
}

impl Sink for DiscardSink {
    type Stream = DiscardStream;

    fn create_stream(&mut self, _name: &str, _opts: StreamOptions) -> io::Result<DiscardStream> {
        Ok(DiscardStream::default())
    }
}

impl WritableStream for DiscardStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
