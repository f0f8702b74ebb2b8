// Command line front end for chunkflate.
//
// Two transform subcommands (`deflate`, `inflate`) that stream one file
// through the chunked pipeline, plus `config` for build details.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::codec::{Direction, Format};
use crate::io::{FileOptions, FileStats, transform_file};
use crate::progress::ProgressEvent;
use crate::reader::CHUNK_SIZE;

const DEFAULT_LEVEL: u32 = 6;
/// Upper bound on `--chunk-size`; the read path holds one chunk in memory.
const MAX_CHUNK_SIZE: u64 = 1 << 30; // 1 GiB

// ---------------------------------------------------------------------------
// Chunk size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

/// Parse a `--chunk-size` value: a positive byte count with an optional
/// K/M/G suffix, at most `MAX_CHUNK_SIZE`.
fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, shift) = match s.char_indices().last() {
        None => return Err("empty chunk size".into()),
        Some((i, 'k' | 'K')) => (&s[..i], 10),
        Some((i, 'm' | 'M')) => (&s[..i], 20),
        Some((i, 'g' | 'G')) => (&s[..i], 30),
        Some(_) => (s, 0),
    };
    let count: u64 = digits
        .trim()
        .parse()
        .map_err(|e| format!("invalid chunk size '{s}': {e}"))?;
    let bytes = count
        .checked_mul(1 << shift)
        .filter(|&n| n <= MAX_CHUNK_SIZE)
        .ok_or_else(|| format!("chunk size '{s}' exceeds max {MAX_CHUNK_SIZE}"))?;
    if bytes == 0 {
        return Err("chunk size must be non-zero".into());
    }
    usize::try_from(bytes).map_err(|_| format!("chunk size '{s}' does not fit in memory"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Chunked streaming deflate/inflate.
#[derive(Parser, Debug)]
#[command(
    name = "chunkflate",
    version,
    about = "Chunked streaming deflate/inflate",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress progress and non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress a file to `<name>.deflate`.
    Deflate(DeflateArgs),
    /// Decompress a `.deflate` file.
    Inflate(InflateArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Zlib,
    Raw,
}

impl From<FormatArg> for Format {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Zlib => Format::Zlib,
            FormatArg::Raw => Format::Raw,
        }
    }
}

#[derive(Args, Debug)]
struct TransformArgs {
    /// Input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Directory to write the output into (default: the input's directory).
    #[arg(long, short = 'o', value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// Read window size (supports K/M/G suffix).
    #[arg(long = "chunk-size", value_parser = parse_chunk_size, default_value_t = CHUNK_SIZE)]
    chunk_size: usize,

    /// Compressed stream framing.
    #[arg(long, value_enum, default_value_t = FormatArg::Zlib)]
    format: FormatArg,

    /// Run the transform but do not write output.
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DeflateArgs {
    #[command(flatten)]
    common: TransformArgs,

    /// Compression level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,
}

#[derive(Args, Debug)]
struct InflateArgs {
    #[command(flatten)]
    common: TransformArgs,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Transform(Direction),
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    input: PathBuf,
    output_dir: Option<PathBuf>,
    file: FileOptions,
}

fn resolve_options(cli: Cli) -> Options {
    let quiet = cli.quiet;
    let verbose = cli.verbose.min(2);
    let json_output = cli.json_output;

    let (command, common, level) = match cli.command {
        Cmd::Deflate(args) => (
            Command::Transform(Direction::Deflate),
            Some(args.common),
            args.level,
        ),
        Cmd::Inflate(args) => (
            Command::Transform(Direction::Inflate),
            Some(args.common),
            DEFAULT_LEVEL,
        ),
        Cmd::Config => (Command::Config, None, DEFAULT_LEVEL),
    };

    let mut file = FileOptions {
        level,
        overwrite: cli.force,
        ..Default::default()
    };
    let (input, output_dir) = match common {
        Some(c) => {
            file.chunk_size = c.chunk_size;
            file.format = c.format.into();
            file.dry_run = c.dry_run;
            (c.input, c.output_dir)
        }
        None => (PathBuf::new(), None),
    };

    Options {
        command,
        quiet,
        verbose,
        json_output,
        input,
        output_dir,
        file,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("chunkflate".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("chunkflate version {version}");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_CHUNK_SIZE={CHUNK_SIZE}");
    eprintln!("MAX_CHUNK_SIZE={MAX_CHUNK_SIZE}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Transform commands
// ---------------------------------------------------------------------------

fn default_output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn cmd_transform(direction: Direction, opts: &Options) -> i32 {
    let out_dir = opts
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&opts.input));

    let show_progress = !opts.quiet && !opts.json_output;
    let mut last_percent = None;
    let on_progress = |ev: ProgressEvent| {
        if show_progress && last_percent != Some(ev.percent) {
            last_percent = Some(ev.percent);
            let mut err = io::stderr().lock();
            let _ = write!(err, "\rchunkflate: {:3}%", ev.percent);
            if ev.is_finished {
                let _ = writeln!(err);
            }
        }
    };

    let stats = match transform_file(direction, &opts.input, &out_dir, &opts.file, on_progress) {
        Ok(stats) => stats,
        Err(e) => {
            if show_progress && last_percent.is_some_and(|p| p < 100) {
                eprintln!();
            }
            eprintln!("chunkflate: {}: {e}", opts.input.display());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "chunkflate: {}: input size: {}, output size: {}, chunks: {}",
            opts.input.display(),
            stats.input_size,
            stats.output_size,
            stats.chunks
        );
    }

    if opts.json_output {
        print_json(direction, opts, &stats);
    } else if !opts.quiet
        && let Some(path) = &stats.output_path
    {
        eprintln!("chunkflate: wrote {}", path.display());
    }

    0
}

fn print_json(direction: Direction, opts: &Options, stats: &FileStats) {
    let command = match direction {
        Direction::Deflate => "deflate",
        Direction::Inflate => "inflate",
    };
    let json = serde_json::json!({
        "command": command,
        "input": opts.input.display().to_string(),
        "output": stats.output_path.as_ref().map(|p| p.display().to_string()),
        "input_size": stats.input_size,
        "output_size": stats.output_size,
        "chunks": stats.chunks,
        "chunk_size": opts.file.chunk_size,
        "sha256": stats.output_sha256.map(hex::encode),
    });
    match serde_json::to_string_pretty(&json) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => eprintln!("chunkflate: json: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse arguments, run the command, and exit with its status.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_filter = match opts.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Transform(direction) => cmd_transform(direction, &opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
