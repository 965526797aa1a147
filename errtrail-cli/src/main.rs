//! # errtrail CLI
//!
//! Renders a sample error chain at every verbosity and as a JSON response.
//!
//! Usage:
//!   errtrail formatting [--frames N] [--depth N]
//!   errtrail json [--status N] [--expose]
//!
//! Examples:
//!   errtrail formatting --frames 5
//!   errtrail --capture reuse formatting
//!   errtrail json --status 404 --expose
//!   RUST_LOG=errtrail=debug errtrail formatting

use clap::{Parser, Subcommand};
use errtrail::config::{self, CapturePolicy, Config};
use errtrail::{Cause, Detail, Error, ErrorCode, MultiError, Report, ResponseOptions, Verbosity};
use serde::Serialize;
use std::fmt;
use std::io;
use tracing::{debug, info};

const NOT_FOUND: ErrorCode = ErrorCode::new("files:not-found");
const LOAD_FAILED: ErrorCode = ErrorCode::new("config:load-failed");
const STARTUP_FAILED: ErrorCode = ErrorCode::new("app:startup-failed");

#[derive(Parser)]
#[command(name = "errtrail")]
#[command(author, version, about = "errtrail - classified errors with call stacks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Call stack capture policy (fresh, reuse, off)
    #[arg(short, long, global = true)]
    capture: Option<CapturePolicy>,

    /// Maximum number of frames recorded per error
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the sample chain at every verbosity
    Formatting {
        /// Frames shown by the detailed form (0 = none)
        #[arg(short, long, default_value = "5")]
        frames: usize,

        /// Chain links shown by the verbose form (0 = all)
        #[arg(short, long, default_value = "0")]
        depth: usize,
    },
    /// Encode the sample chain as a JSON response
    Json {
        /// Status code to include (0 = omit)
        #[arg(short, long, default_value = "0")]
        status: u16,

        /// Include the text of the underlying error
        #[arg(short, long)]
        expose: bool,
    },
}

#[derive(Debug, Serialize)]
struct ConfigFile {
    path: &'static str,
    attempts: u32,
}

/// A third-party style error that carries details but no code
#[derive(Debug)]
struct ParseFailure {
    line: u32,
    details: Vec<Detail>,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected token on line {}", self.line)
    }
}

impl std::error::Error for ParseFailure {}

impl Report for ParseFailure {
    fn details(&self) -> &[Detail] {
        &self.details
    }

    fn formatted(&self) -> Option<String> {
        Some(format!("parse failure\n  line: {}", self.line))
    }
}

#[inline(never)]
fn open_config() -> errtrail::Result<String> {
    let io = io::Error::new(io::ErrorKind::NotFound, "no such file or directory");
    Err(errtrail::wrap!(NOT_FOUND, io, "config file is missing"))
}

#[inline(never)]
fn parse_fallback() -> errtrail::Result<String> {
    let failure = ParseFailure {
        line: 3,
        details: vec![Detail::new(ConfigFile {
            path: "/etc/app/defaults.toml",
            attempts: 2,
        })],
    };
    Err(Error::cast(Cause::report(failure)))
}

#[inline(never)]
fn load_config() -> errtrail::Result<String> {
    let primary = match open_config() {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };
    let fallback = match parse_fallback() {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    let both = MultiError::new([primary, fallback]);
    Err(Error::wrap(LOAD_FAILED, both).with_message("could not load config"))
}

#[inline(never)]
fn start() -> errtrail::Result<()> {
    let config = load_config().map_err(Error::wrap_copy_code)?;
    debug!(len = config.len(), "loaded config");
    Err(errtrail::error!(STARTUP_FAILED, "startup aborted"))
}

fn sample() -> Error {
    match start() {
        Ok(()) => errtrail::error!(STARTUP_FAILED),
        Err(e) => e,
    }
}

fn show_formatting(frames: usize, depth: usize) {
    let err = sample();
    let root = load_config().map_err(Error::wrap_copy_code);

    println!("=== short ===\n{}\n", err.render(Verbosity::Short));

    if let Err(wrapped) = root {
        println!(
            "=== detailed ===\n{}\n",
            wrapped.render(Verbosity::Detailed { max_frames: frames })
        );
        println!(
            "=== verbose ===\n{}\n",
            wrapped.render(Verbosity::Verbose { max_depth: depth })
        );

        println!("=== walk ===");
        for link in errtrail::walk(&wrapped) {
            let code = link.code().map(ErrorCode::as_str).unwrap_or("-");
            println!("  {:<24} {}", code, link.type_name());
        }

        if let Some(file) = errtrail::details_of_type::<ConfigFile>(&wrapped, false) {
            println!("\nconfig details: {:?}", file);
        }
        if let Some(io) = errtrail::as_type::<io::Error>(&wrapped) {
            println!("io error kind: {:?}", io.kind());
        }
        println!("classified as: {}", errtrail::classify(&wrapped));
    }
}

fn show_json(status: u16, expose: bool) {
    let err = match load_config() {
        Ok(_) => return,
        Err(e) => e,
    };
    let options = ResponseOptions {
        expose_error: expose,
    };

    match errtrail::to_json_with(&err, status, &options) {
        Ok(json) => println!("{}", String::from_utf8_lossy(&json)),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = Config::from_env();
    if let Some(capture) = cli.capture {
        settings = settings.with_capture(capture);
    }
    if let Some(max_depth) = cli.max_depth {
        settings = settings.with_max_depth(max_depth);
    }
    info!(capture = settings.capture.as_str(), max_depth = settings.max_depth, "capture settings");
    if config::install(settings).is_err() {
        eprintln!("Error: capture settings were already initialized");
        std::process::exit(1);
    }

    match cli.command {
        Some(Commands::Json { status, expose }) => show_json(status, expose),
        Some(Commands::Formatting { frames, depth }) => show_formatting(frames, depth),
        None => show_formatting(5, 0),
    }
}
