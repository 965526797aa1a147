//! # errtrail
//!
//! Classified error wrapping with call stacks, chain queries and JSON
//! responses.
//!
//! ## Design Philosophy
//!
//! - **ErrorCode**: Know what failed (e.g. `files:not-found`), stable across releases
//! - **Message**: A human-readable sentence, safe to show to callers
//! - **Details**: Typed payloads for structured context, serialized on demand
//! - **Call stack**: Where the error was created, captured cheaply and resolved
//!   only when rendered
//! - **Chain**: Every wrapper keeps its inner error, so any layer can be
//!   queried by type, code or payload
//!
//! ## Usage
//!
//! ```rust
//! use errtrail::{Error, ErrorCode};
//! use std::io;
//!
//! const READ_FAILED: ErrorCode = ErrorCode::new("config:read-failed");
//!
//! fn read_config() -> errtrail::Result<String> {
//!     let io = io::Error::new(io::ErrorKind::NotFound, "no such file");
//!     Err(errtrail::wrap!(READ_FAILED, io, "reading {}", "app.toml"))
//! }
//!
//! let err = read_config().unwrap_err();
//! assert_eq!(err.to_string(), "reading app.toml");
//! assert!(errtrail::as_type::<io::Error>(&err).is_some());
//!
//! let json = errtrail::to_json_string(&err, 404).unwrap();
//! assert!(json.contains("\"Code\": \"config:read-failed\""));
//! assert!(!json.contains("no such file"));
//! ```
//!
//! ## Formatting
//!
//! - `{}`: short form, the message or the inner error's text
//! - `{:#}`: `<code> message (inner)` plus the call stack
//! - `{:?}`: `<code> message (inner)`
//! - `{:#?}`: every error in the chain with its origin and type
//!
//! ## Principles
//!
//! - Inner errors are never lost; JSON responses never leak them unless asked
//! - Creating an error costs a stack walk, never symbol resolution
//! - Errors that are not [`Error`] can opt into capabilities through [`Report`]

mod callstack;
mod cause;
mod chain;
mod code;
pub mod config;
mod error;
mod format;
mod report;
mod response;

pub use callstack::{CallFrame, CallStack, Marker};
pub use cause::{Cause, CodeError, MultiError};
pub use chain::{
    as_type, chain, classify, details_of_type, find_call_stack, find_code, find_details,
    find_map, find_message, is_code, is_of_type, unwrap, unwrap_full, walk, Chain, Link, Walk,
};
pub use code::ErrorCode;
pub use error::Error;
pub use format::{
    detailed_form, render, short_form, verbose_form, Verbosity, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_FRAMES,
};
pub use report::{AsStdError, Detail, Payload, Report};
pub use response::{
    must_json, must_json_string, to_json, to_json_string, to_json_with, EncodeError,
    ResponseModel, ResponseOptions,
};

/// Result type alias using errtrail Error
pub type Result<T> = std::result::Result<T, Error>;
