//! The main Error type for errtrail

use crate::config::{self, CapturePolicy, Config};
use crate::{CallStack, Cause, CodeError, Detail, ErrorCode, Link, Payload, Report};
use std::fmt;

/// A classified error wrapping an inner cause.
///
/// This error type provides:
/// - `code`: What kind of failure occurred
/// - `message`: Optional human-readable description
/// - `details`: Optional typed payloads for structured context
/// - `inner`: The wrapped cause
/// - `call_stack`: Where the error was created, resolved on demand
///
/// # Example
///
/// ```rust
/// use errtrail::{Error, ErrorCode};
///
/// const NOT_FOUND: ErrorCode = ErrorCode::new("files:not-found");
/// const LOAD_FAILED: ErrorCode = ErrorCode::new("config:load-failed");
///
/// let err = Error::wrap(LOAD_FAILED, Error::new(NOT_FOUND))
///     .with_message("could not load config");
///
/// assert_eq!(err.code(), &LOAD_FAILED);
/// assert_eq!(err.to_string(), "could not load config");
/// assert_eq!(errtrail::unwrap_full(&err).to_string(), "files:not-found");
/// ```
pub struct Error {
    code: ErrorCode,
    message: Option<String>,
    details: Vec<Detail>,
    inner: Cause,
    call_stack: CallStack,
    // false when the stack was borrowed from the inner error
    owns_stack: bool,
}

impl Error {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create an error from a code alone.
    ///
    /// The inner error is a [`CodeError`] whose text is the code.
    #[inline(never)]
    pub fn new(code: impl Into<ErrorCode>) -> Self {
        let code = code.into();
        let mut err = Self::wrap(code.clone(), CodeError(code));
        err.hide_frames(1);
        err
    }

    /// Create an error from a code and a formatted message.
    ///
    /// Usually reached through the [`error!`](crate::error!) macro.
    #[inline(never)]
    pub fn new_fmt(code: impl Into<ErrorCode>, args: fmt::Arguments<'_>) -> Self {
        let mut err = Self::new(code).with_message(args.to_string());
        err.hide_frames(1);
        err
    }

    /// Wrap an existing error with a code.
    #[inline(never)]
    pub fn wrap(code: impl Into<ErrorCode>, err: impl Into<Cause>) -> Self {
        let mut err = Self::wrap_with(config::current(), code.into(), err.into());
        err.hide_frames(1);
        err
    }

    /// Wrap an existing error with a code and a formatted message.
    ///
    /// Usually reached through the [`wrap!`](crate::wrap!) macro.
    #[inline(never)]
    pub fn wrap_fmt(
        code: impl Into<ErrorCode>,
        err: impl Into<Cause>,
        args: fmt::Arguments<'_>,
    ) -> Self {
        let mut err = Self::wrap(code, err).with_message(args.to_string());
        err.hide_frames(1);
        err
    }

    /// Wrap an error keeping its own code.
    ///
    /// Falls back to [`ErrorCode::UNEXPECTED`] when the wrapped error carries
    /// no code.
    #[inline(never)]
    pub fn wrap_copy_code(err: impl Into<Cause>) -> Self {
        let inner = err.into();
        let code = inner
            .link()
            .code()
            .cloned()
            .unwrap_or(ErrorCode::UNEXPECTED);

        let mut err = Self::wrap(code, inner);
        err.hide_frames(1);
        err
    }

    /// Wrap an error keeping its own code, with a formatted message.
    #[inline(never)]
    pub fn wrap_copy_code_fmt(err: impl Into<Cause>, args: fmt::Arguments<'_>) -> Self {
        let mut err = Self::wrap_copy_code(err).with_message(args.to_string());
        err.hide_frames(1);
        err
    }

    /// Return `err` unchanged if it already is an [`Error`], otherwise wrap it
    /// with [`ErrorCode::UNEXPECTED`] (see [`cast_or`](Self::cast_or)).
    #[inline(never)]
    pub fn cast(err: impl Into<Cause>) -> Self {
        match Self::cast_with(err.into(), ErrorCode::UNEXPECTED) {
            Cast::Existing(err) => err,
            Cast::Wrapped(mut err) => {
                err.hide_frames(1);
                err
            }
        }
    }

    /// Return `err` unchanged if it already is an [`Error`], otherwise wrap it.
    ///
    /// The new wrapper takes the code (and message) the error exposes itself.
    /// An aggregate with exactly one coded branch lends that branch's code.
    /// Otherwise `fallback` is used.
    #[inline(never)]
    pub fn cast_or(err: impl Into<Cause>, fallback: impl Into<ErrorCode>) -> Self {
        match Self::cast_with(err.into(), fallback.into()) {
            Cast::Existing(err) => err,
            Cast::Wrapped(mut err) => {
                err.hide_frames(1);
                err
            }
        }
    }

    #[inline(never)]
    fn cast_with(inner: Cause, fallback: ErrorCode) -> Cast {
        let inner = match inner.into_error() {
            Ok(err) => return Cast::Existing(err),
            Err(inner) => inner,
        };

        let link = inner.link();
        let code = crate::chain::classify_link(link)
            .cloned()
            .unwrap_or(fallback);
        let message = link.message().map(str::to_owned);

        let mut err = Self::wrap(code, inner);
        err.message = message;
        err.hide_frames(1);
        Cast::Wrapped(err)
    }

    #[inline(never)]
    fn wrap_with(config: &Config, code: ErrorCode, inner: Cause) -> Self {
        let (call_stack, owns_stack) = match config.capture {
            CapturePolicy::Off => (CallStack::empty(), true),
            CapturePolicy::Reuse => match inner.link().call_stack() {
                Some(stack) => (stack.clone(), false),
                None => (CallStack::capture(0, config.max_depth), true),
            },
            CapturePolicy::Fresh => (CallStack::capture(0, config.max_depth), true),
        };

        let mut err = Self {
            code,
            message: None,
            details: Vec::new(),
            inner,
            call_stack,
            owns_stack,
        };
        err.hide_frames(1);
        err
    }

    fn hide_frames(&mut self, n: usize) {
        if self.owns_stack {
            self.call_stack.bump_offset(n);
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error code
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// Get the message, if one was set
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Get the attached detail payloads
    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    /// Get the wrapped error
    pub fn inner(&self) -> &Cause {
        &self.inner
    }

    /// Get the call stack recorded when this error was created
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// A borrowed view of this error for chain traversal
    pub fn link(&self) -> Link<'_> {
        Link::from_report(self)
    }

    /// Consume the error, returning the wrapped error
    pub fn into_inner(self) -> Cause {
        self.inner
    }

    /// Whether this error carries `code`
    pub fn has_code(&self, code: &ErrorCode) -> bool {
        &self.code == code
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the message. An empty message clears it.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = if message.is_empty() {
            None
        } else {
            Some(message)
        };
        self
    }

    /// Attach a detail payload
    pub fn with_details<T: Payload>(mut self, details: T) -> Self {
        self.details.push(Detail::new(details));
        self
    }
}

/// Outcome of a cast: the error itself, or a new wrapper around it
enum Cast {
    Existing(Error),
    Wrapped(Error),
}

// =============================================================================
// std::error::Error and capability implementations
// =============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_std_error())
    }
}

impl Report for Error {
    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn code(&self) -> Option<&ErrorCode> {
        Some(&self.code)
    }

    fn details(&self) -> &[Detail] {
        &self.details
    }

    fn call_stack(&self) -> Option<&CallStack> {
        Some(&self.call_stack)
    }

    fn inner(&self) -> Option<&Cause> {
        Some(&self.inner)
    }
}

// =============================================================================
// Macros for formatted messages
// =============================================================================

/// Create an [`Error`] from a code and an optional formatted message.
///
/// ```rust
/// use errtrail::ErrorCode;
///
/// let err = errtrail::error!(ErrorCode::new("user:not-found"), "no user with id {}", 42);
/// assert_eq!(err.to_string(), "no user with id 42");
/// ```
#[macro_export]
macro_rules! error {
    ($code:expr $(,)?) => {
        $crate::Error::new($code)
    };
    ($code:expr, $($arg:tt)+) => {
        $crate::Error::new_fmt($code, ::std::format_args!($($arg)+))
    };
}

/// Wrap an error with a code and an optional formatted message.
///
/// ```rust
/// use errtrail::ErrorCode;
///
/// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
/// let err = errtrail::wrap!(ErrorCode::new("config:read"), io, "reading {}", "app.toml");
/// assert_eq!(err.to_string(), "reading app.toml");
/// ```
#[macro_export]
macro_rules! wrap {
    ($code:expr, $err:expr $(,)?) => {
        $crate::Error::wrap($code, $err)
    };
    ($code:expr, $err:expr, $($arg:tt)+) => {
        $crate::Error::wrap_fmt($code, $err, ::std::format_args!($($arg)+))
    };
}
