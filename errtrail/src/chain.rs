//! Traversal of wrapped error chains and typed queries over them
//!
//! A chain is followed one link at a time through single-level unwraps
//! ([`chain`]). Aggregates ([`MultiError`]) end that chain; the depth-first
//! [`walk`] descends into their branches in declared order. Typed searches
//! ([`as_type`], the `find_*` helpers, [`details_of_type`]) use the walk,
//! [`is_of_type`] and [`unwrap_full`] use the plain chain.

use crate::{CallStack, Cause, Detail, Error, ErrorCode, MultiError, Report};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

static FALLBACK_CODE: ErrorCode = ErrorCode::UNEXPECTED;

// =============================================================================
// Link
// =============================================================================

/// A borrowed view of one error in a chain, with whatever capabilities the
/// error exposes.
#[derive(Clone, Copy)]
pub struct Link<'a> {
    error: &'a (dyn StdError + 'static),
    report: Option<&'a dyn Report>,
    type_name: &'static str,
}

impl<'a> Link<'a> {
    /// View an error exposing capabilities
    pub fn from_report(report: &'a dyn Report) -> Self {
        Self {
            error: report.as_std_error(),
            report: Some(report),
            type_name: report.type_name(),
        }
    }

    /// View a plain error of a known type.
    ///
    /// [`Error`] and [`MultiError`] values are recognized and keep their
    /// capabilities.
    pub fn from_plain(error: &'a (dyn StdError + 'static), type_name: &'static str) -> Self {
        if let Some(err) = error.downcast_ref::<Error>() {
            return Self::from_report(err);
        }
        if let Some(multi) = error.downcast_ref::<MultiError>() {
            return Self::from_report(multi);
        }
        Self {
            error,
            report: None,
            type_name,
        }
    }

    /// View a plain error of unknown type
    pub fn from_std(error: &'a (dyn StdError + 'static)) -> Self {
        Self::from_plain(error, "dyn std::error::Error")
    }

    /// The error as a `std` error
    pub fn error(&self) -> &'a (dyn StdError + 'static) {
        self.error
    }

    /// The error's capabilities, if it exposes any
    pub fn report(&self) -> Option<&'a dyn Report> {
        self.report
    }

    /// Name of the error's concrete type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The error itself, if it is of type `T`
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&'a T> {
        self.error.downcast_ref::<T>()
    }

    /// Whether the error itself is of type `T`
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.error.is::<T>()
    }

    /// Message capability; empty messages count as absent
    pub fn message(&self) -> Option<&'a str> {
        self.report
            .and_then(|r| r.message())
            .filter(|message| !message.is_empty())
    }

    /// Code capability
    pub fn code(&self) -> Option<&'a ErrorCode> {
        self.report.and_then(|r| r.code())
    }

    /// Details capability
    pub fn details(&self) -> &'a [Detail] {
        self.report.map(|r| r.details()).unwrap_or(&[])
    }

    /// Call stack capability
    pub fn call_stack(&self) -> Option<&'a CallStack> {
        self.report.and_then(|r| r.call_stack())
    }

    /// Custom format capability
    pub fn formatted(&self) -> Option<String> {
        self.report.and_then(|r| r.formatted())
    }

    /// Whether the error is an aggregate with branches
    pub fn is_aggregate(&self) -> bool {
        self.report.map_or(false, |r| !r.branches().is_empty())
    }

    /// The single directly wrapped error.
    ///
    /// Aggregates have none; their sub-errors are [`branches`](Self::branches).
    pub fn unwrap(&self) -> Option<Link<'a>> {
        if let Some(report) = self.report {
            if let Some(inner) = report.inner() {
                return Some(inner.link());
            }
            if !report.branches().is_empty() {
                return None;
            }
        }
        self.error.source().map(Link::from_std)
    }

    /// Sub-errors of an aggregate, in declared order
    pub fn branches(&self) -> impl Iterator<Item = Link<'a>> + 'a {
        let branches: &'a [Cause] = self.report.map(|r| r.branches()).unwrap_or(&[]);
        branches.iter().map(Cause::link)
    }
}

impl fmt::Display for Link<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.error, f)
    }
}

impl fmt::Debug for Link<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("type_name", &self.type_name)
            .field("error", &self.error)
            .finish()
    }
}

impl<'a> From<&'a Error> for Link<'a> {
    fn from(err: &'a Error) -> Self {
        Link::from_report(err)
    }
}

impl<'a> From<&'a MultiError> for Link<'a> {
    fn from(err: &'a MultiError) -> Self {
        Link::from_report(err)
    }
}

impl<'a> From<&'a Cause> for Link<'a> {
    fn from(cause: &'a Cause) -> Self {
        cause.link()
    }
}

impl<'a> From<&'a dyn Report> for Link<'a> {
    fn from(report: &'a dyn Report) -> Self {
        Link::from_report(report)
    }
}

impl<'a> From<&'a (dyn StdError + 'static)> for Link<'a> {
    fn from(err: &'a (dyn StdError + 'static)) -> Self {
        Link::from_std(err)
    }
}

impl<'a> From<&'a (dyn StdError + Send + Sync + 'static)> for Link<'a> {
    fn from(err: &'a (dyn StdError + Send + Sync + 'static)) -> Self {
        Link::from_std(err)
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Iterator over a chain by single-level unwraps, starting with the error
/// itself. Created by [`chain`].
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<Link<'a>>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = Link<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.unwrap();
        Some(current)
    }
}

/// Depth-first iterator over a chain including aggregate branches.
/// Created by [`walk`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    pending: Vec<Link<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Link<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.pending.pop()?;
        match current.unwrap() {
            Some(inner) => self.pending.push(inner),
            None => {
                let start = self.pending.len();
                self.pending.extend(current.branches());
                self.pending[start..].reverse();
            }
        }
        Some(current)
    }
}

/// Iterate `err` and every error reachable by single-level unwraps
pub fn chain<'a>(err: impl Into<Link<'a>>) -> Chain<'a> {
    Chain {
        next: Some(err.into()),
    }
}

/// Iterate `err` and everything it wraps, descending into aggregates
pub fn walk<'a>(err: impl Into<Link<'a>>) -> Walk<'a> {
    Walk {
        pending: vec![err.into()],
    }
}

// =============================================================================
// Queries
// =============================================================================

/// The directly wrapped error, if any
pub fn unwrap<'a>(err: impl Into<Link<'a>>) -> Option<Link<'a>> {
    err.into().unwrap()
}

/// Unwrap until nothing is left to unwrap; returns the root cause
pub fn unwrap_full<'a>(err: impl Into<Link<'a>>) -> Link<'a> {
    let link = err.into();
    chain(link).last().unwrap_or(link)
}

/// The first error of type `T` in the chain, branches included.
///
/// ```rust
/// use errtrail::{Error, ErrorCode};
/// use std::io;
///
/// let err = Error::wrap(ErrorCode::new("config:read"), io::Error::new(io::ErrorKind::NotFound, "gone"));
/// let io_err = errtrail::as_type::<io::Error>(&err).unwrap();
/// assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
/// ```
pub fn as_type<'a, T: StdError + 'static>(err: impl Into<Link<'a>>) -> Option<&'a T> {
    walk(err).find_map(|link| link.downcast_ref::<T>())
}

/// Whether `err` or any error reachable by single-level unwraps is exactly
/// of type `T`. Aggregate branches are not searched.
pub fn is_of_type<'a, T: StdError + 'static>(err: impl Into<Link<'a>>) -> bool {
    chain(err).any(|link| link.is::<T>())
}

/// A detail payload of type `T` attached anywhere in the chain.
///
/// By default the payload found first (attached closest to `err`) is
/// returned; with `prefer_last` the one found last (closest to the root
/// cause).
pub fn details_of_type<'a, T: Any>(err: impl Into<Link<'a>>, prefer_last: bool) -> Option<&'a T> {
    let mut found = walk(err)
        .flat_map(|link| link.details().iter())
        .filter_map(|detail| detail.downcast_ref::<T>());

    if prefer_last {
        found.last()
    } else {
        found.next()
    }
}

/// The first non-`None` result of `f` over the walk
pub fn find_map<'a, R>(
    err: impl Into<Link<'a>>,
    f: impl FnMut(Link<'a>) -> Option<R>,
) -> Option<R> {
    walk(err).find_map(f)
}

/// The first code in the chain
pub fn find_code<'a>(err: impl Into<Link<'a>>) -> Option<&'a ErrorCode> {
    find_map(err, |link| link.code())
}

/// The first non-empty message in the chain
pub fn find_message<'a>(err: impl Into<Link<'a>>) -> Option<&'a str> {
    find_map(err, |link| link.message())
}

/// The first non-empty set of detail payloads in the chain
pub fn find_details<'a>(err: impl Into<Link<'a>>) -> Option<&'a [Detail]> {
    find_map(err, |link| {
        let details = link.details();
        (!details.is_empty()).then_some(details)
    })
}

/// The first call stack in the chain
pub fn find_call_stack<'a>(err: impl Into<Link<'a>>) -> Option<&'a CallStack> {
    find_map(err, |link| link.call_stack())
}

/// The code [`Error::cast`] would give `err`.
///
/// That is the error's own code, or for an aggregate the code of its single
/// coded branch, or [`ErrorCode::UNEXPECTED`].
pub fn classify<'a>(err: impl Into<Link<'a>>) -> &'a ErrorCode {
    classify_link(err.into()).unwrap_or(&FALLBACK_CODE)
}

/// Shorthand for `classify(err) == code`
pub fn is_code<'a>(err: impl Into<Link<'a>>, code: &ErrorCode) -> bool {
    classify(err) == code
}

pub(crate) fn classify_link(link: Link<'_>) -> Option<&ErrorCode> {
    if let Some(code) = link.code() {
        return Some(code);
    }

    let mut coded = link.branches().filter_map(|branch| branch.code());
    match (coded.next(), coded.next()) {
        (Some(code), None) => Some(code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodeError;
    use serde::Serialize;
    use std::io;

    const NOT_FOUND: ErrorCode = ErrorCode::new("files:not-found");
    const LOAD_FAILED: ErrorCode = ErrorCode::new("config:load-failed");

    #[derive(Debug, Serialize, PartialEq)]
    struct Attempt(u32);

    /// A custom wrapper delegating to an inner error through `source`
    #[derive(Debug)]
    struct StatusError {
        inner: Error,
        status: u16,
    }

    impl fmt::Display for StatusError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} ({})", self.inner, self.status)
        }
    }

    impl StdError for StatusError {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.inner)
        }
    }

    fn io_error(msg: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, msg.to_string())
    }

    #[test]
    fn test_unwrap() {
        let err = Error::wrap(LOAD_FAILED, io_error("disk"));
        let inner = unwrap(&err).unwrap();
        assert!(inner.is::<io::Error>());
        assert_eq!(inner.to_string(), "disk");
        assert!(unwrap(inner).is_none());
    }

    #[test]
    fn test_unwrap_full() {
        let err = Error::wrap(LOAD_FAILED, Error::new(NOT_FOUND)).with_message("m");
        let root = unwrap_full(&err);
        assert!(root.is::<CodeError>());
        assert_eq!(root.to_string(), "files:not-found");
    }

    #[test]
    fn test_unwrap_full_through_std_sources() {
        let status = StatusError {
            inner: Error::wrap(LOAD_FAILED, io_error("disk")),
            status: 404,
        };
        let outer = Error::wrap_copy_code(status);

        let root = unwrap_full(&outer);
        assert!(root.is::<io::Error>());
        assert_eq!(chain(&outer).count(), 4);
    }

    #[test]
    fn test_unwrap_full_ignores_offsets() {
        let plain = Error::wrap(LOAD_FAILED, io_error("disk"));
        let bumped = Error::wrap_fmt(LOAD_FAILED, io_error("disk"), format_args!("x"));
        assert_ne!(plain.call_stack().offset(), bumped.call_stack().offset());
        assert_eq!(
            unwrap_full(&plain).to_string(),
            unwrap_full(&bumped).to_string()
        );
    }

    #[test]
    fn test_as_type_finds_first() {
        let err = Error::wrap(
            LOAD_FAILED,
            StatusError {
                inner: Error::new(NOT_FOUND).with_message("inner"),
                status: 404,
            },
        );

        let status = as_type::<StatusError>(&err).unwrap();
        assert_eq!(status.status, 404);

        let first = as_type::<Error>(&err).unwrap();
        assert_eq!(first.code(), &LOAD_FAILED);

        assert!(as_type::<io::Error>(&err).is_none());
    }

    #[test]
    fn test_as_type_descends_into_branches_in_order() {
        let multi = MultiError::new([Error::new(ErrorCode::new("a")), Error::new(ErrorCode::new("b"))]);
        let found = as_type::<Error>(&multi).unwrap();
        assert_eq!(found.code(), "a");

        let multi = MultiError::default()
            .with(io_error("first"))
            .with(Error::new(ErrorCode::new("b")));
        assert_eq!(as_type::<Error>(&multi).unwrap().code(), "b");
        assert_eq!(as_type::<io::Error>(&multi).unwrap().to_string(), "first");
    }

    #[test]
    fn test_is_of_type() {
        let err = Error::wrap(LOAD_FAILED, io_error("disk"));
        assert!(is_of_type::<Error>(&err));
        assert!(is_of_type::<io::Error>(&err));
        assert!(!is_of_type::<CodeError>(&err));

        let plain = io_error("disk");
        assert!(!is_of_type::<Error>(&plain as &(dyn StdError + 'static)));
    }

    #[test]
    fn test_is_of_type_skips_branches() {
        let multi = MultiError::new([io_error("a")]);
        assert!(is_of_type::<MultiError>(&multi));
        assert!(!is_of_type::<io::Error>(&multi));
        assert!(as_type::<io::Error>(&multi).is_some());
    }

    #[test]
    fn test_details_of_type() {
        let root = Error::new(NOT_FOUND).with_details(Attempt(1));
        let middle = Error::wrap(LOAD_FAILED, root).with_details("unrelated");
        let outer = Error::wrap(LOAD_FAILED, middle).with_details(Attempt(3));

        assert_eq!(details_of_type::<Attempt>(&outer, false), Some(&Attempt(3)));
        assert_eq!(details_of_type::<Attempt>(&outer, true), Some(&Attempt(1)));
        assert_eq!(details_of_type::<&str>(&outer, false), Some(&"unrelated"));
        assert_eq!(details_of_type::<u64>(&outer, false), None);
    }

    #[test]
    fn test_find_capabilities() {
        let err = Error::wrap(
            LOAD_FAILED,
            Error::new(NOT_FOUND)
                .with_message("inner message")
                .with_details(Attempt(2)),
        );

        assert_eq!(find_code(&err), Some(&LOAD_FAILED));
        assert_eq!(find_message(&err), Some("inner message"));
        assert_eq!(find_details(&err).unwrap().len(), 1);
        assert!(find_call_stack(&err).is_some());

        let plain = io_error("disk");
        let link = Link::from_std(&plain);
        assert_eq!(find_code(link), None);
        assert_eq!(find_message(link), None);
        assert!(find_details(link).is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&Error::new(NOT_FOUND)), &NOT_FOUND);

        let plain = io_error("disk");
        assert_eq!(classify(Link::from_std(&plain)), &ErrorCode::UNEXPECTED);

        let one = MultiError::default()
            .with(io_error("foo"))
            .with(Error::new(ErrorCode::new("custom-code")));
        assert_eq!(classify(&one), "custom-code");

        let two = MultiError::new([
            Error::new(ErrorCode::new("custom-code")),
            Error::new(ErrorCode::new("custom-code-2")),
        ]);
        assert_eq!(classify(&two), &ErrorCode::UNEXPECTED);

        assert!(is_code(&Error::new(NOT_FOUND), &NOT_FOUND));
        assert!(!is_code(&Error::new(NOT_FOUND), &LOAD_FAILED));
    }

    #[test]
    fn test_std_objects_are_lifted() {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(Error::new(NOT_FOUND));
        let link = Link::from(&*boxed);
        assert_eq!(link.code(), Some(&NOT_FOUND));
        assert!(link.report().is_some());
    }
}
