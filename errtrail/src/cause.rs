//! Owned inner errors and aggregates

use crate::{Error, ErrorCode, Link, Report};
use std::error::Error as StdError;
use std::fmt;

/// The owned inner error of a wrapper.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a `Cause`.
/// [`Error`] and [`MultiError`] values keep their capabilities through that
/// conversion; other types implementing [`Report`] keep theirs when passed
/// through [`Cause::report`].
pub struct Cause(Repr);

enum Repr {
    Report(Box<dyn Report>),
    Plain {
        error: Box<dyn StdError + Send + Sync + 'static>,
        type_name: &'static str,
    },
}

impl Cause {
    /// A cause exposing the capabilities of `report`
    pub fn report<R: Report>(report: R) -> Self {
        Cause(Repr::Report(Box::new(report)))
    }

    /// A cause from an already boxed error.
    ///
    /// The concrete type is erased by the box, so unless the error is an
    /// [`Error`] or [`MultiError`] its type name reads `dyn std::error::Error`.
    /// Use [`boxed_as`](Self::boxed_as) when the name is known.
    pub fn boxed(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self::from_boxed(error, "dyn std::error::Error")
    }

    /// A cause from an already boxed error whose concrete type is `type_name`
    pub fn boxed_as(
        error: Box<dyn StdError + Send + Sync + 'static>,
        type_name: &'static str,
    ) -> Self {
        Self::from_boxed(error, type_name)
    }

    fn from_boxed(error: Box<dyn StdError + Send + Sync + 'static>, type_name: &'static str) -> Self {
        let error = match error.downcast::<Error>() {
            Ok(err) => return Cause(Repr::Report(err)),
            Err(error) => error,
        };
        match error.downcast::<MultiError>() {
            Ok(multi) => Cause(Repr::Report(multi)),
            Err(error) => Cause(Repr::Plain { error, type_name }),
        }
    }

    /// A borrowed view of this cause for traversal
    pub fn link(&self) -> Link<'_> {
        match &self.0 {
            Repr::Report(report) => Link::from_report(report.as_ref()),
            Repr::Plain { error, type_name } => Link::from_plain(error.as_ref(), *type_name),
        }
    }

    /// The cause as a `std` error
    pub fn as_std_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match &self.0 {
            Repr::Report(report) => report.as_std_error(),
            Repr::Plain { error, .. } => error.as_ref(),
        }
    }

    /// The cause's capabilities, if it exposes any
    pub fn as_report(&self) -> Option<&dyn Report> {
        match &self.0 {
            Repr::Report(report) => Some(report.as_ref()),
            Repr::Plain { .. } => None,
        }
    }

    /// The cause itself, if it is of type `T`
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.as_std_error().downcast_ref::<T>()
    }

    /// Whether the cause itself is of type `T`
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.as_std_error().is::<T>()
    }

    /// Unbox into an [`Error`] if the cause is one
    pub fn into_error(self) -> Result<Error, Cause> {
        if !self.is::<Error>() {
            return Err(self);
        }
        match self.into_boxed().downcast::<Error>() {
            Ok(err) => Ok(*err),
            Err(other) => Err(Cause::boxed(other)),
        }
    }

    /// Unbox into a `std` error trait object
    pub fn into_boxed(self) -> Box<dyn StdError + Send + Sync + 'static> {
        match self.0 {
            Repr::Report(report) => report.into_std_error(),
            Repr::Plain { error, .. } => error,
        }
    }
}

impl<E: StdError + Send + Sync + 'static> From<E> for Cause {
    fn from(err: E) -> Self {
        Cause::from_boxed(Box::new(err), std::any::type_name::<E>())
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_std_error(), f)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_std_error(), f)
    }
}

// =============================================================================
// CodeError
// =============================================================================

/// The root cause of errors created from nothing but a code.
///
/// Its text is the code itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeError(pub ErrorCode);

impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for CodeError {}

// =============================================================================
// MultiError
// =============================================================================

/// An aggregate of several independent errors.
///
/// An aggregate ends the single-unwrap chain; typed queries descend into
/// each branch in declared order.
///
/// ```rust
/// use errtrail::{Error, ErrorCode, MultiError};
///
/// let multi = MultiError::new([
///     Error::new(ErrorCode::new("a")),
///     Error::new(ErrorCode::new("b")),
/// ]);
/// assert_eq!(multi.to_string(), "a\nb");
/// ```
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<Cause>,
}

impl MultiError {
    /// Aggregate errors of one type
    pub fn new<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Cause>,
    {
        Self {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a branch
    pub fn push(&mut self, err: impl Into<Cause>) {
        self.errors.push(err.into());
    }

    /// Append a branch (chainable)
    pub fn with(mut self, err: impl Into<Cause>) -> Self {
        self.push(err);
        self
    }

    /// Number of branches
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no branches
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate the branches in declared order
    pub fn iter(&self) -> impl Iterator<Item = &Cause> {
        self.errors.iter()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl StdError for MultiError {}

impl Report for MultiError {
    fn branches(&self) -> &[Cause] {
        &self.errors
    }
}
