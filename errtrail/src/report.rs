//! The capability surface of errors in a chain
//!
//! Every capability is optional. [`Error`](crate::Error) exposes all of them;
//! plain `std` errors expose none; custom error types pick what they need by
//! implementing [`Report`] and overriding the matching methods.

use crate::{CallStack, Cause, ErrorCode};
use serde::Serialize;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

/// Conversions from a concrete error to `std` error trait objects.
///
/// Implemented for every `std::error::Error + Send + Sync + 'static`, which
/// lets [`Report`] trait objects be inspected and downcast as plain errors.
pub trait AsStdError {
    /// Borrow as a `std` error trait object
    fn as_std_error(&self) -> &(dyn StdError + Send + Sync + 'static);

    /// Convert a boxed value into a boxed `std` error trait object
    fn into_std_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static>;
}

impl<T: StdError + Send + Sync + 'static> AsStdError for T {
    fn as_std_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_std_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }
}

/// An error that exposes some of the decoration capabilities.
///
/// # Example
///
/// ```rust
/// use errtrail::{Cause, Error, ErrorCode, Report};
/// use std::fmt;
///
/// #[derive(Debug)]
/// struct Throttled;
///
/// impl fmt::Display for Throttled {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         f.write_str("too many requests")
///     }
/// }
///
/// impl std::error::Error for Throttled {}
///
/// static THROTTLED: ErrorCode = ErrorCode::new("api:throttled");
///
/// impl Report for Throttled {
///     fn code(&self) -> Option<&ErrorCode> {
///         Some(&THROTTLED)
///     }
/// }
///
/// let err = Error::cast(Cause::report(Throttled));
/// assert_eq!(err.code(), &THROTTLED);
/// ```
pub trait Report: StdError + AsStdError + Send + Sync + 'static {
    /// Human-readable message, if one was attached
    fn message(&self) -> Option<&str> {
        None
    }

    /// Classification code
    fn code(&self) -> Option<&ErrorCode> {
        None
    }

    /// Attached detail payloads, in attachment order
    fn details(&self) -> &[Detail] {
        &[]
    }

    /// Call stack recorded when the error was created
    fn call_stack(&self) -> Option<&CallStack> {
        None
    }

    /// A custom multi-line representation used by verbose formatting
    fn formatted(&self) -> Option<String> {
        None
    }

    /// The single directly wrapped error.
    ///
    /// When this returns `None` and [`branches`](Self::branches) is empty,
    /// traversal falls back to `std::error::Error::source`.
    fn inner(&self) -> Option<&Cause> {
        None
    }

    /// Sub-errors of an aggregate error, in declared order
    fn branches(&self) -> &[Cause] {
        &[]
    }

    /// Name of the concrete type
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// =============================================================================
// Details
// =============================================================================

/// A value that can be attached to an error as a detail.
///
/// Implemented for every serializable, debuggable, thread-safe type.
pub trait Payload: Any + fmt::Debug + Send + Sync {
    /// Encode the payload as JSON
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    /// Borrow as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;
}

impl<T> Payload for T
where
    T: Serialize + fmt::Debug + Send + Sync + 'static,
{
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed payload attached to an error for structured context.
pub struct Detail {
    payload: Box<dyn Payload>,
    type_name: &'static str,
}

impl Detail {
    /// Wrap a payload
    pub fn new<T: Payload>(payload: T) -> Self {
        Self {
            payload: Box::new(payload),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The payload, if it is of type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }

    /// Whether the payload is of type `T`
    pub fn is<T: Any>(&self) -> bool {
        self.payload.as_any().is::<T>()
    }

    /// Encode the payload as JSON
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        self.payload.to_json()
    }

    /// Name of the payload's concrete type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.payload, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, PartialEq)]
    struct Request {
        id: u32,
    }

    #[test]
    fn test_detail_downcast() {
        let detail = Detail::new(Request { id: 7 });
        assert!(detail.is::<Request>());
        assert_eq!(detail.downcast_ref::<Request>(), Some(&Request { id: 7 }));
        assert_eq!(detail.downcast_ref::<String>(), None);
        assert!(detail.type_name().ends_with("Request"));
    }

    #[test]
    fn test_detail_to_json() {
        let detail = Detail::new(Request { id: 7 });
        assert_eq!(detail.to_json().unwrap(), json!({ "id": 7 }));
    }

    #[test]
    fn test_detail_to_json_failure() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON keys");
        let detail = Detail::new(map);
        assert!(detail.to_json().is_err());
    }

    #[test]
    fn test_detail_debug_shows_payload() {
        let detail = Detail::new(Request { id: 7 });
        assert_eq!(format!("{:?}", detail), "Request { id: 7 }");
    }
}
