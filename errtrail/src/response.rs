//! Projection of an error chain into a flat response record
//!
//! The record carries the classification code, the safe message, an optional
//! status and the attached details. The text of the underlying error is left
//! out unless [`ResponseOptions::expose_error`] is set.

use crate::chain::{self, Link};
use crate::{format, Detail, Error, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Failure to encode a response.
#[derive(Debug, ThisError)]
pub enum EncodeError {
    #[error("details of type {type_name} cannot be encoded: {source}")]
    Details {
        type_name: &'static str,
        source: serde_json::Error,
    },

    #[error("response cannot be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for building a [`ResponseModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Put the text of the underlying error into the `Error` field
    pub expose_error: bool,
}

impl ResponseOptions {
    /// Set [`expose_error`](Self::expose_error)
    pub fn exposing_error(mut self) -> Self {
        self.expose_error = true;
        self
    }
}

/// A flat, transport-neutral snapshot of an error.
///
/// Serializes as
/// `{"Code": .., "Message"?: .., "Status"?: .., "Details"?: .., "Error"?: ..}`
/// with absent fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseModel {
    pub code: ErrorCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseModel {
    /// Build the record for `err`; a `status` of 0 is left out
    pub fn from_error<'a>(err: impl Into<Link<'a>>, status: u16) -> Result<Self, EncodeError> {
        Self::from_error_with(err, status, &ResponseOptions::default())
    }

    /// Build the record for `err` with explicit options
    pub fn from_error_with<'a>(
        err: impl Into<Link<'a>>,
        status: u16,
        options: &ResponseOptions,
    ) -> Result<Self, EncodeError> {
        let link = err.into();

        let details = match chain::find_details(link) {
            Some(details) => encode_details(details)?,
            None => None,
        };

        Ok(Self {
            code: chain::classify(link).clone(),
            message: link.message().map(str::to_owned),
            status: (status != 0).then_some(status),
            details,
            error: options.expose_error.then(|| exposed_text(link)),
        })
    }
}

impl Error {
    /// Build the response record for this error
    pub fn to_response_model(&self, status: u16) -> Result<ResponseModel, EncodeError> {
        ResponseModel::from_error(self, status)
    }
}

/// One attachment is encoded as itself, several as an array.
fn encode_details(details: &[Detail]) -> Result<Option<serde_json::Value>, EncodeError> {
    let mut values = details
        .iter()
        .map(|detail| {
            detail.to_json().map_err(|source| EncodeError::Details {
                type_name: detail.type_name(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        serde_json::Value::Array(values)
    };

    Ok((!value.is_null()).then_some(value))
}

fn exposed_text(link: Link<'_>) -> String {
    let root = chain::unwrap_full(link);
    if root.report().is_none() {
        root.to_string()
    } else {
        format::short_form(root)
    }
}

// =============================================================================
// JSON encoding
// =============================================================================

/// Encode `err` as pretty-printed JSON
pub fn to_json<'a>(err: impl Into<Link<'a>>, status: u16) -> Result<Vec<u8>, EncodeError> {
    to_json_with(err, status, &ResponseOptions::default())
}

/// Encode `err` as pretty-printed JSON with explicit options
pub fn to_json_with<'a>(
    err: impl Into<Link<'a>>,
    status: u16,
    options: &ResponseOptions,
) -> Result<Vec<u8>, EncodeError> {
    let model = ResponseModel::from_error_with(err, status, options)?;
    Ok(serde_json::to_vec_pretty(&model)?)
}

/// Encode `err` as a pretty-printed JSON string
pub fn to_json_string<'a>(err: impl Into<Link<'a>>, status: u16) -> Result<String, EncodeError> {
    let model = ResponseModel::from_error(err, status)?;
    Ok(serde_json::to_string_pretty(&model)?)
}

/// Like [`to_json`], panicking when encoding fails.
///
/// Meant for responses built from constant, known-good payloads.
pub fn must_json<'a>(err: impl Into<Link<'a>>, status: u16) -> Vec<u8> {
    match to_json(err, status) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode error response");
            panic!("failed to encode error response: {}", e)
        }
    }
}

/// Like [`to_json_string`], panicking when encoding fails
pub fn must_json_string<'a>(err: impl Into<Link<'a>>, status: u16) -> String {
    match to_json_string(err, status) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode error response");
            panic!("failed to encode error response: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cause, Report};
    use serde_json::json;
    use std::error::Error as StdError;
    use std::fmt;
    use std::io;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Context {
        foo: &'static str,
        bar: i32,
    }

    /// Carries details but no code
    #[derive(Debug)]
    struct DetailedError {
        inner: Cause,
        details: Vec<Detail>,
    }

    impl fmt::Display for DetailedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt::Display::fmt(&self.inner, f)
        }
    }

    impl StdError for DetailedError {}

    impl Report for DetailedError {
        fn details(&self) -> &[Detail] {
            &self.details
        }

        fn inner(&self) -> Option<&Cause> {
            Some(&self.inner)
        }
    }

    fn detailed_error() -> Error {
        Error::cast(Cause::report(DetailedError {
            inner: Error::new(ErrorCode::new("some-error"))
                .with_message("an error with details")
                .into(),
            details: vec![Detail::new(Context { foo: "foo", bar: 123 })],
        }))
    }

    fn json_of(err: &Error, status: u16) -> serde_json::Value {
        serde_json::from_slice(&to_json(err, status).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_error_json() {
        let plain = io::Error::new(io::ErrorKind::Other, "some error");
        let link = Link::from_std(&plain);

        assert_eq!(
            to_json_string(link, 0).unwrap(),
            "{\n  \"Code\": \"unexpected-error\"\n}"
        );
        assert_eq!(
            to_json_string(link, 400).unwrap(),
            "{\n  \"Code\": \"unexpected-error\",\n  \"Status\": 400\n}"
        );
    }

    #[test]
    fn test_wrapped_error_json() {
        let err = Error::wrap(
            ErrorCode::new("some-error-code"),
            io::Error::new(io::ErrorKind::Other, "some error"),
        )
        .with_message("some message");

        assert_eq!(
            json_of(&err, 0),
            json!({ "Code": "some-error-code", "Message": "some message" })
        );
        assert_eq!(
            to_json_string(&err, 400).unwrap(),
            "{\n  \"Code\": \"some-error-code\",\n  \"Message\": \"some message\",\n  \"Status\": 400\n}"
        );
    }

    #[test]
    fn test_details_from_inner_link() {
        let err = detailed_error();
        assert_eq!(
            json_of(&err, 500),
            json!({
                "Code": "unexpected-error",
                "Status": 500,
                "Details": { "Foo": "foo", "Bar": 123 }
            })
        );

        let wrapped = Error::wrap(ErrorCode::new("some-detailed-error-wrapped"), err)
            .with_message("some detailed error wrapped");
        assert_eq!(
            json_of(&wrapped, 500),
            json!({
                "Code": "some-detailed-error-wrapped",
                "Message": "some detailed error wrapped",
                "Status": 500,
                "Details": { "Foo": "foo", "Bar": 123 }
            })
        );
    }

    #[test]
    fn test_several_details_become_an_array() {
        let err = Error::new(ErrorCode::new("batch:failed"))
            .with_details(1u32)
            .with_details("two");
        assert_eq!(json_of(&err, 0)["Details"], json!([1, "two"]));
    }

    #[test]
    fn test_null_details_are_omitted() {
        let err = Error::new(ErrorCode::new("batch:failed")).with_details(());
        let model = err.to_response_model(0).unwrap();
        assert_eq!(model.details, None);
    }

    #[test]
    fn test_inner_text_is_not_leaked() {
        let err = Error::wrap(
            ErrorCode::new("db:fail"),
            io::Error::new(io::ErrorKind::Other, "secret connection string leaked"),
        );
        let json = to_json_string(&err, 500).unwrap();
        assert!(!json.contains("secret connection string leaked"));

        let model = err.to_response_model(500).unwrap();
        assert_eq!(model.error, None);
    }

    #[test]
    fn test_expose_error() {
        let options = ResponseOptions::default().exposing_error();

        let err = Error::wrap(
            ErrorCode::new("db:fail"),
            io::Error::new(io::ErrorKind::Other, "connection refused"),
        );
        let json = to_json_with(&err, 500, &options).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["Error"], json!("connection refused"));

        let err = Error::wrap(ErrorCode::new("config:load-failed"), Error::new(ErrorCode::new("files:not-found")));
        let model = ResponseModel::from_error_with(&err, 0, &options).unwrap();
        assert_eq!(model.error.as_deref(), Some("files:not-found"));
    }

    #[test]
    fn test_details_encoding_failure() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys");
        let err = Error::new(ErrorCode::new("x")).with_details(map);

        match to_json(&err, 0) {
            Err(EncodeError::Details { type_name, .. }) => assert!(type_name.contains("HashMap")),
            other => panic!("expected a details failure, got {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "failed to encode error response")]
    fn test_must_json_panics() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys");
        let err = Error::new(ErrorCode::new("x")).with_details(map);
        let _ = must_json(&err, 0);
    }

    #[test]
    fn test_must_json_string() {
        let err = Error::new(ErrorCode::new("x"));
        assert_eq!(must_json_string(&err, 0), "{\n  \"Code\": \"x\"\n}");
        assert_eq!(must_json(&err, 0), must_json_string(&err, 0).into_bytes());
    }

    #[test]
    fn test_round_trip() {
        let err = detailed_error();
        let wrapped = Error::wrap(ErrorCode::new("wrapped"), err).with_message("m");
        let options = ResponseOptions::default().exposing_error();

        let json = to_json_with(&wrapped, 418, &options).unwrap();
        let decoded: ResponseModel = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, ResponseModel::from_error_with(&wrapped, 418, &options).unwrap());
        assert_eq!(decoded.code, "wrapped");
        assert_eq!(decoded.status, Some(418));
        assert_eq!(decoded.details, Some(json!({ "Foo": "foo", "Bar": 123 })));
    }
}
