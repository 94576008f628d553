//! Error types for the tf test helpers.
//!
//! Every failure that is not an ordinary assertion mismatch is a [`TfError`].
//! Inside a sub-test these errors abort the sub-test (they are "fatal" to it);
//! outside a sub-test they are returned to the caller. Diagnostics are exposed
//! through `miette` so reports carry a stable code and an actionable help line.

use miette::Diagnostic;
use thiserror::Error;

/// Shorthand for results produced by this crate.
pub type TfResult<T> = Result<T, TfError>;

/// Why a literal could not be converted into a declared type.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum CoerceError {
    #[error("{found} value {value} is not convertible to {target}")]
    #[diagnostic(code(tf::coerce::incompatible))]
    Incompatible {
        found: &'static str,
        value: String,
        target: &'static str,
    },

    #[error("{value} is out of range for {target}")]
    #[diagnostic(code(tf::coerce::out_of_range))]
    OutOfRange { value: String, target: &'static str },
}

impl CoerceError {
    pub fn incompatible(value: &crate::Value, target: &'static str) -> Self {
        CoerceError::Incompatible {
            found: value.kind(),
            value: value.to_string(),
            target,
        }
    }

    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        CoerceError::OutOfRange {
            value: value.to_string(),
            target,
        }
    }
}

/// The single error type surfaced by the public API.
#[derive(Error, Diagnostic, Debug)]
pub enum TfError {
    #[error("expected {expected} argument(s), got {actual}")]
    #[diagnostic(
        code(tf::config::argument_count),
        help("pass exactly one value per declared parameter; use NIL for a zero value")
    )]
    ArgumentCount { expected: usize, actual: usize },

    #[error("expected {expected} return value(s), got {actual} expectation(s)")]
    #[diagnostic(
        code(tf::config::return_count),
        help("pass exactly one expected value per declared return value")
    )]
    ReturnCount { expected: usize, actual: usize },

    #[error("cannot coerce argument #{position} into {target}: {source}")]
    #[diagnostic(code(tf::coerce::argument))]
    Argument {
        position: usize,
        target: &'static str,
        #[source]
        source: CoerceError,
    },

    #[error("cannot coerce expected value #{position} into {target}: {source}")]
    #[diagnostic(code(tf::coerce::expectation))]
    Expectation {
        position: usize,
        target: &'static str,
        #[source]
        source: CoerceError,
    },

    #[error("invalid environment variable name {name:?}")]
    #[diagnostic(
        code(tf::env::name),
        help("names must be non-empty and must not contain '=' or NUL")
    )]
    EnvName { name: String },

    #[error("invalid value for environment variable {name}")]
    #[diagnostic(code(tf::env::value), help("values must not contain NUL"))]
    EnvValue { name: String },

    #[error("invalid header {name:?}: {message}")]
    #[diagnostic(code(tf::http::header))]
    Header { name: String, message: String },

    #[error("failed to build request: {0}")]
    #[diagnostic(code(tf::http::request))]
    Request(#[from] axum::http::Error),

    #[error("failed to read response body: {0}")]
    #[diagnostic(code(tf::http::body))]
    Body(#[from] axum::Error),

    #[error("failed to encode JSON body: {0}")]
    #[diagnostic(code(tf::http::json))]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(tf::io))]
    Io(#[from] std::io::Error),

    #[error("http server: {message}")]
    #[diagnostic(code(tf::http::server))]
    Server { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn coerce_error_messages_name_both_sides() {
        let err = CoerceError::incompatible(&Value::from("abc"), "i32");
        assert_eq!(err.to_string(), "string value abc is not convertible to i32");

        let err = CoerceError::out_of_range(300, "i8");
        assert_eq!(err.to_string(), "300 is out of range for i8");
    }

    #[test]
    fn argument_errors_carry_position_and_code() {
        let err = TfError::Argument {
            position: 2,
            target: "u8",
            source: CoerceError::out_of_range(-1, "u8"),
        };
        assert_eq!(
            err.to_string(),
            "cannot coerce argument #2 into u8: -1 is out of range for u8"
        );
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("tf::coerce::argument"));
    }

    #[test]
    fn count_errors_have_help() {
        let err = TfError::ArgumentCount {
            expected: 2,
            actual: 3,
        };
        assert!(err.help().is_some());
    }
}
