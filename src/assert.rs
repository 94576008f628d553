//! Assertions on a bound [`Invocation`].
//!
//! Every assertion opens exactly one sub-test named `<display-name>#<n>`,
//! then coerces the arguments, invokes the callable, coerces the expectations
//! and compares. Coercion and arity problems abort that sub-test; mismatches
//! fail it. Either way later assertions keep running. The return value is
//! whether the sub-test passed.

use std::{error::Error, fmt, panic::{self, AssertUnwindSafe}};

use crate::{
    signature::{ArgList, Callable, ReturnList, TrailingError},
    suite::{Failure, SubTest},
    value::Value,
    vals,
    Invocation,
};

/// What `errors_with` expects of the trailing error.
#[derive(Clone)]
pub enum ErrorExpectation {
    /// Any error will do.
    Any,
    /// The error's message must match exactly.
    Message(String),
    /// Both the message and the concrete error type must match.
    Kind {
        message: String,
        type_name: &'static str,
        matches: fn(&(dyn Error + 'static)) -> bool,
    },
}

fn is_kind<E: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    err.is::<E>()
}

impl ErrorExpectation {
    /// Expects an error with the same message and concrete type as `err`.
    pub fn kind<E: Error + 'static>(err: &E) -> Self {
        ErrorExpectation::Kind {
            message: err.to_string(),
            type_name: std::any::type_name::<E>(),
            matches: is_kind::<E>,
        }
    }

    fn check(&self, t: &mut SubTest, actual: &(dyn Error + 'static)) {
        match self {
            ErrorExpectation::Any => {}
            ErrorExpectation::Message(message) => {
                t.check_eq(message.as_str(), actual.to_string().as_str(), "error message mismatch");
            }
            ErrorExpectation::Kind {
                message,
                type_name,
                matches,
            } => {
                if !matches(actual) {
                    t.record(
                        Failure::new("error type mismatch")
                            .compare(*type_name, format!("{:?}", actual)),
                    );
                }
                t.check_eq(message.as_str(), actual.to_string().as_str(), "error message mismatch");
            }
        }
    }
}

impl fmt::Debug for ErrorExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorExpectation::Any => write!(f, "Any"),
            ErrorExpectation::Message(m) => f.debug_tuple("Message").field(m).finish(),
            ErrorExpectation::Kind {
                message, type_name, ..
            } => f
                .debug_struct("Kind")
                .field("message", message)
                .field("type_name", type_name)
                .finish(),
        }
    }
}

impl From<&str> for ErrorExpectation {
    fn from(message: &str) -> Self {
        ErrorExpectation::Message(message.to_string())
    }
}

impl From<String> for ErrorExpectation {
    fn from(message: String) -> Self {
        ErrorExpectation::Message(message)
    }
}

fn positions(list: &[usize]) -> String {
    list.iter()
        .map(|p| format!("#{}", p))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'f, 's, F, Args> Invocation<'f, 's, F, Args>
where
    F: Callable<Args>,
    Args: ArgList,
{
    /// Asserts the callable returns exactly `expected`, one literal per
    /// declared return value. `NIL` stands for the zero value at its position.
    pub fn returns(self, expected: Vec<Value>) -> bool {
        let Invocation { function, args } = self;
        function.suite.run(&function.next_test_name(), |t| {
            let args = Args::from_values(args)?;
            let actual = function.callable.call(args);
            let expected = <F::Output as ReturnList>::from_values(expected)?;
            let differing = expected.differences(&actual);
            if !differing.is_empty() {
                t.record(
                    Failure::new(format!(
                        "{} returned unexpected value(s) at position {}",
                        function.name(),
                        positions(&differing)
                    ))
                    .compare(expected.render().join(", "), actual.render().join(", ")),
                );
            }
            Ok(())
        })
    }

    /// Asserts the last return value carries an error, whatever it is.
    pub fn errors(self) -> bool {
        self.errors_with(ErrorExpectation::Any)
    }

    /// Asserts the last return value carries an error matching `expected`:
    /// a message (`&str`/`String`) or [`ErrorExpectation::kind`].
    pub fn errors_with(self, expected: impl Into<ErrorExpectation>) -> bool {
        let expected = expected.into();
        let Invocation { function, args } = self;
        function.suite.run(&function.next_test_name(), |t| {
            let args = Args::from_values(args)?;
            let actual = function.callable.call(args);
            match actual.trailing_error() {
                TrailingError::Nothing => {
                    t.fail(format!("{} does not return anything", function.name()));
                }
                TrailingError::NotAnError(type_name) => {
                    t.fail(format!(
                        "last return value ({}) is not an error",
                        type_name
                    ));
                }
                TrailingError::Absent => {
                    t.record(
                        Failure::new("expected an error, got none")
                            .compare(format!("{:?}", expected), actual.render().join(", ")),
                    );
                }
                TrailingError::Present(err) => expected.check(t, err),
            }
            Ok(())
        })
    }

    /// Asserts the callable panics, with any payload.
    pub fn panics(self) -> bool {
        self.expect_panic(None)
    }

    /// Asserts the callable panics with `expected` as payload. A textual
    /// expectation against a non-textual payload compares the payload's
    /// debug form, so a `char` payload `'x'` matches `"'x'"`.
    pub fn panics_with(self, expected: impl Into<Value>) -> bool {
        self.expect_panic(Some(expected.into()))
    }

    fn expect_panic(self, expected: Option<Value>) -> bool {
        let Invocation { function, args } = self;
        function.suite.run(&function.next_test_name(), |t| {
            let args = Args::from_values(args)?;
            let result = panic::catch_unwind(AssertUnwindSafe(|| function.callable.call(args)));
            let payload = match result {
                Ok(returned) => {
                    t.record(
                        Failure::new(format!("{} did not panic", function.name()))
                            .compare("a panic", returned.render().join(", ")),
                    );
                    return Ok(());
                }
                Err(payload) => Value::from_panic(payload),
            };
            if let Some(expected) = expected {
                let matched = if expected.is_textual() && !payload.is_textual() {
                    expected.to_string() == format!("{:?}", payload)
                } else {
                    expected == payload
                };
                if !matched {
                    t.record(
                        Failure::new("panic value mismatch")
                            .compare(format!("{:?}", expected), format!("{:?}", payload)),
                    );
                }
            }
            Ok(())
        })
    }
}

impl<'f, 's, F, Args> Invocation<'f, 's, F, Args>
where
    F: Callable<Args, Output = bool>,
    Args: ArgList,
{
    /// Shorthand for `returns(vals![true])`.
    pub fn is_true(self) -> bool {
        self.returns(vals![true])
    }

    /// Shorthand for `returns(vals![false])`.
    pub fn is_false(self) -> bool {
        self.returns(vals![false])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteConfig;
    use crate::suite::{Status, Suite};
    use crate::function;

    fn suite() -> Suite {
        Suite::with_config("assert", SuiteConfig::default().colors(false))
    }

    fn remainder(a: i32, b: i32) -> (i32, i32) {
        (a / b, a % b)
    }

    #[test]
    fn returns_reports_differing_positions() {
        let suite = suite();
        let f = function(&suite, remainder);
        assert!(f.call(vals![10, 3]).returns(vals![3, 1]));
        assert!(!f.call(vals![10, 3]).returns(vals![3, 2]));
        let report = suite.finish();
        let failed = report.outcome("assert/remainder#2").unwrap();
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(
            failed.failures[0].message,
            "remainder returned unexpected value(s) at position #2"
        );
        assert_eq!(failed.failures[0].expected.as_deref(), Some("3, 2"));
        assert_eq!(failed.failures[0].actual.as_deref(), Some("3, 1"));
    }

    #[test]
    fn wrong_expectation_count_aborts() {
        let suite = suite();
        let f = function(&suite, remainder);
        assert!(!f.call(vals![10, 3]).returns(vals![3]));
        assert!(!f.call(vals![10]).returns(vals![3, 1]));
        let report = suite.finish();
        assert_eq!(
            report.outcome("assert/remainder#1").unwrap().status,
            Status::Aborted
        );
        assert_eq!(
            report.outcome("assert/remainder#2").unwrap().failures[0].message,
            "expected 2 argument(s), got 1"
        );
    }

    #[test]
    fn error_expectation_kinds() {
        let kind = ErrorExpectation::kind(&std::fmt::Error);
        let err: &(dyn Error + 'static) = &std::fmt::Error;
        match &kind {
            ErrorExpectation::Kind { matches, .. } => assert!(matches(err)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            ErrorExpectation::from("x"),
            ErrorExpectation::Message(m) if m == "x"
        ));
    }
}
