//! # tf
//!
//! Parametrized testing without table boilerplate. Wrap a function once, then
//! state one expectation per line:
//!
//! ```rust
//! use tf::{function, vals, Suite, NIL};
//!
//! fn remainder(a: i32, b: i32) -> (i32, i32) {
//!     (a / b, a % b)
//! }
//!
//! fn first(words: Vec<String>) -> Option<String> {
//!     words.into_iter().next()
//! }
//!
//! let suite = Suite::new("readme");
//!
//! let remainder = function(&suite, remainder);
//! remainder.call(vals![10, 3]).returns(vals![3, 1]); // remainder#1
//! remainder.call(vals![17, 7]).returns(vals![2, 3]); // remainder#2
//!
//! let first = function(&suite, first);
//! first.call(vals![Vec::<String>::new()]).returns(vals![NIL]);
//!
//! suite.finish();
//! ```
//!
//! Arguments and expectations are untyped literals, coerced to the declared
//! parameter and return types; `NIL` always means the zero value of the
//! declared type. Each assertion runs as its own sub-test of the [`Suite`],
//! named after the callable and numbered in call order.
//!
//! Also included: table tests for axum handlers ([`serve_http`]), a
//! background server for code that needs a real endpoint
//! ([`start_http_server`]) and scoped environment overrides ([`set_env`]).

pub mod assert;
pub mod coerce;
pub mod config;
pub mod env;
pub mod error;
pub mod function;
pub mod http;
pub mod registry;
pub mod signature;
pub mod suite;
pub mod value;

pub use crate::assert::ErrorExpectation;
pub use crate::coerce::Coerce;
pub use crate::config::SuiteConfig;
pub use crate::env::{set_env, set_envs, EnvGuard};
pub use crate::error::{CoerceError, TfError, TfResult};
pub use crate::function::{function, Function, Invocation};
pub use crate::http::{
    empty_response, json_response, serve_http, start_http_server, string_response, HttpHarness,
    HttpServer, HttpTest, HttpTester, MultiHttpTest, Recorded, RequestInfo,
};
pub use crate::registry::CallRegistry;
pub use crate::signature::{display_name, Signature};
pub use crate::suite::{Failure, Outcome, Status, SubTest, Suite, SuiteReport, TestSummary};
pub use crate::value::{Value, NIL};
