// # HTTP Handler Testing
//
// Table-driven tests for axum handlers, plus a throwaway live server for code
// that needs a real endpoint.
//
// ## Module Structure
//
// - **`harness`**: `HttpTest`, `MultiHttpTest` and `serve_http`, which
//   dispatches requests in-process through `tower::ServiceExt::oneshot`
// - **`server`**: `start_http_server`, a background listener whose routes can
//   be added after it starts
// - **`responses`**: canned handlers returning an empty, string or JSON body

mod harness;
mod responses;
mod server;

pub use harness::{
    serve_http, BeforeFn, CheckFn, FinallyFn, HttpHarness, HttpTest, HttpTester, MultiHttpTest,
    Recorded, RequestInfo,
};
pub use responses::{empty_response, json_response, string_response};
pub use server::{start_http_server, HttpServer};

/// Sub-test names cannot contain `:`, so it is dropped.
pub(crate) fn safe_test_name(name: &str) -> String {
    name.replace(':', "")
}
