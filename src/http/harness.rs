//! In-process table tests for HTTP handlers.
//!
//! ```rust
//! use axum::{http::StatusCode, routing::get, Router};
//! use tf::{serve_http, HttpTest, Suite};
//!
//! let suite = Suite::new("hello");
//! let router = Router::new().route("/hello", get(|| async { "hi" }));
//! let harness = serve_http(&suite, router).unwrap();
//! harness.test(
//!     &HttpTest::get("/hello")
//!         .expect_status(StatusCode::OK)
//!         .expect_body("hi"),
//! );
//! suite.finish();
//! ```

use std::{collections::BTreeMap, fmt};

use axum::{
    body::{Body, Bytes},
    http::{
        header::{HeaderName, HeaderValue},
        HeaderMap, Method, Request, StatusCode, Uri,
    },
    Router,
};
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, Runtime};
use tower::ServiceExt;
use tracing::debug;

use super::safe_test_name;
use crate::{error::{TfError, TfResult}, suite::{Suite, SubTest}};

/// Runs before the built-in assertions; returning `false` skips them.
pub type CheckFn = Box<dyn Fn(&mut SubTest, &RequestInfo, &Recorded) -> bool>;
/// Runs after the request is set up, just before it is dispatched.
pub type BeforeFn = Box<dyn Fn(&mut Request<Body>)>;
/// Always runs last. The response is absent when dispatch never completed.
pub type FinallyFn = Box<dyn Fn(&RequestInfo, Option<&Recorded>)>;

/// What was sent, as seen by the hooks.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestInfo {
    fn capture(request: &Request<Body>, body: &Bytes) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            body: body.clone(),
        }
    }
}

/// A fully collected response.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> TfResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Header value as text, or empty when missing or not valid text.
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

// ============================================================================
// TEST TABLES
// ============================================================================

/// One request and the response it should produce.
///
/// Unset expectations are not checked: `status` only when set,
/// `response_body` only when set, and only the headers listed in
/// `response_headers`.
#[derive(Default)]
pub struct HttpTest {
    /// Sub-test name. Defaults to `"<METHOD> <path>"`.
    pub name: String,
    /// Defaults to `GET`.
    pub method: Option<Method>,
    /// Defaults to `/`.
    pub path: String,
    pub request_body: Option<Bytes>,
    /// Added to the request, replacing any existing value.
    pub request_headers: BTreeMap<String, String>,
    /// Must match exactly.
    pub response_headers: BTreeMap<String, String>,
    pub response_body: Option<Bytes>,
    pub status: Option<StatusCode>,
    pub check: Option<CheckFn>,
    pub before: Option<BeforeFn>,
    pub finally: Option<FinallyFn>,
}

impl HttpTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(method: Method, path: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::request(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::request(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::request(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::request(Method::DELETE, path)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn expect_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.insert(name.into(), value.into());
        self
    }

    pub fn expect_body(mut self, body: impl Into<Bytes>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&mut SubTest, &RequestInfo, &Recorded) -> bool + 'static,
    {
        self.check = Some(Box::new(check));
        self
    }

    pub fn before<F>(mut self, before: F) -> Self
    where
        F: Fn(&mut Request<Body>) + 'static,
    {
        self.before = Some(Box::new(before));
        self
    }

    pub fn finally<F>(mut self, finally: F) -> Self
    where
        F: Fn(&RequestInfo, Option<&Recorded>) + 'static,
    {
        self.finally = Some(Box::new(finally));
        self
    }

    pub fn real_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    pub fn real_path(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            &self.path
        }
    }

    fn build_request(&self) -> TfResult<Request<Body>> {
        let body = self
            .request_body
            .clone()
            .map(Body::from)
            .unwrap_or_else(Body::empty);
        let mut request = Request::builder()
            .method(self.real_method())
            .uri(self.real_path())
            .body(body)?;
        for (name, value) in &self.request_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|err| TfError::Header {
                    name: name.clone(),
                    message: err.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| TfError::Header {
                name: name.clone(),
                message: err.to_string(),
            })?;
            request.headers_mut().insert(header_name, header_value);
        }
        Ok(request)
    }
}

impl fmt::Debug for HttpTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTest")
            .field("name", &self.test_name())
            .field("request_headers", &self.request_headers)
            .field("response_headers", &self.response_headers)
            .field("status", &self.status)
            .field("check", &self.check.is_some())
            .field("before", &self.before.is_some())
            .field("finally", &self.finally.is_some())
            .finish()
    }
}

/// Several requests run in order against the same handler.
#[derive(Default)]
pub struct MultiHttpTest {
    pub name: String,
    /// Runs once, before the first step.
    pub before: Option<Box<dyn Fn()>>,
    pub steps: Vec<HttpTest>,
}

impl MultiHttpTest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn before<F: Fn() + 'static>(mut self, before: F) -> Self {
        self.before = Some(Box::new(before));
        self
    }

    pub fn step(mut self, step: HttpTest) -> Self {
        self.steps.push(step);
        self
    }
}

/// Anything [`HttpHarness::test`] can run: a single test or a sequence.
pub trait HttpTester {
    fn test_name(&self) -> String;

    fn tests(&self) -> Vec<&HttpTest>;

    /// Runs before any step.
    fn setup(&self) {}
}

impl HttpTester for HttpTest {
    fn test_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        format!("{} {}", self.real_method(), self.real_path())
    }

    fn tests(&self) -> Vec<&HttpTest> {
        vec![self]
    }
}

impl HttpTester for MultiHttpTest {
    fn test_name(&self) -> String {
        self.name.clone()
    }

    fn tests(&self) -> Vec<&HttpTest> {
        self.steps.iter().collect()
    }

    fn setup(&self) {
        if let Some(before) = &self.before {
            before();
        }
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Dispatches [`HttpTester`]s to a router, one sub-test each.
pub struct HttpHarness<'s> {
    suite: &'s Suite,
    router: Router,
    runtime: HarnessRuntime,
}

// Shut down in the background on drop: dropping a runtime from async code panics.
struct HarnessRuntime(Option<Runtime>);

impl HarnessRuntime {
    fn get(&self) -> TfResult<&Runtime> {
        self.0.as_ref().ok_or_else(|| TfError::Server {
            message: "harness runtime already shut down".to_string(),
        })
    }
}

impl Drop for HarnessRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Builds a harness that sends every request straight to `router`, without
/// opening a socket.
pub fn serve_http(suite: &Suite, router: Router) -> TfResult<HttpHarness<'_>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(HttpHarness {
        suite,
        router,
        runtime: HarnessRuntime(Some(runtime)),
    })
}

fn dispatch(runtime: &Runtime, router: Router, request: Request<Body>) -> TfResult<Recorded> {
    runtime.block_on(async move {
        let response = match router.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await?;
        Ok(Recorded {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    })
}

struct FinallyGuard<'a> {
    hook: Option<&'a FinallyFn>,
    request: RequestInfo,
    response: Option<Recorded>,
}

impl Drop for FinallyGuard<'_> {
    fn drop(&mut self) {
        if let Some(hook) = self.hook {
            hook(&self.request, self.response.as_ref());
        }
    }
}

impl<'s> HttpHarness<'s> {
    /// Runs `tests` as one sub-test. A sequence of more than one step runs
    /// each step as its own nested sub-test.
    pub fn test<T: HttpTester + ?Sized>(&self, tests: &T) -> bool {
        let name = safe_test_name(&tests.test_name());
        self.suite.run(&name, |t| {
            tests.setup();
            let steps = tests.tests();
            match steps.as_slice() {
                [] => Ok(()),
                [single] => self.exercise(t, single),
                many => {
                    for step in many {
                        t.run(&safe_test_name(&step.test_name()), |t| {
                            self.exercise(t, step)
                        });
                    }
                    Ok(())
                }
            }
        })
    }

    /// Sends one request through the router and returns the collected response.
    ///
    /// Safe to call from inside an async test: `block_on` cannot nest in a
    /// running runtime, so the request is then dispatched from a helper thread.
    pub fn send(&self, request: Request<Body>) -> TfResult<Recorded> {
        let router = self.router.clone();
        let runtime = self.runtime.get()?;
        if Handle::try_current().is_err() {
            return dispatch(runtime, router, request);
        }
        std::thread::scope(|scope| {
            scope
                .spawn(move || dispatch(runtime, router, request))
                .join()
        })
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    }

    fn exercise(&self, t: &mut SubTest, test: &HttpTest) -> TfResult<()> {
        let mut request = test.build_request()?;
        let body = test.request_body.clone().unwrap_or_default();
        let mut guard = FinallyGuard {
            hook: test.finally.as_ref(),
            request: RequestInfo::capture(&request, &body),
            response: None,
        };

        if let Some(before) = &test.before {
            before(&mut request);
            guard.request = RequestInfo::capture(&request, &body);
        }

        debug!(method = %request.method(), uri = %request.uri(), "dispatching request");
        let recorded = self.send(request)?;
        let recorded = guard.response.insert(recorded);

        if let Some(check) = &test.check {
            if !check(t, &guard.request, recorded) {
                return Ok(());
            }
        }

        if let Some(status) = test.status {
            if !t.check_eq(&status, &recorded.status, "status code") {
                return Ok(());
            }
        }

        for (name, expected) in &test.response_headers {
            let message = format!("response header {}", name);
            if !t.check_eq(expected.as_str(), recorded.header(name), message) {
                return Ok(());
            }
        }

        if let Some(expected) = &test.response_body {
            let expected = String::from_utf8_lossy(expected);
            t.check_eq(&*expected, recorded.text().as_str(), "response body");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_use_method_and_path() {
        assert_eq!(HttpTest::new().test_name(), "GET /");
        assert_eq!(HttpTest::post("/items").test_name(), "POST /items");
        assert_eq!(HttpTest::get("/x").named("custom").test_name(), "custom");
    }

    #[test]
    fn request_headers_are_validated() {
        let err = HttpTest::get("/")
            .header("bad header", "x")
            .build_request()
            .unwrap_err();
        assert!(matches!(err, TfError::Header { .. }));
    }

    #[test]
    fn request_carries_method_path_and_headers() {
        let request = HttpTest::put("/things/1")
            .header("X-Trace", "abc")
            .body("payload")
            .build_request()
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri().path(), "/things/1");
        assert_eq!(request.headers()["x-trace"], "abc");
    }

    #[test]
    fn multi_test_lists_steps_in_order() {
        let multi = MultiHttpTest::new("flow")
            .step(HttpTest::post("/a"))
            .step(HttpTest::get("/b"));
        let names: Vec<String> = multi.tests().iter().map(|t| t.test_name()).collect();
        assert_eq!(names, vec!["POST /a", "GET /b"]);
    }
}
