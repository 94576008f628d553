//! Canned handlers for stubbing out endpoints.
//!
//! Each returns a [`MethodRouter`] answering every method, ready for
//! `Router::route` or [`HttpServer::add_handler`](super::HttpServer::add_handler).

use axum::{body::Bytes, http::{header, StatusCode}, routing::{any, MethodRouter}};
use serde::Serialize;

use crate::error::TfResult;

/// Responds with `status` and an empty body.
pub fn empty_response(status: StatusCode) -> MethodRouter {
    string_response(status, "")
}

/// Responds with `status` and `body`.
pub fn string_response(status: StatusCode, body: impl Into<String>) -> MethodRouter {
    let body = body.into();
    any(move || {
        let body = body.clone();
        async move { (status, body) }
    })
}

/// Responds with `status` and `body` encoded as JSON. The body is encoded
/// once, up front, so encoding errors surface here.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> TfResult<MethodRouter> {
    let data = Bytes::from(serde_json::to_vec(body)?);
    Ok(any(move || {
        let data = data.clone();
        async move { (status, [(header::CONTENT_TYPE, "application/json")], data) }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    async fn call(router: Router) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn canned_bodies() {
        let (status, body) = call(Router::new().route("/", empty_response(StatusCode::NO_CONTENT))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, body) =
            call(Router::new().route("/", string_response(StatusCode::CREATED, "made"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, "made");

        let payload = serde_json::json!({"id": 7, "tags": ["a"]});
        let router = Router::new().route("/", json_response(StatusCode::OK, &payload).unwrap());
        let (status, body) = call(router).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"id":7,"tags":["a"]}"#);
    }
}
