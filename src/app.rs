//! Outer HTTP layers shared by every application built on the crate.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Request tracing plus a request body cap of `body_limit_bytes`.
pub fn with_http_layers(router: Router, body_limit_bytes: usize) -> Router {
    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use tower::ServiceExt;

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let app = with_http_layers(
            Router::new().route("/echo", post(|body: Bytes| async move { body })),
            8,
        );
        let small = Request::post("/echo").body(Body::from("tiny")).unwrap();
        assert_eq!(app.clone().oneshot(small).await.unwrap().status(), StatusCode::OK);
        let big = Request::post("/echo").body(Body::from("far too large")).unwrap();
        assert_eq!(app.oneshot(big).await.unwrap().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
