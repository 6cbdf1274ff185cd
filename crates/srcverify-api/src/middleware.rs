//! Request middleware: CORS and per-request ids
use axum::middleware::Next;
use axum::{body::Body, http::HeaderValue, http::Request, response::Response};
use tower_http::cors::CorsLayer;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn cors() -> CorsLayer {
    CorsLayer::permissive()
}

/// Run the request inside a span carrying a fresh id and echo the id back.
pub async fn request_id(req: Request<Body>, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
