//! Request logging middleware

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, info, warn};

/// Header carrying the request id in both directions
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request id assigned to the current request, available as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Run the request inside a span keyed by its request id and log the
/// outcome. An incoming `X-Request-ID` is kept, otherwise one is generated;
/// either way it is echoed on the response.
pub async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map_or_else(generate_request_id, String::from);

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        method = %method,
        uri = %uri,
        request_id = %request_id,
    );

    async move {
        let mut response = next.run(request).await;
        let elapsed = start_time.elapsed();
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            warn!(status = %status, elapsed = ?elapsed, "Request completed with error");
        } else {
            info!(status = %status, elapsed = ?elapsed, "Request completed");
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), value);
        }
        response
    }
    .instrument(span)
    .await
}

/// Generate a unique request ID for tracing
fn generate_request_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("req_{:016x}", rng.r#gen::<u64>())
}
