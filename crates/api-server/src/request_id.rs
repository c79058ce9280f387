use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for one HTTP exchange, available to handlers as an extension.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestId(pub String);

/// Caller-supplied id when present and usable as a header value, otherwise a fresh UUID v4.
pub fn resolve_request_id(headers: &HeaderMap) -> RequestId {
    let id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    RequestId(id)
}

/// Tags the trace span with the request id and echoes it back in `X-Request-Id`.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(request.headers());
    tracing::Span::current().record("request_id", request_id.0.as_str());

    let header = HeaderValue::from_str(&request_id.0).ok();
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Some(val) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}
