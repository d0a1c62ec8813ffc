//! Request tracing middleware.
//!
//! Every request runs inside an `http_request` span tagged with a
//! correlation id, so query logs and OTLP spans of one request line up.

use axum::{
    extract::Request,
    http::{header::HeaderValue, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// The header name for correlation IDs.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// W3C Trace Context header.
const TRACEPARENT_HEADER: &str = "traceparent";

/// Correlation ID of the current request, stored as a request extension.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pick the correlation id for a request.
///
/// Uses `X-Correlation-ID` when present, else the trace id of a well-formed
/// `traceparent` (`version-traceid-parentid-flags`), else a fresh UUID.
fn correlation_id_from_headers(headers: &HeaderMap) -> CorrelationId {
    let explicit = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128);

    if let Some(id) = explicit {
        return CorrelationId(id.to_string());
    }

    headers
        .get(TRACEPARENT_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|tp| tp.split('-').nth(1))
        .filter(|trace_id| trace_id.len() == 32 && trace_id.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|trace_id| CorrelationId(trace_id.to_string()))
        .unwrap_or_else(CorrelationId::generate)
}

/// Attach a correlation id, echo it back, and log completion inside the span.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = correlation_id_from_headers(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
    );

    async move {
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        tracing::info!(status = response.status().as_u16(), "Request completed");
        response
    }
    .instrument(span)
    .await
}
