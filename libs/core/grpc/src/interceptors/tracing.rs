//! Server-side request instrumentation.
//!
//! [`server_span`] is installed with tonic's `Server::trace_fn`, so it runs
//! once for every incoming RPC, unary and streaming alike. The span it returns
//! wraps the whole call and, through the OpenTelemetry layer, is exported as a
//! server span whose parent is the caller's `traceparent`.

use opentelemetry::propagation::Extractor;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

const UNKNOWN: &str = "unknown";

/// Build the span for one incoming gRPC request.
pub fn server_span(request: &http::Request<()>) -> Span {
    let (service, method) = split_path(request.uri().path()).unwrap_or((UNKNOWN, UNKNOWN));
    let request_id = HeaderExtractor(request.headers())
        .request_id()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "grpc.request",
        otel.name = %format!("{service}/{method}"),
        otel.kind = "server",
        rpc.system = "grpc",
        rpc.service = %service,
        rpc.method = %method,
        request_id = %request_id,
    );

    let parent = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });
    span.set_parent(parent);

    span
}

/// Split a gRPC path (`/package.Service/Method`) into service and method.
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let (service, method) = path.strip_prefix('/')?.split_once('/')?;
    if service.is_empty() || method.is_empty() || method.contains('/') {
        return None;
    }
    Some((service, method))
}

/// Reads propagation headers from an incoming request
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl HeaderExtractor<'_> {
    /// Extract request ID
    pub fn request_id(&self) -> Option<String> {
        self.0
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from)
    }
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}
