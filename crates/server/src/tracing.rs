//! HTTP tracing middleware
//!
//! Opens a root span for every request. Gateway and registry spans created
//! while the handler runs become its children.

use axum::{body::Body, extract::MatchedPath};
use fastrace::{
    Span,
    future::FutureExt,
    prelude::{LocalSpan, SpanContext},
};
use http::{HeaderMap, Request, Response};
use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::Layer;

/// Layer for HTTP tracing
#[derive(Clone, Default)]
pub struct TracingLayer;

impl<Service> Layer<Service> for TracingLayer
where
    Service: Send + Clone,
{
    type Service = TracingService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        TracingService { next }
    }
}

/// Service that creates traces for HTTP requests
#[derive(Clone)]
pub struct TracingService<Service> {
    next: Service,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for TracingService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str().to_owned())
            .unwrap_or_else(|| req.uri().path().to_owned());

        let method = req.method().to_string();
        let span_name = format!("{method} {path}");

        let parent = extract_trace_context(req.headers()).unwrap_or_else(SpanContext::random);
        let root = Span::root(span_name.clone(), parent);

        // Attributes follow the OpenTelemetry HTTP semantic conventions.
        root.add_property(|| ("http.request.method", method));
        root.add_property(|| ("http.route", path));
        root.add_property(|| ("url.full", req.uri().to_string()));

        if let Some(host) = req.headers().get(http::header::HOST).and_then(|h| h.to_str().ok()) {
            root.add_property(|| ("server.address", host.to_string()));
        }

        let mut next = self.next.clone();

        let fut = async move {
            let response = next.call(req).await?;

            let status = response.status();
            LocalSpan::add_property(|| ("http.response.status_code", status.as_u16().to_string()));

            if status.is_client_error() || status.is_server_error() {
                LocalSpan::add_property(|| ("error", "true"));
            }

            log::debug!("{span_name} -> {}", status.as_u16());

            Ok(response)
        };

        Box::pin(fut.in_span(root))
    }
}

/// Continues a W3C trace when the caller sent a `traceparent` header.
fn extract_trace_context(headers: &HeaderMap) -> Option<SpanContext> {
    let traceparent = headers.get("traceparent")?.to_str().ok()?;
    SpanContext::decode_w3c_traceparent(traceparent)
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue};

    use super::extract_trace_context;

    #[test]
    fn continues_w3c_trace() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let context = extract_trace_context(&headers).unwrap();

        assert_eq!(context.trace_id.0, 0x4bf92f3577b34da6a3ce929d0e0e4736);
        assert_eq!(context.span_id.0, 0x00f067aa0ba902b7);
    }

    #[test]
    fn ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static("not-a-trace"));

        assert!(extract_trace_context(&headers).is_none());
        assert!(extract_trace_context(&HeaderMap::new()).is_none());
    }
}
