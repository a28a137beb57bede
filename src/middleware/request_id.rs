//! Request ID and per-request span middleware.
//!
//! Every request gets an `X-Request-Id`: the caller's own value is kept when
//! it is a short visible-ASCII token, otherwise a UUIDv4 is generated. The ID
//! is echoed on the response and attached to a `request` span that wraps the
//! rest of the stack, so every log line emitted while handling the request
//! (including auth and rate-limit rejections) carries it.
//!
//! The layer also records `gobo_request_duration_seconds` using the matched
//! route template as the endpoint label, so path parameters never explode
//! label cardinality.
//!
//! ```bash
//! curl -H "X-Request-Id: my-correlation-id" http://localhost:3000/examples
//! ```

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::metrics;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID that is propagated unchanged.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Endpoint label for requests that matched no route.
const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Request ID layer for Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl RequestIdLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Request ID service wrapper.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = extract_or_generate_request_id(&req);
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, request_id.clone());

        let method = req.method().clone();
        let endpoint = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_owned());

        let span = info_span!(
            "request",
            request_id = request_id.to_str().unwrap_or_default(),
            method = %method,
            path = %req.uri().path(),
        );

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let started = Instant::now();
                let mut response = inner.call(req).await?;
                let status = response.status();

                metrics::record_request_duration(
                    &endpoint,
                    method.as_str(),
                    status.as_u16(),
                    started.elapsed().as_secs_f64(),
                );
                debug!(status = status.as_u16(), "Request completed");

                response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Keep a well-formed caller ID, otherwise mint a fresh one.
fn extract_or_generate_request_id<B>(req: &Request<B>) -> HeaderValue {
    if let Some(value) = req.headers().get(REQUEST_ID_HEADER)
        && is_acceptable_request_id(value)
    {
        return value.clone();
    }

    let generated = Uuid::new_v4().to_string();
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(&generated).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

fn is_acceptable_request_id(value: &HeaderValue) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= MAX_REQUEST_ID_LEN
        && bytes.iter().all(|b| b.is_ascii_graphic())
}

/// Extension trait to read the request ID inside handlers.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    async fn echo_seen_id(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let seen = req.request_id().unwrap_or("none").to_string();
        Ok(Response::new(Body::from(seen)))
    }

    #[test]
    fn test_keeps_existing_request_id() {
        let req = Request::builder()
            .header(REQUEST_ID_HEADER, "existing-id-123")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_or_generate_request_id(&req), "existing-id-123");
    }

    #[test]
    fn test_generates_uuid_when_absent() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let id = extract_or_generate_request_id(&req);
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_replaces_unacceptable_ids() {
        let too_long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        for bad in ["", "has space", too_long.as_str()] {
            let req = Request::builder()
                .header(REQUEST_ID_HEADER, bad)
                .body(Body::empty())
                .unwrap();

            let id = extract_or_generate_request_id(&req);
            assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok(), "kept {bad:?}");
        }
    }

    #[tokio::test]
    async fn test_id_visible_to_handler_and_echoed() {
        let svc = RequestIdLayer::new().layer(service_fn(echo_seen_id));
        let req = Request::builder()
            .header(REQUEST_ID_HEADER, "corr-42")
            .body(Body::empty())
            .unwrap();

        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "corr-42");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"corr-42");
    }

    #[test]
    fn test_request_id_ext_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(req.request_id(), None);
    }
}
