//! HTTP Basic authentication middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: both the username and the password are
//!   always compared, and neither comparison short-circuits on the first
//!   differing byte
//! - **Opaque credentials**: decoded values are compared as raw bytes, so no
//!   UTF-8 requirement is imposed on clients
//! - **Uniform rejection**: a wrong username and a wrong password produce the
//!   same 401 body
//!
//! # Usage
//!
//! ```bash
//! curl -u admin:password -H 'Content-Type: application/json' \
//!      -d '{"name":"first"}' http://localhost:3000/examples
//! ```
//!
//! Only routes wrapped in [`BasicAuthLayer`] are protected; the layer is
//! attached per route in [`crate::routes`].

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::client_addr::peer_ip;
use crate::error::{AppError, AuthFailure};
use crate::metrics;

/// Scheme prefix expected in the `Authorization` header.
pub const BASIC_PREFIX: &[u8] = b"Basic ";

/// A username/password pair, held as raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl Credentials {
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse the raw value of an `Authorization` header.
    ///
    /// - anything not starting with `Basic ` is [`AuthFailure::MissingCredentials`]
    /// - a payload that is not standard base64, or decodes without a `:`,
    ///   is [`AuthFailure::MalformedHeader`]
    ///
    /// The split happens at the first `:`, so passwords may contain colons.
    pub fn parse_basic(header: &[u8]) -> Result<Self, AuthFailure> {
        let payload = header
            .strip_prefix(BASIC_PREFIX)
            .ok_or(AuthFailure::MissingCredentials)?;

        let decoded = STANDARD
            .decode(payload)
            .map_err(|_| AuthFailure::MalformedHeader)?;

        let mut parts = decoded.splitn(2, |b| *b == b':');
        match (parts.next(), parts.next()) {
            (Some(username), Some(password)) => Ok(Self::new(username, password)),
            _ => Err(AuthFailure::MalformedHeader),
        }
    }

    /// Value suitable for an `Authorization` header.
    pub fn to_header_value(&self) -> String {
        let mut raw = Vec::with_capacity(self.username.len() + self.password.len() + 1);
        raw.extend_from_slice(&self.username);
        raw.push(b':');
        raw.extend_from_slice(&self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Compare against presented credentials without early exit.
    pub fn verify(&self, presented: &Credentials) -> bool {
        let username_ok = self.username.ct_eq(&presented.username);
        let password_ok = self.password.ct_eq(&presented.password);
        (username_ok & password_ok).into()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Check a request's `Authorization` header against `expected`.
pub fn authenticate<B>(req: &Request<B>, expected: &Credentials) -> Result<(), AuthFailure> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::MissingCredentials)?;

    let presented = Credentials::parse_basic(header.as_bytes())?;

    if expected.verify(&presented) {
        Ok(())
    } else {
        Err(AuthFailure::InvalidCredentials)
    }
}

/// Basic authentication layer holding the single configured credential pair.
#[derive(Clone)]
pub struct BasicAuthLayer {
    expected: Arc<Credentials>,
}

impl BasicAuthLayer {
    pub fn new(expected: Credentials) -> Self {
        Self {
            expected: Arc::new(expected),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthService {
            inner,
            expected: self.expected.clone(),
        }
    }
}

/// Service produced by [`BasicAuthLayer`].
#[derive(Clone)]
pub struct BasicAuthService<S> {
    inner: S,
    expected: Arc<Credentials>,
}

impl<S> Service<Request<Body>> for BasicAuthService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let expected = self.expected.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authenticate(&req, &expected) {
                Ok(()) => {
                    debug!(path = %req.uri().path(), "Basic authentication successful");
                    inner.call(req).await
                }
                Err(failure) => {
                    let client_ip = peer_ip(&req)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    warn!(
                        method = %req.method(),
                        path = %req.uri().path(),
                        client_ip = %client_ip,
                        reason = %failure,
                        "Authentication failed"
                    );
                    metrics::record_auth_failure(failure);

                    Ok(AppError::Unauthenticated(failure).into_response())
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::http::header::WWW_AUTHENTICATE;
    use std::convert::Infallible;
    use tower::{ServiceExt, service_fn};

    fn admin() -> Credentials {
        Credentials::new("admin", "password")
    }

    fn request_with(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/examples");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn call(header: Option<&str>) -> (StatusCode, serde_json::Value, Option<String>) {
        let inner = service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::from("{\"reached\":true}")))
        });
        let svc = BasicAuthLayer::new(admin()).layer(inner);

        let response = svc.oneshot(request_with(header)).await.unwrap();
        let status = response.status();
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap(), challenge)
    }

    #[test]
    fn test_parse_basic() {
        // "admin:password"
        let creds = Credentials::parse_basic(b"Basic YWRtaW46cGFzc3dvcmQ=").unwrap();
        assert_eq!(creds, admin());
    }

    #[test]
    fn test_parse_splits_on_first_colon() {
        let header = Credentials::new("user", "pa:ss:word").to_header_value();
        let creds = Credentials::parse_basic(header.as_bytes()).unwrap();
        assert_eq!(creds.password, b"pa:ss:word");
    }

    #[test]
    fn test_parse_allows_empty_halves() {
        // ":"
        let creds = Credentials::parse_basic(b"Basic Og==").unwrap();
        assert_eq!(creds, Credentials::new("", ""));
    }

    #[test]
    fn test_parse_wrong_scheme() {
        assert_eq!(
            Credentials::parse_basic(b"Bearer abc"),
            Err(AuthFailure::MissingCredentials)
        );
        assert_eq!(
            Credentials::parse_basic(b"Basic"),
            Err(AuthFailure::MissingCredentials)
        );
    }

    #[test]
    fn test_parse_bad_base64() {
        assert_eq!(
            Credentials::parse_basic(b"Basic !!!not-base64!!!"),
            Err(AuthFailure::MalformedHeader)
        );
    }

    #[test]
    fn test_parse_missing_separator() {
        // "nocolon"
        assert_eq!(
            Credentials::parse_basic(b"Basic bm9jb2xvbg=="),
            Err(AuthFailure::MalformedHeader)
        );
    }

    #[test]
    fn test_non_utf8_credentials_compare_as_bytes() {
        let expected = Credentials::new(vec![0xff, 0xfe], vec![0x80]);
        let parsed = Credentials::parse_basic(expected.to_header_value().as_bytes()).unwrap();
        assert!(expected.verify(&parsed));
    }

    #[test]
    fn test_verify() {
        assert!(admin().verify(&Credentials::new("admin", "password")));
        assert!(!admin().verify(&Credentials::new("admin", "wrong")));
        assert!(!admin().verify(&Credentials::new("root", "password")));
        assert!(!admin().verify(&Credentials::new("admin", "password-longer")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", admin());
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("\"password\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_valid_credentials_reach_inner_service() {
        let header = admin().to_header_value();
        let (status, body, _) = call(Some(&header)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reached"], true);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (status, body, challenge) = call(None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Unauthorized" }));
        assert!(challenge.unwrap().starts_with("Basic"));
    }

    #[tokio::test]
    async fn test_malformed_header() {
        let (status, body, _) = call(Some("Basic %%%")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid authorization header");
    }

    #[tokio::test]
    async fn test_wrong_username_and_wrong_password_look_identical() {
        let wrong_user = Credentials::new("root", "password").to_header_value();
        let wrong_pass = Credentials::new("admin", "hunter2").to_header_value();

        let a = call(Some(&wrong_user)).await;
        let b = call(Some(&wrong_pass)).await;

        assert_eq!(a, b);
        assert_eq!(a.0, StatusCode::UNAUTHORIZED);
        assert_eq!(a.1["error"], "Invalid credentials");
    }
}
