//! Axum middleware applying a [`RateLimiter`] to every request of a router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::{RateLimitDecision, RateLimiter};
use crate::error::CacheError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Identity of an authenticated caller, inserted as a request extension by
/// whatever authenticates requests upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
}

/// Key a request is counted under: the authenticated user when known,
/// otherwise the client IP, otherwise `anonymous`.
pub fn client_identity(request: &Request) -> String {
    if let Some(user) = request.extensions().get::<AuthenticatedUser>() {
        return format!("user:{}", user.id);
    }

    if let Some(ip) = header_ip(request.headers()) {
        return format!("ip:{ip}");
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn header_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get(REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

/// Rate limiting middleware, mounted with
/// `axum::middleware::from_fn_with_state(limiter, rate_limit)`.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identity(&request);
    let decision = limiter.check(&client);

    if !decision.allowed {
        warn!(
            limiter = %limiter.config().key_prefix,
            client = %client,
            path = %request.uri().path(),
            retry_after_ms = decision.retry_after_ms,
            "Rate limit exceeded"
        );
        let mut response = CacheError::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        }
        .into_response();
        insert_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    if limiter.config().skip_successful_requests && response.status().is_success() {
        limiter.release(&client, decision.window_reset_at_ms);
    }
    insert_headers(&mut response, &decision);
    response
}

fn insert_headers(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn app(config: RateLimitConfig) -> (Arc<RateLimiter>, Router) {
        let limiter = Arc::new(RateLimiter::new(config));
        let router = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/fail", get(|| async { StatusCode::BAD_REQUEST }))
            .layer(middleware::from_fn_with_state(limiter.clone(), rate_limit));
        (limiter, router)
    }

    fn request(path: &str, ip: &str) -> Request {
        Request::builder()
            .uri(path)
            .header(FORWARDED_FOR, ip)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_client_identity_precedence() {
        let mut request = Request::builder()
            .uri("/")
            .header(FORWARDED_FOR, "10.0.0.1, 10.0.0.2")
            .header(REAL_IP, "10.0.0.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identity(&request), "ip:10.0.0.1");

        request.extensions_mut().insert(AuthenticatedUser { id: "42".into() });
        assert_eq!(client_identity(&request), "user:42");

        let real_ip = Request::builder()
            .uri("/")
            .header(REAL_IP, "10.0.0.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identity(&real_ip), "ip:10.0.0.9");

        let mut peer = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_identity(&peer), "anonymous");
        peer.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_identity(&peer), "ip:127.0.0.1");
    }

    #[tokio::test]
    async fn test_denied_request_gets_429() {
        let (_limiter, app) = app(RateLimitConfig::new(2, 60_000));

        for remaining in ["1", "0"] {
            let response = app.clone().oneshot(request("/ok", "1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        }

        let denied = app.clone().oneshot(request("/ok", "1.1.1.1")).await.unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(denied.headers().contains_key("retry-after"));

        let other = app.oneshot(request("/ok", "2.2.2.2")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_skip_successful_requests() {
        let config = RateLimitConfig {
            skip_successful_requests: true,
            ..RateLimitConfig::new(2, 60_000)
        };
        let (limiter, app) = app(config);

        for _ in 0..5 {
            let response = app.clone().oneshot(request("/ok", "1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(limiter.record("ip:1.1.1.1").unwrap().count, 0);

        for _ in 0..2 {
            let response = app.clone().oneshot(request("/fail", "1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        let denied = app.oneshot(request("/ok", "1.1.1.1")).await.unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
