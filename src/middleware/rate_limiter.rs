//! Per-client token bucket rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::ApiError;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_take(&mut self, refill_per_second: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_second).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter; burst capacity is twice the sustained rate
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    refill_per_second: f64,
    capacity: f64,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let rate = requests_per_second.max(1) as f64;
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            refill_per_second: rate,
            capacity: rate * 2.0,
            trust_proxy_headers: false,
        }
    }

    /// Key clients by `X-Forwarded-For`/`X-Real-IP` instead of the peer
    /// address. Only enable behind a reverse proxy that sets them.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub async fn check(&self, client: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity))
            .try_take(self.refill_per_second, self.capacity)
    }

    /// Forget clients idle for longer than `max_idle`
    pub async fn cleanup(&self, max_idle: Duration) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_idle);
        tracing::debug!(removed = before - buckets.len(), "Rate limiter cleanup");
    }

    /// Run [`RateLimiter::cleanup`] on a fixed interval
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.cleanup(every).await;
            }
        })
    }

    fn client_key(&self, request: &Request) -> String {
        let forwarded = if self.trust_proxy_headers {
            forwarded_client(request)
        } else {
            None
        };
        forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`
///
/// The server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()` for clients to be
/// told apart by peer address.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.client_key(&request);
    if !limiter.check(&client).await {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return ApiError::TooManyRequests.into_response();
    }
    next.run(request).await
}

fn forwarded_client(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use tower::ServiceExt;

    fn from_peer(ip: [u8; 4], forwarded_for: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    #[tokio::test]
    async fn test_burst_then_denied() {
        let limiter = RateLimiter::new(5);
        for _ in 0..10 {
            assert!(limiter.check("10.0.0.1").await);
        }
        assert!(!limiter.check("10.0.0.1").await);
        // Other clients are unaffected
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_clients() {
        let limiter = RateLimiter::new(1);
        limiter.check("10.0.0.1").await;
        limiter.cleanup(Duration::ZERO).await;
        assert!(limiter.buckets.lock().await.is_empty());
    }

    #[test]
    fn test_client_key_uses_peer_address() {
        let limiter = RateLimiter::new(1);
        let request = from_peer([198, 51, 100, 4], Some("203.0.113.7"));
        assert_eq!(limiter.client_key(&request), "198.51.100.4");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(limiter.client_key(&request), "unknown");
    }

    #[test]
    fn test_forwarded_headers_only_behind_trusted_proxy() {
        let limiter = RateLimiter::new(1).trust_proxy_headers(true);
        let request = from_peer([10, 0, 0, 1], Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(limiter.client_key(&request), "203.0.113.7");

        let request = from_peer([10, 0, 0, 1], None);
        assert_eq!(limiter.client_key(&request), "10.0.0.1");
    }

    #[tokio::test]
    async fn test_distinct_peers_have_separate_buckets() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(RateLimiter::new(1), rate_limit));

        // Burst of two for the first peer, then refused
        for _ in 0..2 {
            let response = app.clone().oneshot(from_peer([192, 0, 2, 1], None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.clone().oneshot(from_peer([192, 0, 2, 1], None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.clone().oneshot(from_peer([192, 0, 2, 2], None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
