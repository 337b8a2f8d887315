//! Rate limiting middleware using Governor.
//!
//! Implements per-caller rate limiting with a token bucket algorithm. The
//! caller is the peer address of the connection. Behind a reverse proxy,
//! enable `trust_forwarded_for` to use the hop the proxy appended to
//! `X-Forwarded-For` instead.

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use wallet_types::ApiResponse;

pub const RATE_LIMITED: &str = "RATE_LIMITED";

/// Paths that are never rate limited.
const EXEMPT_PREFIXES: [&str; 3] = ["/health", "/api/docs", "/api-docs"];

/// Idle buckets are dropped once every this many checks.
const SWEEP_EVERY: u64 = 1024;

/// Key for requests without a known peer address.
const UNKNOWN_CALLER: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    trust_forwarded_for: bool,
    checks: AtomicU64,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// # Arguments
    /// * `requests` - Number of requests allowed per period (at least 1)
    /// * `period` - Time period for the quota
    pub fn new(requests: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            trust_forwarded_for: false,
            checks: AtomicU64::new(0),
        }
    }

    /// Identifies callers by the last `X-Forwarded-For` hop.
    ///
    /// Only safe when every request arrives through a proxy that appends
    /// the peer address to that header.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Checks if a request should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, caller: IpAddr) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.evict_idle();
        }
        self.limiter.check_key(&caller).is_ok()
    }

    /// Drops buckets that have refilled completely.
    pub fn evict_idle(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of callers with a live bucket.
    pub fn tracked_callers(&self) -> usize {
        self.limiter.len()
    }

    /// Resolves the caller a request is charged to.
    pub fn caller(&self, request: &Request<Body>) -> IpAddr {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        if self.trust_forwarded_for {
            if let Some(forwarded) = last_forwarded_hop(request) {
                return forwarded;
            }
        }
        peer.unwrap_or(UNKNOWN_CALLER)
    }
}

fn last_forwarded_hop(request: &Request<Body>) -> Option<IpAddr> {
    request
        .headers()
        .get_all("X-Forwarded-For")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(','))
        .next_back()
        .and_then(|hop| hop.trim().parse().ok())
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }

    let caller = limiter.caller(&request);
    if !limiter.check(caller) {
        tracing::warn!(%caller, "Rate limit exceeded");
        let body: ApiResponse<()> = ApiResponse::error(
            "Rate limit exceeded. Please try again later.",
            RATE_LIMITED,
        );
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder();
        if let Some(forwarded) = forwarded {
            builder = builder.header("X-Forwarded-For", forwarded);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr = SocketAddr::new(ip(peer), 40_000);
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[test]
    fn test_quota_is_per_caller() {
        let limiter = RateLimiterState::new(2, Duration::from_secs(60));

        assert!(limiter.check(ip("10.0.0.1")));
        assert!(limiter.check(ip("10.0.0.1")));
        assert!(!limiter.check(ip("10.0.0.1")));
        assert!(limiter.check(ip("10.0.0.2")));
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let limiter = RateLimiterState::new(0, Duration::from_secs(60));

        assert!(limiter.check(UNKNOWN_CALLER));
        assert!(!limiter.check(UNKNOWN_CALLER));
    }

    #[test]
    fn test_rotating_forwarded_header_shares_the_peer_quota() {
        let limiter = RateLimiterState::new(1, Duration::from_secs(60));

        let allowed = (0..1000)
            .map(|i| request_from("198.51.100.9", Some(&format!("10.1.{}.{}", i / 256, i % 256))))
            .filter(|request| limiter.check(limiter.caller(request)))
            .count();

        assert_eq!(allowed, 1);
        assert_eq!(limiter.tracked_callers(), 1);
    }

    #[test]
    fn test_trusted_proxy_uses_last_forwarded_hop() {
        let limiter = RateLimiterState::new(1, Duration::from_secs(60)).trust_forwarded_for(true);

        let request = request_from("10.0.0.1", Some("203.0.113.7, 198.51.100.1"));
        assert_eq!(limiter.caller(&request), ip("198.51.100.1"));

        // Unparseable hops fall back to the peer address.
        let request = request_from("10.0.0.1", Some("not-an-address"));
        assert_eq!(limiter.caller(&request), ip("10.0.0.1"));
    }

    #[test]
    fn test_caller_without_connect_info_is_unknown() {
        let limiter = RateLimiterState::default();
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(limiter.caller(&request), UNKNOWN_CALLER);
    }

    #[test]
    fn test_idle_buckets_are_evicted() {
        let limiter = RateLimiterState::new(1, Duration::from_millis(10));

        for i in 0..100u8 {
            limiter.check(IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)));
        }
        assert_eq!(limiter.tracked_callers(), 100);

        std::thread::sleep(Duration::from_millis(50));
        limiter.evict_idle();

        assert_eq!(limiter.tracked_callers(), 0);
    }
}
