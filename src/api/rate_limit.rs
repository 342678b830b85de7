// src/api/rate_limit.rs
// Per-client-IP request limiting for /api routes

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota};
use tracing::warn;

use super::error::ApiError;
use super::AppState;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Keyed limiter: `max` requests per `window` for each client IP
///
/// The quota refills one request every `window / max`, with a burst of `max`,
/// so a client that spends its whole burst waits one refill interval before
/// the next request goes through.
pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    max: NonZeroU32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: NonZeroU32, window: NonZeroU64) -> Self {
        let window = Duration::from_secs(window.get());
        let period = (window / max.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max))
            .allow_burst(max);

        Self {
            limiter: governor::RateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            max,
            window,
        }
    }

    /// Build from the configured limits, treating zero as one
    pub fn from_limits(max: u32, window_secs: u64) -> Self {
        Self::new(
            NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN),
            NonZeroU64::new(window_secs).unwrap_or(NonZeroU64::MIN),
        )
    }

    /// Take one request for `ip`; `Err` holds how long until the next one is allowed
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    pub fn max(&self) -> u32 {
        self.max.get()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Drop state for clients whose quota has fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Human form of the window used in the 429 body, e.g. `15 minutes`
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        s if s >= 3600 && s % 3600 == 0 => plural(s / 3600, "hour"),
        s if s >= 60 && s % 60 == 0 => plural(s / 60, "minute"),
        s => plural(s, "second"),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Peer address from the listener, or the unspecified address when the
/// router runs without connection info (in-process tests)
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

// ============================================================================
// Middleware
// ============================================================================

pub async fn limit_by_ip(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limiter = &state.limiter;
    let ip = client_ip(&request);
    let limit = HeaderValue::from(limiter.max());

    match limiter.check(ip) {
        Ok(()) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(RATELIMIT_LIMIT, limit);
            response
        }
        Err(wait) => {
            warn!(client = %ip, path = %request.uri().path(), "Rate limit exceeded");
            let retry_secs = wait.as_secs().max(1);
            let mut response =
                ApiError::too_many_requests(describe_window(limiter.window())).into_response();
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT, limit);
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(RATELIMIT_RESET, HeaderValue::from(retry_secs));
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
            response
        }
    }
}
