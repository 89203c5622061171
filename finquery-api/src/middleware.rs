//! Rate limiting middleware.
//!
//! One token bucket per tenant, falling back to one per client IP for
//! requests that name no tenant. The tenant is taken from the
//! `x-tenant-id` header, or from the JSON body of `POST /api/query`.
//!
//! Both keys are caller-controlled, so the bucket table is bounded by
//! `rate_limit_max_keys`. Buckets idle long enough to have refilled are
//! dropped when the table fills; past that, new keys share one overflow
//! bucket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Largest request body inspected for a tenant id.
const MAX_PEEK_BYTES: usize = 64 * 1024;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Key for rate limiting - either tenant ID or client IP.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    Tenant(String),
    Ip(IpAddr),
    /// Shared by new keys while the bucket table is full.
    Overflow,
}

struct TrackedLimiter {
    limiter: Arc<DirectRateLimiter>,
    last_seen: Instant,
    /// Idle time after which the bucket is full again and can be dropped.
    refill: Duration,
}

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    limiters: Arc<DashMap<RateLimitKey, TrackedLimiter>>,
    overflow: Arc<DirectRateLimiter>,
}

impl RateLimitState {
    pub fn new(config: Arc<ApiConfig>) -> Self {
        let overflow = Arc::new(RateLimiter::direct(quota(
            config.rate_limit_per_ip,
            config.rate_limit_burst,
        )));
        Self {
            config,
            limiters: Arc::new(DashMap::new()),
            overflow,
        }
    }

    fn limit_for(&self, key: &RateLimitKey) -> u32 {
        match key {
            RateLimitKey::Tenant(_) => self.config.rate_limit_per_tenant,
            RateLimitKey::Ip(_) | RateLimitKey::Overflow => self.config.rate_limit_per_ip,
        }
    }

    /// Get or create the limiter for `key`.
    ///
    /// A full table first drops buckets that have refilled while idle. If
    /// none has, `key` is charged to the shared overflow bucket instead.
    fn limiter(&self, key: RateLimitKey) -> (RateLimitKey, Arc<DirectRateLimiter>) {
        let now = Instant::now();
        if let Some(mut tracked) = self.limiters.get_mut(&key) {
            tracked.last_seen = now;
            return (key, tracked.limiter.clone());
        }

        if self.limiters.len() >= self.config.rate_limit_max_keys {
            self.evict_idle(now);
            if self.limiters.len() >= self.config.rate_limit_max_keys {
                return (RateLimitKey::Overflow, self.overflow.clone());
            }
        }

        let quota = quota(self.limit_for(&key), self.config.rate_limit_burst);
        let limiter = self
            .limiters
            .entry(key.clone())
            .or_insert_with(|| TrackedLimiter {
                limiter: Arc::new(RateLimiter::direct(quota)),
                last_seen: now,
                refill: quota.replenish_interval() * quota.burst_size().get(),
            })
            .limiter
            .clone();
        (key, limiter)
    }

    fn evict_idle(&self, now: Instant) {
        let before = self.limiters.len();
        self.limiters
            .retain(|_, tracked| now.saturating_duration_since(tracked.last_seen) < tracked.refill);
        tracing::debug!(
            evicted = before.saturating_sub(self.limiters.len()),
            "Evicted idle rate limit buckets"
        );
    }

    /// Number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.limiters.len()
    }
}

fn quota(per_minute: u32, burst: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

/// Rejection returned when a key is over its quota.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the next request would be admitted
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let error = ApiError::too_many_requests(Some(self.retry_after))
            .with_details(serde_json::json!({ "retry_after_secs": self.retry_after }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract client IP from request, considering proxy headers.
fn client_ip(request: &Request) -> IpAddr {
    let headers = request.headers();
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        if let Ok(ip) = first.trim().parse() {
            return ip;
        }
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
    {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn header_tenant(request: &Request) -> Option<String> {
    request
        .headers()
        .get(HeaderName::from_static("x-tenant-id"))
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn body_tenant(bytes: &[u8]) -> Option<String> {
    let body: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    ["tenant_id", "tenantId", "userId"]
        .iter()
        .find_map(|field| body.get(*field).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Work out the key for `request`. May buffer the body of a JSON POST to
/// read the tenant id; the request is rebuilt with the same bytes.
async fn resolve_key(request: Request) -> Result<(RateLimitKey, Request), ApiError> {
    if let Some(tenant) = header_tenant(&request) {
        return Ok((RateLimitKey::Tenant(tenant), request));
    }

    let is_json_post = request.method() == Method::POST
        && request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

    if !is_json_post {
        let ip = client_ip(&request);
        return Ok((RateLimitKey::Ip(ip), request));
    }

    let ip = client_ip(&request);
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_PEEK_BYTES)
        .await
        .map_err(|_| ApiError::invalid_input("Request body too large"))?;
    let key = match body_tenant(&bytes) {
        Some(tenant) => RateLimitKey::Tenant(tenant),
        None => RateLimitKey::Ip(ip),
    };
    Ok((key, Request::from_parts(parts, Body::from(bytes))))
}

/// Rate limiting middleware.
///
/// When limited, returns 429 Too Many Requests with a `retry-after` header.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.rate_limit_enabled {
        return next.run(request).await;
    }

    let (key, request) = match resolve_key(request).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    let (key, limiter) = state.limiter(key);
    match limiter.check() {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(state.limit_for(&key)),
            );
            response
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            tracing::warn!(key = ?key, retry_after, "Rate limit exceeded");
            RateLimitError { retry_after }.into_response()
        }
    }
}
