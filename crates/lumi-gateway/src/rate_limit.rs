// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window request limiting keyed by client address.
//!
//! Each key owns a counter that resets when its window elapses. Bursts of
//! up to twice the limit are possible across a window boundary. Counters
//! live for the process lifetime.
//!
//! The registry is a sharded map so lookups for different keys do not
//! contend; each counter has its own lock for the read-modify-write.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::envelope::ApiResponse;

pub const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const HEADER_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Result of one [`RateLimiter::allow`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Counter {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    counters: DashMap<String, Arc<Mutex<Counter>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, key: &str, limit: u32, window: Duration) -> RateDecision {
        self.allow_at(key, limit, window, Utc::now())
    }

    /// Counts one request for `key` at `now`.
    pub fn allow_at(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let counter = match self.counters.get(key) {
            Some(counter) => Arc::clone(counter.value()),
            None => Arc::clone(
                self.counters
                    .entry(key.to_string())
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(Counter {
                            count: 0,
                            window_reset_at: window_end(now, window),
                        }))
                    })
                    .value(),
            ),
        };

        let mut counter = counter.lock().unwrap_or_else(PoisonError::into_inner);
        if now >= counter.window_reset_at {
            counter.count = 0;
            counter.window_reset_at = window_end(now, window);
        }

        if counter.count >= limit {
            return RateDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at: counter.window_reset_at,
            };
        }

        counter.count += 1;
        RateDecision {
            allowed: true,
            limit,
            remaining: limit - counter.count,
            reset_at: counter.window_reset_at,
        }
    }
}

fn window_end(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|w| now.checked_add_signed(w))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A limiter bound to one limit and window, used as middleware state.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    limiter: Arc<RateLimiter>,
    limit: u32,
    window: Duration,
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new()),
            limit,
            window,
        }
    }
}

/// Identifies the caller: first `X-Forwarded-For` entry, then
/// `X-Real-Ip`, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects requests over the policy's limit with 429 and reports the
/// counter on every response.
///
/// When limiters are nested, the innermost one's headers are kept.
pub async fn rate_limit_middleware(
    State(policy): State<RateLimitPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(request.headers(), peer);
    let decision = policy.limiter.allow(&key, policy.limit, policy.window);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        let wait = (decision.reset_at - Utc::now()).num_seconds().max(1);
        warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        ApiResponse::failure(
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too Many Requests. Try again in {wait}s"),
        )
        .into_response()
    };

    let headers = response.headers_mut();
    if !headers.contains_key(HEADER_LIMIT) {
        headers.insert(HEADER_LIMIT, HeaderValue::from(decision.limit));
        headers.insert(HEADER_REMAINING, HeaderValue::from(decision.remaining));
        headers.insert(HEADER_RESET, HeaderValue::from(decision.reset_at.timestamp()));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn requests_up_to_limit_are_allowed_with_decreasing_remaining() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        let remaining: Vec<u32> = (0..5)
            .map(|_| {
                let d = limiter.allow_at("1.2.3.4", 5, MINUTE, now);
                assert!(d.allowed);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let denied = limiter.allow_at("1.2.3.4", 5, MINUTE, now);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, now + TimeDelta::seconds(60));
    }

    #[test]
    fn window_rotation_restarts_count() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        for _ in 0..4 {
            limiter.allow_at("k", 3, MINUTE, start);
        }

        let later = start + TimeDelta::seconds(60);
        let decision = limiter.allow_at("k", 3, MINUTE, later);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at, later + TimeDelta::seconds(60));
    }

    #[test]
    fn denials_keep_reset_time() {
        let limiter = RateLimiter::new();
        let start = Utc::now();
        let first = limiter.allow_at("k", 1, MINUTE, start);
        let denied = limiter.allow_at("k", 1, MINUTE, start + TimeDelta::seconds(30));
        assert_eq!(first.reset_at, denied.reset_at);
    }

    #[test]
    fn distinct_keys_are_independent_under_concurrency() {
        let limiter = Arc::new(RateLimiter::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                let key = if i % 2 == 0 { "a" } else { "b" };
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.allow_at(key, 1000, MINUTE, now).allowed)
                        .count()
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 400);

        let a = limiter.allow_at("a", 1000, MINUTE, now);
        let b = limiter.allow_at("b", 1000, MINUTE, now);
        assert_eq!(a.remaining, 1000 - 201);
        assert_eq!(b.remaining, 1000 - 201);
        assert_eq!(limiter.counters.len(), 2);
    }

    #[test]
    fn concurrent_requests_on_one_key_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| limiter.allow_at("shared", 30, MINUTE, now).allowed)
                        .count()
                })
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 30);
    }

    #[test]
    fn client_key_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.5");

        headers.remove("x-forwarded-for");
        assert_eq!(client_key(&headers, Some(peer)), "198.51.100.7");

        assert_eq!(client_key(&HeaderMap::new(), Some(peer)), "10.0.0.9");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
