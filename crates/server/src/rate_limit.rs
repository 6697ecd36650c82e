//! Fixed-window per-client rate limiting for the credential endpoints.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

#[derive(Clone, Copy, Debug)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub window: Duration,
    pub max_requests: u32,
}

pub const REGISTER_POLICY: RateLimitPolicy = RateLimitPolicy {
    name: "register",
    window: Duration::from_secs(60 * 60),
    max_requests: 10,
};

pub const LOGIN_POLICY: RateLimitPolicy = RateLimitPolicy {
    name: "login",
    window: Duration::from_secs(15 * 60),
    max_requests: 10,
};

struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(String, &'static str), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, policy: &RateLimitPolicy, client: &str) -> bool {
        self.try_acquire_at(policy, client, Instant::now())
    }

    fn try_acquire_at(&self, policy: &RateLimitPolicy, client: &str, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = windows
            .entry((client.to_string(), policy.name))
            .or_insert(Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= policy.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= policy.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Best-effort client identity for rate limiting: the first
/// `X-Forwarded-For` hop when present, the socket peer address otherwise.
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return Ok(Self(ip));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip().to_string());

        Ok(Self(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}
