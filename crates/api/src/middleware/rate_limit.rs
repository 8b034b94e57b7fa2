//! Rate limiting for the detection endpoints.
//!
//! Readers identify themselves with the `X-Reader-ID` header; requests
//! without it share one anonymous budget.

use std::num::NonZeroU32;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};

use shared::validation::normalize_identifier;

use crate::app::AppState;
use crate::error::ApiError;

pub const READER_ID_HEADER: &str = "X-Reader-ID";

const ANONYMOUS_KEY: &str = "anonymous";

pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<String>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// `None` when the limit is zero, which disables limiting.
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
        })
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Takes one cell from the key's budget, or returns the seconds to wait.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}

fn limiter_key(req: &Request<Body>) -> String {
    req.headers()
        .get(READER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(normalize_identifier)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        let key = limiter_key(&req);
        if let Err(retry_after) = limiter.check(&key) {
            tracing::warn!(reader = %key, retry_after, "Detection rate limit exceeded");
            return ApiError::RateLimited {
                limit: limiter.rate_limit_per_minute(),
                retry_after_secs: retry_after,
            }
            .into_response();
        }
    }

    next.run(req).await
}
