//! Global request throttling: a per-minute and a per-day bucket shared by
//! every client. Both must admit a request for it to proceed.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RateLimits {
    per_minute: DefaultDirectRateLimiter,
    per_day: DefaultDirectRateLimiter,
}

impl RateLimits {
    pub fn new(per_minute: u32, per_day: u32) -> Result<Self> {
        let per_minute =
            NonZeroU32::new(per_minute).context("RATE_LIMIT_PER_MINUTE must be positive")?;
        let per_day = NonZeroU32::new(per_day).context("RATE_LIMIT_PER_DAY must be positive")?;

        // Refill evenly across the day, but let the whole daily allowance burst.
        let daily = Quota::with_period(DAY / per_day.get())
            .context("RATE_LIMIT_PER_DAY is too large")?
            .allow_burst(per_day);

        Ok(Self {
            per_minute: RateLimiter::direct(Quota::per_minute(per_minute)),
            per_day: RateLimiter::direct(daily),
        })
    }

    /// Takes one cell from each bucket. The daily bucket is only charged when
    /// the per-minute bucket admits the request.
    pub fn check(&self) -> bool {
        self.per_minute.check().is_ok() && self.per_day.check().is_ok()
    }
}

pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.limits.check() {
        warn!("Rate limit exceeded for {} {}", request.method(), request.uri().path());
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_bucket_exhausts() {
        let limits = RateLimits::new(2, 100).unwrap();
        assert!(limits.check());
        assert!(limits.check());
        assert!(!limits.check());
    }

    #[test]
    fn test_day_bucket_exhausts() {
        let limits = RateLimits::new(100, 3).unwrap();
        for _ in 0..3 {
            assert!(limits.check());
        }
        assert!(!limits.check());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(RateLimits::new(0, 10).is_err());
        assert!(RateLimits::new(10, 0).is_err());
    }
}
