use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Provider-wide request pacing shared by every source using one credential.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle").finish_non_exhaustive()
    }
}

impl RequestThrottle {
    /// Allow `quota_limit` requests per `quota_window`, bursting up to the full limit.
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
            clock: DefaultClock::default(),
        }
    }

    pub fn per_minute(quota_limit: u32) -> Self {
        Self::new(Duration::from_secs(60), quota_limit)
    }

    /// Takes budget if available, otherwise returns how long until the next cell frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Waits until budget is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_once_burst_is_spent() {
        let throttle = RequestThrottle::new(Duration::from_secs(60), 2);

        assert!(throttle.try_acquire().is_ok());
        assert!(throttle.try_acquire().is_ok());

        let wait = throttle.try_acquire().expect_err("third request exceeds quota");
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(30));
    }

    #[test]
    fn zero_limit_is_treated_as_one() {
        let throttle = RequestThrottle::per_minute(0);

        assert!(throttle.try_acquire().is_ok());
        assert!(throttle.try_acquire().is_err());
    }

    #[tokio::test]
    async fn acquire_returns_immediately_with_budget() {
        let throttle = RequestThrottle::per_minute(10);
        throttle.acquire().await;
        assert!(throttle.try_acquire().is_ok());
    }
}
