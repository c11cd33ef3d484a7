use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::RateLimitConfig;

/// Rate limiting error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Rate limit exceeded: {max_requests} per {window_seconds}s. Try again in {retry_after_seconds}s")]
    RateLimitExceeded {
        max_requests: u32,
        window_seconds: u64,
        retry_after_seconds: u64,
    },
}

/// In-memory keyed rate limiter backed by the `governor` crate (GCRA algorithm).
///
/// Each key (typically `"{route}:{client_ip}"`) gets an independent bucket of
/// `max_requests` that refills over `window_seconds`. Limits are per process.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
    max_requests: u32,
    window_seconds: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let max_requests = config.max_requests.max(1);
        let window_seconds = config.window_seconds.max(1);

        // One cell per period, bursting up to max_requests.
        let period = Duration::from_secs(window_seconds)
            .checked_div(max_requests)
            .filter(|p| !p.is_zero())
            .unwrap_or(Duration::from_millis(1));
        let burst = NonZeroU32::new(max_requests).unwrap_or(nonzero!(1u32));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(GovernorRateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
            max_requests,
            window_seconds,
        }
    }

    /// Consume one request for `key`.
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                Err(RateLimitError::RateLimitExceeded {
                    max_requests: self.max_requests,
                    window_seconds: self.window_seconds,
                    retry_after_seconds: wait.as_secs().max(1),
                })
            }
        }
    }

    /// Drop buckets that have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_seconds,
        })
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(10, 60);
        for _ in 0..10 {
            assert!(limiter.check("/ip:1.2.3.4").is_ok());
        }
        match limiter.check("/ip:1.2.3.4") {
            Err(RateLimitError::RateLimitExceeded {
                max_requests,
                window_seconds,
                retry_after_seconds,
            }) => {
                assert_eq!(max_requests, 10);
                assert_eq!(window_seconds, 60);
                assert!(retry_after_seconds >= 1 && retry_after_seconds <= 6);
            }
            Ok(()) => panic!("11th request should be rejected"),
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 60);
        assert!(limiter.check("/ip:1.1.1.1").is_ok());
        assert!(limiter.check("/ip:1.1.1.1").is_err());
        assert!(limiter.check("/ip:2.2.2.2").is_ok());
        assert!(limiter.check("/live/{room_id}:1.1.1.1").is_ok());
        assert_eq!(limiter.tracked_keys(), 3);
    }

    #[test]
    fn test_zero_config_is_clamped() {
        let limiter = limiter(0, 0);
        assert!(limiter.check("k").is_ok());
    }
}
