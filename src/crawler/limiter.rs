//! Randomized inter-request delay
//!
//! One `RateLimiter` is shared by every fetch a platform job makes. Each wait
//! draws a fresh delay uniformly from `[min_delay, max_delay]`; there is no
//! token bucket and no burst allowance.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
}

impl RateLimiter {
    /// Creates a limiter; bounds given in the wrong order are swapped
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        if min_delay <= max_delay {
            Self {
                min_delay,
                max_delay,
            }
        } else {
            Self {
                min_delay: max_delay,
                max_delay: min_delay,
            }
        }
    }

    /// A limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Draws the next delay from the window
    pub fn next_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(fastrand::u64(min..=max))
    }

    /// Suspends the caller for a randomized delay
    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::trace!(delay_ms = delay.as_millis() as u64, "Rate limit wait");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_delays_stay_in_window() {
        let limiter = RateLimiter::new(Duration::from_millis(2000), Duration::from_millis(5000));
        for _ in 0..500 {
            let delay = limiter.next_delay();
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let limiter = RateLimiter::new(Duration::from_millis(900), Duration::from_millis(100));
        assert_eq!(limiter.min_delay(), Duration::from_millis(100));
        assert_eq!(limiter.max_delay(), Duration::from_millis(900));
    }

    #[test]
    fn test_degenerate_window() {
        let limiter = RateLimiter::new(Duration::from_millis(250), Duration::from_millis(250));
        assert_eq!(limiter.next_delay(), Duration::from_millis(250));
        assert_eq!(RateLimiter::disabled().next_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_wait_sleeps_at_least_min_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(20), Duration::from_millis(40));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_disabled_wait_returns_immediately() {
        let start = Instant::now();
        RateLimiter::disabled().wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
