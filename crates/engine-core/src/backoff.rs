use std::time::Duration;

/// Exponential delay between failed polls. Never opens: the caller keeps
/// retrying at `max_delay` for as long as failures continue.
#[derive(Clone, Debug)]
pub struct Backoff {
    consecutive_failures: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            consecutive_failures: 0,
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Records a failure and returns how long to wait before the next attempt.
    pub fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.delay_for(self.consecutive_failures)
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn delay_for(&self, failures: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let exponent = failures.saturating_sub(1).min(16);
        let factor = 1u128 << exponent;
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_capped() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(500));
        let delays: Vec<_> = (0..5).map(|_| backoff.record_failure().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
        assert_eq!(backoff.consecutive_failures(), 5);
    }

    #[test]
    fn test_success_resets() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(1));
        backoff.record_failure();
        backoff.record_failure();
        backoff.record_success();
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.record_failure(), Duration::from_millis(50));
    }

    #[test]
    fn test_max_below_base_uses_base() {
        let mut backoff = Backoff::new(Duration::from_millis(300), Duration::from_millis(10));
        assert_eq!(backoff.record_failure(), Duration::from_millis(300));
        assert_eq!(backoff.record_failure(), Duration::from_millis(300));
    }

    #[test]
    fn test_many_failures_do_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_millis(1), Duration::from_secs(60));
        for _ in 0..1_000 {
            backoff.record_failure();
        }
        assert_eq!(backoff.record_failure(), Duration::from_secs(60));
    }
}
