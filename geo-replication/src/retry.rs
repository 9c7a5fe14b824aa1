use std::time::Duration;

/// Exponential delay schedule: `initial * multiplier^retry`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
}

impl Backoff {
    /// No delay at all between retries.
    pub const fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            max: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub async fn wait(&self, retry: u32) {
        let delay = self.delay(retry);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_capped() {
        let backoff = Backoff {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(1),
            multiplier: 2,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_none_never_waits() {
        let backoff = Backoff::none();
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(10), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_for_delay() {
        let backoff = Backoff {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(10),
            multiplier: 3,
        };
        let start = tokio::time::Instant::now();
        backoff.wait(1).await;
        assert!(start.elapsed() >= Duration::from_secs(6));
    }
}
