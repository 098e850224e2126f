//! Retry policy for failed tasks.

use std::time::Duration;

/// Exponential backoff with a delay ceiling and an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: i32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1000,
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt: `min(2^retries, max_delay)` seconds.
    pub fn delay(&self, retries: i32) -> Duration {
        let exponent = retries.clamp(0, 62) as u32;
        let secs = (1u64 << exponent).min(self.max_delay.as_secs());
        Duration::from_secs(secs)
    }

    /// Whether the task has used up its attempts and must fail terminally.
    pub fn exhausted(&self, retries: i32) -> bool {
        retries >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_the_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(5), Duration::from_secs(32));
        assert_eq!(policy.delay(11), Duration::from_secs(2048));
        // 2^12 = 4096 caps at one hour
        assert_eq!(policy.delay(12), Duration::from_secs(3600));
        assert_eq!(policy.delay(500), Duration::from_secs(3600));
    }

    #[test]
    fn test_negative_retries_clamp_to_first_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(-3), Duration::from_secs(1));
    }

    #[test]
    fn test_exhaustion_at_the_attempt_ceiling() {
        let policy = RetryPolicy::default();
        assert!(!policy.exhausted(0));
        assert!(!policy.exhausted(999));
        assert!(policy.exhausted(1000));
        assert!(policy.exhausted(1500));
    }
}
