//! Failed-login rate limiting.
//!
//! Keyed by best-effort client address. Up to `max_attempts` failures are
//! tolerated inside a rolling cooldown window; further attempts are blocked
//! until the window expires. The window resets once the cooldown has elapsed
//! since the last failure, successful login or not.
//!
//! The in-memory implementation is process-local: in a multi-instance
//! deployment each instance counts independently. The trait seam exists so a
//! shared-store implementation can replace it without touching login logic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const MAX_ATTEMPTS: u32 = 3;
pub const COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allowed,
    Blocked { retry_after: Duration },
}

pub trait RateLimiter: Send + Sync {
    /// Whether an attempt from `key` may proceed. Blocking does not consume
    /// an attempt.
    fn check(&self, key: &str) -> Decision;
    fn record_failure(&self, key: &str);
    fn clear(&self, key: &str);
    fn attempts_remaining(&self, key: &str) -> u32;
}

struct FailureRecord {
    count: u32,
    last_attempt: Instant,
}

pub struct InMemoryRateLimiter {
    max_attempts: u32,
    cooldown: Duration,
    failures: Mutex<HashMap<String, FailureRecord>>,
}

impl InMemoryRateLimiter {
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts,
            cooldown,
            failures: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, COOLDOWN)
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str) -> Decision {
        let mut failures = self.failures.lock().expect("rate limiter poisoned");
        let Some(record) = failures.get(key) else {
            return Decision::Allowed;
        };

        let elapsed = record.last_attempt.elapsed();
        if elapsed >= self.cooldown {
            failures.remove(key);
            return Decision::Allowed;
        }

        if record.count >= self.max_attempts {
            return Decision::Blocked {
                retry_after: self.cooldown - elapsed,
            };
        }
        Decision::Allowed
    }

    fn record_failure(&self, key: &str) {
        let mut failures = self.failures.lock().expect("rate limiter poisoned");
        let record = failures.entry(key.to_string()).or_insert(FailureRecord {
            count: 0,
            last_attempt: Instant::now(),
        });
        record.count += 1;
        record.last_attempt = Instant::now();
    }

    fn clear(&self, key: &str) {
        let mut failures = self.failures.lock().expect("rate limiter poisoned");
        failures.remove(key);
    }

    fn attempts_remaining(&self, key: &str) -> u32 {
        let failures = self.failures.lock().expect("rate limiter poisoned");
        match failures.get(key) {
            Some(record) if record.last_attempt.elapsed() < self.cooldown => {
                self.max_attempts.saturating_sub(record.count)
            }
            _ => self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_failures_then_blocks() {
        let limiter = InMemoryRateLimiter::new(3, Duration::from_secs(30));
        for _ in 0..3 {
            assert_eq!(limiter.check("1.2.3.4"), Decision::Allowed);
            limiter.record_failure("1.2.3.4");
        }
        assert!(matches!(
            limiter.check("1.2.3.4"),
            Decision::Blocked { retry_after } if retry_after > Duration::ZERO
        ));
        // A blocked check must not extend the window or consume attempts.
        assert_eq!(limiter.attempts_remaining("1.2.3.4"), 0);
    }

    #[test]
    fn window_resets_after_cooldown() {
        let limiter = InMemoryRateLimiter::new(3, Duration::from_millis(40));
        for _ in 0..3 {
            limiter.record_failure("10.0.0.1");
        }
        assert!(matches!(limiter.check("10.0.0.1"), Decision::Blocked { .. }));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(limiter.check("10.0.0.1"), Decision::Allowed);
        assert_eq!(limiter.attempts_remaining("10.0.0.1"), 3);
    }

    #[test]
    fn keys_are_independent_and_clearable() {
        let limiter = InMemoryRateLimiter::default();
        for _ in 0..3 {
            limiter.record_failure("a");
        }
        assert!(matches!(limiter.check("a"), Decision::Blocked { .. }));
        assert_eq!(limiter.check("b"), Decision::Allowed);

        limiter.clear("a");
        assert_eq!(limiter.check("a"), Decision::Allowed);
        assert_eq!(limiter.attempts_remaining("a"), 3);
    }
}
