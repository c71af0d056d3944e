use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-action records older than this are swept by [`RateLimiter::cleanup`].
pub const CLEANUP_HORIZON_MS: u64 = 3_600_000;

/// Outcome of a limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

/// Best-effort sliding-window throttle on repeated actions. This is a
/// fairness measure, not a security control: it only counts attempts seen
/// by this process, and a hard quota has to live behind the backend.
#[derive(Debug, Default)]
pub struct RateLimiter {
    attempts: Mutex<HashMap<String, Vec<u64>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl RateLimiter {
    pub fn new() -> RateLimiter {
        RateLimiter::default()
    }

    /// Prunes attempts older than `window_ms`, then either records the new
    /// attempt and allows it, or denies with a retry hint computed from
    /// the oldest surviving attempt.
    pub fn check(&self, action: &str, max_attempts: usize, window_ms: u64) -> Decision {
        self.check_at(now_ms(), action, max_attempts, window_ms)
    }

    fn check_at(&self, now: u64, action: &str, max_attempts: usize, window_ms: u64) -> Decision {
        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            // storage trouble fails open, matching the limiter's
            // best-effort contract
            Err(_) => {
                log::warn!("rate limiter storage unavailable, allowing");
                return Decision {
                    allowed: true,
                    retry_after_secs: 0,
                };
            }
        };

        let timestamps = attempts.entry(action.to_string()).or_default();
        timestamps.retain(|t| now.saturating_sub(*t) < window_ms);

        if timestamps.len() >= max_attempts {
            let oldest = timestamps.iter().min().copied().unwrap_or(now);
            let wait_ms = (oldest + window_ms).saturating_sub(now);
            return Decision {
                allowed: false,
                retry_after_secs: (wait_ms + 999) / 1000,
            };
        }

        timestamps.push(now);
        Decision {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    /// Forgets all attempts for one action.
    pub fn reset(&self, action: &str) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.remove(action);
        }
    }

    /// Drops action records whose every attempt is older than
    /// [`CLEANUP_HORIZON_MS`], bounding storage growth.
    pub fn cleanup(&self) {
        let now = now_ms();
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.retain(|_, timestamps| {
                timestamps
                    .iter()
                    .any(|t| now.saturating_sub(*t) <= CLEANUP_HORIZON_MS)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_denies_with_retry_hint() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            let decision = limiter.check("create_note", 5, 60_000);
            assert!(decision.allowed);
            assert_eq!(decision.retry_after_secs, 0);
        }
        let denied = limiter.check("create_note", 5, 60_000);
        assert!(!denied.allowed);
        assert!(denied.retry_after_secs > 0);
    }

    #[test]
    fn attempts_expire_out_of_the_window() {
        let limiter = RateLimiter::new();
        let start = 1_000_000;
        for i in 0..5 {
            assert!(limiter.check_at(start + i, "a", 5, 60_000).allowed);
        }
        assert!(!limiter.check_at(start + 30_000, "a", 5, 60_000).allowed);
        // the whole window has slid past the original burst
        assert!(limiter.check_at(start + 61_000, "a", 5, 60_000).allowed);
    }

    #[test]
    fn retry_hint_counts_down_to_the_oldest_attempt() {
        let limiter = RateLimiter::new();
        let start = 500_000;
        for _ in 0..3 {
            limiter.check_at(start, "a", 3, 60_000);
        }
        let denied = limiter.check_at(start + 45_000, "a", 3, 60_000);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, 15);
    }

    #[test]
    fn actions_are_tracked_independently() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("create_note", 5, 60_000).allowed);
        }
        assert!(!limiter.check("create_note", 5, 60_000).allowed);
        assert!(limiter.check("delete_note", 5, 60_000).allowed);
    }

    #[test]
    fn reset_clears_one_action() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check("a", 5, 60_000);
        }
        assert!(!limiter.check("a", 5, 60_000).allowed);
        limiter.reset("a");
        assert!(limiter.check("a", 5, 60_000).allowed);
    }

    #[test]
    fn cleanup_sweeps_stale_records() {
        let limiter = RateLimiter::new();
        {
            let mut attempts = limiter.attempts.lock().unwrap();
            attempts.insert("stale".to_string(), vec![0, 1, 2]);
            attempts.insert("fresh".to_string(), vec![now_ms()]);
        }
        limiter.cleanup();
        let attempts = limiter.attempts.lock().unwrap();
        assert!(!attempts.contains_key("stale"));
        assert!(attempts.contains_key("fresh"));
    }
}
