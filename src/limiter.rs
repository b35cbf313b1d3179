//! Per-source sliding-window admission control
//!
//! A pure admission decision: no queuing, no sleeping. The caller decides
//! what to do with a denial (the gateways turn it into a degraded outcome
//! rather than stalling the pipeline).

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;

/// Outcome of an admission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted and recorded against the window
    Granted,
    /// Quota exhausted; the oldest recorded request leaves the window at
    /// this instant
    RetryAt(Instant),
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

struct SourceWindow {
    max_requests: usize,
    window: Duration,
    /// Timestamps of admitted requests, oldest first
    admitted: Mutex<VecDeque<Instant>>,
}

impl SourceWindow {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    fn try_acquire_at(&self, now: Instant) -> Admission {
        let mut admitted = self
            .admitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Evict timestamps that have slid out of the trailing window
        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < self.max_requests {
            admitted.push_back(now);
            return Admission::Granted;
        }

        // Full: the slot frees up when the oldest timestamp expires
        match admitted.front() {
            Some(oldest) => Admission::RetryAt(*oldest + self.window),
            // Zero-quota window never admits
            None => Admission::RetryAt(now + self.window),
        }
    }
}

/// Sliding-window rate limiter shared across all concurrent pipeline runs.
/// One serialized window per source; reads of different sources never
/// contend.
pub struct RateLimiter {
    sources: DashMap<String, SourceWindow>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            sources: DashMap::new(),
        }
    }

    /// Register a source's quota. Replaces any previous registration and
    /// resets its window.
    pub fn register(&self, source: &str, config: &RateLimitConfig) {
        debug!(
            source = %source,
            max_requests = config.max_requests,
            window_secs = config.window_secs,
            "Registered rate limit"
        );
        self.sources.insert(
            source.to_string(),
            SourceWindow::new(config.max_requests as usize, config.window()),
        );
    }

    /// Try to admit one request for a source. Unregistered sources are
    /// admitted unconstrained.
    pub fn try_acquire(&self, source: &str) -> Admission {
        self.try_acquire_at(source, Instant::now())
    }

    fn try_acquire_at(&self, source: &str, now: Instant) -> Admission {
        match self.sources.get(source) {
            Some(window) => window.try_acquire_at(now),
            None => Admission::Granted,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        let limiter = RateLimiter::new();
        limiter.register(
            "src",
            &RateLimitConfig {
                max_requests,
                window_secs,
            },
        );
        limiter
    }

    #[test]
    fn test_grants_up_to_quota_then_denies() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.try_acquire_at("src", now), Admission::Granted);
        }
        match limiter.try_acquire_at("src", now) {
            Admission::RetryAt(at) => assert_eq!(at, now + Duration::from_secs(60)),
            Admission::Granted => panic!("fourth request must be denied"),
        }
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(2, 10);
        let start = Instant::now();

        assert!(limiter.try_acquire_at("src", start).is_granted());
        assert!(limiter
            .try_acquire_at("src", start + Duration::from_secs(5))
            .is_granted());
        // Full within the trailing window
        assert!(!limiter
            .try_acquire_at("src", start + Duration::from_secs(9))
            .is_granted());
        // First admission has expired
        assert!(limiter
            .try_acquire_at("src", start + Duration::from_secs(10))
            .is_granted());
    }

    #[test]
    fn test_unregistered_source_unconstrained() {
        let limiter = RateLimiter::new();
        for _ in 0..100 {
            assert!(limiter.try_acquire("anything").is_granted());
        }
    }

    #[test]
    fn test_sources_are_independent() {
        let limiter = RateLimiter::new();
        limiter.register(
            "a",
            &RateLimitConfig {
                max_requests: 1,
                window_secs: 60,
            },
        );
        limiter.register(
            "b",
            &RateLimitConfig {
                max_requests: 1,
                window_secs: 60,
            },
        );
        let now = Instant::now();

        assert!(limiter.try_acquire_at("a", now).is_granted());
        assert!(!limiter.try_acquire_at("a", now).is_granted());
        assert!(limiter.try_acquire_at("b", now).is_granted());
    }

    #[tokio::test]
    async fn test_never_exceeds_quota_under_concurrency() {
        let limiter = Arc::new(limiter(25, 60));
        let mut handles = Vec::new();

        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                let mut granted = 0u32;
                for _ in 0..20 {
                    if limiter.try_acquire("src").is_granted() {
                        granted += 1;
                    }
                }
                granted
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        // 200 attempts within one window, quota is 25
        assert_eq!(total, 25);
    }
}
