//! Analyzer gateways: rate-limiting, caching, and retry around external calls
//!
//! Every analyzer family gets identical behavior here so the pipeline never
//! depends on how well-behaved an individual upstream is. The contract:
//! cache hit short-circuits, a rate-limit denial degrades instead of
//! blocking, transient failures retry with jittered backoff, malformed
//! responses fail immediately, and exhausted retries yield a scoreless
//! failed outcome.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::limiter::{Admission, RateLimiter};
use crate::models::{AnalyzerId, AnalyzerOutcome, AnalyzerReport, AnalyzerStatus, TokenCandidate};

pub mod holders;
pub mod liquidity;
pub mod security;

pub use holders::HolderAnalyzer;
pub use liquidity::LiquidityAnalyzer;
pub use security::SecurityAnalyzer;

/// Normalized result of one successful external call
#[derive(Debug, Clone)]
pub struct AnalyzerPayload {
    pub report: AnalyzerReport,
    /// Component score, 0-100
    pub score: f64,
    /// Raw upstream body, kept for diagnostics
    pub raw: serde_json::Value,
}

/// One external analyzer family. Implementations own the HTTP specifics and
/// normalization; everything else (limits, cache, retries) lives in the
/// gateway.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn id(&self) -> AnalyzerId;

    /// Rate-limit source key; one quota per upstream service
    fn source(&self) -> &str;

    /// Perform the external call and normalize the response
    async fn fetch(&self, candidate: &TokenCandidate) -> Result<AnalyzerPayload>;
}

/// Wraps one analyzer behind rate-limiting, caching, and retry/backoff
pub struct AnalyzerGateway {
    analyzer: Arc<dyn Analyzer>,
    config: AnalyzerConfig,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
}

impl AnalyzerGateway {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        config: AnalyzerConfig,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResultCache>,
    ) -> Self {
        limiter.register(analyzer.source(), &config.rate_limit);
        Self {
            analyzer,
            config,
            limiter,
            cache,
        }
    }

    pub fn id(&self) -> AnalyzerId {
        self.analyzer.id()
    }

    /// Run one analysis for a candidate. Never returns an error: every
    /// failure mode maps onto an outcome status so a single slow or broken
    /// upstream cannot stall the run.
    pub async fn analyze(&self, candidate: &TokenCandidate) -> AnalyzerOutcome {
        let id = self.analyzer.id();

        if let Some(mut cached) = self.cache.get(&candidate.address, id) {
            debug!(mint = %candidate.address, analyzer = %id, "Cache hit");
            cached.status = AnalyzerStatus::Cached;
            return cached;
        }

        match self.limiter.try_acquire(self.analyzer.source()) {
            Admission::Granted => {}
            Admission::RetryAt(at) => {
                // Not an error: degrade with a neutral score rather than
                // waiting out the window and holding the whole run hostage
                debug!(
                    mint = %candidate.address,
                    analyzer = %id,
                    retry_in_ms = at.saturating_duration_since(std::time::Instant::now()).as_millis() as u64,
                    "Rate limited, degrading"
                );
                return AnalyzerOutcome::degraded(id, self.config.neutral_score);
            }
        }

        match self.fetch_with_retry(candidate).await {
            Ok(payload) => {
                let outcome = AnalyzerOutcome {
                    analyzer: id,
                    status: AnalyzerStatus::Ok,
                    score: Some(payload.score.clamp(0.0, 100.0)),
                    report: Some(payload.report),
                    raw: payload.raw,
                    fetched_at: chrono::Utc::now(),
                };
                self.cache
                    .put(&candidate.address, id, outcome.clone(), self.config.cache_ttl());
                outcome
            }
            Err(e) => {
                warn!(mint = %candidate.address, analyzer = %id, error = %e, "Analyzer failed");
                AnalyzerOutcome::failed(id)
            }
        }
    }

    /// Fetch with per-call timeout and capped, jittered exponential backoff.
    /// Malformed responses are permanent: the upstream answered, retrying
    /// won't change its mind.
    async fn fetch_with_retry(&self, candidate: &TokenCandidate) -> Result<AnalyzerPayload> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.config.retry_base_delay_ms),
            multiplier: 2.0,
            max_interval: Duration::from_millis(self.config.retry_base_delay_ms * 8),
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;
        for attempt in 1..=self.config.max_attempts {
            let result = match timeout(self.config.call_timeout(), self.analyzer.fetch(candidate))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::RequestTimeout {
                    service: self.analyzer.source().to_string(),
                    elapsed_ms: self.config.timeout_ms,
                }),
            };

            match result {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| Duration::from_millis(self.config.retry_base_delay_ms));
                    warn!(
                        analyzer = %self.analyzer.id(),
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient analyzer error, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::RetriesExhausted(self.analyzer.id().as_str().to_string())))
    }
}
