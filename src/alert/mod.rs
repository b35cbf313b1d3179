//! Alert eligibility gate
//!
//! Every scored run ends here. Checks run in a fixed order and the first
//! failing one names the rejection, so operators can read a single reason
//! off each record. Quota consumption and dedup recording happen only on
//! approval.

use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::AlertConfig;
use crate::models::{AlertDecision, AlertReason, ScoringResult};

#[derive(Debug)]
struct QuotaWindow {
    day: NaiveDate,
    used: u32,
}

impl QuotaWindow {
    /// Check-and-increment under one lock hold. Resets at the UTC day
    /// boundary, never on a rolling window.
    fn try_consume(&mut self, now: DateTime<Utc>, max_daily: u32) -> bool {
        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.used = 0;
        }
        if self.used >= max_daily {
            return false;
        }
        self.used += 1;
        true
    }
}

pub struct AlertGate {
    config: AlertConfig,
    /// Addresses alerted recently, for the dedup cool-down
    recent: DashMap<String, Instant>,
    quota: Mutex<QuotaWindow>,
}

impl AlertGate {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            recent: DashMap::new(),
            quota: Mutex::new(QuotaWindow {
                day: Utc::now().date_naive(),
                used: 0,
            }),
        }
    }

    pub fn decide(&self, scoring: &ScoringResult) -> AlertDecision {
        self.decide_at(scoring, Instant::now(), Utc::now())
    }

    fn decide_at(&self, scoring: &ScoringResult, now: Instant, utc_now: DateTime<Utc>) -> AlertDecision {
        let address = scoring.address.as_str();

        if scoring.degraded {
            return self.reject(address, AlertReason::InsufficientData);
        }
        if !scoring.deal_breakers.is_empty() {
            return self.reject(address, AlertReason::DealBreaker);
        }
        if scoring.combined_score < self.config.min_score {
            return self.reject(address, AlertReason::BelowThreshold);
        }
        if scoring
            .ml_confidence
            .is_some_and(|c| c < self.config.min_ml_confidence)
        {
            return self.reject(address, AlertReason::LowConfidence);
        }
        if self.alerted_recently(address, now) {
            return self.reject(address, AlertReason::Duplicate);
        }

        {
            let mut quota = self
                .quota
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !quota.try_consume(utc_now, self.config.max_daily) {
                return self.reject(address, AlertReason::QuotaExceeded);
            }
        }

        self.recent.insert(address.to_string(), now);
        info!(mint = %address, score = scoring.combined_score, "Alert approved");
        AlertDecision::approved(address)
    }

    fn alerted_recently(&self, address: &str, now: Instant) -> bool {
        if let Some(entry) = self.recent.get(address) {
            if now.duration_since(*entry) < self.config.dedup_cooldown() {
                return true;
            }
        }
        // Expired entries are dropped on the next lookup
        self.recent.remove(address);
        false
    }

    fn reject(&self, address: &str, reason: AlertReason) -> AlertDecision {
        debug!(mint = %address, reason = ?reason, "Alert rejected");
        AlertDecision::rejected(address, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn passing_scoring(address: &str) -> ScoringResult {
        ScoringResult {
            address: address.to_string(),
            rule_score: 88.0,
            ml_score: None,
            ml_confidence: None,
            combined_score: 88.0,
            components: vec![],
            risk_level: RiskLevel::Medium,
            deal_breakers: vec![],
            degraded: false,
        }
    }

    fn gate() -> AlertGate {
        AlertGate::new(AlertConfig::default())
    }

    #[test]
    fn test_approval_path() {
        let decision = gate().decide(&passing_scoring("mint1"));
        assert!(decision.eligible);
        assert_eq!(decision.reason, AlertReason::Approved);
    }

    #[test]
    fn test_rejection_order() {
        let gate = gate();

        let mut scoring = passing_scoring("mint1");
        scoring.degraded = true;
        scoring.deal_breakers = vec!["honeypot indicators".into()];
        scoring.combined_score = 10.0;
        // Degraded outranks everything else
        assert_eq!(gate.decide(&scoring).reason, AlertReason::InsufficientData);

        scoring.degraded = false;
        // Deal-breaker outranks the threshold even though the capped score
        // is also below it
        assert_eq!(gate.decide(&scoring).reason, AlertReason::DealBreaker);

        scoring.deal_breakers.clear();
        assert_eq!(gate.decide(&scoring).reason, AlertReason::BelowThreshold);

        scoring.combined_score = 88.0;
        scoring.ml_confidence = Some(0.2);
        assert_eq!(gate.decide(&scoring).reason, AlertReason::LowConfidence);
    }

    #[test]
    fn test_duplicate_within_cooldown() {
        let gate = gate();
        let scoring = passing_scoring("mint1");
        let start = Instant::now();

        assert!(gate.decide_at(&scoring, start, Utc::now()).eligible);

        let shortly_after = start + Duration::from_secs(600);
        let decision = gate.decide_at(&scoring, shortly_after, Utc::now());
        assert_eq!(decision.reason, AlertReason::Duplicate);

        let after_cooldown = start + Duration::from_secs(3601);
        assert!(gate.decide_at(&scoring, after_cooldown, Utc::now()).eligible);
    }

    #[test]
    fn test_daily_quota_and_utc_reset() {
        let gate = gate();
        let now = Instant::now();
        let day_one = Utc::now();

        for i in 0..15 {
            let scoring = passing_scoring(&format!("mint{}", i));
            assert!(gate.decide_at(&scoring, now, day_one).eligible);
        }

        let decision = gate.decide_at(&passing_scoring("mint15"), now, day_one);
        assert_eq!(decision.reason, AlertReason::QuotaExceeded);

        // Quota rejection must not consume dedup state either
        let next_day = day_one + ChronoDuration::days(1);
        assert!(gate.decide_at(&passing_scoring("mint15"), now, next_day).eligible);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_quota_exact_under_concurrent_approvals() {
        let gate = std::sync::Arc::new(gate());
        let max_daily = AlertConfig::default().max_daily;

        let mut tasks = Vec::new();
        for i in 0..100 {
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                gate.decide(&passing_scoring(&format!("mint{}", i))).eligible
            }));
        }

        let mut approved = 0;
        for task in tasks {
            if task.await.unwrap() {
                approved += 1;
            }
        }
        assert_eq!(approved, max_daily);
    }

    #[test]
    fn test_distinct_tokens_not_deduped() {
        let gate = gate();
        let now = Instant::now();
        assert!(gate.decide_at(&passing_scoring("mint1"), now, Utc::now()).eligible);
        assert!(gate.decide_at(&passing_scoring("mint2"), now, Utc::now()).eligible);
    }
}
