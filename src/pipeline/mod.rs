//! Per-candidate analysis pipeline
//!
//! One `analyze` call fans out to every enabled analyzer, collects whatever
//! finished before the run deadline, scores, pattern-matches, gates, and
//! persists. The run always terminates within the configured timeout; late
//! analyzers are recorded as failed rather than awaited.

pub mod worker;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alert::AlertGate;
use crate::analyzers::{Analyzer, AnalyzerGateway};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::Error;
use crate::limiter::RateLimiter;
use crate::models::{AnalysisRecord, AnalyzerOutcome, TokenCandidate};
use crate::notify::Notifier;
use crate::pattern::PatternDetector;
use crate::scoring::{MlScorer, ScoringEngine};
use crate::storage::Storage;

const CACHE_CAPACITY: usize = 10_000;

pub struct Orchestrator {
    gateways: Vec<Arc<AnalyzerGateway>>,
    scoring: ScoringEngine,
    gate: AlertGate,
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<ResultCache>,
    run_deadline: std::time::Duration,
    in_flight: Arc<DashMap<String, ()>>,
}

/// Removes the in-flight marker when the run ends, however it ends
struct InFlightGuard {
    map: Arc<DashMap<String, ()>>,
    address: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.address);
    }
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        analyzers: Vec<Arc<dyn Analyzer>>,
        ml: Arc<dyn MlScorer>,
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new());
        let cache = Arc::new(ResultCache::new(CACHE_CAPACITY));

        let gateways = analyzers
            .into_iter()
            .filter(|a| config.analyzers.for_id(a.id()).enabled)
            .map(|a| {
                let analyzer_config = config.analyzers.for_id(a.id()).clone();
                Arc::new(AnalyzerGateway::new(
                    a,
                    analyzer_config,
                    Arc::clone(&limiter),
                    Arc::clone(&cache),
                ))
            })
            .collect();

        Self {
            gateways,
            scoring: ScoringEngine::new(config.scoring.clone(), ml),
            gate: AlertGate::new(config.alerts.clone()),
            storage,
            notifier,
            cache,
            run_deadline: config.pipeline.timeout(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Analyze one candidate end to end. Returns `None` when the same token
    /// is already being analyzed by a concurrent run.
    pub async fn analyze(&self, candidate: TokenCandidate) -> Option<AnalysisRecord> {
        if self
            .in_flight
            .insert(candidate.address.clone(), ())
            .is_some()
        {
            debug!(mint = %candidate.address, "Already in flight, skipping");
            return None;
        }
        let _guard = InFlightGuard {
            map: Arc::clone(&self.in_flight),
            address: candidate.address.clone(),
        };

        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let analyzed_at = Utc::now();

        let outcomes = self.collect_outcomes(&candidate).await;

        let scoring = self.scoring.score(&candidate, &outcomes);
        let pattern = PatternDetector::detect(&candidate, &outcomes);
        let decision = self.gate.decide(&scoring);

        let record = AnalysisRecord {
            run_id: run_id.clone(),
            candidate,
            outcomes,
            scoring,
            pattern,
            decision,
            analyzed_at,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            run_id = %record.run_id,
            mint = %record.candidate.address,
            score = record.scoring.combined_score,
            eligible = record.decision.eligible,
            reason = ?record.decision.reason,
            duration_ms = record.duration_ms,
            "Run complete"
        );

        // Persistence must never delay or undo the decision
        let storage = Arc::clone(&self.storage);
        let stored = record.clone();
        tokio::spawn(async move {
            if let Err(e) = storage.append(&stored).await {
                warn!(run_id = %stored.run_id, error = %e, "Failed to persist analysis");
            }
        });

        if record.decision.eligible {
            if let Err(e) = self.notifier.notify(&record).await {
                warn!(
                    run_id = %record.run_id,
                    mint = %record.candidate.address,
                    error = %e,
                    "Alert delivery failed"
                );
            }
        }

        Some(record)
    }

    /// Fan out to all gateways and take whatever finished before the
    /// deadline. Pending analyzers are aborted and recorded as failed.
    async fn collect_outcomes(&self, candidate: &TokenCandidate) -> Vec<AnalyzerOutcome> {
        let deadline = tokio::time::Instant::now() + self.run_deadline;

        let mut tasks = JoinSet::new();
        for gateway in &self.gateways {
            let gateway = Arc::clone(gateway);
            let candidate = candidate.clone();
            tasks.spawn(async move { gateway.analyze(&candidate).await });
        }

        let mut outcomes = Vec::with_capacity(self.gateways.len());
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => outcomes.push(outcome),
                Ok(Some(Err(e))) => warn!(mint = %candidate.address, error = %e, "Analyzer task failed"),
                Ok(None) => break,
                Err(_) => {
                    let timeout = Error::PipelineTimeout(self.run_deadline.as_millis() as u64);
                    warn!(
                        mint = %candidate.address,
                        pending = tasks.len(),
                        error = %timeout,
                        "Run deadline hit, abandoning pending analyzers"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        for gateway in &self.gateways {
            if !outcomes.iter().any(|o| o.analyzer == gateway.id()) {
                outcomes.push(AnalyzerOutcome::failed(gateway.id()));
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::AnalyzerPayload;
    use crate::error::Result;
    use crate::models::{
        AlertReason, AnalyzerId, AnalyzerReport, AnalyzerStatus, HolderReport, LiquidityReport,
        RiskLevel, SecurityReport,
    };
    use crate::scoring::DisabledScorer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockAnalyzer {
        id: AnalyzerId,
        payload: AnalyzerPayload,
        delay: Duration,
    }

    #[async_trait]
    impl Analyzer for MockAnalyzer {
        fn id(&self) -> AnalyzerId {
            self.id
        }

        fn source(&self) -> &str {
            self.id.as_str()
        }

        async fn fetch(&self, _candidate: &TokenCandidate) -> Result<AnalyzerPayload> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.payload.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: AtomicU32,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, _record: &AnalysisRecord) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        records: Mutex<Vec<AnalysisRecord>>,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn append(&self, record: &AnalysisRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn security_report(mint_frozen: bool) -> SecurityReport {
        SecurityReport {
            overall_score: 9.5,
            mint_authority_frozen: mint_frozen,
            freeze_authority_revoked: true,
            top_10_holders_pct: 18.0,
            lp_locked: true,
            lp_burned: true,
            is_honeypot: false,
            can_sell: true,
            known_risks: vec![],
        }
    }

    fn security_analyzer(mint_frozen: bool, delay: Duration) -> Arc<dyn Analyzer> {
        let report = security_report(mint_frozen);
        Arc::new(MockAnalyzer {
            id: AnalyzerId::Security,
            payload: AnalyzerPayload {
                score: report.overall_score * 10.0,
                report: AnalyzerReport::Security(report),
                raw: serde_json::Value::Null,
            },
            delay,
        })
    }

    fn liquidity_analyzer(delay: Duration) -> Arc<dyn Analyzer> {
        Arc::new(MockAnalyzer {
            id: AnalyzerId::Liquidity,
            payload: AnalyzerPayload {
                score: 85.0,
                report: AnalyzerReport::Liquidity(LiquidityReport {
                    total_liquidity_usd: 60_000.0,
                    liquidity_sol: 300.0,
                    lp_locked_pct: 100.0,
                    lp_burned_pct: 0.0,
                    stability_score: 85.0,
                }),
                raw: serde_json::Value::Null,
            },
            delay,
        })
    }

    fn holders_analyzer(delay: Duration) -> Arc<dyn Analyzer> {
        Arc::new(MockAnalyzer {
            id: AnalyzerId::Holders,
            payload: AnalyzerPayload {
                score: 80.0,
                report: AnalyzerReport::Holders(HolderReport {
                    total_holders: 350,
                    top_10_concentration: 18.0,
                    top_20_concentration: 28.0,
                    dev_wallet_pct: 3.0,
                    growth_rate_per_min: 8.0,
                    distribution_score: 80.0,
                }),
                raw: serde_json::Value::Null,
            },
            delay,
        })
    }

    fn candidate() -> TokenCandidate {
        serde_json::from_str(
            r#"{"address": "mintA", "symbol": "TKN", "liquidity_usd": 60000.0,
                "age_seconds": 200, "holders": 350, "price_change_5min": 25.0,
                "volume_change_2min": 150.0, "holder_growth_rate": 10.0,
                "social_links": 3}"#,
        )
        .unwrap()
    }

    fn orchestrator(
        analyzers: Vec<Arc<dyn Analyzer>>,
        timeout_ms: u64,
    ) -> (Orchestrator, Arc<MemoryStorage>, Arc<RecordingNotifier>) {
        let mut config = Config::default();
        config.pipeline.timeout_ms = timeout_ms;
        let storage = Arc::new(MemoryStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = Orchestrator::new(
            &config,
            analyzers,
            Arc::new(DisabledScorer),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        (orchestrator, storage, notifier)
    }

    #[tokio::test]
    async fn test_clean_token_approved_and_notified() {
        let (orchestrator, _storage, notifier) = orchestrator(
            vec![
                security_analyzer(true, Duration::ZERO),
                liquidity_analyzer(Duration::ZERO),
                holders_analyzer(Duration::ZERO),
            ],
            5000,
        );

        let record = orchestrator.analyze(candidate()).await.unwrap();
        assert!(record.decision.eligible);
        assert_eq!(record.decision.reason, AlertReason::Approved);
        assert!(record.scoring.deal_breakers.is_empty());
        assert_eq!(record.scoring.risk_level, RiskLevel::Low);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unfrozen_mint_rejected_without_notification() {
        let (orchestrator, _storage, notifier) = orchestrator(
            vec![
                security_analyzer(false, Duration::ZERO),
                liquidity_analyzer(Duration::ZERO),
                holders_analyzer(Duration::ZERO),
            ],
            5000,
        );

        let record = orchestrator.analyze(candidate()).await.unwrap();
        assert!(!record.decision.eligible);
        assert_eq!(record.decision.reason, AlertReason::DealBreaker);
        assert!(record
            .scoring
            .deal_breakers
            .iter()
            .any(|b| b.contains("mint authority")));
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_analyzer_recorded_failed_within_deadline() {
        let (orchestrator, _storage, _notifier) = orchestrator(
            vec![
                security_analyzer(true, Duration::ZERO),
                liquidity_analyzer(Duration::ZERO),
                holders_analyzer(Duration::from_secs(30)),
            ],
            200,
        );

        let started = Instant::now();
        let record = orchestrator.analyze(candidate()).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        let holders = record
            .outcomes
            .iter()
            .find(|o| o.analyzer == AnalyzerId::Holders)
            .unwrap();
        assert_eq!(holders.status, AnalyzerStatus::Failed);
        assert!(holders.score.is_none());

        // Remaining verified coverage still clears the floor
        assert!(!record.scoring.degraded);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_skipped() {
        let (orchestrator, _storage, _notifier) = orchestrator(
            vec![security_analyzer(true, Duration::from_millis(200))],
            5000,
        );
        let orchestrator = Arc::new(orchestrator);

        let first = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.analyze(candidate()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = orchestrator.analyze(candidate()).await;

        assert!(second.is_none());
        assert!(first.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_analysis_persisted() {
        let (orchestrator, storage, _notifier) = orchestrator(
            vec![
                security_analyzer(true, Duration::ZERO),
                liquidity_analyzer(Duration::ZERO),
                holders_analyzer(Duration::ZERO),
            ],
            5000,
        );

        let record = orchestrator.analyze(candidate()).await.unwrap();

        // Storage write is spawned; give it a beat
        tokio::time::sleep(Duration::from_millis(50)).await;
        let records = storage.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].run_id, record.run_id);
    }
}
