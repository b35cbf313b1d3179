//! Bounded intake queue and worker pool
//!
//! Candidates arrive faster than runs complete during launch waves; the
//! bounded channel applies backpressure at intake instead of letting runs
//! pile up. Workers pull from the shared queue and drive the orchestrator.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::TokenCandidate;

use super::Orchestrator;

pub struct WorkerPool {
    sender: async_channel::Sender<TokenCandidate>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(orchestrator: Arc<Orchestrator>, workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(queue_capacity);
        let shutdown = CancellationToken::new();

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let orchestrator = Arc::clone(&orchestrator);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, orchestrator, receiver, shutdown).await;
                })
            })
            .collect();

        info!(workers, queue_capacity, "Worker pool started");
        Self {
            sender,
            shutdown,
            handles,
        }
    }

    /// Queue a candidate, waiting when the queue is full
    pub async fn submit(&self, candidate: TokenCandidate) -> Result<()> {
        self.sender
            .send(candidate)
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Queue a candidate without waiting; a full queue drops it
    pub fn try_submit(&self, candidate: TokenCandidate) -> Result<()> {
        match self.sender.try_send(candidate) {
            Ok(()) => Ok(()),
            Err(async_channel::TrySendError::Full(candidate)) => {
                warn!(mint = %candidate.address, "Intake queue full, dropping candidate");
                Ok(())
            }
            Err(async_channel::TrySendError::Closed(_)) => Err(Error::QueueClosed),
        }
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Stop accepting work, let queued candidates drain, and wait for the
    /// workers to exit
    pub async fn shutdown(self) {
        self.sender.close();
        self.shutdown.cancel();
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Worker exited abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    orchestrator: Arc<Orchestrator>,
    receiver: async_channel::Receiver<TokenCandidate>,
    shutdown: CancellationToken,
) {
    debug!(worker_id, "Worker started");
    loop {
        tokio::select! {
            candidate = receiver.recv() => {
                match candidate {
                    Ok(candidate) => {
                        orchestrator.analyze(candidate).await;
                    }
                    Err(_) => {
                        debug!(worker_id, "Queue closed, worker exiting");
                        break;
                    }
                }
            }
            _ = shutdown.cancelled() => {
                // Finish what is already queued before exiting
                while let Ok(candidate) = receiver.try_recv() {
                    orchestrator.analyze(candidate).await;
                }
                debug!(worker_id, "Worker shut down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{Analyzer, AnalyzerPayload};
    use crate::config::Config;
    use crate::models::{AnalysisRecord, AnalyzerId, AnalyzerReport, SecurityReport};
    use crate::notify::{LogNotifier, Notifier};
    use crate::scoring::DisabledScorer;
    use crate::storage::Storage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StaticSecurity;

    #[async_trait]
    impl Analyzer for StaticSecurity {
        fn id(&self) -> AnalyzerId {
            AnalyzerId::Security
        }

        fn source(&self) -> &str {
            "security"
        }

        async fn fetch(
            &self,
            _candidate: &crate::models::TokenCandidate,
        ) -> crate::error::Result<AnalyzerPayload> {
            let report = SecurityReport {
                overall_score: 9.0,
                mint_authority_frozen: true,
                freeze_authority_revoked: true,
                top_10_holders_pct: 20.0,
                lp_locked: true,
                lp_burned: false,
                is_honeypot: false,
                can_sell: true,
                known_risks: vec![],
            };
            Ok(AnalyzerPayload {
                score: 90.0,
                report: AnalyzerReport::Security(report),
                raw: serde_json::Value::Null,
            })
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        records: Mutex<Vec<AnalysisRecord>>,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn append(&self, record: &AnalysisRecord) -> crate::error::Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn candidate(address: &str) -> crate::models::TokenCandidate {
        serde_json::from_str(&format!(
            r#"{{"address": "{}", "liquidity_usd": 40000.0, "age_seconds": 200}}"#,
            address
        ))
        .unwrap()
    }

    fn pool_with_storage(workers: usize) -> (WorkerPool, Arc<MemoryStorage>) {
        let config = Config::default();
        let storage = Arc::new(MemoryStorage::default());
        let orchestrator = Arc::new(Orchestrator::new(
            &config,
            vec![Arc::new(StaticSecurity)],
            Arc::new(DisabledScorer),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(LogNotifier) as Arc<dyn Notifier>,
        ));
        (WorkerPool::spawn(orchestrator, workers, 16), storage)
    }

    #[tokio::test]
    async fn test_submitted_candidates_processed() {
        let (pool, storage) = pool_with_storage(4);

        for i in 0..8 {
            pool.submit(candidate(&format!("mint{}", i))).await.unwrap();
        }

        // Drain and stop; every queued candidate must have been analyzed
        tokio::time::sleep(Duration::from_millis(200)).await;
        pool.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(storage.records.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let (pool, _storage) = pool_with_storage(1);
        let sender = pool.sender.clone();
        pool.shutdown().await;

        assert!(sender.send(candidate("late")).await.is_err());
    }
}
