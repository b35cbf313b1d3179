//! Analysis record persistence
//!
//! Append-only JSONL, one record per pipeline run. Writes are fire-and-forget
//! from the pipeline's perspective; a storage failure is logged and never
//! blocks or rejects an alert.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::AnalysisRecord;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn append(&self, record: &AnalysisRecord) -> Result<()>;
}

pub struct JsonlStorage {
    path: PathBuf,
}

impl JsonlStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Storage for JsonlStorage {
    async fn append(&self, record: &AnalysisRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Storage(format!("open {}: {}", self.path.display(), e)))?;
        file.write_all(&line)
            .await
            .map_err(|e| Error::Storage(format!("append {}: {}", self.path.display(), e)))?;

        debug!(run_id = %record.run_id, path = %self.path.display(), "Analysis persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AlertDecision, AlertReason, RiskLevel, ScoringResult, TokenCandidate,
    };
    use chrono::Utc;
    use tokio_test::assert_ok;

    fn record(run_id: &str) -> AnalysisRecord {
        let candidate: TokenCandidate =
            serde_json::from_str(r#"{"address": "mint1", "liquidity_usd": 1000.0}"#).unwrap();
        AnalysisRecord {
            run_id: run_id.to_string(),
            candidate,
            outcomes: vec![],
            scoring: ScoringResult {
                address: "mint1".into(),
                rule_score: 50.0,
                ml_score: None,
                ml_confidence: None,
                combined_score: 50.0,
                components: vec![],
                risk_level: RiskLevel::Medium,
                deal_breakers: vec![],
                degraded: false,
            },
            pattern: None,
            decision: AlertDecision::rejected("mint1", AlertReason::BelowThreshold),
            analyzed_at: Utc::now(),
            duration_ms: 123,
        }
    }

    #[tokio::test]
    async fn test_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.jsonl");
        let storage = JsonlStorage::new(&path);

        assert_ok!(storage.append(&record("run-1")).await);
        assert_ok!(storage.append(&record("run-2")).await);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: AnalysisRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.run_id, "run-2");
    }

    #[tokio::test]
    async fn test_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/analyses.jsonl");
        let storage = JsonlStorage::new(&path);

        storage.append(&record("run-1")).await.unwrap();
        assert!(path.exists());
    }
}
