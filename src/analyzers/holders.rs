//! Holder distribution analyzer
//!
//! Pulls the token's largest accounts over a JSON-RPC style endpoint and
//! scores distribution health: enough holders, low whale concentration.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnalyzerId, AnalyzerReport, HolderReport, TokenCandidate};

use super::{Analyzer, AnalyzerPayload};

const SOURCE: &str = "holders";

/// How many largest accounts to request
const ACCOUNT_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
struct RpcResponse {
    result: Option<RpcResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcResult {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    token_accounts: Vec<TokenAccount>,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenAccount {
    #[serde(default)]
    owner: String,
    /// Share of supply, percentage
    #[serde(default)]
    pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
}

/// Holder analyzer calling a token-accounts endpoint for one token
pub struct HolderAnalyzer {
    client: Client,
    base_url: String,
}

impl HolderAnalyzer {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    fn parse(raw: &serde_json::Value, candidate: &TokenCandidate) -> Result<HolderReport> {
        let response: RpcResponse =
            serde_json::from_value(raw.clone()).map_err(|e| Error::MalformedResponse {
                service: SOURCE.into(),
                detail: e.to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(Error::MalformedResponse {
                service: SOURCE.into(),
                detail: error.message,
            });
        }

        let result = response.result.ok_or_else(|| Error::MalformedResponse {
            service: SOURCE.into(),
            detail: "missing result".into(),
        })?;

        let top_10_concentration: f64 =
            result.token_accounts.iter().take(10).map(|a| a.pct).sum();
        let top_20_concentration: f64 =
            result.token_accounts.iter().take(20).map(|a| a.pct).sum();

        // The largest holder is the dev wallet more often than not on fresh
        // launches; treat its share as the dev share
        let dev_wallet_pct = result
            .token_accounts
            .first()
            .filter(|a| !a.owner.is_empty())
            .map(|a| a.pct)
            .unwrap_or(0.0);

        let total_holders = result.total.max(candidate.holders);

        Ok(HolderReport {
            total_holders,
            top_10_concentration,
            top_20_concentration,
            dev_wallet_pct,
            // Growth is a scanner-side observation; the account list is a
            // point-in-time snapshot
            growth_rate_per_min: candidate.holder_growth_rate,
            distribution_score: Self::distribution_score(total_holders, top_10_concentration),
        })
    }

    /// 0-100: rewarded for breadth, punished for whale concentration
    fn distribution_score(total_holders: u32, top_10_concentration: f64) -> f64 {
        let mut score: f64 = 50.0;

        score += match total_holders {
            h if h >= 500 => 30.0,
            h if h >= 100 => 20.0,
            h if h >= 50 => 10.0,
            h if h < 20 => -10.0,
            _ => 0.0,
        };

        score += match top_10_concentration {
            c if c < 15.0 => 20.0,
            c if c < 25.0 => 10.0,
            c if c > 60.0 => -40.0,
            c if c > 40.0 => -20.0,
            _ => 0.0,
        };

        score.clamp(0.0, 100.0)
    }
}

#[async_trait]
impl Analyzer for HolderAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Holders
    }

    fn source(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, candidate: &TokenCandidate) -> Result<AnalyzerPayload> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "radar-holders",
            "method": "getTokenAccounts",
            "params": {
                "page": 1,
                "limit": ACCOUNT_LIMIT,
                "mint": candidate.address,
                "options": { "showZeroBalance": false }
            }
        });

        debug!(mint = %candidate.address, "Fetching holder distribution");

        let response = self.client.post(&self.base_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                service: SOURCE.into(),
                status: status.as_u16(),
            });
        }

        let raw: serde_json::Value = response.json().await?;
        let report = Self::parse(&raw, candidate)?;
        let score = report.distribution_score;

        Ok(AnalyzerPayload {
            report: AnalyzerReport::Holders(report),
            score,
            raw,
        })
    }
}
