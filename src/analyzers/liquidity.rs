//! Liquidity analyzer backed by a DexScreener-style pair API
//!
//! Fetches the token's trading pairs, picks the primary pool, and scores
//! liquidity depth and stability on the 0-100 component scale.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnalyzerId, AnalyzerReport, LiquidityReport, TokenCandidate};

use super::{Analyzer, AnalyzerPayload};

const SOURCE: &str = "dexscreener";

#[derive(Debug, Clone, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Deserialize)]
struct DexPair {
    #[serde(rename = "dexId", default)]
    dex_id: String,
    liquidity: Option<PairLiquidity>,
    volume: Option<PairVolume>,
    #[serde(rename = "liquidityLock")]
    liquidity_lock: Option<LiquidityLock>,
}

#[derive(Debug, Clone, Deserialize)]
struct PairLiquidity {
    usd: Option<f64>,
    /// Quote-side depth; SOL for the pools we care about
    quote: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PairVolume {
    h1: Option<f64>,
    h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct LiquidityLock {
    #[serde(rename = "lockedPct", default)]
    locked_pct: f64,
    #[serde(rename = "burnedPct", default)]
    burned_pct: f64,
}

/// Liquidity analyzer calling the pair-lookup endpoint for one token
pub struct LiquidityAnalyzer {
    client: Client,
    base_url: String,
}

impl LiquidityAnalyzer {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    fn parse(raw: &serde_json::Value) -> Result<Option<LiquidityReport>> {
        let data: TokenPairsResponse =
            serde_json::from_value(raw.clone()).map_err(|e| Error::MalformedResponse {
                service: SOURCE.into(),
                detail: e.to_string(),
            })?;

        let pairs = match data.pairs {
            Some(pairs) if !pairs.is_empty() => pairs,
            _ => return Ok(None),
        };

        // Prefer the launchpad pool over derivative pairs
        let pair = pairs
            .iter()
            .find(|p| p.dex_id == "pumpswap" || p.dex_id == "pumpfun" || p.dex_id == "raydium")
            .unwrap_or(&pairs[0]);

        let total_liquidity_usd = pair.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
        let liquidity_sol = pair.liquidity.as_ref().and_then(|l| l.quote).unwrap_or(0.0);
        let volume_h1 = pair.volume.as_ref().and_then(|v| v.h1).unwrap_or(0.0);
        let (lp_locked_pct, lp_burned_pct) = pair
            .liquidity_lock
            .as_ref()
            .map(|l| (l.locked_pct, l.burned_pct))
            .unwrap_or((0.0, 0.0));

        Ok(Some(LiquidityReport {
            total_liquidity_usd,
            liquidity_sol,
            lp_locked_pct,
            lp_burned_pct,
            stability_score: Self::stability_score(total_liquidity_usd, volume_h1),
        }))
    }

    /// Depth band plus a churn adjustment, 0-100.
    ///
    /// Shallow pools are fragile regardless of volume; a pool whose hourly
    /// volume dwarfs its depth is being churned and gets docked.
    fn stability_score(liquidity_usd: f64, volume_h1: f64) -> f64 {
        let depth = match liquidity_usd {
            l if l >= 100_000.0 => 90.0,
            l if l >= 50_000.0 => 75.0,
            l if l >= 25_000.0 => 60.0,
            l if l >= 10_000.0 => 45.0,
            l if l >= 5_000.0 => 25.0,
            _ => 10.0,
        };

        let churn_penalty = if liquidity_usd > 0.0 {
            let ratio = volume_h1 / liquidity_usd;
            if ratio > 10.0 {
                20.0
            } else if ratio > 5.0 {
                10.0
            } else {
                0.0
            }
        } else {
            0.0
        };

        (depth - churn_penalty + 10.0_f64.min(volume_h1 / 10_000.0)).clamp(0.0, 100.0)
    }
}

#[async_trait]
impl Analyzer for LiquidityAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Liquidity
    }

    fn source(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, candidate: &TokenCandidate) -> Result<AnalyzerPayload> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, candidate.address);
        debug!(mint = %candidate.address, "Fetching liquidity pairs");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                service: SOURCE.into(),
                status: status.as_u16(),
            });
        }

        let raw: serde_json::Value = response.json().await?;
        let report = Self::parse(&raw)?.ok_or_else(|| Error::MalformedResponse {
            service: SOURCE.into(),
            detail: format!("no pairs listed for {}", candidate.address),
        })?;

        let score = report.stability_score;
        Ok(AnalyzerPayload {
            report: AnalyzerReport::Liquidity(report),
            score,
            raw,
        })
    }
}
