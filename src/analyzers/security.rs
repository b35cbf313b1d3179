//! Security analyzer backed by a RugCheck-style report API
//!
//! Normalizes the upstream risk report into a 0-10 security score plus the
//! authority/LP/concentration facts the deal-breaker gates and pattern
//! detector need. The raw body is kept opaque on the outcome.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnalyzerId, AnalyzerReport, SecurityReport, TokenCandidate};

use super::{Analyzer, AnalyzerPayload};

const SOURCE: &str = "rugcheck";

/// Score deductions per risk severity, on the 0-10 scale
const DANGER_PENALTY: f64 = 2.0;
const WARNING_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Deserialize)]
struct RugReport {
    #[serde(default)]
    risks: Vec<RiskItem>,
    #[serde(rename = "tokenMeta")]
    token_meta: Option<TokenMeta>,
    #[serde(rename = "topHolders", default)]
    top_holders: Vec<TopHolder>,
    #[serde(default)]
    markets: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
struct RiskItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenMeta {
    mint: Option<MintMeta>,
}

#[derive(Debug, Clone, Deserialize)]
struct MintMeta {
    #[serde(rename = "mintAuthority")]
    mint_authority: Option<String>,
    #[serde(rename = "freezeAuthority")]
    freeze_authority: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopHolder {
    #[serde(default)]
    pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct Market {
    lp: Option<LpInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct LpInfo {
    #[serde(rename = "lpLockedPct", default)]
    lp_locked_pct: f64,
    #[serde(rename = "lpBurnPct", default)]
    lp_burn_pct: f64,
}

/// Security analyzer calling the report endpoint for one token
pub struct SecurityAnalyzer {
    client: Client,
    base_url: String,
}

impl SecurityAnalyzer {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    fn parse(raw: &serde_json::Value) -> Result<SecurityReport> {
        let report: RugReport =
            serde_json::from_value(raw.clone()).map_err(|e| Error::MalformedResponse {
                service: SOURCE.into(),
                detail: e.to_string(),
            })?;

        // Start from a perfect score and deduct per reported risk
        let mut overall = 10.0f64;
        let mut known_risks = Vec::new();
        for risk in &report.risks {
            match risk.level.as_str() {
                "danger" => overall -= DANGER_PENALTY,
                "warn" | "warning" => overall -= WARNING_PENALTY,
                _ => continue,
            }
            if risk.description.is_empty() {
                known_risks.push(risk.name.clone());
            } else {
                known_risks.push(risk.description.clone());
            }
        }
        let overall = overall.clamp(0.0, 10.0);

        let mint = report.token_meta.as_ref().and_then(|m| m.mint.as_ref());
        // An authority of null means it has been revoked/frozen
        let mint_authority_frozen = mint.map(|m| m.mint_authority.is_none()).unwrap_or(false);
        let freeze_authority_revoked = mint.map(|m| m.freeze_authority.is_none()).unwrap_or(false);

        let top_10_holders_pct: f64 = report.top_holders.iter().take(10).map(|h| h.pct).sum();

        let mut lp_locked = false;
        let mut lp_burned = false;
        for market in &report.markets {
            if let Some(lp) = &market.lp {
                lp_locked |= lp.lp_locked_pct > 0.0;
                lp_burned |= lp.lp_burn_pct > 0.0;
            }
        }

        let is_honeypot = known_risks
            .iter()
            .any(|r| r.to_lowercase().contains("honeypot"));

        Ok(SecurityReport {
            overall_score: overall,
            mint_authority_frozen,
            freeze_authority_revoked,
            top_10_holders_pct,
            lp_locked,
            lp_burned,
            is_honeypot,
            can_sell: !is_honeypot,
            known_risks,
        })
    }
}

#[async_trait]
impl Analyzer for SecurityAnalyzer {
    fn id(&self) -> AnalyzerId {
        AnalyzerId::Security
    }

    fn source(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, candidate: &TokenCandidate) -> Result<AnalyzerPayload> {
        let url = format!("{}/tokens/{}/report", self.base_url, candidate.address);
        debug!(mint = %candidate.address, "Fetching security report");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                service: SOURCE.into(),
                status: status.as_u16(),
            });
        }

        let raw: serde_json::Value = response.json().await?;
        let report = Self::parse(&raw)?;
        // Component score is the 0-10 security score on the 0-100 scale
        let score = report.overall_score * 10.0;

        Ok(AnalyzerPayload {
            report: AnalyzerReport::Security(report),
            score,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_report() {
        let raw = serde_json::json!({
            "risks": [],
            "tokenMeta": {"mint": {"mintAuthority": null, "freezeAuthority": null}},
            "topHolders": [
                {"pct": 5.0}, {"pct": 4.0}, {"pct": 3.0}, {"pct": 2.0}, {"pct": 1.0}
            ],
            "markets": [{"lp": {"lpLockedPct": 0.0, "lpBurnPct": 100.0}}]
        });

        let report = SecurityAnalyzer::parse(&raw).unwrap();
        assert_eq!(report.overall_score, 10.0);
        assert!(report.mint_authority_frozen);
        assert!(report.freeze_authority_revoked);
        assert_eq!(report.top_10_holders_pct, 15.0);
        assert!(report.lp_burned);
        assert!(!report.lp_locked);
        assert!(!report.is_honeypot);
        assert!(report.can_sell);
    }

    #[test]
    fn test_parse_deducts_per_risk() {
        let raw = serde_json::json!({
            "risks": [
                {"name": "mutable metadata", "level": "warn", "description": ""},
                {"name": "large holder", "level": "danger", "description": "Single holder owns 40%"}
            ],
            "tokenMeta": {"mint": {"mintAuthority": "SomeKey111", "freezeAuthority": null}}
        });

        let report = SecurityAnalyzer::parse(&raw).unwrap();
        assert!((report.overall_score - 7.5).abs() < 1e-9);
        assert!(!report.mint_authority_frozen);
        assert_eq!(report.known_risks.len(), 2);
        assert_eq!(report.known_risks[1], "Single holder owns 40%");
    }

    #[test]
    fn test_parse_honeypot_flag() {
        let raw = serde_json::json!({
            "risks": [
                {"name": "honeypot", "level": "danger", "description": "Honeypot: sells disabled"}
            ]
        });

        let report = SecurityAnalyzer::parse(&raw).unwrap();
        assert!(report.is_honeypot);
        assert!(!report.can_sell);
    }

    #[test]
    fn test_parse_score_floor() {
        let risks: Vec<_> = (0..8)
            .map(|i| serde_json::json!({"name": format!("risk{}", i), "level": "danger"}))
            .collect();
        let raw = serde_json::json!({ "risks": risks });

        let report = SecurityAnalyzer::parse(&raw).unwrap();
        assert_eq!(report.overall_score, 0.0);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let raw = serde_json::json!({"risks": "not-a-list"});
        assert!(SecurityAnalyzer::parse(&raw).is_err());
    }

    #[test]
    fn test_missing_meta_is_conservative() {
        // No tokenMeta at all: authorities are treated as NOT revoked
        let raw = serde_json::json!({"risks": []});
        let report = SecurityAnalyzer::parse(&raw).unwrap();
        assert!(!report.mint_authority_frozen);
        assert!(!report.freeze_authority_revoked);
    }
}
