//! Flat feature vector for model scoring

use serde::{Deserialize, Serialize};

use crate::models::{AnalyzerId, AnalyzerOutcome, TokenCandidate};

/// Engineered features from one candidate's market snapshot plus whatever
/// analyzer data came back. Missing analyzer data stays at the neutral
/// defaults rather than being dropped, so the vector shape is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub liquidity_usd: f64,
    /// 24h volume over liquidity, capped at 50
    pub liquidity_churn: f64,
    pub market_cap: f64,
    pub holder_count: f64,
    pub top_10_concentration: f64,
    pub security_score: f64,
    pub lp_secured: f64,
    pub age_minutes: f64,
    pub price_change_5min: f64,
    pub volume_change_2min: f64,
    pub holder_growth_rate: f64,
    pub social_links: f64,
}

impl FeatureVector {
    pub fn build(candidate: &TokenCandidate, outcomes: &[AnalyzerOutcome]) -> Self {
        let find = |id: AnalyzerId| outcomes.iter().find(|o| o.analyzer == id);

        let security = find(AnalyzerId::Security).and_then(|o| o.security());
        let liquidity = find(AnalyzerId::Liquidity).and_then(|o| o.liquidity());
        let holders = find(AnalyzerId::Holders).and_then(|o| o.holders());

        let liquidity_usd = liquidity
            .map(|l| l.total_liquidity_usd)
            .unwrap_or(candidate.liquidity_usd);

        let liquidity_churn = if liquidity_usd > 0.0 {
            (candidate.volume_24h / liquidity_usd).min(50.0)
        } else {
            0.0
        };

        Self {
            liquidity_usd,
            liquidity_churn,
            market_cap: candidate.market_cap,
            holder_count: holders
                .map(|h| f64::from(h.total_holders))
                .unwrap_or(f64::from(candidate.holders)),
            top_10_concentration: security.map(|s| s.top_10_holders_pct).unwrap_or(0.0),
            security_score: security.map(|s| s.overall_score).unwrap_or(5.0),
            lp_secured: security
                .map(|s| if s.lp_locked || s.lp_burned { 1.0 } else { 0.0 })
                .unwrap_or(0.0),
            age_minutes: candidate.age_seconds as f64 / 60.0,
            price_change_5min: candidate.price_change_5min,
            volume_change_2min: candidate.volume_change_2min,
            holder_growth_rate: candidate.holder_growth_rate,
            social_links: candidate.social_links.map(f64::from).unwrap_or(0.0),
        }
    }
}
