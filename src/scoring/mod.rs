//! Composite token scoring
//!
//! Pure over its inputs: one candidate snapshot plus whatever analyzer
//! outcomes the pipeline collected. Weighted components are renormalized
//! over the ones actually present, so a failed analyzer shrinks the basis
//! instead of silently counting as zero.

pub mod features;
pub mod ml;

pub use features::FeatureVector;
pub use ml::{DisabledScorer, MlPrediction, MlScorer};

use std::sync::Arc;

use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::{
    AnalyzerId, AnalyzerOutcome, Component, ComponentScore, RiskLevel, ScoringResult,
    TokenCandidate,
};

pub struct ScoringEngine {
    config: ScoringConfig,
    ml: Arc<dyn MlScorer>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, ml: Arc<dyn MlScorer>) -> Self {
        Self { config, ml }
    }

    pub fn score(&self, candidate: &TokenCandidate, outcomes: &[AnalyzerOutcome]) -> ScoringResult {
        let components = self.collect_components(candidate, outcomes);

        let weights = &self.config.weights;
        let weight_of = |c: Component| match c {
            Component::Security => weights.security,
            Component::Liquidity => weights.liquidity,
            Component::Holders => weights.holders,
            Component::Momentum => weights.momentum,
            Component::Social => weights.social,
            Component::Age => weights.age,
        };

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut coverage = 0.0;
        for cs in &components {
            let w = weight_of(cs.component);
            weighted_sum += cs.score * w;
            weight_total += w;
            if cs.verified {
                coverage += w;
            }
        }

        let rule_score = if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            0.0
        };

        let degraded = coverage < self.config.min_weight_coverage;

        let prediction = self
            .ml
            .predict(&FeatureVector::build(candidate, outcomes))
            .filter(|p| p.confidence >= self.config.ml_confidence_floor);

        let mut combined_score = match prediction {
            Some(p) => rule_score * self.config.rule_weight + p.score * self.config.ml_weight,
            None => rule_score,
        };

        let deal_breakers = self.check_deal_breakers(outcomes);
        if !deal_breakers.is_empty() {
            combined_score = combined_score.min(self.config.deal_breaker_cap);
        }

        let security_component = components
            .iter()
            .find(|c| c.component == Component::Security)
            .map(|c| c.score);

        let risk_level = if !deal_breakers.is_empty() {
            RiskLevel::High
        } else if combined_score >= self.config.low_risk_min_combined
            && security_component.is_some_and(|s| s >= self.config.low_risk_min_security)
        {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };

        debug!(
            mint = %candidate.address,
            rule = rule_score,
            combined = combined_score,
            coverage,
            degraded,
            breakers = deal_breakers.len(),
            "Scored candidate"
        );

        ScoringResult {
            address: candidate.address.clone(),
            rule_score,
            ml_score: prediction.map(|p| p.score),
            ml_confidence: prediction.map(|p| p.confidence),
            combined_score,
            components,
            risk_level,
            deal_breakers,
            degraded,
        }
    }

    fn collect_components(
        &self,
        candidate: &TokenCandidate,
        outcomes: &[AnalyzerOutcome],
    ) -> Vec<ComponentScore> {
        let mut components = Vec::with_capacity(6);

        for (id, component) in [
            (AnalyzerId::Security, Component::Security),
            (AnalyzerId::Liquidity, Component::Liquidity),
            (AnalyzerId::Holders, Component::Holders),
        ] {
            let outcome = outcomes.iter().find(|o| o.analyzer == id);
            if let Some(score) = outcome.and_then(|o| o.score) {
                components.push(ComponentScore {
                    component,
                    score,
                    verified: outcome.is_some_and(|o| o.status.is_verified()),
                });
            }
        }

        components.push(ComponentScore {
            component: Component::Momentum,
            score: momentum_score(candidate),
            verified: true,
        });

        if let Some(links) = candidate.social_links {
            components.push(ComponentScore {
                component: Component::Social,
                score: (f64::from(links) * 25.0).min(100.0),
                verified: true,
            });
        }

        components.push(ComponentScore {
            component: Component::Age,
            score: age_score(candidate.age_seconds),
            verified: true,
        });

        components
    }

    fn check_deal_breakers(&self, outcomes: &[AnalyzerOutcome]) -> Vec<String> {
        let rules = &self.config.deal_breakers;
        let mut violated = Vec::new();

        let security = outcomes
            .iter()
            .find(|o| o.analyzer == AnalyzerId::Security)
            .and_then(|o| o.security());

        let Some(security) = security else {
            // Nothing to enforce against; the coverage floor handles runs
            // where the security report never arrived
            return violated;
        };

        if security.overall_score < rules.min_security_score {
            violated.push(format!(
                "security score {:.1} below minimum {:.1}",
                security.overall_score, rules.min_security_score
            ));
        }
        if rules.require_mint_frozen && !security.mint_authority_frozen {
            violated.push("mint authority not frozen".into());
        }
        if security.top_10_holders_pct > rules.max_top10_pct {
            violated.push(format!(
                "top-10 holders own {:.1}% (max {:.1}%)",
                security.top_10_holders_pct, rules.max_top10_pct
            ));
        }
        if rules.reject_honeypot && (security.is_honeypot || !security.can_sell) {
            violated.push("honeypot indicators".into());
        }
        if rules.require_lp_secured {
            let secured_by_pair = outcomes
                .iter()
                .find(|o| o.analyzer == AnalyzerId::Liquidity)
                .and_then(|o| o.liquidity())
                .is_some_and(|l| l.lp_secured_pct() > 0.0);
            if !security.lp_locked && !security.lp_burned && !secured_by_pair {
                violated.push("LP neither locked nor burned".into());
            }
        }

        violated
    }
}

/// Short-horizon momentum from the scanner snapshot, 0-100
fn momentum_score(candidate: &TokenCandidate) -> f64 {
    let mut score: f64 = 50.0;

    score += match candidate.price_change_5min {
        p if p >= 40.0 => 30.0,
        p if p >= 20.0 => 20.0,
        p if p >= 10.0 => 10.0,
        p if p <= -20.0 => -30.0,
        p if p < 0.0 => -10.0,
        _ => 0.0,
    };

    score += match candidate.volume_change_2min {
        v if v >= 300.0 => 20.0,
        v if v >= 200.0 => 15.0,
        v if v >= 100.0 => 10.0,
        _ => 0.0,
    };

    score += match candidate.holder_growth_rate {
        g if g >= 15.0 => 20.0,
        g if g >= 5.0 => 10.0,
        _ => 0.0,
    };

    score.clamp(0.0, 100.0)
}

/// Seasoning score: brand-new mints are the riskiest, well-settled ones
/// plateau rather than keep improving
fn age_score(age_seconds: u64) -> f64 {
    match age_seconds {
        a if a < 120 => 30.0,
        a if a < 600 => 55.0,
        a if a < 3600 => 70.0,
        a if a < 86_400 => 85.0,
        _ => 75.0,
    }
}
