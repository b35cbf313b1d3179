//! Behavioral pattern classification
//!
//! Evaluation order is fixed and short-circuits on the first match:
//! FAST_SNIPER, SMART_SNIPER, MOMENTUM, SAFE, WHALE_ACCUMULATION. Earlier
//! patterns are the time-critical ones; reordering them changes which alert
//! a borderline token produces, so the order is part of the contract.

use tracing::debug;

use crate::models::{
    AnalyzerId, AnalyzerOutcome, Pattern, PatternMatch, RiskLevel, TokenCandidate,
};

const FAST_SNIPER_MAX_AGE_SECS: u64 = 120;
const FAST_SNIPER_MIN_LIQUIDITY: f64 = 10_000.0;
const FAST_SNIPER_MAX_LIQUIDITY: f64 = 50_000.0;
const FAST_SNIPER_MIN_HOLDER_GROWTH: f64 = 15.0;
const FAST_SNIPER_MIN_VOLUME_SPIKE: f64 = 200.0;

const SMART_SNIPER_MIN_AGE_SECS: u64 = 120;
const SMART_SNIPER_MAX_AGE_SECS: u64 = 300;
const SMART_SNIPER_MIN_LIQUIDITY: f64 = 30_000.0;
const SMART_SNIPER_MAX_LIQUIDITY: f64 = 150_000.0;
const SMART_SNIPER_MIN_SECURITY: f64 = 8.5;

const MOMENTUM_MIN_AGE_SECS: u64 = 300;
const MOMENTUM_MAX_AGE_SECS: u64 = 1800;
const MOMENTUM_MIN_PRICE_CHANGE: f64 = 40.0;
const MOMENTUM_MIN_HOLDER_GROWTH: f64 = 10.0;

const SAFE_MIN_SECURITY: f64 = 9.0;
const SAFE_MAX_TOP10_PCT: f64 = 25.0;

const WHALE_MIN_VOLUME_SPIKE: f64 = 300.0;
const WHALE_MIN_PRICE_MOVE: f64 = 20.0;
const WHALE_MIN_TOP10_PCT: f64 = 20.0;
const WHALE_MAX_TOP10_PCT: f64 = 40.0;

/// Signals the predicates read, flattened out of the candidate and whatever
/// analyzer reports arrived
struct Signals {
    age_seconds: u64,
    liquidity_usd: f64,
    holder_growth_rate: f64,
    volume_change_2min: f64,
    price_change_5min: f64,
    /// 0-10, zero when the security report is missing
    security_score: f64,
    mint_frozen: bool,
    freeze_revoked: bool,
    lp_secured: bool,
    lp_fully_secured: bool,
    top_10_pct: f64,
}

impl Signals {
    fn build(candidate: &TokenCandidate, outcomes: &[AnalyzerOutcome]) -> Self {
        let find = |id: AnalyzerId| outcomes.iter().find(|o| o.analyzer == id);
        let security = find(AnalyzerId::Security).and_then(|o| o.security());
        let liquidity = find(AnalyzerId::Liquidity).and_then(|o| o.liquidity());
        let holders = find(AnalyzerId::Holders).and_then(|o| o.holders());

        let secured_pct = liquidity.map(|l| l.lp_secured_pct()).unwrap_or(0.0);
        let lp_secured = security.is_some_and(|s| s.lp_locked || s.lp_burned) || secured_pct > 0.0;

        Self {
            age_seconds: candidate.age_seconds,
            liquidity_usd: liquidity
                .map(|l| l.total_liquidity_usd)
                .unwrap_or(candidate.liquidity_usd),
            holder_growth_rate: holders
                .map(|h| h.growth_rate_per_min)
                .unwrap_or(candidate.holder_growth_rate),
            volume_change_2min: candidate.volume_change_2min,
            price_change_5min: candidate.price_change_5min,
            security_score: security.map(|s| s.overall_score).unwrap_or(0.0),
            mint_frozen: security.is_some_and(|s| s.mint_authority_frozen),
            freeze_revoked: security.is_some_and(|s| s.freeze_authority_revoked),
            lp_secured,
            lp_fully_secured: secured_pct >= 100.0 || security.is_some_and(|s| s.lp_burned),
            top_10_pct: security
                .map(|s| s.top_10_holders_pct)
                .or(holders.map(|h| h.top_10_concentration))
                .unwrap_or(0.0),
        }
    }
}

pub struct PatternDetector;

impl PatternDetector {
    pub fn detect(
        candidate: &TokenCandidate,
        outcomes: &[AnalyzerOutcome],
    ) -> Option<PatternMatch> {
        let signals = Signals::build(candidate, outcomes);

        let detectors: [fn(&Signals) -> Option<(Pattern, Vec<String>)>; 5] = [
            fast_sniper,
            smart_sniper,
            momentum,
            safe,
            whale_accumulation,
        ];

        for detector in detectors {
            if let Some((pattern, criteria)) = detector(&signals) {
                let risk_level = pattern_risk(pattern, signals.security_score);
                debug!(
                    mint = %candidate.address,
                    pattern = %pattern,
                    criteria = criteria.len(),
                    "Pattern matched"
                );
                return Some(PatternMatch {
                    pattern,
                    risk_level,
                    criteria,
                });
            }
        }

        None
    }
}

fn pattern_risk(pattern: Pattern, security_score: f64) -> RiskLevel {
    match pattern {
        Pattern::Safe => RiskLevel::Low,
        Pattern::SmartSniper => RiskLevel::Medium,
        Pattern::Momentum => {
            if security_score >= 8.5 {
                RiskLevel::Low
            } else {
                RiskLevel::Medium
            }
        }
        Pattern::FastSniper | Pattern::WhaleAccumulation => {
            if security_score >= 8.0 {
                RiskLevel::Medium
            } else {
                RiskLevel::High
            }
        }
    }
}

fn fast_sniper(s: &Signals) -> Option<(Pattern, Vec<String>)> {
    if s.age_seconds > FAST_SNIPER_MAX_AGE_SECS {
        return None;
    }
    if s.liquidity_usd < FAST_SNIPER_MIN_LIQUIDITY || s.liquidity_usd > FAST_SNIPER_MAX_LIQUIDITY {
        return None;
    }

    let mut criteria = vec![
        format!("age {}s <= {}s", s.age_seconds, FAST_SNIPER_MAX_AGE_SECS),
        format!("liquidity ${:.0} in launch band", s.liquidity_usd),
    ];

    if s.holder_growth_rate >= FAST_SNIPER_MIN_HOLDER_GROWTH {
        criteria.push(format!(
            "holder growth {:.1}/min",
            s.holder_growth_rate
        ));
    } else if s.volume_change_2min >= FAST_SNIPER_MIN_VOLUME_SPIKE {
        criteria.push(format!("2min volume spike {:.0}%", s.volume_change_2min));
    } else {
        return None;
    }

    Some((Pattern::FastSniper, criteria))
}

fn smart_sniper(s: &Signals) -> Option<(Pattern, Vec<String>)> {
    if s.age_seconds <= SMART_SNIPER_MIN_AGE_SECS || s.age_seconds > SMART_SNIPER_MAX_AGE_SECS {
        return None;
    }
    if s.liquidity_usd < SMART_SNIPER_MIN_LIQUIDITY || s.liquidity_usd > SMART_SNIPER_MAX_LIQUIDITY
    {
        return None;
    }
    if s.security_score < SMART_SNIPER_MIN_SECURITY || !s.lp_secured {
        return None;
    }

    Some((
        Pattern::SmartSniper,
        vec![
            format!("age {}s in confirmation band", s.age_seconds),
            format!("liquidity ${:.0} established", s.liquidity_usd),
            format!("security {:.1} >= {:.1}", s.security_score, SMART_SNIPER_MIN_SECURITY),
            "LP secured".into(),
        ],
    ))
}

fn momentum(s: &Signals) -> Option<(Pattern, Vec<String>)> {
    if s.age_seconds <= MOMENTUM_MIN_AGE_SECS || s.age_seconds > MOMENTUM_MAX_AGE_SECS {
        return None;
    }
    if s.price_change_5min < MOMENTUM_MIN_PRICE_CHANGE {
        return None;
    }

    let mut criteria = vec![
        format!("age {}s in momentum band", s.age_seconds),
        format!("5min price change {:.0}%", s.price_change_5min),
    ];

    if s.holder_growth_rate >= MOMENTUM_MIN_HOLDER_GROWTH {
        criteria.push(format!("steady holder growth {:.1}/min", s.holder_growth_rate));
    } else if s.volume_change_2min > 0.0 {
        criteria.push(format!("rising volume {:.0}%", s.volume_change_2min));
    } else {
        return None;
    }

    Some((Pattern::Momentum, criteria))
}

fn safe(s: &Signals) -> Option<(Pattern, Vec<String>)> {
    if s.security_score < SAFE_MIN_SECURITY {
        return None;
    }
    if !s.lp_fully_secured {
        return None;
    }
    if !s.mint_frozen || !s.freeze_revoked {
        return None;
    }
    if s.top_10_pct >= SAFE_MAX_TOP10_PCT {
        return None;
    }

    Some((
        Pattern::Safe,
        vec![
            format!("security {:.1} >= {:.1}", s.security_score, SAFE_MIN_SECURITY),
            "LP fully secured".into(),
            "mint frozen, freeze authority revoked".into(),
            format!("top-10 {:.1}% < {:.0}%", s.top_10_pct, SAFE_MAX_TOP10_PCT),
        ],
    ))
}

fn whale_accumulation(s: &Signals) -> Option<(Pattern, Vec<String>)> {
    if s.volume_change_2min < WHALE_MIN_VOLUME_SPIKE {
        return None;
    }
    if s.price_change_5min.abs() < WHALE_MIN_PRICE_MOVE {
        return None;
    }
    if s.top_10_pct < WHALE_MIN_TOP10_PCT || s.top_10_pct > WHALE_MAX_TOP10_PCT {
        return None;
    }

    Some((
        Pattern::WhaleAccumulation,
        vec![
            format!("volume spike {:.0}%", s.volume_change_2min),
            format!("price move {:.0}%", s.price_change_5min),
            format!("top-10 {:.1}% in accumulation band", s.top_10_pct),
        ],
    ))
}
