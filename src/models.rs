//! Core data structures for token analysis
//!
//! Candidates arrive from external scanners, analyzer outcomes are produced
//! by the gateways, and everything downstream (scoring, pattern, decision)
//! is derived and immutable once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A newly discovered token awaiting analysis.
///
/// Immutable once created. The scanner has already applied its own
/// pre-filters (liquidity/age/holder/market-cap bounds); the pipeline does
/// not re-validate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCandidate {
    /// Token mint address (unique key)
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,

    /// Discovery source (pumpfun, raydium, dexscreener)
    #[serde(default = "default_source")]
    pub source: String,
    /// When the scanner discovered this token
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,

    // Market snapshot at discovery time
    pub liquidity_usd: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub price_usd: f64,
    #[serde(default)]
    pub volume_24h: f64,
    #[serde(default)]
    pub holders: u32,
    #[serde(default)]
    pub age_seconds: u64,

    // Short-horizon momentum from the scanner
    #[serde(default)]
    pub price_change_5min: f64,
    #[serde(default)]
    pub volume_change_2min: f64,
    #[serde(default)]
    pub holder_growth_rate: f64,

    /// Number of linked socials from discovery metadata, when the source
    /// exposes them (DexScreener profiles do, raw pool events don't)
    #[serde(default)]
    pub social_links: Option<u32>,
}

fn default_source() -> String {
    "unknown".to_string()
}

/// Identifier for an external analyzer family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerId {
    Security,
    Liquidity,
    Holders,
}

impl AnalyzerId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerId::Security => "security",
            AnalyzerId::Liquidity => "liquidity",
            AnalyzerId::Holders => "holders",
        }
    }

    pub const ALL: [AnalyzerId; 3] = [
        AnalyzerId::Security,
        AnalyzerId::Liquidity,
        AnalyzerId::Holders,
    ];
}

impl std::fmt::Display for AnalyzerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an analyzer outcome was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerStatus {
    /// Fresh fetch succeeded
    Ok,
    /// Produced under constraint (rate-limited); neutral score, not verified
    Degraded,
    /// Fetch failed or timed out; no score contribution
    Failed,
    /// Served from the result cache
    Cached,
}

impl AnalyzerStatus {
    /// Whether this outcome carries verified data (fresh or cached)
    pub fn is_verified(&self) -> bool {
        matches!(self, AnalyzerStatus::Ok | AnalyzerStatus::Cached)
    }
}

/// Security analysis report (RugCheck-style)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Overall security score, 0-10
    pub overall_score: f64,
    pub mint_authority_frozen: bool,
    pub freeze_authority_revoked: bool,
    pub top_10_holders_pct: f64,
    pub lp_locked: bool,
    pub lp_burned: bool,
    pub is_honeypot: bool,
    pub can_sell: bool,
    #[serde(default)]
    pub known_risks: Vec<String>,
}

/// Liquidity analysis report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiquidityReport {
    pub total_liquidity_usd: f64,
    pub liquidity_sol: f64,
    pub lp_locked_pct: f64,
    pub lp_burned_pct: f64,
    /// 0-100
    pub stability_score: f64,
}

impl LiquidityReport {
    /// Percentage of LP that is locked or burned
    pub fn lp_secured_pct(&self) -> f64 {
        (self.lp_locked_pct + self.lp_burned_pct).min(100.0)
    }
}

/// Holder distribution report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolderReport {
    pub total_holders: u32,
    /// Top-10 holders' share of supply, percentage
    pub top_10_concentration: f64,
    pub top_20_concentration: f64,
    pub dev_wallet_pct: f64,
    pub growth_rate_per_min: f64,
    /// 0-100
    pub distribution_score: f64,
}

/// Normalized payload of one analyzer, typed per family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzerReport {
    Security(SecurityReport),
    Liquidity(LiquidityReport),
    Holders(HolderReport),
}

/// Result of one analyzer for one token, possibly served from cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerOutcome {
    pub analyzer: AnalyzerId,
    pub status: AnalyzerStatus,
    /// Component score 0-100; absent for failed outcomes
    pub score: Option<f64>,
    /// Typed, normalized report; absent for degraded/failed outcomes
    pub report: Option<AnalyzerReport>,
    /// Raw upstream payload, kept opaque for diagnostics only
    #[serde(default)]
    pub raw: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl AnalyzerOutcome {
    pub fn failed(analyzer: AnalyzerId) -> Self {
        Self {
            analyzer,
            status: AnalyzerStatus::Failed,
            score: None,
            report: None,
            raw: serde_json::Value::Null,
            fetched_at: Utc::now(),
        }
    }

    pub fn degraded(analyzer: AnalyzerId, neutral_score: f64) -> Self {
        Self {
            analyzer,
            status: AnalyzerStatus::Degraded,
            score: Some(neutral_score),
            report: None,
            raw: serde_json::Value::Null,
            fetched_at: Utc::now(),
        }
    }

    pub fn security(&self) -> Option<&SecurityReport> {
        match &self.report {
            Some(AnalyzerReport::Security(r)) => Some(r),
            _ => None,
        }
    }

    pub fn liquidity(&self) -> Option<&LiquidityReport> {
        match &self.report {
            Some(AnalyzerReport::Liquidity(r)) => Some(r),
            _ => None,
        }
    }

    pub fn holders(&self) -> Option<&HolderReport> {
        match &self.report {
            Some(AnalyzerReport::Holders(r)) => Some(r),
            _ => None,
        }
    }
}

/// Risk classification for a scored token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Scoring component families. Security/liquidity/holders come from analyzer
/// outcomes; momentum and age are derived from the candidate snapshot;
/// social from discovery metadata when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Security,
    Liquidity,
    Holders,
    Momentum,
    Social,
    Age,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::Security,
        Component::Liquidity,
        Component::Holders,
        Component::Momentum,
        Component::Social,
        Component::Age,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Security => "security",
            Component::Liquidity => "liquidity",
            Component::Holders => "holders",
            Component::Momentum => "momentum",
            Component::Social => "social",
            Component::Age => "age",
        }
    }
}

/// One component's contribution to the rule score
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComponentScore {
    pub component: Component,
    /// 0-100
    pub score: f64,
    /// Whether the backing data was verified (fresh/cached), as opposed to
    /// a degraded neutral placeholder
    pub verified: bool,
}

/// Output of the scoring engine. Derived, immutable, one per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub address: String,
    /// Weighted rule score, 0-100
    pub rule_score: f64,
    /// ML score 0-100; absent when the model is unavailable or below the
    /// confidence floor
    pub ml_score: Option<f64>,
    pub ml_confidence: Option<f64>,
    /// rule*0.6 + ml*0.4 when ML present, else rule score; capped below the
    /// alert threshold when a deal-breaker is violated
    pub combined_score: f64,
    pub components: Vec<ComponentScore>,
    pub risk_level: RiskLevel,
    /// Deal-breaker descriptions that were violated, empty when clean
    pub deal_breakers: Vec<String>,
    /// Sum of configured weights backed by verified outcomes fell below the
    /// coverage floor; the run must not alert
    pub degraded: bool,
}

impl ScoringResult {
    pub fn component(&self, component: Component) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.component == component)
    }
}

/// Named behavioral classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    FastSniper,
    SmartSniper,
    Momentum,
    Safe,
    WhaleAccumulation,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pattern::FastSniper => "FAST_SNIPER",
            Pattern::SmartSniper => "SMART_SNIPER",
            Pattern::Momentum => "MOMENTUM",
            Pattern::Safe => "SAFE",
            Pattern::WhaleAccumulation => "WHALE_ACCUMULATION",
        };
        f.write_str(s)
    }
}

/// A satisfied pattern definition with the criteria that matched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: Pattern,
    pub risk_level: RiskLevel,
    /// Ordered list of satisfied criteria, for alert context
    pub criteria: Vec<String>,
}

/// Why the gate decided the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    Approved,
    InsufficientData,
    DealBreaker,
    BelowThreshold,
    LowConfidence,
    Duplicate,
    QuotaExceeded,
}

/// Terminal output of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDecision {
    pub address: String,
    pub eligible: bool,
    pub reason: AlertReason,
    pub decided_at: DateTime<Utc>,
}

impl AlertDecision {
    pub fn rejected(address: &str, reason: AlertReason) -> Self {
        Self {
            address: address.to_string(),
            eligible: false,
            reason,
            decided_at: Utc::now(),
        }
    }

    pub fn approved(address: &str) -> Self {
        Self {
            address: address.to_string(),
            eligible: true,
            reason: AlertReason::Approved,
            decided_at: Utc::now(),
        }
    }
}

/// Everything one pipeline run produced, as handed to the storage collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub run_id: String,
    pub candidate: TokenCandidate,
    pub outcomes: Vec<AnalyzerOutcome>,
    pub scoring: ScoringResult,
    pub pattern: Option<PatternMatch>,
    pub decision: AlertDecision,
    pub analyzed_at: DateTime<Utc>,
    pub duration_ms: u64,
}
