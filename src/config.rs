//! Configuration loading and validation
//!
//! Every numeric threshold in the pipeline lives here as a default, never as
//! a hard-coded constant at the use site. Values come from defaults, then an
//! optional config file, then `RADAR__`-prefixed environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub analyzers: AnalyzersConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Overall per-candidate deadline; analyzers still pending at this point
    /// are marked failed for the run
    #[serde(default = "default_pipeline_timeout_ms")]
    pub timeout_ms: u64,
    /// Concurrent orchestration runs
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded candidate queue between scanners and workers
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_pipeline_timeout_ms(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// One analyzer family's gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    /// Per-call timeout
    #[serde(default = "default_call_timeout_ms")]
    pub timeout_ms: u64,
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Score used for degraded (rate-limited) outcomes; deliberately
    /// mid-range so a denial never reads as verified-safe or verified-bad
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl AnalyzerConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::new(),
            timeout_ms: default_call_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            neutral_score: default_neutral_score(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Sliding-window quota for one external source
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_rate_max_requests(),
            window_secs: default_rate_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzersConfig {
    #[serde(default = "default_security_analyzer")]
    pub security: AnalyzerConfig,
    #[serde(default = "default_liquidity_analyzer")]
    pub liquidity: AnalyzerConfig,
    #[serde(default = "default_holders_analyzer")]
    pub holders: AnalyzerConfig,
}

impl AnalyzersConfig {
    pub fn for_id(&self, id: crate::models::AnalyzerId) -> &AnalyzerConfig {
        match id {
            crate::models::AnalyzerId::Security => &self.security,
            crate::models::AnalyzerId::Liquidity => &self.liquidity,
            crate::models::AnalyzerId::Holders => &self.holders,
        }
    }
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            security: default_security_analyzer(),
            liquidity: default_liquidity_analyzer(),
            holders: default_holders_analyzer(),
        }
    }
}

fn default_security_analyzer() -> AnalyzerConfig {
    AnalyzerConfig {
        base_url: default_security_base_url(),
        rate_limit: RateLimitConfig {
            max_requests: 10,
            window_secs: 60,
        },
        ..Default::default()
    }
}

fn default_liquidity_analyzer() -> AnalyzerConfig {
    AnalyzerConfig {
        base_url: default_liquidity_base_url(),
        rate_limit: RateLimitConfig {
            max_requests: 30,
            window_secs: 60,
        },
        ..Default::default()
    }
}

fn default_holders_analyzer() -> AnalyzerConfig {
    AnalyzerConfig {
        base_url: default_holders_base_url(),
        rate_limit: RateLimitConfig {
            max_requests: 20,
            window_secs: 60,
        },
        ..Default::default()
    }
}

/// Component weights for the rule score, renormalized over present components
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_weight_security")]
    pub security: f64,
    #[serde(default = "default_weight_liquidity")]
    pub liquidity: f64,
    #[serde(default = "default_weight_holders")]
    pub holders: f64,
    #[serde(default = "default_weight_momentum")]
    pub momentum: f64,
    #[serde(default = "default_weight_social")]
    pub social: f64,
    #[serde(default = "default_weight_age")]
    pub age: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            security: default_weight_security(),
            liquidity: default_weight_liquidity(),
            holders: default_weight_holders(),
            momentum: default_weight_momentum(),
            social: default_weight_social(),
            age: default_weight_age(),
        }
    }
}

/// Hard security gates: any violation forces HIGH risk and caps the combined
/// score below the alert threshold
#[derive(Debug, Clone, Deserialize)]
pub struct DealBreakerConfig {
    /// Floor on the 0-10 security score
    #[serde(default = "default_min_security_score")]
    pub min_security_score: f64,
    #[serde(default = "default_true")]
    pub require_mint_frozen: bool,
    #[serde(default = "default_max_top10_pct")]
    pub max_top10_pct: f64,
    #[serde(default = "default_true")]
    pub reject_honeypot: bool,
    /// Require LP to be locked or burned
    #[serde(default = "default_true")]
    pub require_lp_secured: bool,
}

impl Default for DealBreakerConfig {
    fn default() -> Self {
        Self {
            min_security_score: default_min_security_score(),
            require_mint_frozen: true,
            max_top10_pct: default_max_top10_pct(),
            reject_honeypot: true,
            require_lp_secured: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default = "default_rule_weight")]
    pub rule_weight: f64,
    #[serde(default = "default_ml_weight")]
    pub ml_weight: f64,
    /// ML predictions below this confidence are discarded entirely
    #[serde(default = "default_ml_confidence_floor")]
    pub ml_confidence_floor: f64,
    /// Minimum share of configured weight that must be backed by verified
    /// outcomes; below it the run is degraded and never alerts
    #[serde(default = "default_min_weight_coverage")]
    pub min_weight_coverage: f64,
    /// Ceiling applied to the combined score when a deal-breaker fires;
    /// must sit below alerts.min_score
    #[serde(default = "default_deal_breaker_cap")]
    pub deal_breaker_cap: f64,
    #[serde(default)]
    pub deal_breakers: DealBreakerConfig,
    /// LOW risk requires combined >= this ...
    #[serde(default = "default_low_risk_min_combined")]
    pub low_risk_min_combined: f64,
    /// ... and a security component >= this (90 = 9.0 on the 0-10 scale)
    #[serde(default = "default_low_risk_min_security")]
    pub low_risk_min_security: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            rule_weight: default_rule_weight(),
            ml_weight: default_ml_weight(),
            ml_confidence_floor: default_ml_confidence_floor(),
            min_weight_coverage: default_min_weight_coverage(),
            deal_breaker_cap: default_deal_breaker_cap(),
            deal_breakers: DealBreakerConfig::default(),
            low_risk_min_combined: default_low_risk_min_combined(),
            low_risk_min_security: default_low_risk_min_security(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alert_min_score")]
    pub min_score: f64,
    #[serde(default = "default_min_ml_confidence")]
    pub min_ml_confidence: f64,
    /// Maximum approved alerts per UTC day
    #[serde(default = "default_max_daily_alerts")]
    pub max_daily: u32,
    /// Minimum interval before the same token may alert again
    #[serde(default = "default_dedup_cooldown_secs")]
    pub dedup_cooldown_secs: u64,
}

impl AlertConfig {
    pub fn dedup_cooldown(&self) -> Duration {
        Duration::from_secs(self.dedup_cooldown_secs)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_score: default_alert_min_score(),
            min_ml_confidence: default_min_ml_confidence(),
            max_daily: default_max_daily_alerts(),
            dedup_cooldown_secs: default_dedup_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_telegram_token")]
    pub bot_token: String,
    #[serde(default = "default_telegram_chat_id")]
    pub chat_id: String,
    #[serde(default = "default_telegram_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: default_telegram_token(),
            chat_id: default_telegram_chat_id(),
            timeout_ms: default_telegram_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

// Default value functions
fn default_pipeline_timeout_ms() -> u64 {
    5000
}

fn default_workers() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_call_timeout_ms() -> u64 {
    10000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_neutral_score() -> f64 {
    50.0
}

fn default_rate_max_requests() -> u32 {
    10
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_security_base_url() -> String {
    std::env::var("RUGCHECK_API_URL")
        .unwrap_or_else(|_| "https://api.rugcheck.xyz/v1".into())
}

fn default_liquidity_base_url() -> String {
    std::env::var("DEXSCREENER_API_URL")
        .unwrap_or_else(|_| "https://api.dexscreener.com".into())
}

fn default_holders_base_url() -> String {
    std::env::var("HOLDERS_API_URL").unwrap_or_default()
}

fn default_weight_security() -> f64 {
    0.30
}

fn default_weight_liquidity() -> f64 {
    0.20
}

fn default_weight_holders() -> f64 {
    0.15
}

fn default_weight_momentum() -> f64 {
    0.20
}

fn default_weight_social() -> f64 {
    0.10
}

fn default_weight_age() -> f64 {
    0.05
}

fn default_rule_weight() -> f64 {
    0.60
}

fn default_ml_weight() -> f64 {
    0.40
}

fn default_ml_confidence_floor() -> f64 {
    0.65
}

fn default_min_weight_coverage() -> f64 {
    0.50
}

fn default_deal_breaker_cap() -> f64 {
    69.0
}

fn default_min_security_score() -> f64 {
    5.0
}

fn default_max_top10_pct() -> f64 {
    50.0
}

fn default_low_risk_min_combined() -> f64 {
    85.0
}

fn default_low_risk_min_security() -> f64 {
    90.0
}

fn default_alert_min_score() -> f64 {
    70.0
}

fn default_min_ml_confidence() -> f64 {
    0.65
}

fn default_max_daily_alerts() -> u32 {
    15
}

fn default_dedup_cooldown_secs() -> u64 {
    3600
}

fn default_telegram_token() -> String {
    std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
}

fn default_telegram_chat_id() -> String {
    std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default()
}

fn default_telegram_timeout_ms() -> u64 {
    10000
}

fn default_storage_path() -> String {
    "data/analyses.jsonl".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix RADAR_)
            .add_source(
                config::Environment::with_prefix("RADAR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values. Failing here is fatal at startup: the
    /// orchestrator must not accept work with a broken configuration.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        if self.pipeline.timeout_ms == 0 {
            anyhow::bail!("pipeline.timeout_ms must be positive");
        }

        let w = &self.scoring.weights;
        for (name, weight) in [
            ("security", w.security),
            ("liquidity", w.liquidity),
            ("holders", w.holders),
            ("momentum", w.momentum),
            ("social", w.social),
            ("age", w.age),
        ] {
            if weight < 0.0 {
                anyhow::bail!("scoring.weights.{} must not be negative", name);
            }
        }
        let total = w.security + w.liquidity + w.holders + w.momentum + w.social + w.age;
        if total <= 0.0 {
            anyhow::bail!("scoring.weights must sum to a positive value");
        }

        if !(0.0..=1.0).contains(&self.scoring.min_weight_coverage) {
            anyhow::bail!("scoring.min_weight_coverage must be within 0..=1");
        }
        if !(0.0..=1.0).contains(&self.scoring.ml_confidence_floor) {
            anyhow::bail!("scoring.ml_confidence_floor must be within 0..=1");
        }
        if (self.scoring.rule_weight + self.scoring.ml_weight - 1.0).abs() > 1e-6 {
            anyhow::bail!("scoring.rule_weight + scoring.ml_weight must equal 1.0");
        }

        if !(0.0..=100.0).contains(&self.alerts.min_score) {
            anyhow::bail!("alerts.min_score must be within 0..=100");
        }
        if self.scoring.deal_breaker_cap >= self.alerts.min_score {
            anyhow::bail!(
                "scoring.deal_breaker_cap ({}) must sit below alerts.min_score ({})",
                self.scoring.deal_breaker_cap,
                self.alerts.min_score
            );
        }
        if self.alerts.max_daily == 0 {
            anyhow::bail!("alerts.max_daily must be at least 1");
        }

        for (name, analyzer) in [
            ("security", &self.analyzers.security),
            ("liquidity", &self.analyzers.liquidity),
            ("holders", &self.analyzers.holders),
        ] {
            if analyzer.max_attempts == 0 {
                anyhow::bail!("analyzers.{}.max_attempts must be at least 1", name);
            }
            if analyzer.rate_limit.max_requests == 0 {
                anyhow::bail!("analyzers.{}.rate_limit.max_requests must be at least 1", name);
            }
            if analyzer.rate_limit.window_secs == 0 {
                anyhow::bail!("analyzers.{}.rate_limit.window_secs must be positive", name);
            }
            if !(0.0..=100.0).contains(&analyzer.neutral_score) {
                anyhow::bail!("analyzers.{}.neutral_score must be within 0..=100", name);
            }
        }

        if self.notifications.telegram.enabled && self.notifications.telegram.bot_token.is_empty() {
            anyhow::bail!("notifications.telegram enabled but TELEGRAM_BOT_TOKEN not set");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Pipeline:
    timeout: {}ms
    workers: {}
    queue_capacity: {}
  Analyzers:
    security: {} (limit {}/{}s, ttl {}s)
    liquidity: {} (limit {}/{}s, ttl {}s)
    holders: {} (limit {}/{}s, ttl {}s)
  Scoring:
    weights: sec={} liq={} hold={} mom={} soc={} age={}
    blend: rule={} ml={} (confidence floor {})
    coverage floor: {}
  Alerts:
    min_score: {}
    max_daily: {}
    dedup_cooldown: {}s
  Telegram:
    enabled: {}
    bot_token: {}
  Storage:
    path: {}
"#,
            self.pipeline.timeout_ms,
            self.pipeline.workers,
            self.pipeline.queue_capacity,
            self.analyzers.security.enabled,
            self.analyzers.security.rate_limit.max_requests,
            self.analyzers.security.rate_limit.window_secs,
            self.analyzers.security.cache_ttl_secs,
            self.analyzers.liquidity.enabled,
            self.analyzers.liquidity.rate_limit.max_requests,
            self.analyzers.liquidity.rate_limit.window_secs,
            self.analyzers.liquidity.cache_ttl_secs,
            self.analyzers.holders.enabled,
            self.analyzers.holders.rate_limit.max_requests,
            self.analyzers.holders.rate_limit.window_secs,
            self.analyzers.holders.cache_ttl_secs,
            self.scoring.weights.security,
            self.scoring.weights.liquidity,
            self.scoring.weights.holders,
            self.scoring.weights.momentum,
            self.scoring.weights.social,
            self.scoring.weights.age,
            self.scoring.rule_weight,
            self.scoring.ml_weight,
            self.scoring.ml_confidence_floor,
            self.scoring.min_weight_coverage,
            self.alerts.min_score,
            self.alerts.max_daily,
            self.alerts.dedup_cooldown_secs,
            self.notifications.telegram.enabled,
            if self.notifications.telegram.bot_token.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.storage.path,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            analyzers: AnalyzersConfig::default(),
            scoring: ScoringConfig::default(),
            alerts: AlertConfig::default(),
            notifications: NotificationsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.alerts.min_score, 70.0);
        assert_eq!(config.alerts.max_daily, 15);
        assert_eq!(config.pipeline.timeout_ms, 5000);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = WeightsConfig::default();
        let total = w.security + w.liquidity + w.holders + w.momentum + w.social + w.age;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = Config::default();
        config.scoring.weights.momentum = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cap_must_sit_below_threshold() {
        let mut config = Config::default();
        config.scoring.deal_breaker_cap = 75.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let mut config = Config::default();
        config.alerts.max_daily = 0;
        assert!(config.validate().is_err());
    }
}
