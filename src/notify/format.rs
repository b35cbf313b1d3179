//! Alert message formatting for Telegram (Markdown)

use crate::models::{AnalysisRecord, Pattern, RiskLevel};

pub fn format_alert(record: &AnalysisRecord) -> String {
    let candidate = &record.candidate;
    let scoring = &record.scoring;

    let symbol = if candidate.symbol.is_empty() {
        "UNKNOWN"
    } else {
        candidate.symbol.as_str()
    };

    let mut lines = Vec::new();

    match &record.pattern {
        Some(m) => lines.push(format!(
            "{} *{}* — {} {}",
            pattern_emoji(m.pattern),
            symbol,
            m.pattern,
            risk_emoji(m.risk_level)
        )),
        None => lines.push(format!(
            "🎯 *{}* {}",
            symbol,
            risk_emoji(scoring.risk_level)
        )),
    }

    lines.push(format!("`{}`", truncate_address(&candidate.address)));
    lines.push(String::new());
    lines.push(format!("*Score:* {:.1}/100", scoring.combined_score));
    if let (Some(ml), Some(conf)) = (scoring.ml_score, scoring.ml_confidence) {
        lines.push(format!("*ML:* {:.1} ({:.0}% confidence)", ml, conf * 100.0));
    }
    lines.push(format!(
        "*Liquidity:* {}",
        format_usd(candidate.liquidity_usd)
    ));
    if candidate.market_cap > 0.0 {
        lines.push(format!("*Market cap:* {}", format_usd(candidate.market_cap)));
    }
    if candidate.holders > 0 {
        lines.push(format!("*Holders:* {}", candidate.holders));
    }
    lines.push(format!("*Age:* {}", format_age(candidate.age_seconds)));

    if let Some(m) = &record.pattern {
        if !m.criteria.is_empty() {
            lines.push(String::new());
            lines.push("*Matched:*".to_string());
            for criterion in &m.criteria {
                lines.push(format!("  • {}", criterion));
            }
        }
    }

    lines.join("\n")
}

fn pattern_emoji(pattern: Pattern) -> &'static str {
    match pattern {
        Pattern::FastSniper => "⚡️",
        Pattern::SmartSniper => "🎯",
        Pattern::Momentum => "📈",
        Pattern::Safe => "🛡️",
        Pattern::WhaleAccumulation => "🐋",
    }
}

fn risk_emoji(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "🟢",
        RiskLevel::Medium => "🟡",
        RiskLevel::High => "🔴",
    }
}

pub fn format_usd(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("${:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.2}K", value / 1_000.0)
    } else {
        format!("${:.2}", value)
    }
}

fn format_age(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}h{}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

pub fn truncate_address(address: &str) -> String {
    if address.len() <= 8 {
        return address.to_string();
    }
    format!("{}...{}", &address[..5], &address[address.len() - 3..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd_suffixes() {
        assert_eq!(format_usd(532.0), "$532.00");
        assert_eq!(format_usd(45_300.0), "$45.30K");
        assert_eq!(format_usd(2_500_000.0), "$2.50M");
        assert_eq!(format_usd(1_200_000_000.0), "$1.20B");
    }

    #[test]
    fn test_truncate_address() {
        assert_eq!(
            truncate_address("So11111111111111111111111111111111111111112"),
            "So111...112"
        );
        assert_eq!(truncate_address("short"), "short");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(45), "45s");
        assert_eq!(format_age(300), "5m");
        assert_eq!(format_age(7380), "2h3m");
    }
}
