//! Approved-alert delivery
//!
//! The pipeline notifies through the `Notifier` trait and never learns how
//! the message left the process. Telegram is the real channel; the log
//! notifier backs dry runs and setups without a bot token.

pub mod format;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use crate::models::AnalysisRecord;

const SEND_ATTEMPTS: u32 = 3;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &AnalysisRecord) -> Result<()>;
}

/// Telegram Bot API `sendMessage` delivery
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .unwrap_or_default(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                service: "telegram".into(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, record: &AnalysisRecord) -> Result<()> {
        let text = format::format_alert(record);

        let mut last_error = None;
        for attempt in 1..=SEND_ATTEMPTS {
            match self.send(&text).await {
                Ok(()) => {
                    info!(
                        mint = %record.candidate.address,
                        attempt,
                        "Alert delivered to Telegram"
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < SEND_ATTEMPTS => {
                    warn!(
                        mint = %record.candidate.address,
                        attempt,
                        error = %e,
                        "Telegram send failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(mint = %record.candidate.address, error = %e, "Telegram send failed");
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Notification("telegram delivery exhausted".into())))
    }
}

/// Logs the formatted alert instead of delivering it
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, record: &AnalysisRecord) -> Result<()> {
        let pattern = record
            .pattern
            .as_ref()
            .map(|m| m.pattern.to_string())
            .unwrap_or_else(|| "-".into());
        info!(
            mint = %record.candidate.address,
            score = record.scoring.combined_score,
            pattern = %pattern,
            "ALERT\n{}",
            format::format_alert(record)
        );
        Ok(())
    }
}
