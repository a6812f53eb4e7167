// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;
use std::sync::Arc;

pub use telegram::TelegramNotifier;

/// Outbound "send a text message" sink.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Dry-run sink used when no chat credentials are configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        tracing::info!(target: "notify", chars = text.chars().count(), "dry-run message:\n{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Telegram when `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are set, log-only otherwise.
pub fn notifier_from_env() -> DynNotifier {
    match TelegramNotifier::from_env() {
        Some(t) => Arc::new(t),
        None => {
            tracing::warn!(target: "notify", "Telegram disabled (no TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID), using log sink");
            Arc::new(LogNotifier)
        }
    }
}
