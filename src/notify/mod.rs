// src/notify/mod.rs
pub mod log;
pub mod telegram;
pub mod whatsapp;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::config::{DeliveryChannel, DeliveryConfig};

pub use log::LogNotifier;
pub use telegram::TelegramNotifier;
pub use whatsapp::WhatsAppNotifier;

/// What a channel hands back after a send. Logged, never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeliveryReceipt {
    pub channel: &'static str,
    pub status: Option<u16>,
    pub message_id: Option<String>,
    pub raw: Option<serde_json::Value>,
}

impl DeliveryReceipt {
    pub fn local(channel: &'static str) -> Self {
        Self {
            channel,
            status: None,
            message_id: None,
            raw: None,
        }
    }
}

/// Sends a summary to the one recipient fixed at startup.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt>;
    fn channel(&self) -> &'static str;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Factory: the deployment's configured channel.
pub fn build_notifier(cfg: &DeliveryConfig, http: reqwest::Client) -> DynNotifier {
    match cfg.channel {
        DeliveryChannel::Http => Arc::new(LogNotifier),
        DeliveryChannel::WhatsApp => Arc::new(WhatsAppNotifier::new(&cfg.whatsapp, http)),
        DeliveryChannel::Telegram => Arc::new(TelegramNotifier::new(&cfg.telegram, http)),
    }
}
