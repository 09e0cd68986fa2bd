// src/notify/log.rs
use anyhow::Result;

use super::{DeliveryReceipt, Notifier};

/// Channel for HTTP-only deployments: on-demand results go out in the response
/// body, scheduled results end up in the log.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt> {
        tracing::info!(target: "digest", chars = text.chars().count(), "daily news summary:\n{text}");
        Ok(DeliveryReceipt::local("log"))
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}
