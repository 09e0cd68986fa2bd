// src/notify/whatsapp.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use super::{DeliveryReceipt, Notifier};
use crate::config::{WhatsAppConfig, WhatsAppMode};

/// WhatsApp Business Cloud API sender, one fixed recipient.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    endpoint: String,
    token: String,
    recipient: String,
    mode: WhatsAppMode,
    template_name: String,
    template_language: String,
    client: Client,
}

impl WhatsAppNotifier {
    pub fn new(cfg: &WhatsAppConfig, client: Client) -> Self {
        Self {
            endpoint: format!(
                "{}/{}/{}/messages",
                cfg.api_base.trim_end_matches('/'),
                cfg.api_version,
                cfg.phone_number_id
            ),
            token: cfg.token.clone(),
            recipient: cfg.recipient.clone(),
            mode: cfg.mode,
            template_name: cfg.template_name.clone(),
            template_language: cfg.template_language.clone(),
            client,
        }
    }

    pub fn payload(&self, text: &str) -> Value {
        match self.mode {
            WhatsAppMode::Text => text_payload(&self.recipient, text),
            WhatsAppMode::Template => template_payload(
                &self.recipient,
                &self.template_name,
                &self.template_language,
                text,
            ),
        }
    }
}

pub fn text_payload(to: &str, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "text",
        "text": { "preview_url": false, "body": body }
    })
}

/// Template parameters may not carry newlines, tabs or runs of spaces:
/// each non-blank line is squeezed to single spaces and lines are joined with ` | `.
pub fn template_param_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Template whose body has a single `{{1}}` parameter receiving the summary.
pub fn template_payload(to: &str, name: &str, language: &str, body: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "template",
        "template": {
            "name": name,
            "language": { "code": language },
            "components": [{
                "type": "body",
                "parameters": [{ "type": "text", "text": template_param_text(body) }]
            }]
        }
    })
}

#[async_trait::async_trait]
impl Notifier for WhatsAppNotifier {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt> {
        if self.token.is_empty() || self.recipient.is_empty() {
            return Err(anyhow!(
                "WhatsApp credentials missing (WHATSAPP_TOKEN / WHATSAPP_RECIPIENT)"
            ));
        }

        let rsp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&self.payload(text))
            .send()
            .await
            .context("whatsapp post")?;

        let status = rsp.status();
        let body: Value = rsp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(anyhow!("whatsapp HTTP {status}: {body}"));
        }

        let message_id = body["messages"][0]["id"].as_str().map(str::to_string);
        tracing::info!(status = status.as_u16(), message_id = ?message_id, "whatsapp message sent");

        Ok(DeliveryReceipt {
            channel: "whatsapp",
            status: Some(status.as_u16()),
            message_id,
            raw: Some(body),
        })
    }

    fn channel(&self) -> &'static str {
        "whatsapp"
    }
}
