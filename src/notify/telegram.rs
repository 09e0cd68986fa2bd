// src/notify/telegram.rs
//! Telegram Bot API: `sendMessage` delivery plus the long-polling command listener.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use super::{DeliveryReceipt, Notifier};
use crate::config::TelegramConfig;
use crate::pipeline::{Pipeline, FALLBACK_MESSAGE};

/// Hard limit of one Telegram text message.
pub const TELEGRAM_MAX_MESSAGE_CHARS: usize = 4096;

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

pub const ACK_MESSAGE: &str = "Mensagem recebida! Envie /noticias para receber o resumo das notícias do dia.";

#[derive(Clone)]
pub struct TelegramApi {
    base: String,
    client: Client,
}

impl TelegramApi {
    pub fn new(api_base: &str, bot_token: &str, client: Client) -> Self {
        Self {
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            client,
        }
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<DeliveryReceipt> {
        let rsp = self
            .client
            .post(format!("{}/sendMessage", self.base))
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .context("telegram sendMessage")?;

        let status = rsp.status();
        let body: Value = rsp.json().await.unwrap_or(Value::Null);
        if !status.is_success() || body["ok"] != Value::Bool(true) {
            return Err(anyhow!("telegram HTTP {status}: {body}"));
        }

        Ok(DeliveryReceipt {
            channel: "telegram",
            status: Some(status.as_u16()),
            message_id: body["result"]["message_id"].as_i64().map(|id| id.to_string()),
            raw: Some(body),
        })
    }

    /// The bot's own `@username`, without the `@`.
    pub async fn get_me(&self) -> Result<String> {
        let body: Value = self
            .client
            .get(format!("{}/getMe", self.base))
            .send()
            .await
            .context("telegram getMe")?
            .json()
            .await
            .context("telegram getMe json")?;
        if body["ok"] != Value::Bool(true) {
            return Err(anyhow!("telegram getMe rejected: {body}"));
        }
        body["result"]["username"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("telegram getMe returned no username"))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        #[derive(Deserialize)]
        struct Resp {
            ok: bool,
            #[serde(default)]
            result: Vec<Update>,
            description: Option<String>,
        }

        let resp: Resp = self
            .client
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await
            .context("telegram getUpdates")?
            .json()
            .await
            .context("telegram getUpdates json")?;

        if !resp.ok {
            return Err(anyhow!(
                "telegram getUpdates rejected: {}",
                resp.description.unwrap_or_default()
            ));
        }
        Ok(resp.result)
    }
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Scheduled deliveries go to the configured chat.
pub struct TelegramNotifier {
    api: TelegramApi,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(cfg: &TelegramConfig, client: Client) -> Self {
        Self {
            api: TelegramApi::new(&cfg.api_base, &cfg.bot_token, client),
            bot_token: cfg.bot_token.clone(),
            chat_id: cfg.chat_id.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt> {
        if self.bot_token.is_empty() || self.chat_id.is_empty() {
            return Err(anyhow!(
                "Telegram credentials missing (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)"
            ));
        }
        self.api.send_message(&self.chat_id, text).await
    }

    fn channel(&self) -> &'static str {
        "telegram"
    }
}

/// Splits the leading `/cmd@Bot` word into `("/cmd", Some("Bot"))`.
fn command_word(text: &str) -> Option<(&str, Option<&str>)> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    Some(match first.split_once('@') {
        Some((name, bot)) => (name, Some(bot)),
        None => (first, None),
    })
}

/// True when the message is a command explicitly addressed to a different bot.
/// With an unknown own username every addressed command counts as foreign.
pub fn addressed_elsewhere(text: &str, bot_username: Option<&str>) -> bool {
    match command_word(text) {
        Some((_, Some(target))) => {
            !bot_username.is_some_and(|me| target.eq_ignore_ascii_case(me.trim_start_matches('@')))
        }
        _ => false,
    }
}

/// True for `/cmd`, `/cmd args` and `/cmd@{bot_username}`.
pub fn is_command(text: &str, command: &str, bot_username: Option<&str>) -> bool {
    match command_word(text) {
        Some((name, _)) => {
            name.eq_ignore_ascii_case(command) && !addressed_elsewhere(text, bot_username)
        }
        None => false,
    }
}

/// Reply text for one incoming message. The command runs the pipeline
/// under the length ceiling; anything else gets an acknowledgment.
pub async fn reply_for(
    pipeline: &Pipeline,
    command: &str,
    bot_username: Option<&str>,
    text: &str,
) -> String {
    if !is_command(text, command, bot_username) {
        return ACK_MESSAGE.to_string();
    }
    let limit = pipeline.length_limit();
    let ceiling = limit.map_or(TELEGRAM_MAX_MESSAGE_CHARS, |l| l.ceiling);
    let attempts = limit.map_or(3, |l| l.max_attempts);
    match pipeline.run_within_limit(ceiling, attempts).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "telegram command run failed");
            FALLBACK_MESSAGE.to_string()
        }
    }
}

/// Long-polling listener; replies in whichever chat wrote to the bot.
pub struct TelegramPoller {
    api: TelegramApi,
    command: String,
    bot_username: Option<String>,
    pipeline: Arc<Pipeline>,
}

impl TelegramPoller {
    pub fn new(cfg: &TelegramConfig, client: Client, pipeline: Arc<Pipeline>) -> Self {
        Self {
            api: TelegramApi::new(&cfg.api_base, &cfg.bot_token, client),
            command: cfg.command.clone(),
            bot_username: cfg.bot_username.clone().filter(|u| !u.trim().is_empty()),
            pipeline,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(mut self) {
        if self.bot_username.is_none() {
            match self.api.get_me().await {
                Ok(name) => self.bot_username = Some(name),
                Err(e) => tracing::warn!(
                    error = ?e,
                    "telegram bot username unknown; `/cmd@bot` commands will be ignored"
                ),
            }
        }
        tracing::info!(
            command = %self.command,
            bot = ?self.bot_username,
            "telegram listener started"
        );
        let mut offset = 0i64;
        loop {
            let updates = match self.api.get_updates(offset).await {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(error = ?e, "telegram poll failed");
                    tokio::time::sleep(POLL_ERROR_PAUSE).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(msg) = update.message else { continue };
                let Some(text) = msg.text else { continue };
                if addressed_elsewhere(&text, self.bot_username.as_deref()) {
                    continue;
                }

                // A slow command must not stall polling for other chats.
                let chat_id = msg.chat.id.to_string();
                let api = self.api.clone();
                let pipeline = Arc::clone(&self.pipeline);
                let command = self.command.clone();
                let bot_username = self.bot_username.clone();
                tokio::spawn(async move {
                    let reply =
                        reply_for(&pipeline, &command, bot_username.as_deref(), &text).await;
                    if let Err(e) = api.send_message(&chat_id, &reply).await {
                        tracing::warn!(error = ?e, chat_id = %chat_id, "telegram reply failed");
                    }
                });
            }
        }
    }
}
