// src/summarize/openai.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Prompt, Summarizer};
use crate::config::SummarizerConfig;

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI provider (Chat Completions API).
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(cfg: &SummarizerConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: cfg.api_key.clone(),
            api_base: cfg
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            model: cfg
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: cfg.max_tokens,
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &Prompt) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is not set"));
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &prompt.system,
                },
                Msg {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'));
        let body: Resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai post")?
            .error_for_status()
            .context("openai non-2xx")?
            .json()
            .await
            .context("openai response json")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("openai returned no completion text"))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
