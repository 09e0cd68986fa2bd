// src/summarize/gemini.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Prompt, Summarizer};
use crate::config::SummarizerConfig;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Google Generative Language provider (`generateContent`).
pub struct GeminiSummarizer {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GeminiSummarizer {
    pub fn new(cfg: &SummarizerConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: cfg.api_key.clone(),
            api_base: cfg
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            model: cfg
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            max_tokens: cfg.max_tokens,
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, prompt: &Prompt) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY is not set"));
        }

        let req = Req {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: prompt.system.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: prompt.user.clone(),
                }],
            }],
            generation_config: self.max_tokens.map(|n| GenerationConfig {
                max_output_tokens: n,
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let body: Resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .context("gemini post")?
            .error_for_status()
            .context("gemini non-2xx")?
            .json()
            .await
            .context("gemini response json")?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(anyhow!("gemini returned no candidate text"));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
