// src/summarize/mod.rs
//! Summarizer client: provider abstraction, prompt templates and the config factory.

pub mod gemini;
pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{PromptStyleName, SummarizerConfig, SummarizerProvider};
use crate::ingest::DIGEST_SEPARATOR;

pub use gemini::GeminiSummarizer;
pub use openai::OpenAiSummarizer;

/// Default character budget when the `telegram` style has no explicit `max_chars`.
pub const TELEGRAM_PROMPT_MAX_CHARS: usize = 4000;

const BASE_INSTRUCTION: &str = "You are an assistant that must summarize the main news from the websites provided to you as objectively as possible. Always return the news summary in Brazilian Portuguese.";

const ATTRIBUTION_INSTRUCTION: &str = "For every news item, say which website it came from and include its link when one is available.";

/// Fixed system wordings. All of them ask for an objective summary in Brazilian Portuguese.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    Objective,
    Attributed,
    Telegram { max_chars: usize },
}

impl PromptStyle {
    pub fn from_config(cfg: &SummarizerConfig) -> Self {
        match cfg.style {
            PromptStyleName::Objective => PromptStyle::Objective,
            PromptStyleName::Attributed => PromptStyle::Attributed,
            PromptStyleName::Telegram => PromptStyle::Telegram {
                max_chars: cfg.max_chars.unwrap_or(TELEGRAM_PROMPT_MAX_CHARS),
            },
        }
    }

    pub fn system_instruction(&self) -> String {
        match self {
            PromptStyle::Objective => BASE_INSTRUCTION.to_string(),
            PromptStyle::Attributed => format!("{BASE_INSTRUCTION} {ATTRIBUTION_INSTRUCTION}"),
            PromptStyle::Telegram { max_chars } => format!(
                "{BASE_INSTRUCTION} {ATTRIBUTION_INSTRUCTION} The whole answer must stay under {max_chars} characters."
            ),
        }
    }
}

/// A ready-to-send request: system instruction plus the user message carrying the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn from_digest(style: PromptStyle, digest: &[String]) -> Self {
        Self {
            system: style.system_instruction(),
            user: format!("Aqui estão as notícias: {}", digest.join(DIGEST_SEPARATOR)),
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// One remote call; the generated text comes back untouched.
    async fn summarize(&self, prompt: &Prompt) -> Result<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Returns a fixed text; no network.
#[derive(Clone)]
pub struct MockSummarizer {
    pub fixed: String,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _prompt: &Prompt) -> Result<String> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build the configured provider around a shared HTTP client.
pub fn build_summarizer(cfg: &SummarizerConfig, http: reqwest::Client) -> DynSummarizer {
    match cfg.provider {
        SummarizerProvider::OpenAi => Arc::new(OpenAiSummarizer::new(cfg, http)),
        SummarizerProvider::Gemini => Arc::new(GeminiSummarizer::new(cfg, http)),
        SummarizerProvider::Mock => Arc::new(MockSummarizer {
            fixed: cfg
                .mock_text
                .clone()
                .unwrap_or_else(|| "Resumo de teste (mock).".to_string()),
        }),
    }
}
