// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::ingest::types::FeedSource;
use crate::ingest::ItemFormat;
use crate::scheduler::DailySchedule;

pub const DEFAULT_CONFIG_PATH: &str = "config/news.toml";
pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";

pub const DEFAULT_FEEDS: [&str; 2] = [
    "https://g1.globo.com/rss/g1/",
    "https://www.theverge.com/rss/index.xml",
];

fn default_port() -> u16 {
    4000
}
fn default_cap() -> usize {
    3
}
fn default_feeds() -> Vec<FeedSource> {
    DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect()
}
fn default_cron() -> String {
    "0 8 * * *".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_true() -> bool {
    true
}
fn default_ceiling() -> usize {
    4096
}
fn default_attempts() -> u32 {
    3
}
fn default_stage_timeout_secs() -> u64 {
    120
}
fn default_request_timeout_secs() -> Option<u64> {
    Some(60)
}
fn default_max_tokens() -> Option<u32> {
    Some(500)
}
fn env_marker() -> String {
    "ENV".to_string()
}

/// Whole-process configuration. Built once at startup and shared read-only.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            feeds: FeedsConfig::default(),
            summarizer: SummarizerConfig::default(),
            delivery: DeliveryConfig::default(),
            schedule: ScheduleConfig::default(),
            pipeline: PipelineConfig::default(),
            http: HttpConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_feeds")]
    pub urls: Vec<FeedSource>,
    #[serde(default = "default_cap")]
    pub per_feed_cap: usize,
    #[serde(default)]
    pub format: ItemFormat,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: default_feeds(),
            per_feed_cap: default_cap(),
            format: ItemFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerProvider {
    #[default]
    OpenAi,
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyleName {
    #[default]
    Objective,
    Attributed,
    Telegram,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub provider: SummarizerProvider,
    /// Falls back to the provider's default model when absent.
    pub model: Option<String>,
    /// "ENV" means: read from OPENAI_API_KEY / GEMINI_API_KEY (by provider).
    #[serde(default = "env_marker")]
    pub api_key: String,
    pub api_base: Option<String>,
    /// Output bound sent to the provider. `0` disables it.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub style: PromptStyleName,
    /// Character budget written into the `telegram` prompt style.
    pub max_chars: Option<usize>,
    /// Fixed reply of the `mock` provider.
    pub mock_text: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::default(),
            model: None,
            api_key: env_marker(),
            api_base: None,
            max_tokens: default_max_tokens(),
            style: PromptStyleName::default(),
            max_chars: None,
            mock_text: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    #[default]
    Http,
    WhatsApp,
    Telegram,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub channel: DeliveryChannel,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WhatsAppMode {
    #[default]
    Text,
    Template,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_graph_base")]
    pub api_base: String,
    #[serde(default = "default_graph_version")]
    pub api_version: String,
    #[serde(default = "env_marker")]
    pub phone_number_id: String,
    #[serde(default = "env_marker")]
    pub token: String,
    #[serde(default = "env_marker")]
    pub recipient: String,
    #[serde(default)]
    pub mode: WhatsAppMode,
    #[serde(default = "default_template_name")]
    pub template_name: String,
    #[serde(default = "default_template_lang")]
    pub template_language: String,
}

fn default_graph_base() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_graph_version() -> String {
    "v21.0".to_string()
}
fn default_template_name() -> String {
    "resumo_noticias".to_string()
}
fn default_template_lang() -> String {
    "pt_BR".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: default_graph_base(),
            api_version: default_graph_version(),
            phone_number_id: env_marker(),
            token: env_marker(),
            recipient: env_marker(),
            mode: WhatsAppMode::default(),
            template_name: default_template_name(),
            template_language: default_template_lang(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base")]
    pub api_base: String,
    #[serde(default = "env_marker")]
    pub bot_token: String,
    #[serde(default = "env_marker")]
    pub chat_id: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_true")]
    pub polling: bool,
    /// Own `@username`; looked up with `getMe` when absent.
    pub bot_username: Option<String>,
}

fn default_telegram_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_command() -> String {
    "/noticias".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_telegram_base(),
            bot_token: env_marker(),
            chat_id: env_marker(),
            command: default_command(),
            polling: true,
            bot_username: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
            timezone: default_timezone(),
            run_on_startup: false,
        }
    }
}

impl ScheduleConfig {
    pub fn daily(&self) -> Result<DailySchedule> {
        DailySchedule::parse(&self.cron, &self.timezone)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_true")]
    pub single_run_lock: bool,
    #[serde(default = "default_ceiling")]
    pub length_ceiling: usize,
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Bound for each feed fetch, summarizer call and delivery. `0` disables it.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_secs > 0).then(|| Duration::from_secs(self.stage_timeout_secs))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            single_run_lock: true,
            length_ceiling: default_ceiling(),
            max_attempts: default_attempts(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request bound on the shared outbound client. `0` disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl AppConfig {
    /// Parse a TOML document, then resolve "ENV" secrets and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing news config toml")?;
        cfg.resolve_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading news config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load config using env var + fallbacks:
    /// 1) $NEWS_CONFIG_PATH
    /// 2) config/news.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("NEWS_CONFIG_PATH points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        let mut cfg = AppConfig::default();
        cfg.resolve_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Secrets are read here but never checked: a missing credential
    /// surfaces only when the call that needs it is made.
    fn resolve_env(&mut self) -> Result<()> {
        let key_var = match self.summarizer.provider {
            SummarizerProvider::OpenAi => "OPENAI_API_KEY",
            SummarizerProvider::Gemini => "GEMINI_API_KEY",
            SummarizerProvider::Mock => "",
        };
        resolve_secret(&mut self.summarizer.api_key, key_var);

        let wa = &mut self.delivery.whatsapp;
        resolve_secret(&mut wa.token, "WHATSAPP_TOKEN");
        resolve_secret(&mut wa.phone_number_id, "WHATSAPP_PHONE_NUMBER_ID");
        resolve_secret(&mut wa.recipient, "WHATSAPP_RECIPIENT");

        let tg = &mut self.delivery.telegram;
        resolve_secret(&mut tg.bot_token, "TELEGRAM_BOT_TOKEN");
        resolve_secret(&mut tg.chat_id, "TELEGRAM_CHAT_ID");

        if let Ok(port) = env::var("PORT") {
            if !port.trim().is_empty() {
                self.port = port
                    .trim()
                    .parse()
                    .with_context(|| format!("PORT `{port}` is not a valid port number"))?;
            }
        }
        if let Ok(tz) = env::var("NEWS_SCHEDULE_TZ") {
            if !tz.trim().is_empty() {
                self.schedule.timezone = tz.trim().to_string();
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.feeds.urls = clean_list(std::mem::take(&mut self.feeds.urls));
        if self.feeds.urls.is_empty() {
            return Err(anyhow!("at least one feed url must be configured"));
        }
        if self.feeds.per_feed_cap == 0 {
            return Err(anyhow!("feeds.per_feed_cap must be at least 1"));
        }
        if self.pipeline.length_ceiling < 2 {
            return Err(anyhow!("pipeline.length_ceiling must be at least 2"));
        }
        self.pipeline.max_attempts = self.pipeline.max_attempts.max(1);
        if self.http.request_timeout_secs == Some(0) {
            self.http.request_timeout_secs = None;
        }
        if self.summarizer.max_tokens == Some(0) {
            self.summarizer.max_tokens = None;
        }
        self.schedule
            .daily()
            .with_context(|| format!("invalid schedule `{}`", self.schedule.cron))?;
        Ok(())
    }
}

fn resolve_secret(slot: &mut String, var: &str) {
    if !slot.trim().eq_ignore_ascii_case("env") {
        return;
    }
    *slot = if var.is_empty() {
        String::new()
    } else {
        env::var(var).unwrap_or_default()
    };
}

/// Trim, drop empties and keep first occurrence order (feed order matters).
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
