// src/pipeline.rs
//! Collect → summarize → deliver, shared by the HTTP route, the daily
//! scheduler and the Telegram command.

use std::time::Duration;

use anyhow::anyhow;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::config::{AppConfig, DeliveryChannel};
use crate::error::PipelineError;
use crate::ingest::types::FeedProvider;
use crate::ingest::{self, Digest, ItemFormat};
use crate::notify::{build_notifier, DeliveryReceipt, DynNotifier};
use crate::summarize::{build_summarizer, DynSummarizer, Prompt, PromptStyle};

/// User-facing text that replaces the summary when a run fails.
pub const FALLBACK_MESSAGE: &str = "Não foi possível obter notícias hoje.";

/// Upper bound for one feed fetch, one summarizer call or one delivery.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Collect + summarize runs started.");
        describe_counter!(
            "pipeline_failures_total",
            "Failed runs, labelled by failing stage."
        );
        describe_counter!("deliveries_total", "Successful deliveries per channel.");
        describe_histogram!("summarize_ms", "Summarizer call time in milliseconds.");
    });
}

pub struct Pipeline {
    feeds: Vec<Box<dyn FeedProvider>>,
    per_feed_cap: usize,
    format: ItemFormat,
    style: PromptStyle,
    summarizer: DynSummarizer,
    notifier: DynNotifier,
    run_lock: Option<Mutex<()>>,
    length_limit: Option<LengthLimit>,
    stage_timeout: Option<Duration>,
}

/// Output ceiling of a length-bounded channel and how many runs may try to meet it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthLimit {
    pub ceiling: usize,
    pub max_attempts: u32,
}

impl Pipeline {
    /// Defaults: cap 3, title-only items, objective prompt, runs serialized,
    /// every stage bounded by [`DEFAULT_STAGE_TIMEOUT`].
    pub fn new(
        feeds: Vec<Box<dyn FeedProvider>>,
        summarizer: DynSummarizer,
        notifier: DynNotifier,
    ) -> Self {
        Self {
            feeds,
            per_feed_cap: 3,
            format: ItemFormat::Title,
            style: PromptStyle::Objective,
            summarizer,
            notifier,
            run_lock: Some(Mutex::new(())),
            length_limit: None,
            stage_timeout: Some(DEFAULT_STAGE_TIMEOUT),
        }
    }

    pub fn with_cap(mut self, per_feed_cap: usize) -> Self {
        self.per_feed_cap = per_feed_cap;
        self
    }

    pub fn with_format(mut self, format: ItemFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_style(mut self, style: PromptStyle) -> Self {
        self.style = style;
        self
    }

    /// `false` lets concurrent triggers overlap freely.
    pub fn with_run_lock(mut self, enabled: bool) -> Self {
        self.run_lock = enabled.then(|| Mutex::new(()));
        self
    }

    /// `None` lets a stage wait indefinitely. With the run lock on, a hung
    /// stage would then hold back every later run.
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Scheduled runs go through `run_within_limit` once this is set.
    pub fn with_length_limit(mut self, ceiling: usize, max_attempts: u32) -> Self {
        self.length_limit = Some(LengthLimit {
            ceiling,
            max_attempts,
        });
        self
    }

    /// Wire feeds, summarizer and notifier from config over one shared HTTP client.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let http = ingest::providers::http_client(cfg)?;
        let feeds = ingest::providers::from_config(cfg, &http);
        let summarizer = build_summarizer(&cfg.summarizer, http.clone());
        let notifier = build_notifier(&cfg.delivery, http);

        let mut pipeline = Self::new(feeds, summarizer, notifier)
            .with_cap(cfg.feeds.per_feed_cap)
            .with_format(cfg.feeds.format)
            .with_style(PromptStyle::from_config(&cfg.summarizer))
            .with_run_lock(cfg.pipeline.single_run_lock)
            .with_stage_timeout(cfg.pipeline.stage_timeout());
        if cfg.delivery.channel == DeliveryChannel::Telegram {
            pipeline = pipeline
                .with_length_limit(cfg.pipeline.length_ceiling, cfg.pipeline.max_attempts);
        }
        Ok(pipeline)
    }

    pub fn length_limit(&self) -> Option<LengthLimit> {
        self.length_limit
    }

    pub async fn collect(&self) -> Result<Digest, PipelineError> {
        ingest::collect_digest_within(
            &self.feeds,
            self.per_feed_cap,
            self.format,
            self.stage_timeout,
        )
        .await
    }

    /// Exactly one summarizer call.
    pub async fn summarize(&self, digest: &[String]) -> Result<String, PipelineError> {
        let prompt = Prompt::from_digest(self.style, digest);
        let t0 = std::time::Instant::now();
        let call = self.summarizer.summarize(&prompt);
        let out = within(self.stage_timeout, "summarizer call", call).await;
        histogram!("summarize_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out.map_err(|source| PipelineError::Summarize {
            provider: self.summarizer.provider_name(),
            source,
        })
    }

    /// Collect + summarize. No summarizer call happens when collection fails.
    pub async fn run(&self) -> Result<String, PipelineError> {
        ensure_metrics_described();
        let _guard = match &self.run_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        counter!("pipeline_runs_total").increment(1);
        let result = match self.collect().await {
            Ok(digest) => {
                tracing::debug!(items = digest.len(), "digest collected");
                self.summarize(&digest).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            counter!("pipeline_failures_total", "kind" => e.kind().as_str()).increment(1);
        }
        result
    }

    /// `run`, with any failure replaced by [`FALLBACK_MESSAGE`].
    pub async fn run_or_fallback(&self) -> String {
        match self.run().await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind().as_str(), "news run failed");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    /// Re-run until the summary is shorter than `ceiling` chars, at most
    /// `max_attempts` times; the last oversized result is truncated.
    pub async fn run_within_limit(
        &self,
        ceiling: usize,
        max_attempts: u32,
    ) -> Result<String, PipelineError> {
        let attempts = max_attempts.max(1);
        let mut last = String::new();
        for attempt in 1..=attempts {
            let summary = self.run().await?;
            let len = summary.chars().count();
            if len < ceiling {
                return Ok(summary);
            }
            tracing::warn!(attempt, len, ceiling, "summary over length ceiling");
            last = summary;
        }
        Ok(truncate_to_limit(&last, ceiling))
    }

    pub async fn deliver(&self, text: &str) -> Result<DeliveryReceipt, PipelineError> {
        let channel = self.notifier.channel();
        match within(self.stage_timeout, "delivery", self.notifier.deliver(text)).await {
            Ok(receipt) => {
                counter!("deliveries_total", "channel" => channel).increment(1);
                Ok(receipt)
            }
            Err(source) => {
                let e = PipelineError::Delivery { channel, source };
                counter!("pipeline_failures_total", "kind" => e.kind().as_str()).increment(1);
                Err(e)
            }
        }
    }

    /// Timer-triggered run: summary (or fallback) is always handed to the channel.
    pub async fn scheduled_run(&self) -> Result<DeliveryReceipt, PipelineError> {
        let text = match self.length_limit {
            Some(limit) => match self.run_within_limit(limit.ceiling, limit.max_attempts).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, kind = e.kind().as_str(), "news run failed");
                    FALLBACK_MESSAGE.to_string()
                }
            },
            None => self.run_or_fallback().await,
        };
        self.deliver(&text).await
    }
}

async fn within<T, F>(limit: Option<Duration>, what: &str, fut: F) -> anyhow::Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(anyhow!("{what} timed out after {limit:?}"))),
        None => fut.await,
    }
}

/// Cut to `ceiling - 1` chars (ellipsis included), on a char boundary.
pub fn truncate_to_limit(text: &str, ceiling: usize) -> String {
    if text.chars().count() < ceiling {
        return text.to_string();
    }
    let keep = ceiling.saturating_sub(2);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}
