// src/ingest/mod.rs
//! Feed collection: fetch every configured feed in order, keep the first
//! `cap` items of each and render them into digest lines.

pub mod providers;
pub mod types;

use std::time::Duration;

use anyhow::anyhow;

use crate::error::PipelineError;
use crate::ingest::types::{FeedProvider, NewsItem};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Deserialize;

pub const NO_DATE: &str = "Data não disponível";
pub const NO_LINK: &str = "Link não disponível";
pub const NO_EXCERPT: &str = "Resumo não disponível";

/// Separator used when the digest is folded into one prompt.
pub const DIGEST_SEPARATOR: &str = " | ";

/// Ordered digest lines for one run.
pub type Digest = Vec<String>;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items kept in the digest, all feeds.");
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_fetch_ms", "Fetch + parse time per feed in milliseconds.");
    });
}

/// How a news item is rendered into a digest line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemFormat {
    /// `📌 {title}`
    #[default]
    Title,
    /// Source, title, date, link and excerpt, with placeholders for gaps.
    Detailed,
}

impl NewsItem {
    pub fn render(&self, format: ItemFormat) -> String {
        match format {
            ItemFormat::Title => format!("📌 {}", self.title),
            ItemFormat::Detailed => {
                let head = match &self.source {
                    Some(src) => format!("📰 {src}: {}", self.title),
                    None => format!("📰 {}", self.title),
                };
                format!(
                    "{head} · 📅 {} · 🔗 {} · 📝 {}",
                    self.published.as_deref().unwrap_or(NO_DATE),
                    self.link.as_deref().unwrap_or(NO_LINK),
                    self.excerpt.as_deref().unwrap_or(NO_EXCERPT),
                )
            }
        }
    }
}

/// Normalize text: decode entities, strip tags, collapse whitespace and cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap, on char boundaries
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect::<String>().trim_end().to_string();
        out.push('…');
    }

    out
}

/// Fetch feeds one at a time, in order. Any failing feed fails the whole collection.
pub async fn collect_digest(
    providers: &[Box<dyn FeedProvider>],
    per_feed_cap: usize,
    format: ItemFormat,
) -> Result<Digest, PipelineError> {
    collect_digest_within(providers, per_feed_cap, format, None).await
}

/// [`collect_digest`] with each feed fetch bounded by `fetch_timeout`.
/// A feed that does not answer in time fails the collection like any other fetch error.
pub async fn collect_digest_within(
    providers: &[Box<dyn FeedProvider>],
    per_feed_cap: usize,
    format: ItemFormat,
    fetch_timeout: Option<Duration>,
) -> Result<Digest, PipelineError> {
    ensure_metrics_described();

    let mut digest = Vec::with_capacity(providers.len() * per_feed_cap);
    for p in providers {
        let t0 = std::time::Instant::now();
        let fetched = match fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, p.fetch())
                .await
                .unwrap_or_else(|_| Err(anyhow!("feed fetch timed out after {limit:?}"))),
            None => p.fetch().await,
        };
        let feed = match fetched {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = ?e, feed = p.url(), "feed fetch failed");
                counter!("feed_errors_total").increment(1);
                return Err(PipelineError::Fetch {
                    url: p.url().to_string(),
                    source: e,
                });
            }
        };
        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        tracing::info!(
            feed = p.url(),
            title = feed.title.as_deref().unwrap_or_default(),
            items = feed.items.len(),
            "feed fetched"
        );

        let before = digest.len();
        digest.extend(
            feed.items
                .iter()
                .take(per_feed_cap)
                .map(|item| item.render(format)),
        );
        counter!("feed_items_total").increment((digest.len() - before) as u64);
    }

    Ok(digest)
}
