// src/ingest/providers/mod.rs
pub mod rss;

use std::time::Duration;

use crate::config::AppConfig;
use crate::ingest::types::FeedProvider;

pub use rss::RssFeedProvider;

const USER_AGENT: &str = "news-summarizer/0.1 (+rss digest)";

/// Shared outbound client; honours the optional request timeout from config.
pub fn http_client(cfg: &AppConfig) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(secs) = cfg.http.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// One HTTP provider per configured feed URL, in configuration order.
pub fn from_config(cfg: &AppConfig, client: &reqwest::Client) -> Vec<Box<dyn FeedProvider>> {
    cfg.feeds
        .urls
        .iter()
        .map(|url| Box::new(RssFeedProvider::from_url(url.clone(), client.clone())) as Box<dyn FeedProvider>)
        .collect()
}
