// src/ingest/types.rs
use anyhow::Result;

/// URL of one syndication feed; fixed for the process lifetime.
pub type FeedSource = String;

/// One entry of a fetched feed. Lives for a single pipeline run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub source: Option<String>,    // feed title, e.g. "g1 > Todas as notícias"
    pub published: Option<String>, // display form, see `display_date`
    pub link: Option<String>,
    pub excerpt: Option<String>,
}

/// A parsed feed document: its title plus items in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: Option<String>,
    pub items: Vec<NewsItem>,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self) -> Result<Feed>;
    fn url(&self) -> &str;
}
