// tests/common/mod.rs
// Shared fakes for integration tests: scripted feeds, summarizers and notifiers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::Router;

use news_summarizer::ingest::providers::RssFeedProvider;
use news_summarizer::ingest::types::{Feed, FeedProvider, NewsItem};
use news_summarizer::notify::{DeliveryReceipt, Notifier};
use news_summarizer::summarize::{Prompt, Summarizer};

pub const G1_XML: &str = include_str!("../fixtures/g1_rss.xml");
pub const VERGE_XML: &str = include_str!("../fixtures/verge_atom.xml");

/// Feed with `n` items titled `{prefix}1..{prefix}n`.
pub struct StaticFeed {
    pub url: String,
    pub prefix: String,
    pub n: usize,
}

impl StaticFeed {
    pub fn boxed(prefix: &str, n: usize) -> Box<dyn FeedProvider> {
        Box::new(Self {
            url: format!("https://{}.example/rss", prefix.to_lowercase()),
            prefix: prefix.to_string(),
            n,
        })
    }
}

#[async_trait]
impl FeedProvider for StaticFeed {
    async fn fetch(&self) -> Result<Feed> {
        let items = (1..=self.n)
            .map(|i| NewsItem {
                title: format!("{}{}", self.prefix, i),
                source: Some(self.prefix.clone()),
                published: None,
                link: None,
                excerpt: None,
            })
            .collect();
        Ok(Feed {
            title: Some(self.prefix.clone()),
            items,
        })
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Always fails like a network error would.
pub struct FailingFeed {
    pub url: String,
}

impl FailingFeed {
    pub fn boxed(url: &str) -> Box<dyn FeedProvider> {
        Box::new(Self {
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl FeedProvider for FailingFeed {
    async fn fetch(&self) -> Result<Feed> {
        Err(anyhow!("connection reset by peer"))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Never answers on its first fetch; healthy afterwards.
pub struct HangOnceFeed {
    hung: AtomicBool,
}

impl HangOnceFeed {
    pub fn boxed() -> Box<dyn FeedProvider> {
        Box::new(Self {
            hung: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl FeedProvider for HangOnceFeed {
    async fn fetch(&self) -> Result<Feed> {
        if !self.hung.swap(true, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        StaticFeed {
            url: self.url().to_string(),
            prefix: "H".into(),
            n: 3,
        }
        .fetch()
        .await
    }

    fn url(&self) -> &str {
        "https://hang.example/rss"
    }
}

/// Sleeps inside `fetch` and records how many fetches were in flight at once.
pub struct SlowFeed {
    pub delay: Duration,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl SlowFeed {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FeedProvider for SlowFeed {
    async fn fetch(&self) -> Result<Feed> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Feed {
            title: Some("slow".into()),
            items: vec![NewsItem {
                title: "S1".into(),
                source: None,
                published: None,
                link: None,
                excerpt: None,
            }],
        })
    }

    fn url(&self) -> &str {
        "https://slow.example/rss"
    }
}

pub fn fixture_feeds() -> Vec<Box<dyn FeedProvider>> {
    vec![
        Box::new(RssFeedProvider::from_fixture("fixture:g1", G1_XML)),
        Box::new(RssFeedProvider::from_fixture("fixture:verge", VERGE_XML)),
    ]
}

/// Replays scripted outputs (the last one repeats) and records every prompt.
pub struct ScriptedSummarizer {
    outputs: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedSummarizer {
    pub fn new(outputs: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn always(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let next = self.outputs.lock().unwrap().pop_front();
        let out = match next {
            Some(o) => {
                *self.last.lock().unwrap() = Some(o.clone());
                o
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("script exhausted".into())),
        };
        out.map_err(|e| anyhow!(e))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Keeps every delivered text.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt> {
        if self.fail {
            return Err(anyhow!("provider returned 503"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(DeliveryReceipt::local("recording"))
    }

    fn channel(&self) -> &'static str {
        "recording"
    }
}

/// Serve `app` on an ephemeral local port; returns `http://127.0.0.1:PORT`.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    format!("http://{addr}")
}
