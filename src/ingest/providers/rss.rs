// src/ingest/providers/rss.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    macros::format_description,
    OffsetDateTime, UtcOffset,
};

use crate::ingest::normalize_text;
use crate::ingest::types::{Feed, FeedProvider, NewsItem};

const EXCERPT_MAX_CHARS: usize = 280;
const TITLE_MAX_CHARS: usize = 300;

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<AtomText>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Feed provider over plain HTTP(S), or over an embedded document for tests.
pub struct RssFeedProvider {
    url: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http(reqwest::Client),
}

impl RssFeedProvider {
    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            mode: Mode::Http(client),
        }
    }

    /// `label` stands in for the URL in logs and errors.
    pub fn from_fixture(label: impl Into<String>, xml: &str) -> Self {
        Self {
            url: label.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }
}

#[async_trait]
impl FeedProvider for RssFeedProvider {
    async fn fetch(&self) -> Result<Feed> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http(client) => {
                let body = client
                    .get(&self.url)
                    .send()
                    .await
                    .context("feed http get()")?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                parse_feed(&body)
            }
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Parse an RSS 2.0 or Atom document, picked by its root element.
pub fn parse_feed(xml: &str) -> Result<Feed> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    match root_element(&xml_clean).as_deref() {
        Some("rss") => parse_rss(&xml_clean),
        Some("feed") => parse_atom(&xml_clean),
        Some(other) => Err(anyhow!("unsupported feed root element <{other}>")),
        None => Err(anyhow!("document has no root element")),
    }
}

fn parse_rss(xml: &str) -> Result<Feed> {
    let rss: Rss = from_str(xml).context("parsing rss xml")?;
    let title = rss.channel.title.map(|t| normalize_text(&t, TITLE_MAX_CHARS));

    let mut items = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let item_title = normalize_text(it.title.as_deref().unwrap_or_default(), TITLE_MAX_CHARS);
        if item_title.is_empty() {
            continue;
        }
        items.push(NewsItem {
            title: item_title,
            source: title.clone().filter(|t| !t.is_empty()),
            published: it.pub_date.as_deref().and_then(display_date),
            link: non_empty(it.link),
            excerpt: it
                .description
                .map(|d| normalize_text(&d, EXCERPT_MAX_CHARS))
                .filter(|d| !d.is_empty()),
        });
    }

    Ok(Feed { title, items })
}

fn parse_atom(xml: &str) -> Result<Feed> {
    let feed: AtomFeed = from_str(xml).context("parsing atom xml")?;
    let title = feed.title.map(|t| normalize_text(&t.value, TITLE_MAX_CHARS));

    let mut items = Vec::with_capacity(feed.entry.len());
    for e in feed.entry {
        let entry_title = e
            .title
            .map(|t| normalize_text(&t.value, TITLE_MAX_CHARS))
            .unwrap_or_default();
        if entry_title.is_empty() {
            continue;
        }
        let link = e
            .link
            .iter()
            .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
            .or_else(|| e.link.first())
            .and_then(|l| l.href.clone());
        let excerpt = e
            .summary
            .or(e.content)
            .map(|t| normalize_text(&t.value, EXCERPT_MAX_CHARS))
            .filter(|t| !t.is_empty());

        items.push(NewsItem {
            title: entry_title,
            source: title.clone().filter(|t| !t.is_empty()),
            published: e.published.or(e.updated).as_deref().and_then(display_date),
            link: non_empty(link),
            excerpt,
        });
    }

    Ok(Feed { title, items })
}

/// Local name of the first element in the document.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) dates become `dd/mm/yyyy HH:MM UTC`;
/// anything else is passed through trimmed.
pub fn display_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC));
    let fmt = format_description!("[day]/[month]/[year] [hour]:[minute] UTC");
    Some(
        parsed
            .and_then(|dt| dt.format(fmt).ok())
            .unwrap_or_else(|| raw.to_string()),
    )
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
