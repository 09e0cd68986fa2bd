// tests/collect_digest.rs
//
// Digest assembly across feeds: per-feed cap, feed order, item rendering
// and the all-or-nothing failure rule.

mod common;

use std::time::Duration;

use common::{FailingFeed, HangOnceFeed, StaticFeed};
use news_summarizer::ingest::{
    collect_digest, collect_digest_within, ItemFormat, NO_DATE, NO_EXCERPT, NO_LINK,
};
use news_summarizer::{FailureKind, PipelineError};

#[tokio::test]
async fn caps_each_feed_and_keeps_feed_order() {
    let feeds = vec![StaticFeed::boxed("A", 5), StaticFeed::boxed("B", 5)];
    let digest = collect_digest(&feeds, 3, ItemFormat::Title)
        .await
        .expect("collect");

    assert_eq!(
        digest,
        vec!["📌 A1", "📌 A2", "📌 A3", "📌 B1", "📌 B2", "📌 B3"]
    );
}

#[tokio::test]
async fn short_feeds_contribute_what_they_have() {
    let feeds = vec![
        StaticFeed::boxed("A", 1),
        StaticFeed::boxed("B", 0),
        StaticFeed::boxed("C", 4),
    ];
    let digest = collect_digest(&feeds, 3, ItemFormat::Title)
        .await
        .expect("collect");
    assert_eq!(digest.len(), 4);
    assert!(digest.len() <= 3 * feeds.len());
    assert_eq!(digest[0], "📌 A1");
    assert_eq!(digest[1], "📌 C1");
}

#[tokio::test]
async fn one_failing_feed_fails_the_whole_collection() {
    let feeds = vec![
        StaticFeed::boxed("A", 3),
        FailingFeed::boxed("https://down.example/rss"),
        StaticFeed::boxed("C", 3),
    ];
    let err = collect_digest(&feeds, 3, ItemFormat::Title)
        .await
        .expect_err("must fail");

    assert_eq!(err.kind(), FailureKind::Fetch);
    match err {
        PipelineError::Fetch { url, .. } => assert_eq!(url, "https://down.example/rss"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn fixtures_render_detailed_lines_with_placeholders() {
    let feeds = common::fixture_feeds();
    let digest = collect_digest(&feeds, 3, ItemFormat::Detailed)
        .await
        .expect("collect fixtures");
    assert_eq!(digest.len(), 6);

    assert!(digest[0].starts_with("📰 g1 > Todas as notícias: Chuva forte"));
    assert!(digest[0].contains("06/10/2025 13:30 UTC"));
    // Third g1 item has no description.
    assert!(digest[2].contains(NO_EXCERPT), "{}", digest[2]);

    assert!(digest[3].starts_with("📰 The Verge: Apple announces new MacBook lineup"));
    assert!(digest[3].contains("https://www.theverge.com/news/1/apple-macbook"));

    for line in &digest {
        assert!(!line.contains(NO_DATE), "{line}");
        assert!(!line.contains(NO_LINK), "{line}");
    }
}

#[tokio::test]
async fn no_feeds_yields_empty_digest() {
    let digest = collect_digest(&[], 3, ItemFormat::Title)
        .await
        .expect("collect");
    assert!(digest.is_empty());
}

#[tokio::test]
async fn silent_feed_fails_collection_after_the_fetch_timeout() {
    let feeds = vec![StaticFeed::boxed("A", 2), HangOnceFeed::boxed()];
    let err = collect_digest_within(&feeds, 3, ItemFormat::Title, Some(Duration::from_millis(100)))
        .await
        .expect_err("hung feed must not stall collection");

    assert_eq!(err.kind(), FailureKind::Fetch);
    assert!(err.to_string().contains("hang.example"), "{err}");
    assert!(err.to_string().contains("timed out"), "{err}");

    // The same provider answers on the next attempt.
    let digest = collect_digest_within(&feeds, 3, ItemFormat::Title, Some(Duration::from_millis(100)))
        .await
        .expect("second attempt");
    assert_eq!(digest, vec!["📌 A1", "📌 A2", "📌 H1", "📌 H2", "📌 H3"]);
}
