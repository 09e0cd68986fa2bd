// tests/length_ceiling.rs
//
// Length-bounded runs (Telegram): re-run while the summary reaches the
// ceiling, truncate after the last attempt, and the command/ack replies.

mod common;

use common::{FailingFeed, RecordingNotifier, ScriptedSummarizer, StaticFeed};
use news_summarizer::notify::telegram::{reply_for, ACK_MESSAGE, TELEGRAM_MAX_MESSAGE_CHARS};
use news_summarizer::{Pipeline, FALLBACK_MESSAGE};

const CEILING: usize = TELEGRAM_MAX_MESSAGE_CHARS;

fn pipeline(summarizer: std::sync::Arc<ScriptedSummarizer>) -> Pipeline {
    Pipeline::new(
        vec![StaticFeed::boxed("A", 3)],
        summarizer,
        RecordingNotifier::new(),
    )
}

#[tokio::test]
async fn short_summary_returns_after_one_run() {
    let summarizer = ScriptedSummarizer::always("curto");
    let out = pipeline(summarizer.clone())
        .run_within_limit(CEILING, 3)
        .await
        .expect("run");
    assert_eq!(out, "curto");
    assert_eq!(summarizer.calls(), 1);
}

#[tokio::test]
async fn oversized_summary_triggers_another_run() {
    let summarizer = ScriptedSummarizer::new(vec![
        Ok("x".repeat(CEILING)),
        Ok("y".repeat(CEILING + 500)),
        Ok("cabe".to_string()),
    ]);
    let out = pipeline(summarizer.clone())
        .run_within_limit(CEILING, 3)
        .await
        .expect("run");
    assert_eq!(out, "cabe");
    assert_eq!(summarizer.calls(), 3);
}

#[tokio::test]
async fn exhausted_attempts_truncate_last_result() {
    let summarizer = ScriptedSummarizer::always(&"z".repeat(CEILING * 2));
    let out = pipeline(summarizer.clone())
        .run_within_limit(CEILING, 3)
        .await
        .expect("run");
    assert_eq!(summarizer.calls(), 3);
    assert!(out.chars().count() < CEILING);
    assert!(out.ends_with('…'));
}

#[tokio::test]
async fn failure_inside_loop_propagates() {
    let summarizer = ScriptedSummarizer::new(vec![
        Ok("x".repeat(CEILING)),
        Err("timeout".into()),
    ]);
    let err = pipeline(summarizer.clone())
        .run_within_limit(CEILING, 3)
        .await
        .expect_err("second run fails");
    assert!(err.to_string().contains("timeout"));
    assert_eq!(summarizer.calls(), 2);
}

#[tokio::test]
async fn scheduled_run_respects_configured_limit() {
    let notifier = RecordingNotifier::new();
    let summarizer = ScriptedSummarizer::new(vec![Ok("a".repeat(100)), Ok("ok".into())]);
    let pipeline = Pipeline::new(vec![StaticFeed::boxed("A", 3)], summarizer.clone(), notifier.clone())
        .with_length_limit(50, 3);

    pipeline.scheduled_run().await.expect("deliver");
    assert_eq!(summarizer.calls(), 2);
    assert_eq!(*notifier.sent.lock().unwrap(), vec!["ok".to_string()]);
}

#[tokio::test]
async fn command_gets_summary_and_other_text_gets_ack() {
    let summarizer = ScriptedSummarizer::always("Resumo via bot");
    let p = pipeline(summarizer.clone());

    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "/noticias").await,
        "Resumo via bot"
    );
    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "/noticias@NewsBot").await,
        "Resumo via bot"
    );
    assert_eq!(summarizer.calls(), 2);

    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "bom dia").await,
        ACK_MESSAGE
    );
    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "/start").await,
        ACK_MESSAGE
    );
    assert_eq!(summarizer.calls(), 2);
}

#[tokio::test]
async fn command_for_another_bot_never_runs_the_pipeline() {
    let summarizer = ScriptedSummarizer::always("Resumo via bot");
    let p = pipeline(summarizer.clone());

    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "/noticias@OtherBot").await,
        ACK_MESSAGE
    );
    // Own name unknown: only the bare command is trusted.
    assert_eq!(reply_for(&p, "/noticias", None, "/noticias@NewsBot").await, ACK_MESSAGE);
    assert_eq!(summarizer.calls(), 0);

    assert_eq!(reply_for(&p, "/noticias", None, "/noticias").await, "Resumo via bot");
    assert_eq!(summarizer.calls(), 1);
}

#[tokio::test]
async fn command_falls_back_when_run_fails() {
    let summarizer = ScriptedSummarizer::always("nunca");
    let p = Pipeline::new(
        vec![FailingFeed::boxed("https://a.example/rss")],
        summarizer.clone(),
        RecordingNotifier::new(),
    );
    assert_eq!(
        reply_for(&p, "/noticias", Some("NewsBot"), "/noticias").await,
        FALLBACK_MESSAGE
    );
    assert_eq!(summarizer.calls(), 0);
}
