// tests/scheduler_startup.rs
//
// The daily loop: an optional immediate run at startup, and nothing
// delivered before the first trigger otherwise.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};

use common::{RecordingNotifier, ScriptedSummarizer, StaticFeed};
use news_summarizer::scheduler::{spawn_daily, DailySchedule};
use news_summarizer::Pipeline;

/// Daily expression firing roughly twelve hours from now.
fn far_schedule() -> DailySchedule {
    let hour = (Utc::now().hour() + 12) % 24;
    DailySchedule::parse(&format!("0 {hour} * * *"), "UTC").expect("schedule")
}

fn pipeline(notifier: Arc<RecordingNotifier>) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(
        vec![StaticFeed::boxed("A", 3)],
        ScriptedSummarizer::always("Resumo de abertura"),
        notifier,
    ))
}

#[tokio::test]
async fn startup_run_delivers_without_waiting_for_the_trigger() {
    let notifier = RecordingNotifier::new();
    let handle = spawn_daily(far_schedule(), pipeline(notifier.clone()), true);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while notifier.sent.lock().unwrap().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();

    assert_eq!(
        *notifier.sent.lock().unwrap(),
        vec!["Resumo de abertura".to_string()]
    );
}

#[tokio::test]
async fn no_startup_run_means_nothing_before_the_trigger() {
    let notifier = RecordingNotifier::new();
    let handle = spawn_daily(far_schedule(), pipeline(notifier.clone()), false);

    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.abort();

    assert!(notifier.sent.lock().unwrap().is_empty());
}
