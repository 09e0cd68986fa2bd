//! News Summarizer: binary entrypoint
//! Boots the Axum HTTP server, the daily scheduler and (for Telegram
//! deployments) the bot listener around one shared pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use news_summarizer::config::DeliveryChannel;
use news_summarizer::notify::telegram::TelegramPoller;
use news_summarizer::{metrics::Metrics, scheduler, AppConfig, Pipeline};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise info for this crate and warn for dependencies.
/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_summarizer=info,digest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    tracing::info!(
        feeds = cfg.feeds.urls.len(),
        provider = ?cfg.summarizer.provider,
        channel = ?cfg.delivery.channel,
        schedule = %cfg.schedule.cron,
        timezone = %cfg.schedule.timezone,
        "configuration loaded"
    );

    // Recorder goes in before any run can record.
    let metrics = if cfg.metrics.enabled {
        Some(Metrics::init(&cfg)?)
    } else {
        None
    };

    let pipeline = Arc::new(Pipeline::from_config(&cfg)?);

    if cfg.schedule.enabled {
        let daily = cfg.schedule.daily()?;
        scheduler::spawn_daily(daily, Arc::clone(&pipeline), cfg.schedule.run_on_startup);
    }

    if cfg.delivery.channel == DeliveryChannel::Telegram && cfg.delivery.telegram.polling {
        let client = news_summarizer::ingest::providers::http_client(&cfg)?;
        TelegramPoller::new(&cfg.delivery.telegram, client, Arc::clone(&pipeline)).spawn();
    }

    let mut app = news_summarizer::router(Arc::clone(&pipeline));
    if let Some(metrics) = &metrics {
        app = app.merge(metrics.router());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server running on http://localhost:{}", cfg.port);
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
