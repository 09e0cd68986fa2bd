// src/metrics.rs
//! Prometheus exposition for pipeline counters and timings.

use anyhow::Context;
use axum::{http::header, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::AppConfig;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder (once per process) and publish static
    /// gauges describing the deployment.
    pub fn init(cfg: &AppConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("feeds_configured").set(cfg.feeds.urls.len() as f64);
        gauge!("feed_item_cap").set(cfg.feeds.per_feed_cap as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`, merged next to the public routes.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], h.render()) }
            }),
        )
    }
}
