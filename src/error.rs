// src/error.rs
//! Typed failures for one pipeline run.

use thiserror::Error;

/// Which stage of the run failed. Used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Summarize,
    Delivery,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Summarize => "summarize",
            FailureKind::Delivery => "delivery",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch feed {url}: {source:#}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("summarizer `{provider}` failed: {source:#}")]
    Summarize {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("delivery via `{channel}` failed: {source:#}")]
    Delivery {
        channel: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Fetch { .. } => FailureKind::Fetch,
            PipelineError::Summarize { .. } => FailureKind::Summarize,
            PipelineError::Delivery { .. } => FailureKind::Delivery,
        }
    }
}
