// src/config/mod.rs
pub mod app;

pub use app::{
    AppConfig, DeliveryChannel, DeliveryConfig, FeedsConfig, PipelineConfig, PromptStyleName,
    ScheduleConfig, SummarizerConfig, SummarizerProvider, TelegramConfig, WhatsAppConfig,
    WhatsAppMode,
};
