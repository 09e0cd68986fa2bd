//! One-shot run: collect + summarize with the deployment config and print the result.
//! Pass `--deliver` to also send it through the configured channel.

use news_summarizer::{AppConfig, Pipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let deliver = std::env::args().skip(1).any(|a| a == "--deliver");
    let cfg = AppConfig::load_default()?;
    let pipeline = Pipeline::from_config(&cfg)?;

    if deliver {
        match pipeline.scheduled_run().await {
            Ok(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", pipeline.run_or_fallback().await);
    }
    Ok(())
}
