//! Canopy cache warmer entry point.
//!
//! # Purpose
//! Loads configuration, warms the model cache if it is missing, then serves
//! `/metrics` until interrupted.
use warmer::app::run_with_shutdown;
use warmer::config::WarmerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WarmerConfig::from_env_or_yaml()?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
