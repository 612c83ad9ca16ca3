use anyhow::Context;
use pulsefleet::core::config::AppConfig;
use pulsefleet::{credentials, display, Fleet};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .init();

    display::banner();

    let config = AppConfig::from_env();

    let tokens = match credentials::load(&config.token_file).await {
        Ok(tokens) if !tokens.is_empty() => tokens,
        Ok(_) => {
            error!("No usable tokens in {}", config.token_file.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("Error reading tokens file: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting {} WebSocket clients...", tokens.len());
    let fleet = Fleet::start(tokens, &config);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for termination signal")?;

    fleet.shutdown().await;
    Ok(())
}
