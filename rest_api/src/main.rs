// rest_api/src/main.rs

use anyhow::Result;
use log::{error, info};

use rest_api::{load_rest_api_config, start_server};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_file = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = load_rest_api_config(config_file.as_deref())?;
    info!("Starting hospital REST API on {}", config.bind_address());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal.");
    };
    start_server(config, shutdown).await
}
