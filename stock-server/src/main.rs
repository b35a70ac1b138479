use stock_server::{Config, Server, init_logger_with_file};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    init_logger_with_file(
        Some(&config.log_level),
        config.log_json || config.is_production(),
        Some(&config.log_dir()),
    );

    tracing::info!(
        "Starting stock-server v{} (env: {})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}
