use discord_provider::{init_logging, serve, DiscordProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Discord provider");
    serve(DiscordProvider::new()).await?;
    Ok(())
}
