use anyhow::anyhow;
use tokio::net::TcpListener;

use voxgate::{ServerConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e))?;
    let address = config.address();

    // Create application state and router
    let app_state = AppState::new(config);
    let app = voxgate::routes::create_app(app_state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!(%address, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
