use std::sync::Arc;

use matchings::{handlers::AppState, open_store, routes::create_router, utils, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let store = open_store(&config).await?;

    let port = config.port;
    let state = AppState::new(store, Arc::new(utils::SystemClock), &config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
