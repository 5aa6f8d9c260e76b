use std::sync::Arc;

use anyhow::Context;

use atomic_api::app::{self, services};
use atomic_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    atomic_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(services::build_services(&config).await?);
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
