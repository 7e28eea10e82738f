use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use relay_core::CliArgs;
use relay_storage::Storage;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let boot = relay_core::bootstrap(CliArgs::parse()).await.context("bootstrap")?;
    let jwt = relay_admin::JwtSettings::from_env().context("admin JWT settings")?;

    let app = Router::new()
        .merge(relay_router::router(boot.state.clone()))
        .nest(
            "/admin",
            relay_admin::router(boot.state.clone(), boot.storage.clone() as Arc<dyn Storage>, jwt),
        );

    let bind = format!("{}:{}", boot.host, boot.port);
    let listener = tokio::net::TcpListener::bind(&bind).await.with_context(|| format!("bind {bind}"))?;
    tracing::info!(%bind, "listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
