use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::core::app_state::AppState;
use crate::core::outbox;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Attach state, spawn the outbox relay and serve until shutdown.
pub async fn bootstrap(service_name: &str, app: Router<AppState>, state: AppState) -> Result<()> {
    let app = app
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    tokio::spawn(outbox::run_relay(state.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("{service_name} listening on http://{addr}");
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
