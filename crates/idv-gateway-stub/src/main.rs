//! Verification API stub server: standalone development server.
//!
//! In-memory implementation of the two endpoints `idv-client` calls, so
//! the CLI and integration work can run without the real verification
//! service. Users are identified by their bearer token; any non-blank
//! token is accepted.
//!
//! Storage is in-memory (DashMap) with no persistence. Records are lost
//! on restart.
//!
//! Environment:
//! - `IDV_STUB_PORT` (default 5001)
//! - `IDV_STUB_DECISION`: `approve` (default) or `reject`
//! - `RUST_LOG` (default `info`)

mod routes;
mod store;

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("IDV_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5001);

    let decision = match std::env::var("IDV_STUB_DECISION") {
        Ok(raw) => raw.parse().map_err(anyhow::Error::msg)?,
        Err(_) => store::Decision::default(),
    };

    let state = store::AppState::new(decision);
    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(?decision, "idv-gateway-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
