//! The thin admin + health HTTP surface (§4.9.1): liveness/readiness plus
//! `register_contract` / `remove_contract` / `pause` / `resume`, mounted
//! alongside the indexing workers rather than as a standalone service.

pub mod auth;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AdminState;

pub async fn serve(
    state: AdminState,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "admin/health server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
