//! Operator status API.
//!
//! Read-only surface over the watcher's published state: current phase,
//! per-pool health and window detail, and the recent alert ring. The
//! failover decisions themselves are never driven from here.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Router};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::alert::Emitter;
use crate::engine::StatusSnapshot;

/// State shared with the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub status: Arc<ArcSwap<StatusSnapshot>>,
    pub emitter: Emitter,
    pub api_key: String,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pools", get(get_pools))
        .route("/admin/alerts", get(get_alerts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        // The watcher's own liveness endpoint stays unauthenticated.
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin API until shutdown.
pub async fn serve(
    state: AdminState,
    bind_address: String,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    axum::serve(listener, admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
