use axum::{extract::State, Json};

use crate::admin::AdminState;
use crate::alert::Alert;
use crate::engine::{PoolStatus, StatusSnapshot};

pub async fn get_status(State(state): State<AdminState>) -> Json<StatusSnapshot> {
    Json((**state.status.load()).clone())
}

pub async fn get_pools(State(state): State<AdminState>) -> Json<Vec<PoolStatus>> {
    Json(state.status.load().pools.clone())
}

pub async fn get_alerts(State(state): State<AdminState>) -> Json<Vec<Alert>> {
    Json(state.emitter.recent())
}

pub async fn healthz() -> &'static str {
    "ok"
}
