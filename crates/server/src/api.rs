//! Operator-facing JSON API.

mod clients;
mod error;

use std::{collections::BTreeMap, sync::Arc};

use axum::{Json, Router, extract::State, routing::get};
use coordinator::{Coordinator, ServiceStatus, Stats};
use serde_json::json;

pub(crate) use error::{ApiError, error_response};

#[derive(Clone)]
pub(crate) struct AppState {
    pub coordinator: Arc<Coordinator>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/services", get(services))
        .route("/api/stats", get(stats))
        .route("/api/clients", get(clients::list).post(clients::create))
        .route("/api/clients/{name}", get(clients::get).delete(clients::delete))
        .route("/api/clients/{name}/config", get(clients::artifact))
        .with_state(state)
}

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn services(State(state): State<AppState>) -> Json<BTreeMap<String, ServiceStatus>> {
    Json(state.coordinator.service_statuses().await)
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.coordinator.stats().await?))
}
