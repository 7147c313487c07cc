use axum::{extract::State, routing::get, Json, Router};

use crate::db;
use crate::models::HealthResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}

/// API health check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = db::ping(&state.db).await;
    if !database {
        tracing::warn!("Health check: database not reachable");
    }

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    })
}
