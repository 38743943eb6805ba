use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let status = match crate::db::ping(&state.db).await {
        Ok(()) => "ok",
        Err(_) => "degraded",
    };

    Json(HealthStatus {
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}
