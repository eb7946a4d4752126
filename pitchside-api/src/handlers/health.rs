use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub providers: Vec<String>,
}

/// Reports which delivery providers have an adapter wired in. A service
/// with no adapters still serves the registry, so the status degrades
/// rather than fails.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers: Vec<String> = state
        .dispatcher
        .configured_providers()
        .iter()
        .map(|p| p.to_string())
        .collect();

    let status = if providers.is_empty() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.into(),
        providers,
    })
}
