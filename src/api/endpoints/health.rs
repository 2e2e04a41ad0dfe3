use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
    pub timestamp: String,
}

/// `GET /health`: liveness check, no store access.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: ctx.core.config().environment.clone(),
        version: crate::config::APP_VERSION,
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}
