use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub store: String,
    pub wspay_configured: bool,
    pub test_gateway: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let config = &state.config;
    let wspay_configured =
        !config.wspay.shop_id.is_empty() && !config.wspay.secret_key().is_empty();

    let mut response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.server.environment.clone(),
        store: state.store.backend().to_string(),
        wspay_configured,
        test_gateway: config.wspay.uses_test_gateway(),
    };

    if let Err(e) = state.store.ping().await {
        warn!("Store health check failed: {}", e);
        response.status = "unhealthy".to_string();
        return Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)));
    }

    Ok(Json(response))
}
