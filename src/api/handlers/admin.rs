use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{ErrorResponse, SweepResponse};

pub async fn cron_weather_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !is_authorized(&headers, state.config.server.cron_secret.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let Some(sweeper) = &state.sweeper else {
        let body = ErrorResponse {
            error: "forecast service not configured".to_string(),
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    };

    log::info!("Cron triggered weather sweep");
    match sweeper.sweep().await {
        Ok(processed_count) => Json(SweepResponse { processed_count }).into_response(),
        Err(e) => {
            log::error!("Weather sweep failed: {:?}", e);
            let body = ErrorResponse {
                error: "weather sweep failed".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Without a configured secret the endpoint stays closed.
fn is_authorized(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return false;
    };
    let expected = format!("Bearer {}", secret);
    headers.get("Authorization").and_then(|h| h.to_str().ok()) == Some(expected.as_str())
}
