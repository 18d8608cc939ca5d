use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::errors::BookingError;
use crate::payments::ProviderEvent;

/// Unknown payments and irrelevant events still answer 200 so the provider
/// stops redelivering; only store failures ask for a retry.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ProviderEvent>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.reconciliation.on_provider_event(&event)?))
}
