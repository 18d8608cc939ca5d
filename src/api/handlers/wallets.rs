use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{TopUpRequest, WalletResponse};
use crate::errors::BookingError;

pub async fn top_up(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TopUpRequest>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.wallets.top_up(&request.user_id, request.venue_id, request.amount)?))
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path((user_id, venue_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, BookingError> {
    let balance = state.wallets.balance(&user_id, venue_id)?;
    let transactions = state.wallets.transactions(&user_id, venue_id)?;
    Ok(Json(WalletResponse {
        user_id,
        venue_id,
        balance,
        transactions,
    }))
}
