use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::errors::BookingError;
use crate::services::matches::ResultSubmission;

pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
    Json(submission): Json<ResultSubmission>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.matches.submit_result(booking_id, &submission)?))
}

pub async fn get_player_rating(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.matches.player_rating(&user_id)?))
}
