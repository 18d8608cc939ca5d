use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::AppState;
use crate::api::models::{AvailabilityParams, AvailabilityResponse, CancelRequest, PayWithWalletRequest};
use crate::booking::BookingRequest;
use crate::errors::BookingError;

const DEFAULT_CANCEL_REASON: &str = "cancelled_by_user";

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookingRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let outcome = state.bookings.create_booking(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.bookings.get_booking(booking_id)?))
}

pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.bookings.list_shares(booking_id)?))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
    body: Option<Json<CancelRequest>>,
) -> Result<impl IntoResponse, BookingError> {
    let Json(request) = body.unwrap_or_default();
    let reason = request.reason.as_deref().unwrap_or(DEFAULT_CANCEL_REASON);
    let outcome = state.bookings.cancel_booking(booking_id, reason, request.refund_to).await?;
    Ok(Json(outcome))
}

pub async fn pay_with_wallet(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<i64>,
    Json(request): Json<PayWithWalletRequest>,
) -> Result<impl IntoResponse, BookingError> {
    Ok(Json(state.wallets.pay_booking(booking_id, &request.user_id)?))
}

pub async fn court_availability(
    State(state): State<Arc<AppState>>,
    Path(court_id): Path<i64>,
    Query(params): Query<AvailabilityParams>,
) -> Result<impl IntoResponse, BookingError> {
    let available = state.bookings.is_available(court_id, params.date, params.start, params.end)?;
    Ok(Json(AvailabilityResponse {
        court_id,
        date: params.date,
        start: params.start,
        end: params.end,
        available,
    }))
}
