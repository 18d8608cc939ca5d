use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::{error, info};

use crate::api::models::ErrorResponse;
use crate::booking::BookingService;
use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::errors::BookingError;
use crate::payments::{PaymentProvider, ReconciliationListener, StripeClient};
use crate::services::matches::MatchService;
use crate::services::notifications::NotificationHub;
use crate::services::sweeper::CancellationSweeper;
use crate::services::wallet::WalletService;
use crate::weather::{ForecastProvider, OpenWeatherClient};

pub mod admin;
pub mod bookings;
pub mod matches;
pub mod notifications;
pub mod payments;
pub mod wallets;

pub struct AppState {
    pub config: AppConfig,
    pub bookings: BookingService,
    pub wallets: WalletService,
    pub matches: MatchService,
    pub reconciliation: ReconciliationListener,
    /// Absent when no forecast service is configured.
    pub sweeper: Option<CancellationSweeper>,
    pub notifications: NotificationHub,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: AppConfig,
        payments: Option<Arc<dyn PaymentProvider>>,
        forecast: Option<Arc<dyn ForecastProvider>>,
    ) -> Self {
        let notifications = NotificationHub::new();
        Self {
            bookings: BookingService::new(pool.clone(), payments, notifications.clone(), config.booking.clone()),
            wallets: WalletService::new(pool.clone()),
            matches: MatchService::new(pool.clone(), config.rating.clone()),
            reconciliation: ReconciliationListener::new(pool.clone(), notifications.clone()),
            sweeper: forecast.map(|f| CancellationSweeper::new(pool, f, notifications.clone(), config.sweep.clone())),
            notifications,
            config,
        }
    }

    /// Wires the configured outbound clients; either may be left out.
    pub fn from_config(pool: DbPool, config: AppConfig) -> Result<Self> {
        let user_agent = config.server.user_agent;
        let payments = StripeClient::from_settings(&config.payment, user_agent)?
            .map(|c| Arc::new(c) as Arc<dyn PaymentProvider>);
        let forecast = OpenWeatherClient::from_settings(&config.weather, user_agent)?
            .map(|c| Arc::new(c) as Arc<dyn ForecastProvider>);

        info!(
            "Payment provider {}, forecast service {}",
            if payments.is_some() { "configured" } else { "not configured" },
            if forecast.is_some() { "configured" } else { "not configured" }
        );
        Ok(Self::new(pool, config, payments, forecast))
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Conflict => StatusCode::CONFLICT,
            BookingError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            BookingError::CourtNotFound(_) | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Store(_) | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:?}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
