use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime, Utc};
use log::{error, info, warn};
use rust_decimal::Decimal;
use rusqlite::TransactionBehavior;

use super::notifications::{Notification, NotificationHub};
use super::wallet;
use crate::config::settings::SweepSettings;
use crate::database::{bookings, ledger, Booking, DbPool, LedgerCategory, PaymentStatus, RefundStatus, WalletTransactionKind};
use crate::weather::{Forecast, ForecastProvider};

pub const RAIN_CHECK_REASON: &str = "rain_check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepDecision {
    Kept,
    RainCheck,
    /// Another sweep or a cancellation got there first.
    Skipped,
}

/// Cancels and credits outdoor bookings that are forecast to be rained out.
pub struct CancellationSweeper {
    pool: DbPool,
    forecast: Arc<dyn ForecastProvider>,
    notifications: NotificationHub,
    settings: SweepSettings,
}

impl CancellationSweeper {
    pub fn new(
        pool: DbPool,
        forecast: Arc<dyn ForecastProvider>,
        notifications: NotificationHub,
        settings: SweepSettings,
    ) -> Self {
        Self {
            pool,
            forecast,
            notifications,
            settings,
        }
    }

    pub async fn sweep(&self) -> Result<usize> {
        self.sweep_at(Utc::now().naive_utc()).await
    }

    /// Checks every unchecked booking starting within the horizon after `now`.
    /// Returns how many bookings were stamped by this run.
    pub async fn sweep_at(&self, now: NaiveDateTime) -> Result<usize> {
        let horizon_end = now + Duration::hours(self.settings.horizon_hours);
        let candidates = {
            let conn = self.pool.get().context("Failed to get database connection")?;
            bookings::list_unchecked_outdoor(&conn, now.date(), horizon_end.date())?
        };
        let due: Vec<_> = candidates
            .into_iter()
            .filter(|c| {
                let start = c.booking.starts_at();
                start >= now && start <= horizon_end
            })
            .collect();
        info!("Weather sweep: {} bookings to check", due.len());

        let mut processed = 0;
        let mut rained_out = 0;
        for candidate in due {
            let booking = candidate.booking;
            let forecast = match self.forecast.get_forecast(&candidate.city, booking.starts_at()).await {
                Ok(forecast) => forecast,
                Err(e) => {
                    warn!("Forecast for booking {} in {} unavailable, retrying next sweep: {:#}", booking.id, candidate.city, e);
                    continue;
                }
            };

            match self.apply(&booking, &forecast, Utc::now().naive_utc()) {
                Ok(SweepDecision::Kept) => processed += 1,
                Ok(SweepDecision::RainCheck) => {
                    processed += 1;
                    rained_out += 1;
                    self.notifications.dispatch(
                        booking.requester_id.clone(),
                        Notification::RainCheck {
                            booking_id: booking.id,
                            credited: booking.total_price,
                        },
                    );
                }
                Ok(SweepDecision::Skipped) => {}
                Err(e) => error!("Weather sweep failed for booking {}: {:?}", booking.id, e),
            }
        }

        info!("Weather sweep finished: {} checked, {} rain checks", processed, rained_out);
        Ok(processed)
    }

    /// Stamps the booking and, on rain, cancels it with a wallet credit, all in one transaction.
    fn apply(&self, booking: &Booking, forecast: &Forecast, now: NaiveDateTime) -> Result<SweepDecision> {
        let mut conn = self.pool.get().context("Failed to get database connection")?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !bookings::mark_weather_checked(&tx, booking.id, now, &forecast.raw)? {
            return Ok(SweepDecision::Skipped);
        }

        let decision = if forecast.is_raining && bookings::mark_cancelled(&tx, booking.id, RAIN_CHECK_REASON, now)? {
            // The listing was read before the forecast call; payment may have settled since.
            let current = bookings::find_by_id(&tx, booking.id)?
                .with_context(|| format!("Booking {} disappeared during weather check", booking.id))?;
            rain_check(&tx, &current, now)?;
            SweepDecision::RainCheck
        } else {
            SweepDecision::Kept
        };

        tx.commit().context("Failed to commit weather check")?;
        Ok(decision)
    }
}

/// Full-price wallet credit with the matching ledger refund.
fn rain_check(conn: &rusqlite::Connection, booking: &Booking, now: NaiveDateTime) -> Result<()> {
    if booking.total_price > Decimal::ZERO {
        wallet::credit(
            conn,
            &booking.requester_id,
            booking.venue_id,
            booking.total_price,
            WalletTransactionKind::Credit,
            Some(booking.id),
            now,
        )?;
        ledger::append_entry(
            conn,
            booking.venue_id,
            Some(booking.id),
            &format!("Rain check refund for booking #{}", booking.id),
            booking.total_price,
            Decimal::ZERO,
            LedgerCategory::Refund,
            now,
        )?;
    }
    if !bookings::transition_payment_status(conn, booking.id, booking.payment_status, PaymentStatus::Refunded)? {
        bail!(
            "Booking {} payment left {} during rain check",
            booking.id,
            booking.payment_status.as_str()
        );
    }
    bookings::set_refund_status(conn, booking.id, RefundStatus::Credited)?;
    info!("Booking {} rained out, {} credited to {}", booking.id, booking.total_price, booking.requester_id);
    Ok(())
}
