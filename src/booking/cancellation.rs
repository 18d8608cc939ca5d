use chrono::{NaiveDateTime, Utc};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::orchestrator::BookingService;
use crate::database::{bookings, ledger, Booking, LedgerCategory, PaymentMethod, PaymentStatus, RefundStatus, WalletTransactionKind};
use crate::errors::{BookingError, BookingResult};
use crate::services::notifications::Notification;
use crate::services::wallet;

/// Where the money of a paid booking goes back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundTarget {
    #[default]
    Wallet,
    OriginalMethod,
}

#[derive(Debug, Clone, PartialEq)]
enum RefundPlan {
    Nothing,
    WalletCredited(Decimal),
    Provider { payment_id: String, amount: Decimal },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub refunded: Option<Decimal>,
}

/// Cancels the booking and books its refund. Returns the refund still owed by
/// the provider, if any.
fn commit_cancellation(
    conn: &mut Connection,
    booking_id: i64,
    reason: &str,
    target: RefundTarget,
    now: NaiveDateTime,
) -> BookingResult<(Booking, RefundPlan)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let booking = bookings::find_by_id(&tx, booking_id)?.ok_or(BookingError::BookingNotFound(booking_id))?;
    if !bookings::mark_cancelled(&tx, booking.id, reason, now)? {
        return Err(BookingError::validation(format!("booking {} is already cancelled", booking.id)));
    }

    let plan = if booking.payment_status == PaymentStatus::Paid && booking.total_price > Decimal::ZERO {
        let amount = booking.total_price;
        ledger::append_entry(
            &tx,
            booking.venue_id,
            Some(booking.id),
            &format!("Refund for booking #{} ({})", booking.id, reason),
            amount,
            Decimal::ZERO,
            LedgerCategory::Refund,
            now,
        )?;
        bookings::transition_payment_status(&tx, booking.id, PaymentStatus::Paid, PaymentStatus::Refunded)?;

        match (&booking.provider_payment_id, booking.payment_method, target) {
            (Some(payment_id), PaymentMethod::Provider, RefundTarget::OriginalMethod) => {
                bookings::set_refund_status(&tx, booking.id, RefundStatus::Requested)?;
                RefundPlan::Provider {
                    payment_id: payment_id.clone(),
                    amount,
                }
            }
            _ => {
                wallet::credit(
                    &tx,
                    &booking.requester_id,
                    booking.venue_id,
                    amount,
                    WalletTransactionKind::Credit,
                    Some(booking.id),
                    now,
                )?;
                bookings::set_refund_status(&tx, booking.id, RefundStatus::Credited)?;
                RefundPlan::WalletCredited(amount)
            }
        }
    } else {
        if booking.total_price > Decimal::ZERO {
            ledger::append_entry(
                &tx,
                booking.venue_id,
                Some(booking.id),
                &format!("Booking #{} cancelled unpaid ({})", booking.id, reason),
                booking.total_price,
                Decimal::ZERO,
                LedgerCategory::Cancellation,
                now,
            )?;
        }
        RefundPlan::Nothing
    };

    let cancelled = bookings::find_by_id(&tx, booking.id)?.ok_or(BookingError::BookingNotFound(booking.id))?;
    tx.commit()?;

    Ok((cancelled, plan))
}

impl BookingService {
    /// Cancels a booking exactly once, refunding it when it was paid.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        reason: &str,
        target: RefundTarget,
    ) -> BookingResult<CancellationOutcome> {
        let (mut booking, plan) = {
            let mut conn = self.pool.get()?;
            commit_cancellation(&mut conn, booking_id, reason, target, Utc::now().naive_utc())?
        };
        info!("Booking {} cancelled ({})", booking.id, reason);

        let refunded = match plan {
            RefundPlan::Nothing => None,
            RefundPlan::WalletCredited(amount) => Some(amount),
            RefundPlan::Provider { payment_id, amount } => {
                let status = self.issue_provider_refund(booking.id, &payment_id, amount).await;
                booking.refund_status = Some(status);
                Some(amount)
            }
        };

        self.notifications.dispatch(
            booking.requester_id.clone(),
            Notification::BookingCancelled {
                booking_id: booking.id,
                reason: reason.to_string(),
                refunded,
            },
        );

        Ok(CancellationOutcome { booking, refunded })
    }

    /// Runs after the cancellation committed; failure only marks the refund.
    async fn issue_provider_refund(&self, booking_id: i64, payment_id: &str, amount: Decimal) -> RefundStatus {
        let status = match &self.provider {
            Some(provider) => match provider.create_refund(payment_id, amount).await {
                Ok(refund) => {
                    info!("Refund {} issued for booking {}", refund.refund_id, booking_id);
                    RefundStatus::Processed
                }
                Err(e) => {
                    warn!("Refund of {} for booking {} failed: {}", amount, booking_id, e);
                    RefundStatus::Failed
                }
            },
            None => {
                warn!("No payment provider configured, refund for booking {} not issued", booking_id);
                RefundStatus::Failed
            }
        };

        let stored = self
            .pool
            .get()
            .map_err(BookingError::from)
            .and_then(|conn| Ok(bookings::set_refund_status(&conn, booking_id, status)?));
        if let Err(e) = stored {
            error!("Failed to record refund status for booking {}: {:?}", booking_id, e);
        }
        status
    }
}
