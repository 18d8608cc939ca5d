use log::{debug, info, warn};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};

use crate::database::{bookings, Booking, DbPool, PaymentMethod, PaymentStatus};
use crate::errors::BookingResult;
use crate::services::notifications::{Notification, NotificationHub};

/// Inbound payment provider webhook payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEvent {
    pub event_type: String,
    pub payment_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Succeeded,
    Failed,
    Other,
}

impl ProviderEvent {
    fn kind(&self) -> EventKind {
        let event_type = self.event_type.to_ascii_lowercase();
        if event_type.ends_with("succeeded") {
            return EventKind::Succeeded;
        }
        if event_type.ends_with("failed") || event_type.ends_with("canceled") {
            return EventKind::Failed;
        }
        match self.status.as_deref() {
            Some("succeeded") => EventKind::Succeeded,
            Some("failed") | Some("canceled") => EventKind::Failed,
            _ => EventKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Applied { booking_id: i64, status: PaymentStatus },
    Unchanged { booking_id: i64 },
    UnknownPayment,
    Ignored,
}

/// Where a booking's payment status moves for a provider event, if anywhere.
///
/// `paid` and `refunded` are terminal for webhooks, which makes redelivery a no-op.
fn next_status(current: PaymentStatus, kind: EventKind) -> Option<PaymentStatus> {
    match (current, kind) {
        (PaymentStatus::Pending | PaymentStatus::Failed, EventKind::Succeeded) => Some(PaymentStatus::Paid),
        (PaymentStatus::Pending, EventKind::Failed) => Some(PaymentStatus::Failed),
        _ => None,
    }
}

/// A provider charge succeeding for a booking the requester already settled from their wallet.
fn is_double_payment(booking: &Booking, kind: EventKind) -> bool {
    kind == EventKind::Succeeded
        && booking.payment_status == PaymentStatus::Paid
        && booking.payment_method == PaymentMethod::Wallet
}

pub struct ReconciliationListener {
    pool: DbPool,
    notifications: NotificationHub,
}

impl ReconciliationListener {
    pub fn new(pool: DbPool, notifications: NotificationHub) -> Self {
        Self { pool, notifications }
    }

    /// Applies one provider event. Unknown payment ids are logged and dropped.
    pub fn on_provider_event(&self, event: &ProviderEvent) -> BookingResult<ReconciliationOutcome> {
        let kind = event.kind();
        if kind == EventKind::Other {
            debug!("Ignoring provider event {} for {}", event.event_type, event.payment_id);
            return Ok(ReconciliationOutcome::Ignored);
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(booking) = bookings::find_by_provider_payment_id(&tx, &event.payment_id)? else {
            warn!("Provider event {} references unknown payment {}, discarding", event.event_type, event.payment_id);
            return Ok(ReconciliationOutcome::UnknownPayment);
        };

        let Some(next) = next_status(booking.payment_status, kind) else {
            if is_double_payment(&booking, kind) {
                warn!(
                    "Payment {} settled for booking {} already paid from the wallet, refund it manually",
                    event.payment_id, booking.id
                );
                return Ok(ReconciliationOutcome::Unchanged { booking_id: booking.id });
            }
            debug!(
                "Booking {} already {}, ignoring {}",
                booking.id,
                booking.payment_status.as_str(),
                event.event_type
            );
            return Ok(ReconciliationOutcome::Unchanged { booking_id: booking.id });
        };

        if !bookings::transition_payment_status(&tx, booking.id, booking.payment_status, next)? {
            return Ok(ReconciliationOutcome::Unchanged { booking_id: booking.id });
        }
        tx.commit()?;
        drop(conn);

        if !booking.is_active() && next == PaymentStatus::Paid {
            warn!("Payment {} settled for cancelled booking {}, refund it manually", event.payment_id, booking.id);
        }
        info!(
            "Booking {} payment {} -> {}",
            booking.id,
            booking.payment_status.as_str(),
            next.as_str()
        );

        self.notifications.publish(
            &booking.requester_id,
            Notification::PaymentStatusChanged {
                booking_id: booking.id,
                status: next,
            },
        );

        Ok(ReconciliationOutcome::Applied {
            booking_id: booking.id,
            status: next,
        })
    }
}
