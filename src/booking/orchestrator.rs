use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::conflict::{has_conflict, SlotInterval};
use super::pricing::{price, split_shares};
use crate::config::settings::BookingSettings;
use crate::database::{bookings, courts, ledger, matches, shares, DbPool};
use crate::database::{Booking, BookingShare, CourtStatus, LedgerCategory, NewBookingRow, OpenMatch};
use crate::database::{PaymentMethod, PaymentStatus};
use crate::errors::{BookingError, BookingResult};
use crate::payments::{ChargeRequest, PaymentProvider};
use crate::services::notifications::{Notification, NotificationHub};
use crate::services::wallet;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub court_id: i64,
    pub requester_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendee_count: i32,
    #[serde(default)]
    pub split_payment: bool,
    #[serde(default)]
    pub public_match: bool,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Everything written by the booking transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedBooking {
    pub booking: Booking,
    pub shares: Vec<BookingShare>,
    pub open_match: Option<OpenMatch>,
}

/// State of the provider charge after the booking committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentInitiation {
    /// Money already moved inside the transaction (wallet, instant or free).
    NotRequired,
    NotConfigured,
    Initiated {
        payment_id: String,
        client_secret: Option<String>,
        checkout_url: Option<String>,
    },
    /// The booking stands; payment stays pending until reconciled.
    Failed { warning: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOutcome {
    #[serde(flatten)]
    pub committed: CommittedBooking,
    pub payment: PaymentInitiation,
}

/// Validates and writes a booking with all of its derived rows in one
/// immediate transaction.
///
/// The write lock is taken at `BEGIN`, so the conflict check below is the last
/// gate before insert: two callers racing for one slot serialize here and the
/// loser sees the winner's row.
pub fn commit_booking(
    conn: &mut Connection,
    request: &BookingRequest,
    settings: &BookingSettings,
    now: NaiveDateTime,
) -> BookingResult<CommittedBooking> {
    validate_request(request, settings)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let court = courts::find_by_id(&tx, request.court_id)?.ok_or(BookingError::CourtNotFound(request.court_id))?;
    if court.status == CourtStatus::Maintenance {
        return Err(BookingError::validation(format!("court {} is under maintenance", court.id)));
    }
    if request.attendee_count > court.capacity {
        return Err(BookingError::validation(format!(
            "attendee count {} exceeds court capacity {}",
            request.attendee_count, court.capacity
        )));
    }

    if has_conflict(&tx, court.id, request.date, request.start_time, request.end_time, None)? {
        return Err(BookingError::Conflict);
    }

    let total_price = price(court.hourly_rate, request.start_time, request.end_time)?;
    let payment_status = initial_payment_status(request.payment_method, total_price);

    let booking = bookings::insert_booking(
        &tx,
        &NewBookingRow {
            court_id: court.id,
            venue_id: court.venue_id,
            requester_id: &request.requester_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            total_price,
            attendee_count: request.attendee_count,
            payment_status,
            payment_method: request.payment_method,
            created_at: now,
        },
    )?;

    if request.payment_method == PaymentMethod::Wallet && total_price > Decimal::ZERO {
        wallet::debit(&tx, &request.requester_id, court.venue_id, total_price, Some(booking.id), now)?;
    }

    let open_match = if request.public_match {
        let open_match = matches::insert_open_match(&tx, booking.id, &request.requester_id, request.attendee_count, now)?;
        matches::enroll_participant(&tx, open_match.id, &request.requester_id, now)?;
        Some(open_match)
    } else {
        None
    };

    let mut created_shares = Vec::new();
    if request.split_payment {
        for (idx, quote) in split_shares(total_price, request.attendee_count, settings.service_fee)?
            .into_iter()
            .enumerate()
        {
            created_shares.push(shares::insert_share(
                &tx,
                booking.id,
                idx as i32,
                quote.share_amount,
                quote.service_fee,
                quote.total_owed,
            )?);
        }
    }

    ledger::append_entry(
        &tx,
        court.venue_id,
        Some(booking.id),
        &format!("Court booking #{} ({} {}-{})", booking.id, booking.date, booking.start_time.format("%H:%M"), booking.end_time.format("%H:%M")),
        Decimal::ZERO,
        total_price,
        LedgerCategory::Booking,
        now,
    )?;

    tx.commit()?;

    Ok(CommittedBooking {
        booking,
        shares: created_shares,
        open_match,
    })
}

fn validate_request(request: &BookingRequest, settings: &BookingSettings) -> BookingResult<()> {
    SlotInterval::new(request.start_time, request.end_time)?;
    if request.attendee_count < 1 {
        return Err(BookingError::validation("attendee count must be at least 1"));
    }
    if request.requester_id.trim().is_empty() {
        return Err(BookingError::validation("requester is required"));
    }
    if request.payment_method == PaymentMethod::Instant && !settings.allow_instant_payment {
        return Err(BookingError::validation("instant payment is disabled"));
    }
    Ok(())
}

fn initial_payment_status(method: PaymentMethod, total_price: Decimal) -> PaymentStatus {
    if total_price.is_zero() {
        return PaymentStatus::Paid;
    }
    match method {
        PaymentMethod::Provider => PaymentStatus::Pending,
        PaymentMethod::Wallet | PaymentMethod::Instant => PaymentStatus::Paid,
    }
}

pub struct BookingService {
    pub(super) pool: DbPool,
    pub(super) provider: Option<Arc<dyn PaymentProvider>>,
    pub(super) notifications: NotificationHub,
    pub(super) settings: BookingSettings,
}

impl BookingService {
    pub fn new(
        pool: DbPool,
        provider: Option<Arc<dyn PaymentProvider>>,
        notifications: NotificationHub,
        settings: BookingSettings,
    ) -> Self {
        Self {
            pool,
            provider,
            notifications,
            settings,
        }
    }

    pub async fn create_booking(&self, request: BookingRequest) -> BookingResult<BookingOutcome> {
        let committed = {
            let mut conn = self.pool.get()?;
            commit_booking(&mut conn, &request, &self.settings, Utc::now().naive_utc())?
        };
        let booking = &committed.booking;
        info!(
            "Booking {} confirmed: court {} on {} {}-{} for {}",
            booking.id, booking.court_id, booking.date, booking.start_time, booking.end_time, booking.total_price
        );

        let payment = self.initiate_payment(&committed).await;

        self.notifications.dispatch(
            booking.requester_id.clone(),
            Notification::BookingConfirmed {
                booking_id: booking.id,
                court_id: booking.court_id,
                date: booking.date,
                start_time: booking.start_time,
                end_time: booking.end_time,
                total_price: booking.total_price,
            },
        );

        Ok(BookingOutcome { committed, payment })
    }

    pub fn get_booking(&self, booking_id: i64) -> BookingResult<Booking> {
        let conn = self.pool.get()?;
        bookings::find_by_id(&conn, booking_id)?.ok_or(BookingError::BookingNotFound(booking_id))
    }

    pub fn list_shares(&self, booking_id: i64) -> BookingResult<Vec<BookingShare>> {
        let conn = self.pool.get()?;
        bookings::find_by_id(&conn, booking_id)?.ok_or(BookingError::BookingNotFound(booking_id))?;
        Ok(shares::list_by_booking(&conn, booking_id)?)
    }

    /// Read-only availability probe; the authoritative check runs again on commit.
    pub fn is_available(&self, court_id: i64, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> BookingResult<bool> {
        let conn = self.pool.get()?;
        courts::find_by_id(&conn, court_id)?.ok_or(BookingError::CourtNotFound(court_id))?;
        Ok(!has_conflict(&conn, court_id, date, start, end, None)?)
    }

    /// Creates the provider charge for a committed booking. Never fails the booking.
    async fn initiate_payment(&self, committed: &CommittedBooking) -> PaymentInitiation {
        let booking = &committed.booking;
        if booking.payment_method != PaymentMethod::Provider || booking.payment_status != PaymentStatus::Pending {
            return PaymentInitiation::NotRequired;
        }
        let Some(provider) = &self.provider else {
            info!("No payment provider configured, booking {} stays pending", booking.id);
            return PaymentInitiation::NotConfigured;
        };

        let request = self.charge_request(committed);
        match provider.create_charge(&request).await {
            Ok(charge) => {
                if let Err(e) = self.store_payment_id(booking.id, &charge.payment_id) {
                    error!("Failed to store payment id {} for booking {}: {:?}", charge.payment_id, booking.id, e);
                    return PaymentInitiation::Failed {
                        warning: "payment was created but could not be linked to the booking".to_string(),
                    };
                }
                PaymentInitiation::Initiated {
                    payment_id: charge.payment_id,
                    client_secret: charge.client_secret,
                    checkout_url: charge.checkout_url,
                }
            }
            Err(e) => {
                warn!("Charge creation failed for booking {}, payment stays pending: {}", booking.id, e);
                PaymentInitiation::Failed {
                    warning: e.to_string(),
                }
            }
        }
    }

    /// The requester pays their own share when the booking is split.
    fn charge_request(&self, committed: &CommittedBooking) -> ChargeRequest {
        let booking = &committed.booking;
        let mut metadata = BTreeMap::from([
            ("booking_id".to_string(), booking.id.to_string()),
            ("court_id".to_string(), booking.court_id.to_string()),
            ("venue_id".to_string(), booking.venue_id.to_string()),
            ("requester_id".to_string(), booking.requester_id.clone()),
        ]);

        let amount = match committed.shares.first() {
            Some(share) => {
                metadata.insert("share_index".to_string(), share.share_index.to_string());
                share.total_owed
            }
            None => booking.total_price,
        };

        ChargeRequest {
            amount,
            currency: self.settings.currency.clone(),
            metadata,
        }
    }

    fn store_payment_id(&self, booking_id: i64, payment_id: &str) -> BookingResult<()> {
        let conn = self.pool.get()?;
        bookings::set_provider_payment_id(&conn, booking_id, payment_id)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::{self, setup, BookingStatus};
    use crate::payments::{Charge, ProviderError, Refund};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Records every call; charges fail while `fail_charges` is set.
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub fail_charges: bool,
        charges: Mutex<Vec<ChargeRequest>>,
        refunds: Mutex<Vec<(String, Decimal)>>,
    }

    impl FakeProvider {
        pub fn failing() -> Self {
            Self {
                fail_charges: true,
                ..Self::default()
            }
        }

        pub fn charges(&self) -> Vec<ChargeRequest> {
            self.charges.lock().unwrap().clone()
        }

        pub fn refunds(&self) -> Vec<(String, Decimal)> {
            self.refunds.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        async fn create_charge(&self, request: &ChargeRequest) -> Result<Charge, ProviderError> {
            if self.fail_charges {
                return Err(ProviderError::Rejected {
                    status: 503,
                    message: "provider unavailable".to_string(),
                });
            }
            let mut charges = self.charges.lock().unwrap();
            charges.push(request.clone());
            let id = format!("pi_{}", charges.len());
            Ok(Charge {
                client_secret: Some(format!("{}_secret", id)),
                payment_id: id,
                checkout_url: None,
            })
        }

        async fn create_refund(&self, payment_id: &str, amount: Decimal) -> Result<Refund, ProviderError> {
            let mut refunds = self.refunds.lock().unwrap();
            refunds.push((payment_id.to_string(), amount));
            Ok(Refund {
                refund_id: format!("re_{}", refunds.len()),
            })
        }
    }

    /// Pool with one venue and one outdoor court at 25.00/h for four players.
    pub(crate) fn harness() -> (DbPool, i64, i64) {
        let pool = database::create_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        setup::initialize_database(&conn).unwrap();
        let venue = courts::insert_venue(&conn, "Padel Club", "Warsaw").unwrap();
        let court = courts::insert_court(&conn, venue.id, "Court 1", dec!(25.00), 4, true).unwrap();
        drop(conn);
        (pool, court.id, venue.id)
    }

    pub(crate) fn request(court_id: i64, start: (u32, u32), end: (u32, u32)) -> BookingRequest {
        BookingRequest {
            court_id,
            requester_id: "alice".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            attendee_count: 2,
            split_payment: false,
            public_match: false,
            payment_method: PaymentMethod::Provider,
        }
    }

    fn service(pool: DbPool, provider: Option<Arc<dyn PaymentProvider>>) -> BookingService {
        BookingService::new(pool, provider, NotificationHub::new(), BookingSettings::default())
    }

    #[tokio::test]
    async fn test_booking_without_provider_stays_pending() {
        let (pool, court_id, _) = harness();
        let service = service(pool.clone(), None);

        let outcome = service.create_booking(request(court_id, (10, 0), (11, 30))).await.unwrap();
        let booking = &outcome.committed.booking;

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.total_price, dec!(37.50));
        assert_eq!(outcome.payment, PaymentInitiation::NotConfigured);

        let conn = pool.get().unwrap();
        let entries = ledger::list_by_booking(&conn, booking.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].credit, dec!(37.50));
        assert_eq!(entries[0].category, LedgerCategory::Booking);
    }

    #[tokio::test]
    async fn test_overlapping_slot_is_rejected_and_adjacent_slot_accepted() {
        let (pool, court_id, _) = harness();
        let service = service(pool, None);

        service.create_booking(request(court_id, (10, 0), (11, 0))).await.unwrap();

        let overlapping = service.create_booking(request(court_id, (10, 30), (11, 30))).await;
        assert!(matches!(overlapping, Err(BookingError::Conflict)));

        let adjacent = service.create_booking(request(court_id, (11, 0), (12, 0))).await;
        assert!(adjacent.is_ok());
    }

    #[tokio::test]
    async fn test_split_booking_creates_shares_and_charges_requester_share() {
        let (pool, court_id, _) = harness();
        let provider = Arc::new(FakeProvider::default());
        let service = service(pool, Some(provider.clone()));

        let mut req = request(court_id, (10, 0), (11, 0));
        req.attendee_count = 4;
        req.split_payment = true;
        let outcome = service.create_booking(req).await.unwrap();

        let shares = &outcome.committed.shares;
        assert_eq!(shares.len(), 4);
        assert!(shares.iter().all(|s| s.total_owed == dec!(6.50)));
        assert_eq!(shares.iter().map(|s| s.total_owed).sum::<Decimal>(), dec!(26.00));

        let charges = provider.charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].amount, dec!(6.50));
        assert_eq!(charges[0].metadata.get("share_index").map(String::as_str), Some("0"));

        assert!(matches!(outcome.payment, PaymentInitiation::Initiated { ref payment_id, .. } if payment_id == "pi_1"));
        let stored = service.get_booking(outcome.committed.booking.id).unwrap();
        assert_eq!(stored.provider_payment_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_confirmed_pending_booking() {
        let (pool, court_id, _) = harness();
        let service = service(pool, Some(Arc::new(FakeProvider::failing())));

        let outcome = service.create_booking(request(court_id, (18, 0), (19, 0))).await.unwrap();

        assert!(matches!(outcome.payment, PaymentInitiation::Failed { .. }));
        let stored = service.get_booking(outcome.committed.booking.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(stored.provider_payment_id, None);
    }

    #[tokio::test]
    async fn test_wallet_booking_without_funds_writes_nothing() {
        let (pool, court_id, _) = harness();
        let service = service(pool.clone(), None);

        let mut req = request(court_id, (10, 0), (11, 0));
        req.payment_method = PaymentMethod::Wallet;
        let result = service.create_booking(req).await;

        assert!(matches!(result, Err(BookingError::InsufficientFunds { .. })));
        let conn = pool.get().unwrap();
        let date = NaiveDate::from_ymd_opt(2030, 6, 1).unwrap();
        assert!(bookings::list_active_for_court_date(&conn, court_id, date).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallet_booking_is_paid_immediately() {
        let (pool, court_id, venue_id) = harness();
        crate::services::wallet::WalletService::new(pool.clone())
            .top_up("alice", venue_id, dec!(30.00))
            .unwrap();
        let service = service(pool.clone(), None);

        let mut req = request(court_id, (10, 0), (11, 0));
        req.payment_method = PaymentMethod::Wallet;
        let outcome = service.create_booking(req).await.unwrap();

        assert_eq!(outcome.committed.booking.payment_status, PaymentStatus::Paid);
        assert_eq!(outcome.payment, PaymentInitiation::NotRequired);
        let conn = pool.get().unwrap();
        let wallet = crate::database::wallets::find_wallet(&conn, "alice", venue_id).unwrap().unwrap();
        assert_eq!(wallet.balance, dec!(5.00));
    }

    #[tokio::test]
    async fn test_public_match_enrolls_requester() {
        let (pool, court_id, _) = harness();
        let service = service(pool.clone(), None);

        let mut req = request(court_id, (10, 0), (11, 0));
        req.public_match = true;
        let outcome = service.create_booking(req).await.unwrap();

        let open_match = outcome.committed.open_match.unwrap();
        let conn = pool.get().unwrap();
        assert_eq!(matches::list_confirmed_participants(&conn, open_match.id).unwrap(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (pool, court_id, _) = harness();
        let service = service(pool.clone(), None);

        let mut too_many = request(court_id, (10, 0), (11, 0));
        too_many.attendee_count = 5;
        assert!(matches!(service.create_booking(too_many).await, Err(BookingError::Validation(_))));

        let mut nobody = request(court_id, (10, 0), (11, 0));
        nobody.attendee_count = 0;
        assert!(matches!(service.create_booking(nobody).await, Err(BookingError::Validation(_))));

        let backwards = request(court_id, (11, 0), (10, 0));
        assert!(matches!(service.create_booking(backwards).await, Err(BookingError::Validation(_))));

        let mut instant = request(court_id, (10, 0), (11, 0));
        instant.payment_method = PaymentMethod::Instant;
        assert!(matches!(service.create_booking(instant).await, Err(BookingError::Validation(_))));

        let missing = request(999, (10, 0), (11, 0));
        assert!(matches!(service.create_booking(missing).await, Err(BookingError::CourtNotFound(999))));

        {
            let conn = pool.get().unwrap();
            courts::update_status(&conn, court_id, CourtStatus::Maintenance).unwrap();
        }
        let closed = request(court_id, (10, 0), (11, 0));
        assert!(matches!(service.create_booking(closed).await, Err(BookingError::Validation(_))));
    }
}
