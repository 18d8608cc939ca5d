use chrono::{NaiveDateTime, Utc};
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;

use crate::database::money::to_cents;
use crate::database::{bookings, wallets, DbPool};
use crate::database::{Booking, PaymentMethod, PaymentStatus, Wallet, WalletTransaction, WalletTransactionKind};
use crate::errors::{BookingError, BookingResult};

/// Adds `amount` to the wallet, creating it at zero first if needed.
///
/// Runs on the caller's connection so it can join an enclosing transaction.
pub fn credit(
    conn: &Connection,
    user_id: &str,
    venue_id: i64,
    amount: Decimal,
    kind: WalletTransactionKind,
    booking_id: Option<i64>,
    now: NaiveDateTime,
) -> BookingResult<Wallet> {
    ensure_positive(amount)?;
    let wallet = wallets::add_to_balance(conn, user_id, venue_id, amount, now)?;
    wallets::insert_transaction(conn, user_id, venue_id, kind, amount, booking_id, now)?;
    Ok(wallet)
}

/// Subtracts `amount`, failing without any write when the balance does not cover it.
pub fn debit(
    conn: &Connection,
    user_id: &str,
    venue_id: i64,
    amount: Decimal,
    booking_id: Option<i64>,
    now: NaiveDateTime,
) -> BookingResult<Wallet> {
    ensure_positive(amount)?;

    let available = wallets::find_wallet(conn, user_id, venue_id)?
        .map(|w| w.balance)
        .unwrap_or(Decimal::ZERO);
    if amount > available {
        return Err(BookingError::InsufficientFunds {
            requested: amount,
            available,
        });
    }

    let wallet = wallets::subtract_from_balance(conn, user_id, venue_id, amount, now)?.ok_or(
        BookingError::InsufficientFunds {
            requested: amount,
            available,
        },
    )?;
    wallets::insert_transaction(
        conn,
        user_id,
        venue_id,
        WalletTransactionKind::Debit,
        amount,
        booking_id,
        now,
    )?;
    Ok(wallet)
}

/// Rejects amounts that are not at least one cent once rounded, or that overflow storage.
fn ensure_positive(amount: Decimal) -> BookingResult<()> {
    match to_cents(amount) {
        Ok(cents) if cents > 0 => Ok(()),
        Ok(_) => Err(BookingError::validation("amount must be at least 0.01")),
        Err(_) => Err(BookingError::validation(format!("amount {} is out of range", amount))),
    }
}

pub struct WalletService {
    pool: DbPool,
}

impl WalletService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn top_up(&self, user_id: &str, venue_id: i64, amount: Decimal) -> BookingResult<Wallet> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let wallet = credit(
            &tx,
            user_id,
            venue_id,
            amount,
            WalletTransactionKind::TopUp,
            None,
            Utc::now().naive_utc(),
        )?;
        tx.commit()?;

        info!("Wallet {}@{} topped up by {}", user_id, venue_id, amount);
        Ok(wallet)
    }

    /// Current balance; a wallet never touched reads as zero.
    pub fn balance(&self, user_id: &str, venue_id: i64) -> BookingResult<Decimal> {
        let conn = self.pool.get()?;
        Ok(wallets::find_wallet(&conn, user_id, venue_id)?
            .map(|w| w.balance)
            .unwrap_or(Decimal::ZERO))
    }

    pub fn transactions(&self, user_id: &str, venue_id: i64) -> BookingResult<Vec<WalletTransaction>> {
        let conn = self.pool.get()?;
        Ok(wallets::list_transactions(&conn, user_id, venue_id)?)
    }

    /// Settles a pending booking from the requester's wallet.
    ///
    /// The debit and the `paid` transition commit together or not at all.
    pub fn pay_booking(&self, booking_id: i64, user_id: &str) -> BookingResult<Booking> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let booking = bookings::find_by_id(&tx, booking_id)?.ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.requester_id != user_id {
            return Err(BookingError::validation("only the requester can pay for this booking"));
        }
        if !booking.is_active() {
            return Err(BookingError::validation("booking is cancelled"));
        }
        if !matches!(booking.payment_status, PaymentStatus::Pending | PaymentStatus::Failed) {
            return Err(BookingError::validation(format!(
                "booking payment is already {}",
                booking.payment_status.as_str()
            )));
        }

        let now = Utc::now().naive_utc();
        debit(&tx, user_id, booking.venue_id, booking.total_price, Some(booking.id), now)?;

        if !bookings::transition_payment_status(&tx, booking.id, booking.payment_status, PaymentStatus::Paid)? {
            return Err(BookingError::validation("booking payment changed concurrently"));
        }
        bookings::set_payment_method(&tx, booking.id, PaymentMethod::Wallet)?;

        let paid = bookings::find_by_id(&tx, booking.id)?.ok_or(BookingError::BookingNotFound(booking.id))?;
        tx.commit()?;

        info!("Booking {} paid from wallet of {}", booking.id, user_id);
        Ok(paid)
    }
}
