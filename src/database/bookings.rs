use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{Booking, NewBookingRow, PaymentMethod, PaymentStatus, RefundStatus, SweepCandidate};
use super::money::{from_cents, to_cents};

const BOOKING_COLUMNS: &str = "b.id, b.court_id, b.venue_id, b.requester_id, b.date, b.start_time, b.end_time, b.total_price_cents, b.attendee_count, b.status, b.payment_status, b.payment_method, b.provider_payment_id, b.cancellation_reason, b.refund_status, b.created_at, b.cancelled_at, b.weather_checked_at, b.weather_snapshot";

pub fn insert_booking(conn: &Connection, row: &NewBookingRow) -> Result<Booking> {
    let sql = "INSERT INTO bookings (court_id, venue_id, requester_id, date, start_time, end_time, total_price_cents, attendee_count, payment_status, payment_method, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING id";

    let total_price_cents = to_cents(row.total_price)?;
    let id: i64 = conn
        .query_row(
            sql,
            params![
                row.court_id,
                row.venue_id,
                row.requester_id,
                row.date,
                row.start_time,
                row.end_time,
                total_price_cents,
                row.attendee_count,
                row.payment_status,
                row.payment_method,
                row.created_at
            ],
            |r| r.get(0),
        )
        .context("Failed to insert booking")?;

    find_by_id(conn, id)?.context("Inserted booking disappeared")
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let snapshot: Option<String> = row.get(18)?;
    Ok(Booking {
        id: row.get(0)?,
        court_id: row.get(1)?,
        venue_id: row.get(2)?,
        requester_id: row.get(3)?,
        date: row.get(4)?,
        start_time: row.get(5)?,
        end_time: row.get(6)?,
        total_price: from_cents(row.get(7)?),
        attendee_count: row.get(8)?,
        status: row.get(9)?,
        payment_status: row.get(10)?,
        payment_method: row.get(11)?,
        provider_payment_id: row.get(12)?,
        cancellation_reason: row.get(13)?,
        refund_status: row.get(14)?,
        created_at: row.get(15)?,
        cancelled_at: row.get(16)?,
        weather_checked_at: row.get(17)?,
        weather_snapshot: snapshot.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1");

    conn.query_row(&sql, params![id], parse_booking_row)
        .optional()
        .context("Failed to query booking by id")
}

pub fn find_by_provider_payment_id(conn: &Connection, payment_id: &str) -> Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.provider_payment_id = ?1");

    conn.query_row(&sql, params![payment_id], parse_booking_row)
        .optional()
        .context("Failed to query booking by provider payment id")
}

/// Bookings still holding a slot on the given court and date.
pub fn list_active_for_court_date(
    conn: &Connection,
    court_id: i64,
    date: NaiveDate,
) -> Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.court_id = ?1 AND b.date = ?2 AND b.cancelled_at IS NULL ORDER BY b.start_time"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![court_id, date], parse_booking_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Confirmed, unchecked bookings on outdoor courts dated within `[from, to]`.
pub fn list_unchecked_outdoor(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SweepCandidate>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS}, v.city FROM bookings b
         JOIN courts c ON c.id = b.court_id
         JOIN venues v ON v.id = b.venue_id
         WHERE b.status = 'confirmed'
           AND b.cancelled_at IS NULL
           AND b.weather_checked_at IS NULL
           AND c.outdoor = 1
           AND b.date BETWEEN ?1 AND ?2
         ORDER BY b.date, b.start_time"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![from, to], |row| {
            Ok(SweepCandidate {
                booking: parse_booking_row(row)?,
                city: row.get(19)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn set_provider_payment_id(conn: &Connection, booking_id: i64, payment_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE bookings SET provider_payment_id = ?1 WHERE id = ?2",
        params![payment_id, booking_id],
    )
    .context("Failed to store provider payment id")
    .map(|_| ())
}

pub fn set_payment_method(conn: &Connection, booking_id: i64, method: PaymentMethod) -> Result<()> {
    conn.execute(
        "UPDATE bookings SET payment_method = ?1 WHERE id = ?2",
        params![method, booking_id],
    )
    .context("Failed to update payment method")
    .map(|_| ())
}

/// Compare-and-set on the payment status. Returns whether the row moved.
pub fn transition_payment_status(
    conn: &Connection,
    booking_id: i64,
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE bookings SET payment_status = ?1 WHERE id = ?2 AND payment_status = ?3",
            params![to, booking_id, from],
        )
        .context("Failed to transition payment status")?;
    Ok(changed == 1)
}

/// Stamps the cancellation. Returns false when the booking was already cancelled.
pub fn mark_cancelled(
    conn: &Connection,
    booking_id: i64,
    reason: &str,
    cancelled_at: NaiveDateTime,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE bookings SET status = 'cancelled', cancellation_reason = ?1, cancelled_at = ?2 WHERE id = ?3 AND cancelled_at IS NULL",
            params![reason, cancelled_at, booking_id],
        )
        .context("Failed to cancel booking")?;
    Ok(changed == 1)
}

pub fn set_refund_status(conn: &Connection, booking_id: i64, status: RefundStatus) -> Result<()> {
    conn.execute(
        "UPDATE bookings SET refund_status = ?1 WHERE id = ?2",
        params![status, booking_id],
    )
    .context("Failed to update refund status")
    .map(|_| ())
}

/// Records the forecast check. Returns false when another sweep got there first.
pub fn mark_weather_checked(
    conn: &Connection,
    booking_id: i64,
    checked_at: NaiveDateTime,
    snapshot: &serde_json::Value,
) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE bookings SET weather_checked_at = ?1, weather_snapshot = ?2 WHERE id = ?3 AND weather_checked_at IS NULL",
            params![checked_at, snapshot.to_string(), booking_id],
        )
        .context("Failed to mark booking weather checked")?;
    Ok(changed == 1)
}
