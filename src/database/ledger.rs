use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use super::models::{LedgerCategory, LedgerEntry};
use super::money::{from_cents, to_cents};

/// Append-only: there is no update or delete counterpart.
#[allow(clippy::too_many_arguments)]
pub fn append_entry(
    conn: &Connection,
    venue_id: i64,
    booking_id: Option<i64>,
    description: &str,
    debit: Decimal,
    credit: Decimal,
    category: LedgerCategory,
    transaction_date: NaiveDateTime,
) -> Result<LedgerEntry> {
    let sql = "INSERT INTO ledger_entries (venue_id, booking_id, description, debit_cents, credit_cents, transaction_date, category) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id, venue_id, booking_id, description, debit_cents, credit_cents, transaction_date, category, status";

    conn.query_row(
        sql,
        params![
            venue_id,
            booking_id,
            description,
            to_cents(debit)?,
            to_cents(credit)?,
            transaction_date,
            category
        ],
        parse_entry_row,
    )
    .context("Failed to append ledger entry")
}

fn parse_entry_row(row: &rusqlite::Row) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        venue_id: row.get(1)?,
        booking_id: row.get(2)?,
        description: row.get(3)?,
        debit: from_cents(row.get(4)?),
        credit: from_cents(row.get(5)?),
        transaction_date: row.get(6)?,
        category: row.get(7)?,
        status: row.get(8)?,
    })
}

pub fn list_by_booking(conn: &Connection, booking_id: i64) -> Result<Vec<LedgerEntry>> {
    let sql = "SELECT id, venue_id, booking_id, description, debit_cents, credit_cents, transaction_date, category, status FROM ledger_entries WHERE booking_id = ?1 ORDER BY id";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![booking_id], parse_entry_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Credits minus debits across every entry for the venue.
pub fn venue_net(conn: &Connection, venue_id: i64) -> Result<Decimal> {
    let cents: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(credit_cents) - SUM(debit_cents), 0) FROM ledger_entries WHERE venue_id = ?1",
            params![venue_id],
            |row| row.get(0),
        )
        .context("Failed to sum venue ledger")?;
    Ok(from_cents(cents))
}
