use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use super::models::BookingShare;
use super::money::{from_cents, to_cents};

pub fn insert_share(
    conn: &Connection,
    booking_id: i64,
    share_index: i32,
    share_amount: Decimal,
    service_fee: Decimal,
    total_owed: Decimal,
) -> Result<BookingShare> {
    let sql = "INSERT INTO booking_shares (booking_id, share_index, share_amount_cents, service_fee_cents, total_owed_cents) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id, booking_id, share_index, share_amount_cents, service_fee_cents, total_owed_cents";

    conn.query_row(
        sql,
        params![
            booking_id,
            share_index,
            to_cents(share_amount)?,
            to_cents(service_fee)?,
            to_cents(total_owed)?
        ],
        parse_share_row,
    )
    .context("Failed to insert booking share")
}

fn parse_share_row(row: &rusqlite::Row) -> rusqlite::Result<BookingShare> {
    Ok(BookingShare {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        share_index: row.get(2)?,
        share_amount: from_cents(row.get(3)?),
        service_fee: from_cents(row.get(4)?),
        total_owed: from_cents(row.get(5)?),
    })
}

pub fn list_by_booking(conn: &Connection, booking_id: i64) -> Result<Vec<BookingShare>> {
    let sql = "SELECT id, booking_id, share_index, share_amount_cents, service_fee_cents, total_owed_cents FROM booking_shares WHERE booking_id = ?1 ORDER BY share_index";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![booking_id], parse_share_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}
