use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::models::{Court, CourtStatus, Venue};
use super::money::{from_cents, to_cents};

pub fn insert_venue(conn: &Connection, name: &str, city: &str) -> Result<Venue> {
    let sql = "INSERT INTO venues (name, city) VALUES (?1, ?2) RETURNING id, name, city";

    conn.query_row(sql, params![name, city], parse_venue_row)
        .context("Failed to insert venue")
}

fn parse_venue_row(row: &rusqlite::Row) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
    })
}

pub fn find_venue(conn: &Connection, id: i64) -> Result<Option<Venue>> {
    let sql = "SELECT id, name, city FROM venues WHERE id = ?1";

    conn.query_row(sql, params![id], parse_venue_row)
        .optional()
        .context("Failed to query venue by id")
}

pub fn insert_court(
    conn: &Connection,
    venue_id: i64,
    name: &str,
    hourly_rate: Decimal,
    capacity: i32,
    outdoor: bool,
) -> Result<Court> {
    let sql = "INSERT INTO courts (venue_id, name, hourly_rate_cents, capacity, outdoor) VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id, venue_id, name, hourly_rate_cents, capacity, status, outdoor";

    conn.query_row(
        sql,
        params![venue_id, name, to_cents(hourly_rate)?, capacity, outdoor],
        parse_court_row,
    )
    .context("Failed to insert court")
}

fn parse_court_row(row: &rusqlite::Row) -> rusqlite::Result<Court> {
    Ok(Court {
        id: row.get(0)?,
        venue_id: row.get(1)?,
        name: row.get(2)?,
        hourly_rate: from_cents(row.get(3)?),
        capacity: row.get(4)?,
        status: row.get(5)?,
        outdoor: row.get(6)?,
    })
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Court>> {
    let sql = "SELECT id, venue_id, name, hourly_rate_cents, capacity, status, outdoor FROM courts WHERE id = ?1";

    conn.query_row(sql, params![id], parse_court_row)
        .optional()
        .context("Failed to query court by id")
}

pub fn update_status(conn: &Connection, id: i64, status: CourtStatus) -> Result<()> {
    conn.execute("UPDATE courts SET status = ?1 WHERE id = ?2", params![status, id])
        .context("Failed to update court status")
        .map(|_| ())
}
