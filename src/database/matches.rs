use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use super::models::{MatchResult, OpenMatch, SetScore};

pub fn insert_open_match(
    conn: &Connection,
    booking_id: i64,
    host_id: &str,
    max_players: i32,
    created_at: NaiveDateTime,
) -> Result<OpenMatch> {
    let sql = "INSERT INTO open_matches (booking_id, host_id, max_players, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id, booking_id, host_id, max_players, status, created_at";

    conn.query_row(
        sql,
        params![booking_id, host_id, max_players, created_at],
        parse_open_match_row,
    )
    .context("Failed to insert open match")
}

fn parse_open_match_row(row: &rusqlite::Row) -> rusqlite::Result<OpenMatch> {
    Ok(OpenMatch {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        host_id: row.get(2)?,
        max_players: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn find_open_match_by_booking(conn: &Connection, booking_id: i64) -> Result<Option<OpenMatch>> {
    let sql = "SELECT id, booking_id, host_id, max_players, status, created_at FROM open_matches WHERE booking_id = ?1";

    conn.query_row(sql, params![booking_id], parse_open_match_row)
        .optional()
        .context("Failed to query open match by booking")
}

pub fn enroll_participant(
    conn: &Connection,
    open_match_id: i64,
    user_id: &str,
    joined_at: NaiveDateTime,
) -> Result<()> {
    conn.execute(
        "INSERT INTO match_participants (open_match_id, user_id, status, joined_at) VALUES (?1, ?2, 'confirmed', ?3)",
        params![open_match_id, user_id, joined_at],
    )
    .context("Failed to enroll match participant")
    .map(|_| ())
}

pub fn list_confirmed_participants(conn: &Connection, open_match_id: i64) -> Result<Vec<String>> {
    let sql = "SELECT user_id FROM match_participants WHERE open_match_id = ?1 AND status = 'confirmed' ORDER BY joined_at";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![open_match_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(rows)
}

/// One result per booking; a resubmission overwrites the previous one.
pub fn upsert_result(conn: &Connection, result: &MatchResult) -> Result<MatchResult> {
    let sql = "INSERT INTO match_results (booking_id, team1_players, team2_players, sets, winner, submitted_by, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT (booking_id) DO UPDATE SET team1_players = excluded.team1_players, team2_players = excluded.team2_players, sets = excluded.sets, winner = excluded.winner, submitted_by = excluded.submitted_by, updated_at = excluded.updated_at";

    conn.execute(
        sql,
        params![
            result.booking_id,
            serde_json::to_string(&result.team1)?,
            serde_json::to_string(&result.team2)?,
            serde_json::to_string(&result.sets)?,
            result.winner,
            result.submitted_by,
            result.updated_at
        ],
    )
    .context("Failed to upsert match result")?;

    find_result(conn, result.booking_id)?.context("Upserted match result disappeared")
}

pub fn find_result(conn: &Connection, booking_id: i64) -> Result<Option<MatchResult>> {
    let sql = "SELECT booking_id, team1_players, team2_players, sets, winner, submitted_by, updated_at FROM match_results WHERE booking_id = ?1";

    let raw = conn
        .query_row(sql, params![booking_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i32>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, NaiveDateTime>(6)?,
            ))
        })
        .optional()
        .context("Failed to query match result")?;

    let Some((booking_id, team1, team2, sets, winner, submitted_by, updated_at)) = raw else {
        return Ok(None);
    };

    Ok(Some(MatchResult {
        booking_id,
        team1: serde_json::from_str(&team1).context("Malformed team1 roster")?,
        team2: serde_json::from_str(&team2).context("Malformed team2 roster")?,
        sets: serde_json::from_str::<Vec<SetScore>>(&sets).context("Malformed set scores")?,
        winner,
        submitted_by,
        updated_at,
    }))
}
