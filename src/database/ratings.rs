use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use super::models::DbPlayerRating;

pub fn upsert_rating(
    conn: &Connection,
    user_id: &str,
    rating: f64,
    matches_played: i32,
    updated_at: NaiveDateTime,
) -> Result<DbPlayerRating> {
    let sql = "INSERT INTO player_ratings (user_id, rating, matches_played, updated_at) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT (user_id) DO UPDATE SET rating = excluded.rating, matches_played = MAX(matches_played, excluded.matches_played), updated_at = excluded.updated_at
               RETURNING user_id, rating, matches_played, updated_at";

    conn.query_row(
        sql,
        params![user_id, rating, matches_played, updated_at],
        parse_db_rating_row,
    )
    .context("Failed to upsert rating")
}

fn parse_db_rating_row(row: &rusqlite::Row) -> rusqlite::Result<DbPlayerRating> {
    Ok(DbPlayerRating {
        user_id: row.get(0)?,
        rating: row.get(1)?,
        matches_played: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub fn find_for_player(conn: &Connection, user_id: &str) -> Result<Option<DbPlayerRating>> {
    let sql = "SELECT user_id, rating, matches_played, updated_at FROM player_ratings WHERE user_id = ?1";

    conn.query_row(sql, params![user_id], parse_db_rating_row)
        .optional()
        .context("Failed to get rating for player")
}
