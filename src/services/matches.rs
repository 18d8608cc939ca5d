use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::config::settings::RatingSettings;
use crate::database::{bookings, matches, ratings, DbPool, MatchResult, SetScore};
use crate::errors::{BookingError, BookingResult};
use crate::rating::weighting::game_totals;
use crate::rating::{update_ratings, PlayerRating, RatingUpdate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub submitted_by: String,
    pub team1: [String; 2],
    pub team2: [String; 2],
    pub sets: Vec<SetScore>,
}

impl ResultSubmission {
    fn validate(&self) -> BookingResult<()> {
        let players: HashSet<&str> = self.team1.iter().chain(self.team2.iter()).map(|p| p.trim()).collect();
        if players.contains("") {
            return Err(BookingError::validation("every team needs two named players"));
        }
        if players.len() != 4 {
            return Err(BookingError::validation("a player cannot appear twice in one match"));
        }
        if self.sets.is_empty() {
            return Err(BookingError::validation("at least one set score is required"));
        }
        Ok(())
    }

    /// 1 or 2 for the team with more games, 0 for a draw.
    fn winner(&self) -> i32 {
        let (team1, team2) = game_totals(&self.sets);
        match team1.cmp(&team2) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => 2,
            std::cmp::Ordering::Equal => 0,
        }
    }
}

pub struct MatchService {
    pool: DbPool,
    settings: RatingSettings,
}

impl MatchService {
    pub fn new(pool: DbPool, settings: RatingSettings) -> Self {
        Self { pool, settings }
    }

    /// Stores the result for a booking and then re-rates its four players.
    ///
    /// The result is committed on its own; a failed rating update is logged
    /// and leaves the stored result in place.
    pub fn submit_result(&self, booking_id: i64, submission: &ResultSubmission) -> BookingResult<MatchResult> {
        submission.validate()?;
        let now = Utc::now().naive_utc();

        let result = {
            let conn = self.pool.get()?;
            let booking = bookings::find_by_id(&conn, booking_id)?.ok_or(BookingError::BookingNotFound(booking_id))?;
            if !booking.is_active() {
                return Err(BookingError::validation(format!("booking {} is cancelled", booking_id)));
            }
            matches::upsert_result(
                &conn,
                &MatchResult {
                    booking_id,
                    team1: submission.team1.clone(),
                    team2: submission.team2.clone(),
                    sets: submission.sets.clone(),
                    winner: submission.winner(),
                    submitted_by: submission.submitted_by.clone(),
                    updated_at: now,
                },
            )?
        };
        info!("Result for booking {} recorded, winner {}", booking_id, result.winner);

        match self.apply_ratings(&result, now) {
            Ok(updates) => {
                for update in updates {
                    info!("Rating {} {:.2} -> {:.2}", update.player_id, update.old_rating, update.new_rating);
                }
            }
            Err(e) => error!("Rating update for booking {} failed: {:?}", booking_id, e),
        }

        Ok(result)
    }

    /// Current rating; players who never played start at the initial rating.
    pub fn player_rating(&self, user_id: &str) -> BookingResult<PlayerRating> {
        let conn = self.pool.get()?;
        Ok(load_rating(&conn, user_id, &self.settings)?)
    }

    fn apply_ratings(&self, result: &MatchResult, now: NaiveDateTime) -> Result<Vec<RatingUpdate>> {
        let mut conn = self.pool.get().context("Failed to get connection for ratings")?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let team1 = [
            load_rating(&tx, &result.team1[0], &self.settings)?,
            load_rating(&tx, &result.team1[1], &self.settings)?,
        ];
        let team2 = [
            load_rating(&tx, &result.team2[0], &self.settings)?,
            load_rating(&tx, &result.team2[1], &self.settings)?,
        ];

        let updates = update_ratings(&team1, &team2, &result.sets, &self.settings);
        for update in &updates {
            ratings::upsert_rating(&tx, &update.player_id, update.new_rating, update.matches_played, now)?;
        }
        tx.commit().context("Failed to commit rating updates")?;

        Ok(updates)
    }
}

fn load_rating(conn: &Connection, user_id: &str, settings: &RatingSettings) -> Result<PlayerRating> {
    let stored = ratings::find_for_player(conn, user_id)?;
    Ok(match stored {
        Some(r) => PlayerRating::new(r.user_id, r.rating, r.matches_played, settings.experience_threshold),
        None => PlayerRating::new(user_id, settings.initial_rating, 0, settings.experience_threshold),
    })
}
