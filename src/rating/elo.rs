use log::debug;

use super::types::{ConfidenceLevel, PlayerRating, RatingUpdate, RatingValue};
use super::weighting::{game_totals, margin_multiplier};
use crate::config::settings::RatingSettings;
use crate::database::SetScore;

/// Rates a finished doubles match.
///
/// Teams are compared by their average rating; the outcome is decided by total
/// games won across all sets, with equal totals scored as a draw. Returns one
/// update per player, team 1 first.
pub fn update_ratings(
    team1: &[PlayerRating; 2],
    team2: &[PlayerRating; 2],
    sets: &[SetScore],
    config: &RatingSettings,
) -> Vec<RatingUpdate> {
    let expected1 = expected_score(team_average(team1), team_average(team2), config.expectation_scale);
    let expected2 = 1.0 - expected1;

    let (games1, games2) = game_totals(sets);
    let (actual1, actual2) = actual_scores(games1, games2);
    let margin = margin_multiplier(games1, games2);
    debug!(
        "Rating match {}-{} games: expected {:.3}, actual {}, margin {:.3}",
        games1, games2, expected1, actual1, margin
    );

    team1
        .iter()
        .map(|p| rate_player(p, margin, actual1, expected1, config))
        .chain(team2.iter().map(|p| rate_player(p, margin, actual2, expected2, config)))
        .collect()
}

fn team_average(team: &[PlayerRating; 2]) -> RatingValue {
    (team[0].rating + team[1].rating) / 2.0
}

/// Logistic expectation of `own` against `other` on the 400-point scale.
pub fn expected_score(own: RatingValue, other: RatingValue, scale: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((other - own) * scale / 400.0))
}

fn actual_scores(games1: u32, games2: u32) -> (f64, f64) {
    match games1.cmp(&games2) {
        std::cmp::Ordering::Greater => (1.0, 0.0),
        std::cmp::Ordering::Less => (0.0, 1.0),
        std::cmp::Ordering::Equal => (0.5, 0.5),
    }
}

fn k_factor(player: &PlayerRating, config: &RatingSettings) -> f64 {
    match ConfidenceLevel::from_matches_played(player.matches_played, config.experience_threshold) {
        ConfidenceLevel::Provisional => config.provisional_k_factor,
        ConfidenceLevel::Established => config.established_k_factor,
    }
}

fn rate_player(player: &PlayerRating, margin: f64, actual: f64, expected: f64, config: &RatingSettings) -> RatingUpdate {
    let change = k_factor(player, config) * margin * (actual - expected);
    RatingUpdate {
        player_id: player.player_id.clone(),
        old_rating: player.rating,
        new_rating: round2(player.rating + change),
        matches_played: player.matches_played + 1,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
