use crate::database::SetScore;

/// Games won by each team over all sets. Missing scores count as zero.
pub fn game_totals(sets: &[SetScore]) -> (u32, u32) {
    sets.iter().fold((0, 0), |(team1, team2), set| {
        (team1 + set.team1.unwrap_or(0), team2 + set.team2.unwrap_or(0))
    })
}

/// Scales a rating change by how decisive the win was: `1 + |diff| / total`.
///
/// Stays in `[1.0, 2.0)` for any score with games on both sides and is exactly
/// 1.0 when no games were recorded.
pub fn margin_multiplier(team1_games: u32, team2_games: u32) -> f64 {
    let total = team1_games + team2_games;
    if total == 0 {
        return 1.0;
    }
    let diff = team1_games.abs_diff(team2_games);
    1.0 + diff as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(team1: u32, team2: u32) -> SetScore {
        SetScore {
            team1: Some(team1),
            team2: Some(team2),
        }
    }

    #[test]
    fn test_game_totals_treat_missing_scores_as_zero() {
        let sets = vec![set(6, 4), SetScore { team1: Some(3), team2: None }];
        assert_eq!(game_totals(&sets), (9, 4));
        assert_eq!(game_totals(&[]), (0, 0));
    }

    #[test]
    fn test_margin_multiplier_bounds() {
        assert_eq!(margin_multiplier(0, 0), 1.0);
        assert_eq!(margin_multiplier(6, 6), 1.0);
        assert!((margin_multiplier(7, 6) - (1.0 + 1.0 / 13.0)).abs() < 1e-12);
        assert!(margin_multiplier(12, 1) < 2.0);
        assert!(margin_multiplier(12, 0) > margin_multiplier(7, 6));
    }
}
