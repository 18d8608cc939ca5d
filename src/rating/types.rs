use serde::Serialize;

pub type PlayerId = String;
pub type RatingValue = f64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRating {
    pub player_id: PlayerId,
    pub rating: RatingValue,
    pub matches_played: i32,
    pub confidence_level: ConfidenceLevel,
}

impl PlayerRating {
    pub fn new(player_id: impl Into<PlayerId>, rating: RatingValue, matches_played: i32, experience_threshold: i32) -> Self {
        Self {
            player_id: player_id.into(),
            rating,
            matches_played,
            confidence_level: ConfidenceLevel::from_matches_played(matches_played, experience_threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Provisional, // below the experience threshold, rated with the larger K
    Established,
}

impl ConfidenceLevel {
    pub fn from_matches_played(matches: i32, threshold: i32) -> Self {
        if matches < threshold {
            ConfidenceLevel::Provisional
        } else {
            ConfidenceLevel::Established
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConfidenceLevel::Provisional => "provisional",
            ConfidenceLevel::Established => "established",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingUpdate {
    pub player_id: PlayerId,
    pub old_rating: RatingValue,
    pub new_rating: RatingValue,
    pub matches_played: i32,
}

impl RatingUpdate {
    pub fn change(&self) -> RatingValue {
        self.new_rating - self.old_rating
    }
}
