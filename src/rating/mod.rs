pub mod elo;
pub mod types;
pub mod weighting;

pub use elo::update_ratings;
pub use types::{ConfidenceLevel, PlayerRating, RatingUpdate};
