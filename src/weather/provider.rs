use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub is_raining: bool,
    /// Provider payload the decision was made on, stored with the booking.
    pub raw: Value,
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Forecast for `city` closest to `at` (UTC).
    async fn get_forecast(&self, city: &str, at: NaiveDateTime) -> Result<Forecast>;
}
