use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::debug;
use serde_json::Value;

use super::provider::{Forecast, ForecastProvider};
use crate::config::settings::WeatherSettings;
use crate::http::RateLimitedClient;

const RAIN_CONDITIONS: [&str; 3] = ["Rain", "Drizzle", "Thunderstorm"];

/// OpenWeatherMap 5 day / 3 hour forecast client.
pub struct OpenWeatherClient {
    client: RateLimitedClient,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings, api_key: String, user_agent: &str) -> Result<Self> {
        let client = RateLimitedClient::new(user_agent, settings.timeout_secs, settings.rate_limit_ms)?;
        Ok(Self {
            client,
            api_key,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &WeatherSettings, user_agent: &str) -> Result<Option<Self>> {
        match &settings.api_key {
            Some(key) => Ok(Some(Self::new(settings, key.clone(), user_agent)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherClient {
    async fn get_forecast(&self, city: &str, at: NaiveDateTime) -> Result<Forecast> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let query = [("q", city), ("appid", self.api_key.as_str()), ("units", "metric")];
        let response = self.client.get(&url, &query).await?;

        if !response.status().is_success() {
            bail!("Forecast API returned status {} for {}", response.status(), city);
        }

        let body: Value = response.json().await.context("Failed to decode forecast response")?;
        let forecast = nearest_forecast(&body, at)?;
        debug!("Forecast for {} at {}: raining={}", city, at, forecast.is_raining);
        Ok(forecast)
    }
}

/// Picks the 3-hour slot whose timestamp is closest to `at`.
fn nearest_forecast(body: &Value, at: NaiveDateTime) -> Result<Forecast> {
    let target = at.and_utc().timestamp();
    let slot = body
        .get("list")
        .and_then(Value::as_array)
        .context("Forecast response has no list")?
        .iter()
        .filter_map(|entry| entry.get("dt").and_then(Value::as_i64).map(|dt| (dt, entry)))
        .min_by_key(|(dt, _)| (dt - target).abs())
        .map(|(_, entry)| entry)
        .context("Forecast response has no usable slots")?;

    Ok(Forecast {
        is_raining: is_rain(slot),
        raw: slot.clone(),
    })
}

fn is_rain(slot: &Value) -> bool {
    slot.get("weather")
        .and_then(Value::as_array)
        .map(|conditions| {
            conditions
                .iter()
                .filter_map(|c| c.get("main").and_then(Value::as_str))
                .any(|main| RAIN_CONDITIONS.contains(&main))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn slot(hour: u32, main: &str) -> Value {
        json!({ "dt": at(hour).and_utc().timestamp(), "weather": [{ "main": main, "description": main.to_lowercase() }] })
    }

    #[test]
    fn test_nearest_slot_decides() {
        let body = json!({ "list": [slot(9, "Clear"), slot(12, "Rain"), slot(15, "Clouds")] });

        assert!(nearest_forecast(&body, at(11)).unwrap().is_raining);
        assert!(!nearest_forecast(&body, at(10)).unwrap().is_raining);
        assert!(!nearest_forecast(&body, at(16)).unwrap().is_raining);
    }

    #[test]
    fn test_drizzle_and_thunderstorm_count_as_rain() {
        assert!(is_rain(&slot(9, "Drizzle")));
        assert!(is_rain(&slot(9, "Thunderstorm")));
        assert!(!is_rain(&slot(9, "Snow")));
        assert!(!is_rain(&json!({ "dt": 0 })));
    }

    #[test]
    fn test_snapshot_is_the_chosen_slot() {
        let body = json!({ "list": [slot(12, "Rain")] });
        let forecast = nearest_forecast(&body, at(12)).unwrap();
        assert_eq!(forecast.raw, slot(12, "Rain"));
    }

    #[test]
    fn test_empty_forecast_is_an_error() {
        assert!(nearest_forecast(&json!({ "list": [] }), at(12)).is_err());
        assert!(nearest_forecast(&json!({ "cod": "404" }), at(12)).is_err());
    }
}
