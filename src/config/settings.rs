use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub service_fee: Decimal,
    pub currency: String,
    /// Marks bookings paid at creation without any money movement.
    pub allow_instant_payment: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            service_fee: Decimal::new(25, 2),
            currency: "eur".to_string(),
            allow_instant_payment: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatingSettings {
    pub initial_rating: f64,
    pub expectation_scale: f64,
    pub provisional_k_factor: f64,
    pub established_k_factor: f64,
    pub experience_threshold: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            initial_rating: 1500.0,
            expectation_scale: 1.0,
            provisional_k_factor: 40.0,
            established_k_factor: 20.0,
            experience_threshold: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub horizon_hours: i64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self { horizon_hours: 24 }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://api.stripe.com".to_string(),
            rate_limit_ms: 50,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://api.openweathermap.org".to_string(),
            rate_limit_ms: 1000, // free tier allows 60 req/min
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub database_path: String,
    pub cron_secret: Option<String>,
    pub user_agent: &'static str,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            database_path: "court_booking.db".to_string(),
            cron_secret: None,
            user_agent: "CourtBooking/1.0",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub booking: BookingSettings,
    pub rating: RatingSettings,
    pub sweep: SweepSettings,
    pub payment: PaymentSettings,
    pub weather: WeatherSettings,
    pub server: ServerSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by whatever is present in the environment.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(path) = env::var("DATABASE_PATH") {
            config.server.database_path = path;
        }
        config.server.cron_secret = non_empty_var("CRON_SECRET");

        if let Some(fee) = parsed_var::<Decimal>("SERVICE_FEE") {
            config.booking.service_fee = fee;
        }
        if let Some(currency) = non_empty_var("CURRENCY") {
            config.booking.currency = currency.to_lowercase();
        }
        if let Some(allow) = parsed_var::<bool>("ALLOW_INSTANT_PAYMENT") {
            config.booking.allow_instant_payment = allow;
        }

        config.payment.api_key = non_empty_var("PAYMENT_API_KEY");
        if let Some(url) = non_empty_var("PAYMENT_API_BASE_URL") {
            config.payment.api_base_url = url;
        }

        config.weather.api_key = non_empty_var("WEATHER_API_KEY");
        if let Some(url) = non_empty_var("WEATHER_API_BASE_URL") {
            config.weather.api_base_url = url;
        }

        if let Some(hours) = parsed_var::<i64>("SWEEP_HORIZON_HOURS") {
            config.sweep.horizon_hours = hours;
        }

        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparsable value for {}: {}", key, raw);
            None
        }
    }
}
