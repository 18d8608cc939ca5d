pub mod openweather;
pub mod provider;

pub use openweather::OpenWeatherClient;
pub use provider::{Forecast, ForecastProvider};
