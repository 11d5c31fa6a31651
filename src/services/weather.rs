//! Best-effort forecast lookup for event detail pages.
//!
//! Nothing here can fail a caller: every provider error, timeout or
//! malformed payload collapses to `None` after a `warn!`. Repeated failures
//! trip a circuit breaker so a dead upstream stops costing request latency.

use async_trait::async_trait;
use chrono::{Duration as DateSpan, NaiveDate, Utc};
use failsafe::{
    backoff::{self, Constant},
    failure_policy::{self, ConsecutiveFailures},
    futures::CircuitBreaker,
    Config as BreakerConfig, Error as BreakerError, StateMachine,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::{
    config::WeatherConfig,
    error::{AppError, AppResult},
};

/// Open-Meteo serves daily forecasts up to this many days ahead.
pub const FORECAST_HORIZON_DAYS: i64 = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn forecast(&self, location: &str, date: NaiveDate) -> Option<Forecast>;
}

/// Used when weather is disabled and in tests.
pub struct NoWeather;

#[async_trait]
impl WeatherProvider for NoWeather {
    async fn forecast(&self, _location: &str, _date: NaiveDate) -> Option<Forecast> {
        None
    }
}

const FALLBACK_COORDINATES: (f64, f64) = (57.7210, 12.9401);

const KNOWN_PLACES: &[(&[&str], (f64, f64))] = &[
    (&["stockholm"], (59.3293, 18.0686)),
    (&["göteborg", "gothenburg"], (57.7089, 11.9746)),
    (&["malmö", "malmo"], (55.6050, 13.0038)),
    (&["uppsala"], (59.8586, 17.6389)),
    (&["linköping", "linkoping"], (58.4108, 15.6214)),
    (&["örebro", "orebro"], (59.2741, 15.2066)),
    (&["västerås", "vasteras"], (59.6162, 16.5528)),
    (&["helsingborg"], (56.0465, 12.6945)),
    (&["jönköping", "jonkoping"], (57.7826, 14.1618)),
    (&["norrköping", "norrkoping"], (58.5877, 16.1924)),
    (&["lund"], (55.7047, 13.1910)),
    (&["umeå", "umea"], (63.8258, 20.2630)),
    (&["gävle", "gavle"], (60.6745, 17.1417)),
    (&["borås", "boras"], FALLBACK_COORDINATES),
];

/// First known place name contained in `location`, else Borås.
pub fn coordinates_for(location: &str) -> (f64, f64) {
    let haystack = location.to_lowercase();
    KNOWN_PLACES
        .iter()
        .find(|(names, _)| names.iter().any(|name| haystack.contains(name)))
        .map(|(_, coords)| *coords)
        .unwrap_or(FALLBACK_COORDINATES)
}

/// WMO weather interpretation code to text and icon.
pub fn describe(code: i32) -> (&'static str, &'static str) {
    match code {
        0 => ("Clear sky", "☀️"),
        1 => ("Mainly clear", "🌤️"),
        2 => ("Partly cloudy", "⛅"),
        3 => ("Overcast", "☁️"),
        45 => ("Fog", "🌫️"),
        48 => ("Depositing rime fog", "🌫️"),
        51 => ("Light drizzle", "🌦️"),
        53 => ("Moderate drizzle", "🌦️"),
        55 => ("Dense drizzle", "🌦️"),
        61 => ("Light rain", "🌧️"),
        63 => ("Moderate rain", "🌧️"),
        65 => ("Heavy rain", "🌧️"),
        71 => ("Light snowfall", "🌨️"),
        73 => ("Moderate snowfall", "🌨️"),
        75 => ("Heavy snowfall", "🌨️"),
        77 => ("Snow grains", "🌨️"),
        80 => ("Light rain showers", "🌦️"),
        81 => ("Moderate rain showers", "🌦️"),
        82 => ("Violent rain showers", "🌦️"),
        85 => ("Light snow showers", "🌨️"),
        86 => ("Heavy snow showers", "🌨️"),
        95 => ("Thunderstorm", "⛈️"),
        96 => ("Thunderstorm with light hail", "⛈️"),
        99 => ("Thunderstorm with heavy hail", "⛈️"),
        _ => ("Unknown conditions", "❓"),
    }
}

/// `date` lies in today..=today+16 (UTC).
pub fn within_horizon(date: NaiveDate, today: NaiveDate) -> bool {
    date >= today && date <= today + DateSpan::days(FORECAST_HORIZON_DAYS)
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    relative_humidity_2m_mean: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
}

impl DailySeries {
    fn first_day(&self) -> Option<Forecast> {
        let code = (*self.weather_code.first()?)?;
        let (description, icon) = describe(code);
        Some(Forecast {
            temperature: (*self.temperature_2m_max.first()?)?,
            humidity: (*self.relative_humidity_2m_mean.first()?)?,
            wind_speed: (*self.wind_speed_10m_max.first()?)?,
            description: description.to_string(),
            icon: icon.to_string(),
        })
    }
}

type Breaker = StateMachine<ConsecutiveFailures<Constant>, ()>;

/// Open-Meteo daily forecast client.
#[derive(Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<Breaker>,
}

impl OpenMeteoClient {
    pub fn from_config(config: &WeatherConfig) -> AppResult<Self> {
        let policy = failure_policy::consecutive_failures(
            config.failure_threshold,
            backoff::constant(Duration::from_secs(config.cooldown_secs)),
        );
        let circuit_breaker = BreakerConfig::new().failure_policy(policy).build();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("weather http client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            circuit_breaker: Arc::new(circuit_breaker),
        })
    }

    async fn fetch(&self, latitude: f64, longitude: f64, date: NaiveDate) -> Result<Forecast, AppError> {
        let day = date.format("%Y-%m-%d").to_string();
        let url = format!("{}/v1/forecast", self.base_url);
        debug!("requesting forecast for {:.2},{:.2} on {}", latitude, longitude, day);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("latitude", format!("{latitude:.4}")),
                ("longitude", format!("{longitude:.4}")),
                (
                    "daily",
                    "weather_code,temperature_2m_max,relative_humidity_2m_mean,wind_speed_10m_max"
                        .to_string(),
                ),
                ("timezone", "UTC".to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::DependencyUnavailable(format!("weather request failed: {e}")))?;

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| AppError::DependencyUnavailable(format!("weather payload unreadable: {e}")))?;

        body.daily
            .first_day()
            .ok_or_else(|| AppError::DependencyUnavailable("weather payload incomplete".into()))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn forecast(&self, location: &str, date: NaiveDate) -> Option<Forecast> {
        if !within_horizon(date, Utc::now().date_naive()) {
            return None;
        }
        let (latitude, longitude) = coordinates_for(location);

        match self
            .circuit_breaker
            .call(self.fetch(latitude, longitude, date))
            .await
        {
            Ok(forecast) => Some(forecast),
            Err(BreakerError::Rejected) => {
                warn!("weather circuit open, skipping lookup for '{}'", location);
                None
            }
            Err(BreakerError::Inner(e)) => {
                warn!("weather lookup for '{}' absorbed: {}", location, e);
                None
            }
        }
    }
}
