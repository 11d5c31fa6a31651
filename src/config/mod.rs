use serde::Deserialize;
use std::{env, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

// Top-level container for every settings section
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub weather: WeatherConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub storage: StorageBackend,
    /// Only required for the Postgres backend.
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_ms: u64,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

// Startup bootstrap: admin account and optional sample events
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_display_name: String,
    pub sample_events: bool,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.open-meteo.com".to_string(),
            timeout_ms: 3000,
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_email: "admin@townsquare.local".to_string(),
            admin_display_name: "Admin User".to_string(),
            sample_events: false,
        }
    }
}

fn var_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = var_or(name, default);
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var: name, value: raw })
}

fn parse_choice<T>(name: &'static str, default: &str, choices: &[(&str, T)]) -> Result<T, ConfigError>
where
    T: Copy,
{
    let raw = var_or(name, default);
    choices
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(raw.trim()))
        .map(|(_, value)| *value)
        .ok_or(ConfigError::Invalid { var: name, value: raw })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = parse_choice(
            "STORAGE",
            "postgres",
            &[("postgres", StorageBackend::Postgres), ("memory", StorageBackend::Memory)],
        )?;
        let url = env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty());
        if storage == StorageBackend::Postgres && url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let weather_defaults = WeatherConfig::default();
        let seed_defaults = SeedConfig::default();

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "townsquare=debug,tower_http=debug"),
                log_format: parse_choice(
                    "LOG_FORMAT",
                    "pretty",
                    &[("pretty", LogFormat::Pretty), ("json", LogFormat::Json)],
                )?,
            },
            database: DatabaseConfig {
                storage,
                url,
                pool_size: parse_var("DB_POOL_SIZE", "20")?,
                acquire_timeout_secs: parse_var("DB_ACQUIRE_TIMEOUT_SECS", "5")?,
            },
            weather: WeatherConfig {
                enabled: parse_var("WEATHER_ENABLED", "true")?,
                base_url: var_or("WEATHER_BASE_URL", &weather_defaults.base_url),
                timeout_ms: parse_var("WEATHER_TIMEOUT_MS", "3000")?,
                failure_threshold: parse_var("WEATHER_FAILURE_THRESHOLD", "3")?,
                cooldown_secs: parse_var("WEATHER_COOLDOWN_SECS", "60")?,
            },
            seed: SeedConfig {
                admin_email: var_or("ADMIN_EMAIL", &seed_defaults.admin_email),
                admin_display_name: var_or("ADMIN_DISPLAY_NAME", &seed_defaults.admin_display_name),
                sample_events: parse_var("SEED_SAMPLE_EVENTS", "false")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_number_names_the_variable() {
        // Read a variable no other test touches.
        env::set_var("TOWNSQUARE_TEST_PORT", "eighty");
        let err = parse_var::<u16>("TOWNSQUARE_TEST_PORT", "8000").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "TOWNSQUARE_TEST_PORT",
                value: "eighty".into()
            }
        );
        env::remove_var("TOWNSQUARE_TEST_PORT");
    }

    #[test]
    fn defaults_apply_when_unset() {
        let threshold: u32 = parse_var("TOWNSQUARE_TEST_UNSET_THRESHOLD", "3").unwrap();
        assert_eq!(threshold, 3);
    }

    #[test]
    fn choices_are_case_insensitive() {
        env::set_var("TOWNSQUARE_TEST_FORMAT", "JSON");
        let format = parse_choice(
            "TOWNSQUARE_TEST_FORMAT",
            "pretty",
            &[("pretty", LogFormat::Pretty), ("json", LogFormat::Json)],
        )
        .unwrap();
        assert_eq!(format, LogFormat::Json);
        env::remove_var("TOWNSQUARE_TEST_FORMAT");
    }
}
