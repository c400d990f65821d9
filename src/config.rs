use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_FEED_URL: &str = "https://gtfsrt.prod.obanyc.com/vehiclePositions";
const DEFAULT_TRAFFIC_URL: &str =
    "https://api.tomtom.com/traffic/services/4/flowSegmentData/absolute/10/json";
const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Runtime configuration, read once from the environment at startup.
/// Missing required keys abort before the first cycle.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub feed_api_key: String,
    pub traffic_url: String,
    pub traffic_api_key: String,
    pub weather_url: String,
    pub weather_api_key: String,
    pub model_path: String,
    pub meta_path: String,
    pub cycle_interval: Duration,
    pub fetch_timeout: Duration,
    pub max_vehicles: usize,
    pub stale_after_cycles: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            feed_url: env_or("FEED_URL", DEFAULT_FEED_URL),
            feed_api_key: required("MTA_API_KEY")?,
            traffic_url: env_or("TRAFFIC_URL", DEFAULT_TRAFFIC_URL),
            traffic_api_key: required("TOMTOM_API_KEY")?,
            weather_url: env_or("WEATHER_URL", DEFAULT_WEATHER_URL),
            weather_api_key: required("OPENWEATHER_API_KEY")?,
            model_path: required("MODEL_PATH")?,
            meta_path: required("META_PATH")?,
            cycle_interval: Duration::from_secs(env_parsed("CYCLE_SECS", 30)),
            fetch_timeout: Duration::from_secs(env_parsed("FETCH_TIMEOUT_SECS", 10)),
            max_vehicles: env_parsed("MAX_VEHICLES", 10),
            stale_after_cycles: env_parsed("STALE_AFTER_CYCLES", 20),
            port: env_parsed("PORT", 8080),
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} not set", key))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
