use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{TrafficInfo, WeatherInfo};

/// Coordinate-keyed side-info lookups. Every failure mode — transport error,
/// non-success status, malformed body, timeout — resolves to `None` locally;
/// absence is a value, not an abort. One attempt per vehicle per cycle.
#[async_trait]
pub trait SideInfoProvider: Send + Sync {
    async fn fetch_traffic(&self, lat: f64, lon: f64) -> Option<TrafficInfo>;
    async fn fetch_weather(&self, lat: f64, lon: f64) -> Option<WeatherInfo>;
}

/// TomTom flow-segment + OpenWeather current-weather over one shared client.
/// The client carries the per-call timeout.
pub struct HttpSideInfo {
    client: Client,
    traffic_url: String,
    traffic_key: String,
    weather_url: String,
    weather_key: String,
}

#[derive(Deserialize)]
struct FlowResponse {
    #[serde(rename = "flowSegmentData")]
    flow: FlowSegmentData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowSegmentData {
    current_speed: f32,
    free_flow_speed: f32,
    current_travel_time: f32,
    free_flow_travel_time: f32,
}

#[derive(Deserialize)]
struct WeatherResponse {
    main: WeatherMain,
    weather: Vec<WeatherEntry>,
    wind: WeatherWind,
}

#[derive(Deserialize)]
struct WeatherMain {
    temp: f32,
    humidity: f32,
}

#[derive(Deserialize)]
struct WeatherEntry {
    main: String,
}

#[derive(Deserialize)]
struct WeatherWind {
    speed: f32,
}

impl HttpSideInfo {
    pub fn new(
        client: Client,
        traffic_url: String,
        traffic_key: String,
        weather_url: String,
        weather_key: String,
    ) -> Self {
        Self {
            client,
            traffic_url,
            traffic_key,
            weather_url,
            weather_key,
        }
    }

    async fn traffic(&self, lat: f64, lon: f64) -> Result<TrafficInfo> {
        let resp = self
            .client
            .get(&self.traffic_url)
            .query(&[
                ("point", format!("{},{}", lat, lon)),
                ("unit", "KMPH".to_string()),
                ("key", self.traffic_key.clone()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("traffic lookup HTTP {}", resp.status());
        }
        let d: FlowResponse = resp.json().await?;
        if d.flow.free_flow_travel_time <= 0.0 {
            bail!("traffic lookup returned zero free-flow travel time");
        }
        let ratio = d.flow.current_travel_time / d.flow.free_flow_travel_time;
        Ok(TrafficInfo {
            current_speed: d.flow.current_speed,
            free_flow_speed: d.flow.free_flow_speed,
            traffic_ratio: round2(ratio),
        })
    }

    async fn weather(&self, lat: f64, lon: f64) -> Result<WeatherInfo> {
        let resp = self
            .client
            .get(&self.weather_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.weather_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("weather lookup HTTP {}", resp.status());
        }
        let d: WeatherResponse = resp.json().await?;
        let condition = match d.weather.first() {
            Some(w) => w.main.clone(),
            None => bail!("weather lookup returned no condition entries"),
        };
        Ok(WeatherInfo {
            temperature: d.main.temp,
            humidity: d.main.humidity,
            condition,
            wind_speed: d.wind.speed,
        })
    }
}

#[async_trait]
impl SideInfoProvider for HttpSideInfo {
    async fn fetch_traffic(&self, lat: f64, lon: f64) -> Option<TrafficInfo> {
        match self.traffic(lat, lon).await {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!("traffic fetch at ({:.4},{:.4}) unavailable: {}", lat, lon, e);
                None
            }
        }
    }

    async fn fetch_weather(&self, lat: f64, lon: f64) -> Option<WeatherInfo> {
        match self.weather(lat, lon).await {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::debug!("weather fetch at ({:.4},{:.4}) unavailable: {}", lat, lon, e);
                None
            }
        }
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_response_shape() {
        let body = r#"{
            "flowSegmentData": {
                "currentSpeed": 32.0,
                "freeFlowSpeed": 45.0,
                "currentTravelTime": 130.0,
                "freeFlowTravelTime": 100.0
            }
        }"#;
        let d: FlowResponse = serde_json::from_str(body).expect("flow body should parse");
        assert_eq!(d.flow.current_speed, 32.0);
        assert_eq!(round2(d.flow.current_travel_time / d.flow.free_flow_travel_time), 1.3);
    }

    #[test]
    fn test_weather_response_shape() {
        let body = r#"{
            "main": {"temp": 21.5, "humidity": 64.0},
            "weather": [{"main": "Rain"}],
            "wind": {"speed": 3.2}
        }"#;
        let d: WeatherResponse = serde_json::from_str(body).expect("weather body should parse");
        assert_eq!(d.main.temp, 21.5);
        assert_eq!(d.weather[0].main, "Rain");
    }

    #[tokio::test]
    async fn test_unreachable_provider_resolves_to_absent() {
        // Port 9 (discard) is closed on the test host; a refused or timed-out
        // connection must surface as absence, never as a propagated error.
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(250))
            .build()
            .expect("client should build");
        let side = HttpSideInfo::new(
            client,
            "http://127.0.0.1:9/traffic".to_string(),
            "key".to_string(),
            "http://127.0.0.1:9/weather".to_string(),
            "key".to_string(),
        );

        assert!(side.fetch_traffic(40.7, -74.0).await.is_none());
        assert!(side.fetch_weather(40.7, -74.0).await.is_none());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.2345), 1.23);
        assert_eq!(round2(1.555), 1.56);
        assert_eq!(round2(1.0), 1.0);
    }
}
