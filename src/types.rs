use serde::{Deserialize, Serialize};

/// One position observation from the realtime feed. Rebuilt every cycle;
/// nothing here outlives the cycle that produced it.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleSnapshot {
    pub vehicle_id: String,
    pub route_id: String,
    pub trip_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since epoch, source clock.
    pub timestamp: u64,
    pub speed: Option<f32>,
}

/// Traffic flow around one coordinate. `traffic_ratio` is
/// current_travel_time / free_flow_travel_time; 1.0 means free flow.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficInfo {
    pub current_speed: f32,
    pub free_flow_speed: f32,
    pub traffic_ratio: f32,
}

/// Current weather at one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherInfo {
    pub temperature: f32,
    pub humidity: f32,
    pub condition: String,
    pub wind_speed: f32,
}

/// Fixed-shape numeric encoding of one cycle's enrichment signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureTuple {
    pub traffic_ratio: f32,
    pub temperature: f32,
    pub weather_code: i64,
}

/// Whether a delay estimate came from the model or the rule-based fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    Scored,
    Heuristic,
}

/// Sink-facing output, one per vehicle per cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    pub vehicle_id: String,
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Local display time (IST), HH:MM:SS.
    pub time: String,
    pub eta_delay_seconds: u32,
    pub traffic_ratio: f32,
    pub temperature: f32,
    pub condition: String,
    pub source: EstimateSource,
}
