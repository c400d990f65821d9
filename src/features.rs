use std::collections::HashMap;

use crate::types::{FeatureTuple, TrafficInfo, WeatherInfo};

/// Defaults substituted when a side-info fetch resolved to absent.
pub const DEFAULT_TRAFFIC_RATIO: f32 = 1.0;
pub const DEFAULT_TEMPERATURE: f32 = 25.0;
pub const DEFAULT_CONDITION: &str = "Clear";

/// Sentinel code for condition labels the encoder was not built with.
pub const UNKNOWN_WEATHER_CODE: i64 = 0;

/// Maps categorical weather conditions to the integer codes the model was
/// trained against. The class list is fixed at construction; labels outside
/// it encode to the sentinel, never to an error.
pub struct WeatherEncoder {
    codes: HashMap<String, i64>,
}

impl WeatherEncoder {
    /// Build from the class list in training order (label index = code).
    pub fn from_classes(classes: &[String]) -> Self {
        let codes = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as i64))
            .collect();
        Self { codes }
    }

    pub fn code(&self, condition: &str) -> i64 {
        self.codes
            .get(condition)
            .copied()
            .unwrap_or(UNKNOWN_WEATHER_CODE)
    }

    /// Encode one cycle's enrichment pair into a feature tuple. Pure and
    /// total: absent inputs take the documented defaults.
    pub fn encode(
        &self,
        traffic: Option<&TrafficInfo>,
        weather: Option<&WeatherInfo>,
    ) -> FeatureTuple {
        let traffic_ratio = traffic
            .map(|t| t.traffic_ratio)
            .unwrap_or(DEFAULT_TRAFFIC_RATIO);
        let (temperature, condition) = match weather {
            Some(w) => (w.temperature, w.condition.as_str()),
            None => (DEFAULT_TEMPERATURE, DEFAULT_CONDITION),
        };
        FeatureTuple {
            traffic_ratio,
            temperature,
            weather_code: self.code(condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> WeatherEncoder {
        let classes: Vec<String> = ["Clear", "Clouds", "Rain", "Snow"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        WeatherEncoder::from_classes(&classes)
    }

    fn weather(condition: &str, temp: f32) -> WeatherInfo {
        WeatherInfo {
            temperature: temp,
            humidity: 50.0,
            condition: condition.to_string(),
            wind_speed: 2.0,
        }
    }

    fn traffic(ratio: f32) -> TrafficInfo {
        TrafficInfo {
            current_speed: 30.0,
            free_flow_speed: 40.0,
            traffic_ratio: ratio,
        }
    }

    #[test]
    fn test_known_condition_codes() {
        let enc = encoder();
        assert_eq!(enc.code("Clear"), 0);
        assert_eq!(enc.code("Rain"), 2);
        assert_eq!(enc.code("Snow"), 3);
    }

    #[test]
    fn test_unknown_condition_is_sentinel() {
        let enc = encoder();
        assert_eq!(enc.code("Volcanic Ash"), UNKNOWN_WEATHER_CODE);
        assert_eq!(enc.code(""), UNKNOWN_WEATHER_CODE);
    }

    #[test]
    fn test_encode_full_inputs() {
        let enc = encoder();
        let t = enc.encode(Some(&traffic(1.3)), Some(&weather("Rain", 18.0)));
        assert_eq!(t.traffic_ratio, 1.3);
        assert_eq!(t.temperature, 18.0);
        assert_eq!(t.weather_code, 2);
    }

    #[test]
    fn test_encode_all_absence_combinations() {
        let enc = encoder();
        let tr = traffic(1.2);
        let w = weather("Clouds", 10.0);

        // Both absent: all documented defaults.
        let t = enc.encode(None, None);
        assert_eq!(t.traffic_ratio, DEFAULT_TRAFFIC_RATIO);
        assert_eq!(t.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(t.weather_code, enc.code(DEFAULT_CONDITION));

        // Traffic absent only.
        let t = enc.encode(None, Some(&w));
        assert_eq!(t.traffic_ratio, DEFAULT_TRAFFIC_RATIO);
        assert_eq!(t.temperature, 10.0);

        // Weather absent only.
        let t = enc.encode(Some(&tr), None);
        assert_eq!(t.traffic_ratio, 1.2);
        assert_eq!(t.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_encode_is_idempotent() {
        let enc = encoder();
        let tr = traffic(1.1);
        let w = weather("Snow", -2.0);
        let a = enc.encode(Some(&tr), Some(&w));
        let b = enc.encode(Some(&tr), Some(&w));
        assert_eq!(a, b, "Identical inputs must encode identically");
    }
}
