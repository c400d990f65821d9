use std::sync::Arc;

use crate::model::DelayModel;
use crate::types::{EstimateSource, FeatureTuple};

/// Traffic ratio above which congestion is considered established.
pub const CONGESTION_RATIO: f32 = 1.1;

/// Raw scored delays under this, during congestion, are overridden.
const MIN_PLAUSIBLE_SECS: f32 = 5.0;

/// Rule-based delay from traffic ratio alone: roughly one extra minute per
/// unit of excess travel time. Used below the window threshold and as the
/// terminal fallback when scoring fails or is implausible.
pub fn heuristic_delay(traffic_ratio: f32) -> u32 {
    if traffic_ratio > CONGESTION_RATIO {
        ((traffic_ratio - 1.0) * 60.0).round().max(0.0) as u32
    } else {
        0
    }
}

/// Turns one vehicle's window into a delay estimate.
///
/// Three branches per vehicle per cycle: Insufficient (window not yet full),
/// Scored (model invoked on the full window), Fallback (model failed or
/// produced an implausible value). Every branch yields a result; a model
/// failure for one vehicle never touches another's.
pub struct Predictor {
    model: Arc<dyn DelayModel>,
    window_len: usize,
}

impl Predictor {
    pub fn new(model: Arc<dyn DelayModel>, window_len: usize) -> Self {
        Self { model, window_len }
    }

    pub fn predict(&self, window: &[FeatureTuple], traffic_ratio: f32) -> (u32, EstimateSource) {
        if window.len() < self.window_len {
            return (heuristic_delay(traffic_ratio), EstimateSource::Heuristic);
        }

        match self.model.score(window) {
            Ok(raw) => {
                if raw < MIN_PLAUSIBLE_SECS && traffic_ratio > CONGESTION_RATIO {
                    // Known congestion the model failed to reflect: trust the rule.
                    (heuristic_delay(traffic_ratio), EstimateSource::Heuristic)
                } else {
                    (raw.max(0.0).round() as u32, EstimateSource::Scored)
                }
            }
            Err(e) => {
                tracing::warn!("scoring failed, using heuristic: {}", e);
                (heuristic_delay(traffic_ratio), EstimateSource::Heuristic)
            }
        }
    }
}
