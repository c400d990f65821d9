use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use tch::{kind::Kind, CModule, Device, Tensor};

use crate::types::FeatureTuple;

/// Scoring seam: consumes a full feature window, returns raw delay seconds.
/// May fail; the orchestrator isolates failures per vehicle.
pub trait DelayModel: Send + Sync {
    fn score(&self, window: &[FeatureTuple]) -> Result<f32>;
}

/// Sidecar metadata exported with the trained model. Scaler parameters and
/// the condition-class list travel with the weights so normalization and
/// scoring can only ever be swapped as a pair.
#[derive(Deserialize)]
pub struct ModelMeta {
    pub weather_classes: Vec<String>,
    pub feature_min: [f32; 3],
    pub feature_max: [f32; 3],
    pub window: usize,
}

/// TorchScript LSTM delay scorer with its paired min-max normalization.
pub struct LstmScorer {
    model: CModule,
    device: Device,
    meta: ModelMeta,
}

impl LstmScorer {
    pub fn load(model_path: &str, meta_path: &str) -> Result<Self> {
        let device = Device::Cpu;

        let meta_txt = fs::read_to_string(Path::new(meta_path))
            .with_context(|| format!("failed to read meta at {}", meta_path))?;
        let meta: ModelMeta =
            serde_json::from_str(&meta_txt).with_context(|| "failed to parse model meta JSON")?;
        if meta.window == 0 {
            bail!("model meta declares a zero-length window");
        }

        let model = CModule::load_on_device(model_path, device)
            .with_context(|| format!("failed to load TorchScript {}", model_path))?;

        // Probe with a dummy forward — expect a single scalar out of [1, W, 3].
        let dummy = Tensor::zeros([1, meta.window as i64, 3], (Kind::Float, device));
        let out = model.forward_ts(&[dummy])?;
        if out.numel() != 1 {
            bail!("unexpected model output size: {:?}", out.size());
        }

        Ok(Self {
            model,
            device,
            meta,
        })
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Min-max scale one window into the flat row-major layout the model
    /// was calibrated with. Degenerate columns (min == max) scale to 0.
    fn normalize(&self, window: &[FeatureTuple]) -> Vec<f32> {
        let mut flat = Vec::with_capacity(window.len() * 3);
        for t in window {
            let raw = [t.traffic_ratio, t.temperature, t.weather_code as f32];
            for (i, x) in raw.iter().enumerate() {
                let span = self.meta.feature_max[i] - self.meta.feature_min[i];
                if span.abs() < f32::EPSILON {
                    flat.push(0.0);
                } else {
                    flat.push((x - self.meta.feature_min[i]) / span);
                }
            }
        }
        flat
    }
}

impl DelayModel for LstmScorer {
    fn score(&self, window: &[FeatureTuple]) -> Result<f32> {
        if window.len() != self.meta.window {
            bail!(
                "window length mismatch: got {}, expected {}",
                window.len(),
                self.meta.window
            );
        }

        let flat = self.normalize(window);
        let input = Tensor::from_slice(&flat)
            .reshape([1, self.meta.window as i64, 3])
            .to_device(self.device);

        let out = self.model.forward_ts(&[input])?;
        if out.numel() != 1 {
            bail!("unexpected model output size: {:?}", out.size());
        }
        Ok(out.reshape([-1]).double_value(&[0]) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_parses() {
        let meta_txt = r#"{
            "weather_classes": ["Clear", "Clouds", "Rain"],
            "feature_min": [0.8, -5.0, 0.0],
            "feature_max": [2.5, 40.0, 2.0],
            "window": 5
        }"#;
        let meta: ModelMeta = serde_json::from_str(meta_txt).expect("meta should parse");
        assert_eq!(meta.weather_classes.len(), 3);
        assert_eq!(meta.window, 5);
        assert_eq!(meta.feature_min[1], -5.0);
    }
}
