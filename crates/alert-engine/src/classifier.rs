//! Danger classifier adapter.
//!
//! Turns a window of 3-axis readings into a fixed feature vector, scores it
//! with an externally trained model and maps the probability onto a
//! [`Sensitivity`] threshold. Without a model every window scores 0, so the
//! automatic path never fires an alert on its own.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{EngineError, ModelLoadError, Result};
use crate::model::{SensorReading, SensorType, Sensitivity};

/// Length of the feature vector: five statistics per axis plus a two-slot
/// sensor one-hot.
pub const FEATURE_COUNT: usize = 17;

/// Features derived from one reading window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Extract `[mean, std, max, min, sum_sq]` for x, y and z followed by
/// `[is_accelerometer, is_gyroscope]`.
///
/// The standard deviation is the population one.
pub fn extract_features(readings: &[SensorReading], sensor: SensorType) -> Result<FeatureVector> {
    if readings.is_empty() {
        return Err(EngineError::Validation(
            "sensor window must contain at least one reading".to_string(),
        ));
    }

    let mut features = [0.0; FEATURE_COUNT];
    let axes: [fn(&SensorReading) -> f64; 3] = [|r| r.x, |r| r.y, |r| r.z];

    for (i, axis) in axes.iter().enumerate() {
        let values: Vec<f64> = readings.iter().map(axis).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let sum_sq = values.iter().map(|v| v * v).sum::<f64>();

        features[i * 5..i * 5 + 5].copy_from_slice(&[mean, variance.sqrt(), max, min, sum_sq]);
    }

    match sensor {
        SensorType::Accelerometer => features[15] = 1.0,
        SensorType::Gyroscope => features[16] = 1.0,
    }

    Ok(FeatureVector(features))
}

/// An externally trained danger model.
pub trait DangerModel: Send + Sync {
    /// Identifier of the trained artifact.
    fn version(&self) -> &str;

    /// Probability of danger for one feature vector.
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// Logistic regression exported by the offline training job.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    pub version: String,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    /// Load a model from its JSON export.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ModelLoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, ModelLoadError> {
        let model: LogisticModel = serde_json::from_str(raw)?;
        if model.weights.len() != FEATURE_COUNT {
            return Err(ModelLoadError::Shape {
                expected: FEATURE_COUNT,
                found: model.weights.len(),
            });
        }
        Ok(model)
    }
}

impl DangerModel for LogisticModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(features.as_slice())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

/// Scores sensor windows and applies sensitivity thresholds.
#[derive(Clone, Default)]
pub struct DangerClassifier {
    model: Option<Arc<dyn DangerModel>>,
}

impl fmt::Debug for DangerClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DangerClassifier")
            .field("model", &self.model.as_ref().map(|m| m.version().to_string()))
            .finish()
    }
}

impl DangerClassifier {
    pub fn new(model: Arc<dyn DangerModel>) -> Self {
        Self { model: Some(model) }
    }

    /// A classifier that scores every window as safe.
    pub fn without_model() -> Self {
        Self { model: None }
    }

    /// Load the model at `path`, degrading to [`DangerClassifier::without_model`]
    /// when the path is unset or unreadable.
    pub fn from_path(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            warn!("No danger model configured, automatic detection disabled");
            return Self::without_model();
        };

        match LogisticModel::load(path) {
            Ok(model) => {
                info!(version = %model.version, path = %path.display(), "Loaded danger model");
                Self::new(Arc::new(model))
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to load danger model, automatic detection disabled");
                Self::without_model()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Probability of danger in `[0, 1]` for a reading window.
    pub fn classify(&self, readings: &[SensorReading], sensor: SensorType) -> Result<f64> {
        let features = extract_features(readings, sensor)?;

        let Some(model) = &self.model else {
            return Ok(0.0);
        };

        let probability = model.predict(&features);
        if probability.is_nan() {
            warn!(version = model.version(), "Danger model returned NaN");
            return Ok(0.0);
        }
        Ok(probability.clamp(0.0, 1.0))
    }

    /// Whether `probability` meets the threshold of `sensitivity`.
    pub fn decide(probability: f64, sensitivity: Sensitivity) -> bool {
        probability >= sensitivity.threshold()
    }
}
