//! Feature normalization (per-feature standardization)

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::error::{HazardError, HazardResult};

/// Normalization parameters fit on the training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl NormalizationParams {
    /// Fit mean and population std per column; a constant column gets scale 1
    pub fn fit(features: &Array2<f32>) -> HazardResult<Self> {
        if features.nrows() == 0 {
            return Err(HazardError::InvalidArtifact(
                "cannot fit normalization on zero rows".to_string(),
            ));
        }

        let mean = features
            .mean_axis(Axis(0))
            .ok_or_else(|| HazardError::InvalidArtifact("empty feature matrix".to_string()))?;
        let std = features.std_axis(Axis(0), 0.0);

        let scale = std
            .iter()
            .map(|&s| if s.is_finite() && s > f32::EPSILON { s } else { 1.0 })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: ArrayView1<f32>) -> Array1<f32> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform_batch(&self, features: &Array2<f32>) -> Array2<f32> {
        let mean = ArrayView1::from(&self.mean[..]);
        let scale = ArrayView1::from(&self.scale[..]);
        (features - &mean) / &scale
    }

    /// Shape and finiteness check used when loading artifacts
    pub fn validate(&self, expected_features: usize) -> HazardResult<()> {
        if self.mean.len() != expected_features || self.scale.len() != expected_features {
            return Err(HazardError::InvalidArtifact(format!(
                "normalization has {}/{} entries, schema expects {}",
                self.mean.len(),
                self.scale.len(),
                expected_features
            )));
        }
        let finite = self.mean.iter().chain(&self.scale).all(|v| v.is_finite());
        if !finite || self.scale.iter().any(|s| *s == 0.0) {
            return Err(HazardError::InvalidArtifact(
                "normalization contains non-finite or zero-scale values".to_string(),
            ));
        }
        Ok(())
    }
}
