//! Hazard Model
//!
//! One parameterized model type for every hazard; the `HazardType` tag picks
//! the feature schema. Weights and normalization live together in one
//! `Fitted` value that is swapped in whole, so inference never observes a
//! half-trained or half-loaded model.

use chrono::{DateTime, Utc};
use ndarray::ArrayView1;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::{HazardError, HazardResult};
use super::network::{bce_loss, Adam, LayerParams, Network};
use super::normalization::NormalizationParams;
use super::training::{TrainingConfig, TrainingReport, TrainingSet};
use crate::logic::features::{HazardFeatureSchema, HazardType, SCHEMA_VERSION};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Uninitialized,
    Loaded,
    Trained,
    /// Persisted artifact was built for a different schema; retrain to serve
    Stale,
}

impl ModelState {
    pub fn is_servable(&self) -> bool {
        matches!(self, ModelState::Loaded | ModelState::Trained)
    }
}

struct Fitted {
    network: Network,
    normalization: NormalizationParams,
    trained_at: DateTime<Utc>,
}

struct Slot {
    state: ModelState,
    fitted: Option<Arc<Fitted>>,
}

/// Listing entry for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub hazard: HazardType,
    pub state: ModelState,
    pub feature_names: Vec<String>,
    pub trained_at: Option<DateTime<Utc>>,
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// Persisted form: both halves plus the schema they were fit against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub hazard: HazardType,
    pub schema_version: u8,
    pub layout_hash: u32,
    pub normalization: Option<NormalizationParams>,
    pub layers: Option<Vec<LayerParams>>,
    pub trained_at: Option<DateTime<Utc>>,
    pub checksum: String,
}

fn payload_checksum(
    normalization: &Option<NormalizationParams>,
    layers: &Option<Vec<LayerParams>>,
) -> HazardResult<String> {
    let bytes = serde_json::to_vec(&(normalization, layers))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

// ============================================================================
// MODEL
// ============================================================================

pub struct HazardModel {
    schema: HazardFeatureSchema,
    slot: RwLock<Slot>,
    /// Serializes training runs for this hazard
    training: Mutex<()>,
}

impl HazardModel {
    pub fn new(hazard: HazardType) -> Self {
        Self {
            schema: hazard.schema(),
            slot: RwLock::new(Slot {
                state: ModelState::Uninitialized,
                fitted: None,
            }),
            training: Mutex::new(()),
        }
    }

    pub fn hazard(&self) -> HazardType {
        self.schema.hazard
    }

    pub fn schema(&self) -> &HazardFeatureSchema {
        &self.schema
    }

    pub fn state(&self) -> ModelState {
        self.slot.read().state
    }

    pub fn status(&self) -> ModelStatus {
        let slot = self.slot.read();
        ModelStatus {
            hazard: self.hazard(),
            state: slot.state,
            feature_names: self.schema.feature_names().iter().map(|s| s.to_string()).collect(),
            trained_at: slot.fitted.as_ref().map(|f| f.trained_at),
        }
    }

    /// Fit normalization on `train` only, optimise, then swap in atomically
    pub fn train(
        &self,
        train: &TrainingSet,
        eval: Option<&TrainingSet>,
        epochs: usize,
        batch_size: usize,
        config: &TrainingConfig,
    ) -> HazardResult<TrainingReport> {
        let hazard = self.hazard();
        let fail = |reason: String| HazardError::TrainingFailure { hazard, reason };
        if epochs == 0 || batch_size == 0 {
            return Err(fail("epochs and batch_size must be positive".to_string()));
        }

        let _guard = self.training.lock();
        let count = self.schema.feature_count();

        let (features, labels) = train.to_arrays(hazard, count)?;
        let normalization = NormalizationParams::fit(&features)?;
        let inputs = normalization.transform_batch(&features);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut network = Network::new(count, &config.hidden_layers, &mut rng);
        let mut optimizer = Adam::new(config.learning_rate, &network);

        let mut train_loss = f32::NAN;
        for epoch in 0..epochs {
            train_loss = network.train_epoch(&inputs, &labels, batch_size, &mut optimizer, &mut rng);
            if !train_loss.is_finite() {
                return Err(fail(format!("loss diverged at epoch {}", epoch)));
            }
            if (epoch + 1) % 10 == 0 || epoch + 1 == epochs {
                log::debug!("{} epoch {}/{}: loss {:.4}", hazard, epoch + 1, epochs, train_loss);
            }
        }

        let eval_loss = match eval.filter(|e| !e.is_empty()) {
            Some(eval) => {
                let (eval_x, eval_y) = eval.to_arrays(hazard, count)?;
                let predicted = network.predict(&normalization.transform_batch(&eval_x));
                Some(bce_loss(predicted.view(), eval_y.view()))
            }
            None => None,
        };

        let trained_at = Utc::now();
        let fitted = Arc::new(Fitted {
            network,
            normalization,
            trained_at,
        });

        {
            let mut slot = self.slot.write();
            slot.fitted = Some(fitted);
            slot.state = ModelState::Trained;
        }

        Ok(TrainingReport {
            hazard,
            epochs,
            train_samples: train.len(),
            eval_samples: eval.map(|e| e.len()).unwrap_or(0),
            train_loss,
            eval_loss,
            trained_at,
            persisted: false,
        })
    }

    /// Deterministic score in [0, 1] for one raw feature vector
    pub fn infer(&self, features: &[f32]) -> HazardResult<f32> {
        let fitted = self.servable()?;

        if features.len() != self.schema.feature_count() {
            return Err(HazardError::InvalidInput(format!(
                "{} expects {} features, got {}",
                self.hazard(),
                self.schema.feature_count(),
                features.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(HazardError::InvalidInput("non-finite feature value".to_string()));
        }

        let normalized = fitted.normalization.transform(ArrayView1::from(features));
        let score = fitted.network.predict_one(normalized.view());
        if !score.is_finite() {
            return Err(HazardError::InvalidInput(format!("{} produced a non-finite score", self.hazard())));
        }
        Ok(score.clamp(0.0, 1.0))
    }

    fn servable(&self) -> HazardResult<Arc<Fitted>> {
        let slot = self.slot.read();
        match (&slot.fitted, slot.state.is_servable()) {
            (Some(fitted), true) => Ok(Arc::clone(fitted)),
            _ => Err(HazardError::NotReady(self.hazard())),
        }
    }

    /// Weights and normalization as one JSON artifact
    pub fn serialize(&self) -> HazardResult<Vec<u8>> {
        let fitted = self.servable()?;
        let normalization = Some(fitted.normalization.clone());
        let layers = Some(fitted.network.to_params());
        let checksum = payload_checksum(&normalization, &layers)?;

        let artifact = ModelArtifact {
            hazard: self.hazard(),
            schema_version: SCHEMA_VERSION,
            layout_hash: self.schema.layout_hash(),
            normalization,
            layers,
            trained_at: Some(fitted.trained_at),
            checksum,
        };
        Ok(serde_json::to_vec_pretty(&artifact)?)
    }

    /// Restore both halves or nothing. A schema mismatch marks the model stale.
    pub fn load(&self, bytes: &[u8]) -> HazardResult<()> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;

        if artifact.hazard != self.hazard() {
            return Err(HazardError::InvalidArtifact(format!(
                "artifact is for {}, not {}",
                artifact.hazard,
                self.hazard()
            )));
        }

        if let Err(mismatch) = self.schema.validate(artifact.schema_version, artifact.layout_hash) {
            let mut slot = self.slot.write();
            slot.state = ModelState::Stale;
            slot.fitted = None;
            return Err(HazardError::InvalidArtifact(mismatch.to_string()));
        }

        let (normalization, layers) = match (&artifact.normalization, &artifact.layers) {
            (Some(n), Some(l)) => (n, l),
            (None, None) => return Err(HazardError::InvalidArtifact("artifact is empty".to_string())),
            _ => {
                return Err(HazardError::InvalidArtifact(
                    "artifact has only one of weights/normalization".to_string(),
                ))
            }
        };

        if payload_checksum(&artifact.normalization, &artifact.layers)? != artifact.checksum {
            return Err(HazardError::InvalidArtifact("checksum mismatch".to_string()));
        }

        let count = self.schema.feature_count();
        normalization.validate(count)?;
        let network = Network::from_params(layers, count)?;

        let fitted = Arc::new(Fitted {
            network,
            normalization: normalization.clone(),
            trained_at: artifact.trained_at.unwrap_or_else(Utc::now),
        });

        let mut slot = self.slot.write();
        slot.fitted = Some(fitted);
        slot.state = ModelState::Loaded;
        Ok(())
    }
}
