//! Hazard Registry
//!
//! Owns one `HazardModel` per hazard and is the only writer of model state.
//! Loads artifacts at startup, trains and persists on demand, and runs batch
//! inference for an observation with the suppression clamp applied.

pub mod storage;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::logic::features::{map_features, HazardType};
use crate::logic::model::error::{HazardError, HazardResult};
use crate::logic::model::hazard_model::{HazardModel, ModelState, ModelStatus};
use crate::logic::model::threshold::SuppressionPolicy;
use crate::logic::model::training::{
    LabelSource, TrainingConfig, TrainingReport, TrainingSet, EVAL_FRACTION, SPLIT_SEED,
};
use crate::logic::weather::WeatherObservation;

pub use storage::{FileModelStore, MemoryModelStore, ModelStore};

pub struct HazardRegistry {
    models: BTreeMap<HazardType, HazardModel>,
    store: Arc<dyn ModelStore>,
    labels: Arc<dyn LabelSource>,
    policies: HashMap<HazardType, SuppressionPolicy>,
    training: TrainingConfig,
    samples: usize,
}

impl HazardRegistry {
    /// All hazards uninitialized; earthquake suppressed with default policy
    pub fn new(store: Arc<dyn ModelStore>, labels: Arc<dyn LabelSource>) -> Self {
        let models = HazardType::ALL
            .into_iter()
            .map(|h| (h, HazardModel::new(h)))
            .collect();

        let mut policies = HashMap::new();
        policies.insert(HazardType::Earthquake, SuppressionPolicy::earthquake());

        Self {
            models,
            store,
            labels,
            policies,
            training: TrainingConfig::default(),
            samples: crate::constants::DEFAULT_TRAINING_SAMPLES,
        }
    }

    pub fn with_policy(mut self, policy: SuppressionPolicy) -> Self {
        self.policies.insert(policy.hazard, policy);
        self
    }

    pub fn with_training(mut self, config: TrainingConfig, samples: usize) -> Self {
        self.training = config;
        self.samples = samples;
        self
    }

    pub fn model(&self, hazard: HazardType) -> Option<&HazardModel> {
        self.models.get(&hazard)
    }

    pub fn policy(&self, hazard: HazardType) -> Option<&SuppressionPolicy> {
        self.policies.get(&hazard)
    }

    // ========================================================================
    // LOAD
    // ========================================================================

    /// Load every persisted artifact; missing or bad artifacts are not fatal
    pub fn initialize(&self) -> BTreeMap<HazardType, ModelState> {
        for (hazard, model) in &self.models {
            match self.store.load(*hazard) {
                Ok(Some(bytes)) => match model.load(&bytes) {
                    Ok(()) => log::info!("Loaded {} model", hazard),
                    Err(e) => log::warn!("Rejected {} model artifact: {}", hazard, e),
                },
                Ok(None) => log::info!("No saved {} model; needs training", hazard),
                Err(e) => log::warn!("Could not read {} model: {}", hazard, e),
            }
        }

        let states = self.states();
        let ready = states.values().filter(|s| s.is_servable()).count();
        log::info!("Hazard registry initialized: {}/{} models ready", ready, states.len());
        states
    }

    pub fn states(&self) -> BTreeMap<HazardType, ModelState> {
        self.models.iter().map(|(h, m)| (*h, m.state())).collect()
    }

    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        self.models.values().map(HazardModel::status).collect()
    }

    pub fn servable_count(&self) -> usize {
        self.models.values().filter(|m| m.state().is_servable()).count()
    }

    // ========================================================================
    // TRAIN
    // ========================================================================

    /// Train every hazard independently; one failure does not stop the rest
    pub fn train_all(
        &self,
        epochs: usize,
        batch_size: usize,
    ) -> BTreeMap<HazardType, HazardResult<TrainingReport>> {
        let mut outcomes = BTreeMap::new();
        for hazard in HazardType::ALL {
            let outcome = self.train_one(hazard, epochs, batch_size);
            match &outcome {
                Ok(report) => log::info!(
                    "Trained {} model: loss {:.4}, eval {:?}, persisted {}",
                    hazard,
                    report.train_loss,
                    report.eval_loss,
                    report.persisted
                ),
                Err(e) => log::error!("Training {} failed: {}", hazard, e),
            }
            outcomes.insert(hazard, outcome);
        }
        outcomes
    }

    /// Generate labels from the configured source, then `train_with`
    pub fn train_one(
        &self,
        hazard: HazardType,
        epochs: usize,
        batch_size: usize,
    ) -> HazardResult<TrainingReport> {
        let set = self.labels.generate(hazard, self.samples);
        self.train_with(hazard, &set, epochs, batch_size)
    }

    /// 80/20 reproducible split, train, persist. A persistence failure is
    /// logged and reported in `persisted`, the trained model stays live.
    pub fn train_with(
        &self,
        hazard: HazardType,
        set: &TrainingSet,
        epochs: usize,
        batch_size: usize,
    ) -> HazardResult<TrainingReport> {
        let model = self
            .models
            .get(&hazard)
            .ok_or_else(|| HazardError::TrainingFailure {
                hazard,
                reason: "no model registered".to_string(),
            })?;

        let (train, eval) = set.split(EVAL_FRACTION, SPLIT_SEED);
        let mut report = model.train(&train, Some(&eval), epochs, batch_size, &self.training)?;

        match model.serialize().and_then(|bytes| self.store.save(hazard, &bytes)) {
            Ok(()) => report.persisted = true,
            Err(e) => log::error!("Saving {} model failed: {}", hazard, e),
        }
        Ok(report)
    }

    // ========================================================================
    // INFER
    // ========================================================================

    /// Scores for every servable hazard. Unready hazards and hazards whose
    /// features are missing are absent from the map, never zero.
    pub fn predict_all(&self, observation: &WeatherObservation) -> BTreeMap<HazardType, f32> {
        let mut scores = BTreeMap::new();

        for (hazard, model) in &self.models {
            if !model.state().is_servable() {
                continue;
            }

            let raw = match map_features(observation, *hazard).and_then(|f| model.infer(&f)) {
                Ok(score) => score,
                Err(HazardError::NotReady(_)) => continue,
                Err(e) => {
                    log::warn!("{} skipped for {}: {}", hazard, observation.location, e);
                    continue;
                }
            };

            let score = match self.policies.get(hazard) {
                Some(policy) => policy.apply(raw),
                None => raw,
            };
            scores.insert(*hazard, score);
        }
        scores
    }
}
