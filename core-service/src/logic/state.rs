//! Shared pipeline state
//!
//! Owned explicitly and handed to the ingestion loop and the analysis
//! service by `Arc`; nothing here is a global.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::logic::events::Broadcaster;
use crate::logic::features::HazardType;
use crate::logic::ingestion::cache::ObservationCache;
use crate::logic::ingestion::prediction::{PredictionLog, RiskPrediction};
use crate::logic::narrative::{Narrator, SilentNarrator};
use crate::logic::registry::HazardRegistry;
use crate::logic::weather::WeatherObservation;

#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<HazardRegistry>,
    pub cache: Arc<ObservationCache>,
    pub predictions: Arc<PredictionLog>,
    pub broadcaster: Arc<Broadcaster>,
    pub narrator: Arc<dyn Narrator>,
}

impl SharedState {
    pub fn new(registry: Arc<HazardRegistry>, narrator: Arc<dyn Narrator>) -> Self {
        Self {
            registry,
            cache: Arc::new(ObservationCache::new()),
            predictions: Arc::new(PredictionLog::new()),
            broadcaster: Arc::new(Broadcaster::default()),
            narrator,
        }
    }

    /// No narrative backend
    pub fn silent(registry: Arc<HazardRegistry>) -> Self {
        Self::new(registry, Arc::new(SilentNarrator))
    }

    /// Narrative bounded by `limit`; empty or timed-out text is `None`
    pub async fn narrate(
        &self,
        hazard: HazardType,
        observation: &WeatherObservation,
        score: f32,
        limit: Duration,
    ) -> Option<String> {
        let summary = self
            .narrator
            .summarize(hazard, &observation.location, observation, score);
        match tokio::time::timeout(limit, summary).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(_) => {
                log::warn!("Narrative for {} at {} timed out", hazard, observation.location);
                None
            }
        }
    }

    /// Narratives for many requests at once, each bounded by `limit`.
    /// Results keep request order; a failed task yields `None`.
    pub async fn narrate_batch(
        &self,
        requests: Vec<(HazardType, f32, WeatherObservation)>,
        limit: Duration,
    ) -> Vec<Option<String>> {
        let mut narratives = vec![None; requests.len()];
        let mut tasks = JoinSet::new();
        for (index, (hazard, score, observation)) in requests.into_iter().enumerate() {
            let state = self.clone();
            tasks.spawn(async move { (index, state.narrate(hazard, &observation, score, limit).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, text)) => narratives[index] = text,
                Err(e) => log::warn!("Narrative task aborted: {}", e),
            }
        }
        narratives
    }

    /// Append to the log, then publish
    pub fn record_prediction(&self, prediction: RiskPrediction) -> Arc<RiskPrediction> {
        let stored = self.predictions.append(prediction);
        self.broadcaster.emit_new_prediction(Arc::clone(&stored));
        stored
    }
}
