//! On-demand Risk Analysis
//!
//! Request-driven counterpart of the ingestion loop. Runs on the same tokio
//! runtime and reads the same registry; results above the reporting
//! threshold go into the shared prediction log and are broadcast.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::logic::config::PipelineConfig;
use crate::logic::features::HazardType;
use crate::logic::feeds::{with_timeout, FeedError};
use crate::logic::ingestion::prediction::{RiskPrediction, TIMEFRAME_ON_DEMAND};
use crate::logic::model::threshold::{classify_severity, is_reportable, Severity};
use crate::logic::model::{HazardResult, ModelStatus, TrainingReport};
use crate::logic::state::SharedState;
use crate::logic::weather::{
    Coordinates, ForecastPoint, GeocodeCandidate, WeatherAttribute, WeatherObservation,
    WeatherProvider,
};

/// Geocoding candidates considered for a city query
const GEOCODE_LIMIT: usize = 5;

/// Forecast attached to a city analysis: 5 days, first 8 steps
const FORECAST_DAYS: u32 = 5;
const FORECAST_STEPS: usize = 8;

/// Heuristic summary bands
const SUMMARY_HIGH: f32 = 0.6;
const SUMMARY_MODERATE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("weather unavailable: {0}")]
    Weather(#[from] FeedError),

    #[error("no location matches '{0}'")]
    LocationNotFound(String),

    #[error("training task failed: {0}")]
    Training(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationAnalysis {
    pub location: String,
    pub coordinates: Coordinates,
    pub observation: WeatherObservation,
    pub scores: BTreeMap<HazardType, f32>,
    pub severities: BTreeMap<HazardType, Severity>,
    pub summaries: BTreeMap<HazardType, String>,
    pub risk_summary: String,
    /// Ids of predictions stored in the log
    pub recorded: Vec<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forecast: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoding_confidence: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub observations: usize,
    pub sensors: usize,
    pub predictions: usize,
    pub high_probability_predictions: usize,
    pub declarations: usize,
    pub events: usize,
    pub monitored_locations: usize,
    pub servable_models: usize,
    pub published: BTreeMap<&'static str, u64>,
}

pub struct RiskService {
    state: SharedState,
    weather: Arc<dyn WeatherProvider>,
    config: PipelineConfig,
}

impl RiskService {
    pub fn new(state: SharedState, weather: Arc<dyn WeatherProvider>, config: PipelineConfig) -> Self {
        Self { state, weather, config }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Fetch weather for a point, score it, and record what clears the threshold
    pub async fn analyze_coordinates(
        &self,
        lat: f64,
        lon: f64,
        name: Option<&str>,
    ) -> Result<LocationAnalysis, ServiceError> {
        let fetch = self.weather.get_current_weather(lat, lon, name, self.config.units);
        let observation = with_timeout(self.config.fetch_timeout, fetch).await?;
        Ok(self.analyze_observation(observation).await)
    }

    /// Score an observation the caller already has
    pub async fn analyze_observation(&self, observation: WeatherObservation) -> LocationAnalysis {
        let scores = self.state.registry.predict_all(&observation);

        let requests = scores
            .iter()
            .map(|(&hazard, &score)| (hazard, score, observation.clone()))
            .collect();
        let narratives = self
            .state
            .narrate_batch(requests, self.config.fetch_timeout)
            .await;

        let mut summaries = BTreeMap::new();
        let mut recorded = Vec::new();
        for ((&hazard, &score), narrative) in scores.iter().zip(narratives) {
            if let Some(text) = &narrative {
                summaries.insert(hazard, text.clone());
            }
            if is_reportable(score, self.config.reporting_threshold) {
                let prediction =
                    RiskPrediction::new(hazard, score, &observation, TIMEFRAME_ON_DEMAND, narrative);
                recorded.push(self.state.record_prediction(prediction).id);
            }
        }

        LocationAnalysis {
            location: observation.location.clone(),
            coordinates: observation.coordinates,
            severities: scores.iter().map(|(h, s)| (*h, classify_severity(*s))).collect(),
            risk_summary: heuristic_summary(&scores, &observation),
            scores,
            summaries,
            recorded,
            forecast: Vec::new(),
            geocoding_confidence: None,
            observation,
            timestamp: Utc::now(),
        }
    }

    /// Geocode, pick the best candidate, analyze it, attach a short forecast
    pub async fn analyze_city(&self, query: &str) -> Result<LocationAnalysis, ServiceError> {
        let lookup = self.weather.geocode(query, GEOCODE_LIMIT);
        let candidates = with_timeout(self.config.fetch_timeout, lookup).await?;
        let best = best_candidate(query, &candidates)
            .ok_or_else(|| ServiceError::LocationNotFound(query.to_string()))?;

        let name = best.display_name();
        let mut analysis = self.analyze_coordinates(best.lat, best.lon, Some(&name)).await?;

        let forecast = self
            .weather
            .get_forecast(best.lat, best.lon, FORECAST_DAYS, self.config.units);
        match with_timeout(self.config.fetch_timeout, forecast).await {
            Ok(points) => analysis.forecast = points.into_iter().take(FORECAST_STEPS).collect(),
            Err(e) => log::warn!("Forecast for {} unavailable: {}", name, e),
        }

        let has = |v: &Option<String>| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        analysis.geocoding_confidence = Some(if has(&best.state) && has(&best.country) {
            "high"
        } else {
            "medium"
        });
        Ok(analysis)
    }

    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        self.state.registry.model_statuses()
    }

    /// Retrain every hazard on the blocking pool; per-hazard outcomes as `train_all`
    pub async fn train_models(
        &self,
        epochs: usize,
        batch_size: usize,
    ) -> Result<BTreeMap<HazardType, HazardResult<TrainingReport>>, ServiceError> {
        let registry = Arc::clone(&self.state.registry);
        let outcomes =
            tokio::task::spawn_blocking(move || registry.train_all(epochs, batch_size)).await?;
        log::info!(
            "Retrained {}/{} hazard models",
            outcomes.values().filter(|o| o.is_ok()).count(),
            outcomes.len()
        );
        Ok(outcomes)
    }

    pub fn stats(&self) -> PipelineStats {
        let state = &self.state;
        PipelineStats {
            observations: state.cache.weather().observations.len(),
            sensors: state.cache.sensors().readings.len(),
            predictions: state.predictions.len(),
            high_probability_predictions: state.predictions.high_probability_count(),
            declarations: state.cache.declarations().len(),
            events: state.cache.events().len(),
            monitored_locations: self.config.locations.len(),
            servable_models: state.registry.servable_count(),
            published: state.broadcaster.publish_counts(),
        }
    }
}

/// Exact name +3, substring +1, has state +1, has country +1; ties keep provider order
pub fn best_candidate<'a>(query: &str, candidates: &'a [GeocodeCandidate]) -> Option<&'a GeocodeCandidate> {
    let wanted = query.trim().to_lowercase();
    let score = |c: &GeocodeCandidate| {
        let name = c.name.to_lowercase();
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        let mut s = 0;
        if name == wanted {
            s += 3;
        }
        if name.contains(&wanted) {
            s += 1;
        }
        if present(&c.state) {
            s += 1;
        }
        if present(&c.country) {
            s += 1;
        }
        s
    };
    candidates.iter().min_by_key(|c| Reverse(score(c)))
}

/// One-line summary of current conditions and high (> 0.6) / moderate risks
pub fn heuristic_summary(scores: &BTreeMap<HazardType, f32>, observation: &WeatherObservation) -> String {
    let value = |attr| observation.get(attr).unwrap_or(0.0);
    let mut summary = format!(
        "Current: {:.1}°C, {:.0}% RH, {:.1} m/s wind. ",
        value(WeatherAttribute::Temperature),
        value(WeatherAttribute::Humidity),
        value(WeatherAttribute::WindSpeed)
    );

    // BTreeMap order is enum order; sort by name
    let band = |keep: &dyn Fn(f32) -> bool| {
        let mut names: Vec<&str> = scores
            .iter()
            .filter(|(_, s)| keep(**s))
            .map(|(h, _)| h.as_str())
            .collect();
        names.sort_unstable();
        names
    };
    let high = band(&|s| s > SUMMARY_HIGH);
    let moderate = band(&|s| s > SUMMARY_MODERATE && s <= SUMMARY_HIGH);

    if !high.is_empty() {
        summary.push_str(&format!("High risks: {}. ", high.join(", ")));
    }
    if !moderate.is_empty() {
        summary.push_str(&format!("Moderate risks: {}. ", moderate.join(", ")));
    }
    if high.is_empty() && moderate.is_empty() {
        summary.push_str("No significant risks detected.");
    }
    summary.trim_end().to_string()
}
