//! Risk predictions and the append-only prediction log

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::logic::features::HazardType;
use crate::logic::model::threshold::{classify_severity, Severity, HIGH_PROBABILITY};
use crate::logic::weather::{Coordinates, WeatherObservation};

/// Timeframe label for predictions produced by the ingestion loop
pub const TIMEFRAME_INGESTION: &str = "24h";

/// Timeframe label for on-demand analysis
pub const TIMEFRAME_ON_DEMAND: &str = "24-72h";

const MODEL_LABEL: &str = "neural-net";
const MODEL_LABEL_NARRATIVE: &str = "neural-net+narrative";

/// Immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub id: Uuid,
    pub hazard: HazardType,
    pub score: f32,
    pub severity: Severity,
    pub location: String,
    pub coordinates: Coordinates,
    pub observation: WeatherObservation,
    pub timeframe: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RiskPrediction {
    pub fn new(
        hazard: HazardType,
        score: f32,
        observation: &WeatherObservation,
        timeframe: &str,
        narrative: Option<String>,
    ) -> Self {
        let narrative = narrative.filter(|n| !n.trim().is_empty());
        let model = if narrative.is_some() { MODEL_LABEL_NARRATIVE } else { MODEL_LABEL };

        Self {
            id: Uuid::new_v4(),
            hazard,
            score,
            severity: classify_severity(score),
            location: observation.location.clone(),
            coordinates: observation.coordinates,
            observation: observation.clone(),
            timeframe: timeframe.to_string(),
            model: model.to_string(),
            narrative,
            created_at: Utc::now(),
        }
    }
}

/// Append-only; rotation is someone else's job
#[derive(Default)]
pub struct PredictionLog {
    entries: RwLock<Vec<Arc<RiskPrediction>>>,
}

impl PredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, prediction: RiskPrediction) -> Arc<RiskPrediction> {
        let prediction = Arc::new(prediction);
        self.entries.write().push(Arc::clone(&prediction));
        prediction
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<RiskPrediction>> {
        self.entries.read().iter().find(|p| p.id == *id).cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<RiskPrediction>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entries scoring above 0.7
    pub fn high_probability_count(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|p| p.score > HIGH_PROBABILITY)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs() -> WeatherObservation {
        WeatherObservation::new("Miami, FL", Coordinates::new(25.76, -80.19))
    }

    #[test]
    fn test_prediction_labels() {
        let plain = RiskPrediction::new(HazardType::Flood, 0.45, &obs(), TIMEFRAME_INGESTION, None);
        assert_eq!(plain.severity, Severity::High);
        assert_eq!(plain.model, "neural-net");

        let blank = RiskPrediction::new(HazardType::Flood, 0.45, &obs(), TIMEFRAME_INGESTION, Some("  ".into()));
        assert_eq!(blank.narrative, None);

        let told = RiskPrediction::new(HazardType::Storm, 0.8, &obs(), TIMEFRAME_ON_DEMAND, Some("Gusty".into()));
        assert_eq!(told.model, "neural-net+narrative");
        assert_eq!(told.timeframe, "24-72h");
    }

    #[test]
    fn test_log_append_and_lookup() {
        let log = PredictionLog::new();
        let a = log.append(RiskPrediction::new(HazardType::Flood, 0.75, &obs(), TIMEFRAME_INGESTION, None));
        log.append(RiskPrediction::new(HazardType::Storm, 0.3, &obs(), TIMEFRAME_INGESTION, None));

        assert_eq!(log.len(), 2);
        assert_eq!(log.high_probability_count(), 1);
        assert_eq!(log.get(&a.id).map(|p| p.hazard), Some(HazardType::Flood));
        assert!(log.get(&Uuid::new_v4()).is_none());
    }
}
