//! Pipeline Configuration
//!
//! Assembled once at startup from `constants` (environment with fallback).

use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::logic::model::threshold::SuppressionPolicy;
use crate::logic::weather::{default_locations, MonitoredLocation, Units};

/// EONET status filter used by the ingestion loop
pub const DEFAULT_EVENT_STATUS: &str = "open";

#[derive(Debug, Clone)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub batch_size: usize,
    pub samples: usize,
    pub on_startup: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub interval: Duration,
    pub lookback_days: u32,
    pub feed_limit: usize,
    pub fetch_timeout: Duration,
    pub reporting_threshold: f32,
    pub units: Units,
    pub event_status: String,
    pub model_dir: PathBuf,
    pub earthquake: SuppressionPolicy,
    pub training: TrainingSettings,
    pub locations: Vec<MonitoredLocation>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(constants::DEFAULT_INGESTION_INTERVAL),
            lookback_days: constants::DEFAULT_FEED_LOOKBACK_DAYS,
            feed_limit: constants::DEFAULT_FEED_LIMIT,
            fetch_timeout: Duration::from_secs(constants::DEFAULT_FETCH_TIMEOUT),
            reporting_threshold: constants::DEFAULT_REPORTING_THRESHOLD,
            units: Units::parse(constants::DEFAULT_WEATHER_UNITS),
            event_status: DEFAULT_EVENT_STATUS.to_string(),
            model_dir: PathBuf::from("models"),
            earthquake: SuppressionPolicy::earthquake(),
            training: TrainingSettings {
                epochs: constants::DEFAULT_TRAINING_EPOCHS,
                batch_size: constants::DEFAULT_TRAINING_BATCH_SIZE,
                samples: constants::DEFAULT_TRAINING_SAMPLES,
                on_startup: false,
            },
            locations: default_locations(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(constants::get_ingestion_interval().max(1)),
            lookback_days: constants::get_feed_lookback_days(),
            feed_limit: constants::get_feed_limit(),
            fetch_timeout: Duration::from_secs(constants::get_fetch_timeout().max(1)),
            reporting_threshold: constants::get_reporting_threshold(),
            units: Units::parse(&constants::get_weather_units()),
            event_status: DEFAULT_EVENT_STATUS.to_string(),
            model_dir: constants::get_model_dir(),
            earthquake: SuppressionPolicy::earthquake_from_env(),
            training: TrainingSettings {
                epochs: constants::get_training_epochs(),
                batch_size: constants::get_training_batch_size(),
                samples: constants::get_training_samples(),
                on_startup: constants::is_train_on_startup(),
            },
            locations: default_locations(),
        }
    }

    pub fn log_summary(&self) {
        log::info!(
            "Pipeline config: every {:?}, {} locations, lookback {}d, limit {}, threshold {}",
            self.interval,
            self.locations.len(),
            self.lookback_days,
            self.feed_limit,
            self.reporting_threshold
        );
        log::info!(
            "Earthquake predictions: {} (multiplier {}, ceiling {})",
            if self.earthquake.allow_full_scale { "full scale" } else { "suppressed" },
            self.earthquake.multiplier,
            self.earthquake.ceiling
        );
    }
}
