//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment; see the `get_*` helpers.

/// Ingestion period (seconds)
pub const DEFAULT_INGESTION_INTERVAL: u64 = 300;

/// Lookback window for declaration/event feeds (days)
pub const DEFAULT_FEED_LOOKBACK_DAYS: u32 = 14;

/// Max records requested from each external feed
pub const DEFAULT_FEED_LIMIT: usize = 200;

/// Per-call timeout for every external fetch (seconds)
pub const DEFAULT_FETCH_TIMEOUT: u64 = 30;

/// Minimum score for a hazard to become a RiskPrediction
pub const DEFAULT_REPORTING_THRESHOLD: f32 = 0.1;

/// Multiplier applied to suppressed hazards (earthquake)
pub const DEFAULT_EARTHQUAKE_RISK_MULTIPLIER: f32 = 0.05;

/// Configurable upper bound for suppressed hazards.
/// Never exceeds `HARD_SUPPRESSION_CEILING` in model::threshold.
pub const DEFAULT_EARTHQUAKE_RISK_CEILING: f32 = 0.05;

/// Default training parameters
pub const DEFAULT_TRAINING_EPOCHS: usize = 100;
pub const DEFAULT_TRAINING_BATCH_SIZE: usize = 32;
pub const DEFAULT_TRAINING_SAMPLES: usize = 10_000;

/// Default units for weather requests
pub const DEFAULT_WEATHER_UNITS: &str = "metric";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name (also the data directory name)
pub const APP_NAME: &str = "hazard-risk";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Like `env_parse`, but "NaN" and "inf" fall back too
fn env_finite(key: &str) -> Option<f32> {
    env_parse::<f32>(key).filter(|v| v.is_finite())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Get ingestion interval from environment or use default
pub fn get_ingestion_interval() -> u64 {
    env_parse("INGESTION_INTERVAL_SECS").unwrap_or(DEFAULT_INGESTION_INTERVAL)
}

pub fn get_feed_lookback_days() -> u32 {
    env_parse("FEED_LOOKBACK_DAYS").unwrap_or(DEFAULT_FEED_LOOKBACK_DAYS)
}

pub fn get_feed_limit() -> usize {
    env_parse("FEED_LIMIT").unwrap_or(DEFAULT_FEED_LIMIT)
}

pub fn get_fetch_timeout() -> u64 {
    env_parse("FETCH_TIMEOUT_SECS").unwrap_or(DEFAULT_FETCH_TIMEOUT)
}

pub fn get_reporting_threshold() -> f32 {
    env_finite("REPORTING_THRESHOLD").unwrap_or(DEFAULT_REPORTING_THRESHOLD)
}

/// Full-scale earthquake predictions are off unless explicitly enabled
pub fn is_earthquake_prediction_allowed() -> bool {
    env_flag("ALLOW_EARTHQUAKE_PREDICTIONS").unwrap_or(false)
}

pub fn get_earthquake_multiplier() -> f32 {
    env_finite("EARTHQUAKE_RISK_MULTIPLIER").unwrap_or(DEFAULT_EARTHQUAKE_RISK_MULTIPLIER)
}

pub fn get_earthquake_ceiling() -> f32 {
    env_finite("EARTHQUAKE_RISK_CEILING").unwrap_or(DEFAULT_EARTHQUAKE_RISK_CEILING)
}

pub fn get_training_epochs() -> usize {
    env_parse("TRAINING_EPOCHS").unwrap_or(DEFAULT_TRAINING_EPOCHS)
}

pub fn get_training_batch_size() -> usize {
    env_parse("TRAINING_BATCH_SIZE").unwrap_or(DEFAULT_TRAINING_BATCH_SIZE)
}

pub fn get_training_samples() -> usize {
    env_parse("TRAINING_SAMPLES").unwrap_or(DEFAULT_TRAINING_SAMPLES)
}

pub fn is_train_on_startup() -> bool {
    env_flag("TRAIN_ON_STARTUP").unwrap_or(false)
}

pub fn get_weather_units() -> String {
    env_string("WEATHER_UNITS").unwrap_or_else(|| DEFAULT_WEATHER_UNITS.to_string())
}

pub fn get_openweather_api_key() -> Option<String> {
    env_string("OPENWEATHER_API_KEY")
}

pub fn get_gemini_api_key() -> Option<String> {
    env_string("GEMINI_API_KEY")
}

/// Model directory: `MODEL_DIR` or `<local data dir>/hazard-risk/models`
pub fn get_model_dir() -> std::path::PathBuf {
    env_string("MODEL_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(APP_NAME)
                .join("models")
        })
}
