//! Hazard pipeline errors

use thiserror::Error;

use crate::logic::features::HazardType;
use crate::logic::weather::WeatherAttribute;

pub type HazardResult<T> = Result<T, HazardError>;

#[derive(Debug, Error)]
pub enum HazardError {
    /// Observation lacks (or has a non-finite) attribute the schema needs
    #[error("{hazard}: observation is missing '{attribute}'")]
    MissingAttribute {
        hazard: HazardType,
        attribute: WeatherAttribute,
    },

    /// No weights loaded or trained yet
    #[error("{0} model is not ready")]
    NotReady(HazardType),

    /// Wrong feature count or non-finite input/output at inference
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{hazard} training failed: {reason}")]
    TrainingFailure { hazard: HazardType, reason: String },

    #[error("suppression failed: {0}")]
    SuppressionError(String),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for HazardError {
    fn from(err: std::io::Error) -> Self {
        HazardError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for HazardError {
    fn from(err: serde_json::Error) -> Self {
        HazardError::InvalidArtifact(err.to_string())
    }
}
