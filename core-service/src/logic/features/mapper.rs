//! Hazard Feature Mapper
//!
//! Observation → ordered feature vector for one hazard. A missing or
//! non-finite attribute is an error; nothing is defaulted.

use super::layout::HazardType;
use crate::logic::model::error::{HazardError, HazardResult};
use crate::logic::weather::WeatherObservation;

pub fn map_features(observation: &WeatherObservation, hazard: HazardType) -> HazardResult<Vec<f32>> {
    hazard
        .schema()
        .attributes
        .iter()
        .map(|&attribute| match observation.get(attribute) {
            Some(value) if value.is_finite() => Ok(value),
            _ => Err(HazardError::MissingAttribute { hazard, attribute }),
        })
        .collect()
}
