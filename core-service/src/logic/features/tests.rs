//! Feature schema and mapper tests

use super::layout::*;
use super::mapper::map_features;
use crate::logic::model::error::HazardError;
use crate::logic::weather::{Coordinates, WeatherAttribute, WeatherObservation};

fn full_observation() -> WeatherObservation {
    WeatherObservation::new("Phoenix", Coordinates::new(33.45, -112.07))
        .with(WeatherAttribute::Temperature, 35.0)
        .with(WeatherAttribute::Humidity, 15.0)
        .with(WeatherAttribute::Pressure, 1008.0)
        .with(WeatherAttribute::WindSpeed, 30.0)
        .with(WeatherAttribute::WindDirection, 220.0)
        .with(WeatherAttribute::Precipitation, 0.0)
        .with(WeatherAttribute::Visibility, 20.0)
        .with(WeatherAttribute::CloudCover, 10.0)
}

#[test]
fn test_wildfire_vector_order() {
    let features = map_features(&full_observation(), HazardType::Wildfire).unwrap();
    assert_eq!(features, vec![35.0, 15.0, 30.0, 0.0, 20.0]);
}

#[test]
fn test_every_hazard_maps_full_observation() {
    let observation = full_observation();
    for hazard in HazardType::ALL {
        let features = map_features(&observation, hazard).unwrap();
        assert_eq!(features.len(), hazard.schema().feature_count());
    }
}

#[test]
fn test_missing_attribute_is_surfaced() {
    let mut observation = full_observation();
    observation.visibility = None;

    match map_features(&observation, HazardType::Wildfire) {
        Err(HazardError::MissingAttribute { hazard, attribute }) => {
            assert_eq!(hazard, HazardType::Wildfire);
            assert_eq!(attribute, WeatherAttribute::Visibility);
        }
        other => panic!("expected MissingAttribute, got {:?}", other),
    }

    // storm does not use visibility
    assert!(map_features(&observation, HazardType::Storm).is_ok());
}

#[test]
fn test_non_finite_attribute_rejected() {
    let observation = full_observation().with(WeatherAttribute::Humidity, f32::NAN);
    assert!(matches!(
        map_features(&observation, HazardType::Drought),
        Err(HazardError::MissingAttribute { .. })
    ));
}

#[test]
fn test_layout_hashes_are_distinct_per_hazard() {
    // storm and tornado share attributes; the hazard name keeps hashes apart
    let storm = HazardType::Storm.schema();
    let tornado = HazardType::Tornado.schema();
    assert_eq!(storm.attributes, tornado.attributes);
    assert_ne!(storm.layout_hash(), tornado.layout_hash());
    assert_eq!(storm.layout_hash(), HazardType::Storm.schema().layout_hash());
}

#[test]
fn test_validate_layout() {
    let schema = HazardType::Flood.schema();
    assert!(schema.validate(SCHEMA_VERSION, schema.layout_hash()).is_ok());
    assert!(schema.validate(SCHEMA_VERSION + 1, schema.layout_hash()).is_err());
    assert!(schema.validate(SCHEMA_VERSION, schema.layout_hash() ^ 1).is_err());
}

#[test]
fn test_hazard_type_parse() {
    assert_eq!("Wildfire".parse::<HazardType>().unwrap(), HazardType::Wildfire);
    assert!("volcano".parse::<HazardType>().is_err());
    assert_eq!(HazardType::Earthquake.schema().index_of(WeatherAttribute::Pressure), Some(0));
}
