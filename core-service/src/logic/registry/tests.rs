//! Registry orchestration tests

use std::sync::Arc;

use super::*;
use crate::logic::model::threshold::HARD_SUPPRESSION_CEILING;
use crate::logic::model::training::SyntheticLabels;
use crate::logic::weather::{Coordinates, WeatherAttribute, WeatherObservation};

fn quick_registry(store: Arc<dyn ModelStore>) -> HazardRegistry {
    HazardRegistry::new(store, Arc::new(SyntheticLabels::default())).with_training(
        TrainingConfig {
            hidden_layers: vec![8],
            learning_rate: 0.01,
            seed: 5,
        },
        120,
    )
}

fn observation() -> WeatherObservation {
    WeatherObservation::new("Dallas, TX", Coordinates::new(32.78, -96.80))
        .with(WeatherAttribute::Temperature, 31.0)
        .with(WeatherAttribute::Humidity, 55.0)
        .with(WeatherAttribute::Pressure, 1002.0)
        .with(WeatherAttribute::WindSpeed, 18.0)
        .with(WeatherAttribute::WindDirection, 180.0)
        .with(WeatherAttribute::Precipitation, 4.0)
        .with(WeatherAttribute::Visibility, 9.0)
        .with(WeatherAttribute::CloudCover, 75.0)
}

/// Returns rows of the wrong width for one hazard
struct BrokenFor(HazardType);

impl LabelSource for BrokenFor {
    fn generate(&self, hazard: HazardType, samples: usize) -> TrainingSet {
        let set = SyntheticLabels::default().generate(hazard, samples);
        if hazard == self.0 {
            TrainingSet::new(vec![vec![1.0]; samples], set.labels)
        } else {
            set
        }
    }
}

struct ReadOnlyStore;

impl ModelStore for ReadOnlyStore {
    fn load(&self, _hazard: HazardType) -> HazardResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn save(&self, _hazard: HazardType, _bytes: &[u8]) -> HazardResult<()> {
        Err(HazardError::Persistence("read-only".to_string()))
    }
}

#[test]
fn test_initialize_with_empty_store() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    let states = registry.initialize();

    assert_eq!(states.len(), 7);
    assert!(states.values().all(|s| *s == ModelState::Uninitialized));
    assert!(registry.predict_all(&observation()).is_empty());
}

#[test]
fn test_train_all_persists_and_reloads() {
    let store = Arc::new(MemoryModelStore::new());
    let registry = quick_registry(store.clone());

    let outcomes = registry.train_all(2, 32);
    assert!(outcomes.values().all(|o| o.as_ref().map(|r| r.persisted).unwrap_or(false)));
    assert!(HazardType::ALL.iter().all(|h| store.contains(*h)));

    let fresh = quick_registry(store);
    let states = fresh.initialize();
    assert!(states.values().all(|s| *s == ModelState::Loaded));
    assert_eq!(fresh.predict_all(&observation()), registry.predict_all(&observation()));
}

#[test]
fn test_training_failure_is_isolated() {
    let registry = HazardRegistry::new(
        Arc::new(MemoryModelStore::new()),
        Arc::new(BrokenFor(HazardType::Storm)),
    )
    .with_training(TrainingConfig { hidden_layers: vec![4], ..Default::default() }, 60);

    let outcomes = registry.train_all(1, 16);
    assert!(matches!(
        outcomes.get(&HazardType::Storm),
        Some(Err(HazardError::TrainingFailure { .. }))
    ));
    assert_eq!(outcomes.values().filter(|o| o.is_ok()).count(), 6);

    let scores = registry.predict_all(&observation());
    assert!(!scores.contains_key(&HazardType::Storm));
    assert_eq!(scores.len(), 6);
}

#[test]
fn test_persistence_failure_keeps_model_live() {
    let registry = quick_registry(Arc::new(ReadOnlyStore));
    let report = registry.train_one(HazardType::Flood, 1, 32).unwrap();

    assert!(!report.persisted);
    assert_eq!(registry.states()[&HazardType::Flood], ModelState::Trained);
    assert!(registry.predict_all(&observation()).contains_key(&HazardType::Flood));
}

#[test]
fn test_training_one_hazard_leaves_others_untouched() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    registry.train_all(2, 32);

    let storm_before = registry.model(HazardType::Storm).unwrap().serialize().unwrap();
    let scores_before = registry.predict_all(&observation());

    registry.train_one(HazardType::Flood, 3, 16).unwrap();

    let storm_after = registry.model(HazardType::Storm).unwrap().serialize().unwrap();
    let scores_after = registry.predict_all(&observation());
    assert_eq!(storm_before, storm_after);
    assert_eq!(scores_before[&HazardType::Storm], scores_after[&HazardType::Storm]);
}

#[test]
fn test_unready_hazards_are_absent_not_zero() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    registry.train_one(HazardType::Wildfire, 2, 32).unwrap();

    let scores = registry.predict_all(&observation());
    assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![HazardType::Wildfire]);
}

#[test]
fn test_missing_attribute_only_drops_that_hazard() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    registry.train_all(1, 32);

    let mut partial = observation();
    partial.visibility = None;

    // flood and wildfire need visibility
    let scores = registry.predict_all(&partial);
    assert!(!scores.contains_key(&HazardType::Flood));
    assert!(!scores.contains_key(&HazardType::Wildfire));
    assert_eq!(scores.len(), 5);
}

#[test]
fn test_earthquake_is_suppressed() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    registry.train_one(HazardType::Earthquake, 2, 32).unwrap();

    for pressure in [880.0, 950.0, 1013.0] {
        let obs = observation()
            .with(WeatherAttribute::Pressure, pressure)
            .with(WeatherAttribute::WindSpeed, 29.0);
        let score = registry.predict_all(&obs)[&HazardType::Earthquake];
        assert!(score <= HARD_SUPPRESSION_CEILING, "score {}", score);
        assert!(score >= 0.0);
    }
}

#[test]
fn test_broken_policy_reports_zero() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new())).with_policy(SuppressionPolicy {
        multiplier: f32::NAN,
        ..SuppressionPolicy::earthquake()
    });
    registry.train_one(HazardType::Earthquake, 1, 32).unwrap();

    assert_eq!(registry.predict_all(&observation())[&HazardType::Earthquake], 0.0);
}

#[test]
fn test_predict_all_is_deterministic() {
    let registry = quick_registry(Arc::new(MemoryModelStore::new()));
    registry.train_all(2, 32);

    let first = registry.predict_all(&observation());
    let second = registry.predict_all(&observation());
    assert_eq!(first.len(), 7);
    for (hazard, score) in &first {
        assert_eq!(score.to_bits(), second[hazard].to_bits());
    }
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let registry = quick_registry(Arc::new(FileModelStore::new(dir.path())));
    registry.train_one(HazardType::Drought, 1, 32).unwrap();

    let restarted = quick_registry(Arc::new(FileModelStore::new(dir.path())));
    let states = restarted.initialize();
    assert_eq!(states[&HazardType::Drought], ModelState::Loaded);
    assert_eq!(states[&HazardType::Flood], ModelState::Uninitialized);
    assert_eq!(restarted.model_statuses().len(), 7);
    assert_eq!(restarted.servable_count(), 1);
}
