//! Training data and configuration
//!
//! Label provenance is pluggable through `LabelSource`. `SyntheticLabels`
//! samples plausible weather per hazard and scores it with a hand-written
//! risk formula. It is a bootstrap default, not ground truth.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::{HazardError, HazardResult};
use crate::logic::features::HazardType;

/// Seed for the reproducible train/evaluation split
pub const SPLIT_SEED: u64 = 42;

/// Fraction of samples held out for evaluation
pub const EVAL_FRACTION: f32 = 0.2;

// ============================================================================
// TRAINING SET
// ============================================================================

/// Labeled feature vectors in schema order; labels are probabilities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
}

impl TrainingSet {
    pub fn new(features: Vec<Vec<f32>>, labels: Vec<f32>) -> Self {
        Self { features, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Seeded shuffle, then (train, evaluation) with `eval_fraction` held out
    pub fn split(&self, eval_fraction: f32, seed: u64) -> (TrainingSet, TrainingSet) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let eval_len = ((self.len() as f32) * eval_fraction.clamp(0.0, 1.0)).round() as usize;
        let (eval_idx, train_idx) = order.split_at(eval_len.min(self.len()));

        (self.subset(train_idx), self.subset(eval_idx))
    }

    fn subset(&self, indices: &[usize]) -> TrainingSet {
        TrainingSet {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Validate and convert; every row must have `feature_count` finite values
    pub fn to_arrays(&self, hazard: HazardType, feature_count: usize) -> HazardResult<(Array2<f32>, Array1<f32>)> {
        let fail = |reason: String| HazardError::TrainingFailure { hazard, reason };

        if self.is_empty() {
            return Err(fail("training set is empty".to_string()));
        }
        if self.features.len() != self.labels.len() {
            return Err(fail(format!(
                "{} feature rows but {} labels",
                self.features.len(),
                self.labels.len()
            )));
        }
        if let Some(row) = self.features.iter().position(|r| r.len() != feature_count) {
            return Err(fail(format!("row {} does not have {} features", row, feature_count)));
        }
        if self.features.iter().flatten().any(|v| !v.is_finite()) {
            return Err(fail("features contain non-finite values".to_string()));
        }
        if self.labels.iter().any(|l| !(0.0..=1.0).contains(l)) {
            return Err(fail("labels must lie in [0, 1]".to_string()));
        }

        let flat: Vec<f32> = self.features.iter().flatten().copied().collect();
        let features = Array2::from_shape_vec((self.len(), feature_count), flat)
            .map_err(|e| fail(e.to_string()))?;
        Ok((features, Array1::from_vec(self.labels.clone())))
    }
}

// ============================================================================
// CONFIG / REPORT
// ============================================================================

/// Network shape and optimiser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f32,
    /// Seeds weight init and batch shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            learning_rate: 0.001,
            seed: SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub hazard: HazardType,
    pub epochs: usize,
    pub train_samples: usize,
    pub eval_samples: usize,
    pub train_loss: f32,
    pub eval_loss: Option<f32>,
    pub trained_at: DateTime<Utc>,
    /// Artifact saved; set by the registry
    pub persisted: bool,
}

// ============================================================================
// LABEL SOURCES
// ============================================================================

pub trait LabelSource: Send + Sync {
    fn generate(&self, hazard: HazardType, samples: usize) -> TrainingSet;
}

/// Seeded synthetic generator
#[derive(Debug, Clone)]
pub struct SyntheticLabels {
    seed: u64,
}

impl SyntheticLabels {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SyntheticLabels {
    fn default() -> Self {
        Self::new(SPLIT_SEED)
    }
}

impl LabelSource for SyntheticLabels {
    fn generate(&self, hazard: HazardType, samples: usize) -> TrainingSet {
        // Distinct stream per hazard so sets stay independent
        let mut rng = StdRng::seed_from_u64(self.seed ^ (hazard as u64 + 1).wrapping_mul(0x9E37_79B9));
        let mut set = TrainingSet::default();
        for _ in 0..samples {
            let (row, label) = synthetic_sample(hazard, &mut rng);
            set.features.push(row);
            set.labels.push(label.clamp(0.0, 1.0));
        }
        set
    }
}

/// One row in schema order plus its risk label
fn synthetic_sample(hazard: HazardType, rng: &mut StdRng) -> (Vec<f32>, f32) {
    let mut u = |lo: f32, hi: f32| rng.gen_range(lo..hi);

    match hazard {
        HazardType::Flood => {
            let (t, h, p) = (u(-10.0, 40.0), u(20.0, 100.0), u(900.0, 1100.0));
            let (ws, pr, vis, cc) = (u(0.0, 50.0), u(0.0, 100.0), u(0.0, 20.0), u(0.0, 100.0));
            let risk = (pr / 50.0) * (1.0 - vis / 20.0) * (h / 100.0);
            (vec![t, h, p, ws, pr, vis, cc], risk.min(1.0))
        }
        HazardType::Wildfire => {
            let (t, h, ws) = (u(10.0, 50.0), u(10.0, 80.0), u(0.0, 40.0));
            let (pr, vis) = (u(0.0, 20.0), u(5.0, 25.0));
            let risk = (t / 50.0) * (1.0 - h / 100.0) * (1.0 - pr / 20.0);
            (vec![t, h, ws, pr, vis], risk.min(1.0))
        }
        HazardType::Storm => {
            let (t, h, p) = (u(-20.0, 35.0), u(30.0, 100.0), u(850.0, 1050.0));
            let (ws, wd, cc) = (u(0.0, 60.0), u(0.0, 360.0), u(20.0, 100.0));
            let risk = (ws / 60.0) * (1.0 - p / 1100.0) * (h / 100.0);
            (vec![t, h, p, ws, wd, cc], risk.min(1.0))
        }
        HazardType::Earthquake => {
            let (p, ws, t) = (u(900.0, 1100.0), u(0.0, 30.0), u(-10.0, 40.0));
            let (h, cc) = (u(30.0, 100.0), u(0.0, 100.0));
            let risk = (1.0 - p / 1100.0) * (ws / 30.0) * 0.3;
            (vec![p, ws, t, h, cc], risk.min(1.0))
        }
        HazardType::Tornado => {
            let (t, h, p) = (u(15.0, 35.0), u(40.0, 90.0), u(950.0, 1020.0));
            let (ws, wd, cc) = (u(0.0, 50.0), u(0.0, 360.0), u(60.0, 100.0));
            let risk = (ws / 50.0) * (1.0 - p / 1020.0) * (h / 90.0);
            (vec![t, h, p, ws, wd, cc], risk.min(1.0))
        }
        HazardType::Landslide => {
            let (t, h, pr) = (u(-5.0, 35.0), u(50.0, 100.0), u(0.0, 80.0));
            let (ws, p) = (u(0.0, 25.0), u(950.0, 1050.0));
            let risk = (pr / 80.0) * (ws / 25.0) * 0.7;
            (vec![t, h, pr, ws, p], risk.min(1.0))
        }
        HazardType::Drought => {
            let (t, h, pr) = (u(20.0, 45.0), u(10.0, 60.0), u(0.0, 15.0));
            let (ws, p) = (u(0.0, 20.0), u(980.0, 1030.0));
            let risk = (t / 45.0) * (1.0 - h / 60.0) * (1.0 - pr / 15.0);
            (vec![t, h, pr, ws, p], risk.min(1.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_rows_match_schema() {
        let source = SyntheticLabels::default();
        for hazard in HazardType::ALL {
            let set = source.generate(hazard, 50);
            assert_eq!(set.len(), 50);
            let width = hazard.schema().feature_count();
            assert!(set.features.iter().all(|r| r.len() == width));
            assert!(set.labels.iter().all(|l| (0.0..=1.0).contains(l)));
        }
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let a = SyntheticLabels::new(9).generate(HazardType::Storm, 20);
        let b = SyntheticLabels::new(9).generate(HazardType::Storm, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_is_disjoint_and_reproducible() {
        let set = TrainingSet::new((0..100).map(|i| vec![i as f32]).collect(), vec![0.5; 100]);

        let (train, eval) = set.split(EVAL_FRACTION, SPLIT_SEED);
        assert_eq!(train.len(), 80);
        assert_eq!(eval.len(), 20);

        let mut all: Vec<f32> = train.features.iter().chain(&eval.features).map(|r| r[0]).collect();
        all.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, (0..100).map(|i| i as f32).collect::<Vec<_>>());

        let (train_again, _) = set.split(EVAL_FRACTION, SPLIT_SEED);
        assert_eq!(train, train_again);
    }

    #[test]
    fn test_to_arrays_rejects_bad_labels() {
        let set = TrainingSet::new(vec![vec![1.0, 2.0]], vec![1.5]);
        assert!(matches!(
            set.to_arrays(HazardType::Flood, 2),
            Err(HazardError::TrainingFailure { .. })
        ));
        let set = TrainingSet::new(vec![vec![1.0]], vec![0.5]);
        assert!(set.to_arrays(HazardType::Flood, 2).is_err());
    }
}
