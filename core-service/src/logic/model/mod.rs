//! Model Module - Hazard Inference Engine
//!
//! A single parameterized model type serves all hazards. Training, artifact
//! persistence, and the suppression clamp live here; orchestration across
//! hazards is in `registry`.

pub mod error;
pub mod hazard_model;
pub mod network;
pub mod normalization;
pub mod threshold;
pub mod training;


// Re-export common types
pub use error::{HazardError, HazardResult};
pub use hazard_model::{HazardModel, ModelArtifact, ModelState, ModelStatus};
pub use threshold::{classify_severity, Severity, SuppressionPolicy, HARD_SUPPRESSION_CEILING};
pub use training::{LabelSource, SyntheticLabels, TrainingConfig, TrainingReport, TrainingSet};
