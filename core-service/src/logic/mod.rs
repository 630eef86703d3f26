//! Logic Module - Business Logic & Engines
//!
//! ## Layout
//! - `weather/`, `feeds/` - external collaborators (observations, declarations, events)
//! - `features/` - hazard feature schemas and the observation -> vector mapper
//! - `model/` - hazard model (normalization, network, training, safety clamp)
//! - `registry/` - owns all hazard models, persistence, batch inference
//! - `ingestion/` - periodic ingestion loop, caches, prediction log
//! - `events` - topic broadcast fan-out
//! - `service` - on-demand analysis sharing the same state

pub mod config;
pub mod events;
pub mod feeds;
pub mod features;
pub mod ingestion;
pub mod model;
pub mod narrative;
pub mod registry;
pub mod service;
pub mod state;
pub mod weather;
