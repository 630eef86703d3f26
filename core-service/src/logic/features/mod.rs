//! Features Module - Hazard Feature Mapping
//!
//! Schemas live in `layout`; `mapper` turns a weather observation into the
//! vector a hazard model expects.

pub mod layout;
pub mod mapper;

#[cfg(test)]
mod tests;

pub use layout::{HazardFeatureSchema, HazardType, LayoutInfo, SCHEMA_VERSION};
pub use mapper::map_features;
