//! Hazard Risk Core
//!
//! Scores live weather observations against independent hazard models and
//! publishes risk predictions to subscribers in near-real-time.

pub mod constants;
pub mod logic;
