//! Hazard Feature Layout - Per-hazard Feature Schemas
//!
//! **CRITICAL: This file controls every model's input contract**
//!
//! ## Rules (NEVER break these):
//! 1. Add attribute to a schema → increment SCHEMA_VERSION
//! 2. Change order → increment SCHEMA_VERSION
//! 3. Remove attribute → increment SCHEMA_VERSION
//!
//! Persisted normalization parameters are positional. A model artifact whose
//! layout hash differs from the current one is stale and must be retrained.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::logic::weather::WeatherAttribute;
use WeatherAttribute::*;

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current schema version
/// MUST be incremented when any schema below changes
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// HAZARD TYPES
// ============================================================================

/// Fixed set of hazards; the tag selects the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardType {
    Flood,
    Wildfire,
    Storm,
    Earthquake,
    Tornado,
    Landslide,
    Drought,
}

impl HazardType {
    pub const ALL: [HazardType; 7] = [
        HazardType::Flood,
        HazardType::Wildfire,
        HazardType::Storm,
        HazardType::Earthquake,
        HazardType::Tornado,
        HazardType::Landslide,
        HazardType::Drought,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Flood => "flood",
            HazardType::Wildfire => "wildfire",
            HazardType::Storm => "storm",
            HazardType::Earthquake => "earthquake",
            HazardType::Tornado => "tornado",
            HazardType::Landslide => "landslide",
            HazardType::Drought => "drought",
        }
    }

    pub fn schema(&self) -> HazardFeatureSchema {
        HazardFeatureSchema {
            hazard: *self,
            attributes: schema_attributes(*self),
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        HazardType::ALL
            .into_iter()
            .find(|h| h.as_str() == wanted)
            .ok_or_else(|| format!("unknown hazard type '{}'", s))
    }
}

// ============================================================================
// SCHEMAS (Authoritative source)
// ============================================================================

const FLOOD: &[WeatherAttribute] = &[
    Temperature,   // 0
    Humidity,      // 1
    Pressure,      // 2
    WindSpeed,     // 3
    Precipitation, // 4
    Visibility,    // 5
    CloudCover,    // 6
];

const WILDFIRE: &[WeatherAttribute] = &[Temperature, Humidity, WindSpeed, Precipitation, Visibility];

const STORM: &[WeatherAttribute] = &[Temperature, Humidity, Pressure, WindSpeed, WindDirection, CloudCover];

const EARTHQUAKE: &[WeatherAttribute] = &[Pressure, WindSpeed, Temperature, Humidity, CloudCover];

const TORNADO: &[WeatherAttribute] = &[Temperature, Humidity, Pressure, WindSpeed, WindDirection, CloudCover];

const LANDSLIDE: &[WeatherAttribute] = &[Temperature, Humidity, Precipitation, WindSpeed, Pressure];

const DROUGHT: &[WeatherAttribute] = &[Temperature, Humidity, Precipitation, WindSpeed, Pressure];

fn schema_attributes(hazard: HazardType) -> &'static [WeatherAttribute] {
    match hazard {
        HazardType::Flood => FLOOD,
        HazardType::Wildfire => WILDFIRE,
        HazardType::Storm => STORM,
        HazardType::Earthquake => EARTHQUAKE,
        HazardType::Tornado => TORNADO,
        HazardType::Landslide => LANDSLIDE,
        HazardType::Drought => DROUGHT,
    }
}

/// Ordered attribute list for one hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardFeatureSchema {
    pub hazard: HazardType,
    pub attributes: &'static [WeatherAttribute],
}

impl HazardFeatureSchema {
    pub fn feature_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        self.attributes.iter().map(|a| a.as_str()).collect()
    }

    /// Get feature index by attribute
    pub fn index_of(&self, attribute: WeatherAttribute) -> Option<usize> {
        self.attributes.iter().position(|a| *a == attribute)
    }

    /// CRC32 over (version, hazard, attribute names)
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[SCHEMA_VERSION]);
        hasher.update(self.hazard.as_str().as_bytes());
        hasher.update(&[0]);
        for attribute in self.attributes {
            hasher.update(attribute.as_str().as_bytes());
            hasher.update(&[0]); // Separator
        }
        hasher.finalize()
    }

    pub fn info(&self) -> LayoutInfo {
        LayoutInfo {
            hazard: self.hazard,
            version: SCHEMA_VERSION,
            hash: self.layout_hash(),
            feature_names: self.feature_names().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Validate the version/hash recorded alongside persisted parameters
    pub fn validate(&self, version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
        let expected_hash = self.layout_hash();
        if version != SCHEMA_VERSION || hash != expected_hash {
            return Err(LayoutMismatchError {
                hazard: self.hazard,
                expected_version: SCHEMA_VERSION,
                expected_hash,
                actual_version: version,
                actual_hash: hash,
            });
        }
        Ok(())
    }
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub hazard: HazardType,
    pub version: u8,
    pub hash: u32,
    pub feature_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub hazard: HazardType,
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.hazard,
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}
