//! Monitored Locations
//!
//! Cities polled every ingestion cycle.

use super::types::MonitoredLocation;

const DEFAULT_LOCATIONS: &[(&str, f64, f64)] = &[
    ("San Francisco, CA", 37.7749, -122.4194),
    ("Los Angeles, CA", 34.0522, -118.2437),
    ("Miami, FL", 25.7617, -80.1918),
    ("New York, NY", 40.7128, -74.0060),
    ("Houston, TX", 29.7604, -95.3698),
    ("Seattle, WA", 47.6062, -122.3321),
    ("New Orleans, LA", 29.9511, -90.0715),
    ("Portland, OR", 45.5152, -122.6784),
    ("Chicago, IL", 41.8781, -87.6298),
    ("Denver, CO", 39.7392, -104.9903),
];

pub fn default_locations() -> Vec<MonitoredLocation> {
    DEFAULT_LOCATIONS
        .iter()
        .map(|(name, lat, lng)| MonitoredLocation::new(*name, *lat, *lng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations() {
        let locations = default_locations();
        assert_eq!(locations.len(), 10);
        assert!(locations.iter().any(|l| l.name == "Denver, CO"));
    }
}
