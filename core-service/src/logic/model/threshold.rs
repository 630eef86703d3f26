//! Risk Thresholds
//!
//! Severity tiers, the reporting threshold, and the suppression clamp applied
//! to hazards whose weather-only signal is not trustworthy (earthquake).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{HazardError, HazardResult};
use crate::constants;
use crate::logic::features::HazardType;

/// Suppressed scores never exceed this, whatever the configuration says
pub const HARD_SUPPRESSION_CEILING: f32 = 0.05;

/// Scores above this are reported as high probability in stats
pub const HIGH_PROBABILITY: f32 = 0.7;

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// low < 0.2 <= medium < 0.4 <= high < 0.7 <= critical (NaN -> low)
pub fn classify_severity(score: f32) -> Severity {
    match score {
        s if s >= 0.7 => Severity::Critical,
        s if s >= 0.4 => Severity::High,
        s if s >= 0.2 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Strictly above the threshold
pub fn is_reportable(score: f32, threshold: f32) -> bool {
    score > threshold
}

// ============================================================================
// SUPPRESSION POLICY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionPolicy {
    pub hazard: HazardType,
    /// Pass raw scores through unmodified
    pub allow_full_scale: bool,
    pub multiplier: f32,
    /// Can lower the hard ceiling, never raise it
    pub ceiling: f32,
}

impl SuppressionPolicy {
    /// Earthquake policy with default multiplier and ceiling
    pub fn earthquake() -> Self {
        Self {
            hazard: HazardType::Earthquake,
            allow_full_scale: false,
            multiplier: constants::DEFAULT_EARTHQUAKE_RISK_MULTIPLIER,
            ceiling: constants::DEFAULT_EARTHQUAKE_RISK_CEILING,
        }
    }

    /// Earthquake policy from ALLOW_EARTHQUAKE_PREDICTIONS / EARTHQUAKE_RISK_*
    pub fn earthquake_from_env() -> Self {
        Self {
            hazard: HazardType::Earthquake,
            allow_full_scale: constants::is_earthquake_prediction_allowed(),
            multiplier: constants::get_earthquake_multiplier(),
            ceiling: constants::get_earthquake_ceiling(),
        }
    }

    pub fn try_apply(&self, raw: f32) -> HazardResult<f32> {
        if !raw.is_finite() {
            return Err(HazardError::SuppressionError(format!("raw score {} is not finite", raw)));
        }
        if self.allow_full_scale {
            return Ok(raw.clamp(0.0, 1.0));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(HazardError::SuppressionError(format!(
                "invalid multiplier {}",
                self.multiplier
            )));
        }
        if !self.ceiling.is_finite() {
            return Err(HazardError::SuppressionError(format!("invalid ceiling {}", self.ceiling)));
        }

        let scaled = (raw * self.multiplier).min(self.ceiling);
        Ok(scaled.min(HARD_SUPPRESSION_CEILING).max(0.0))
    }

    /// Any fault degrades to exactly zero
    pub fn apply(&self, raw: f32) -> f32 {
        match self.try_apply(raw) {
            Ok(score) => score,
            Err(e) => {
                log::warn!("{} suppression failed, reporting 0: {}", self.hazard, e);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_breakpoints() {
        let cases = [
            (0.0, Severity::Low),
            (0.19, Severity::Low),
            (0.20, Severity::Medium),
            (0.39, Severity::Medium),
            (0.40, Severity::High),
            (0.69, Severity::High),
            (0.70, Severity::Critical),
            (1.0, Severity::Critical),
        ];
        for (score, expected) in cases {
            assert_eq!(classify_severity(score), expected, "score {}", score);
        }
        assert_eq!(classify_severity(f32::NAN), Severity::Low);
    }

    #[test]
    fn test_severity_is_monotone() {
        let mut previous = Severity::Low;
        for i in 0..=1000 {
            let tier = classify_severity(i as f32 / 1000.0);
            assert!(tier >= previous);
            previous = tier;
        }
    }

    #[test]
    fn test_suppression_never_exceeds_ceiling() {
        let policy = SuppressionPolicy {
            multiplier: 50.0,
            ceiling: 0.9,
            ..SuppressionPolicy::earthquake()
        };
        for i in 0..=100 {
            let score = policy.apply(i as f32 / 100.0);
            assert!(score <= HARD_SUPPRESSION_CEILING);
            assert!(score >= 0.0);
        }
        assert_eq!(policy.apply(1.0), HARD_SUPPRESSION_CEILING);
    }

    #[test]
    fn test_suppression_default_scaling() {
        let policy = SuppressionPolicy::earthquake();
        assert!((policy.apply(0.8) - 0.04).abs() < 1e-6);
        assert_eq!(policy.apply(0.0), 0.0);
    }

    #[test]
    fn test_lower_ceiling_is_respected() {
        let policy = SuppressionPolicy {
            multiplier: 1.0,
            ceiling: 0.01,
            ..SuppressionPolicy::earthquake()
        };
        assert_eq!(policy.apply(0.5), 0.01);
    }

    #[test]
    fn test_suppression_faults_degrade_to_zero() {
        let policy = SuppressionPolicy::earthquake();
        assert_eq!(policy.apply(f32::NAN), 0.0);
        assert_eq!(policy.apply(f32::INFINITY), 0.0);

        let broken = SuppressionPolicy {
            multiplier: f32::NAN,
            ..SuppressionPolicy::earthquake()
        };
        assert!(broken.try_apply(0.5).is_err());
        assert_eq!(broken.apply(0.5), 0.0);

        let negative = SuppressionPolicy {
            multiplier: -1.0,
            ..SuppressionPolicy::earthquake()
        };
        assert_eq!(negative.apply(0.5), 0.0);
    }

    #[test]
    fn test_full_scale_passthrough() {
        let policy = SuppressionPolicy {
            allow_full_scale: true,
            ..SuppressionPolicy::earthquake()
        };
        assert_eq!(policy.apply(0.83), 0.83);
    }

    #[test]
    fn test_reporting_threshold_is_strict() {
        assert!(!is_reportable(0.1, 0.1));
        assert!(is_reportable(0.1001, 0.1));
    }
}
