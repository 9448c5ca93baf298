//! Thresholds used by the risk rule chains.

use serde::{Deserialize, Serialize};

use crate::models::AirspaceClass;

/// Configuration for the classification rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Points at or above this altitude (ft AGL) are never low risk
    pub altitude_limit_ft: f64,
    /// Block groups at or above this density (persons/sq-mile) are urban
    pub urban_density: f64,
    /// Aerodrome proximity radius in nautical miles
    pub aerodrome_radius_nm: f64,
    /// Replacement for negative ("unlimited") upper bounds
    pub unlimited_ceiling_ft: f64,
    /// Controlled classes tolerated by the medium-risk airspace gate
    pub medium_allowed_classes: Vec<AirspaceClass>,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            altitude_limit_ft: 500.0,
            urban_density: 100.0,
            aerodrome_radius_nm: 5.0,
            unlimited_ceiling_ft: 60_000.0,
            medium_allowed_classes: vec![
                AirspaceClass::B,
                AirspaceClass::C,
                AirspaceClass::D,
                AirspaceClass::E,
            ],
        }
    }
}

impl RiskThresholds {
    pub fn above_altitude_limit(&self, altitude_agl_ft: f64) -> bool {
        altitude_agl_ft >= self.altitude_limit_ft
    }

    /// Absent density is never urban.
    pub fn is_urban(&self, density: Option<f64>) -> bool {
        density.is_some_and(|d| d >= self.urban_density)
    }

    pub fn near_aerodrome(&self, distance_nm: f64) -> bool {
        distance_nm < self.aerodrome_radius_nm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive_where_rules_say_so() {
        let rules = RiskThresholds::default();
        assert!(rules.above_altitude_limit(500.0));
        assert!(!rules.above_altitude_limit(499.9));
        assert!(rules.is_urban(Some(100.0)));
        assert!(!rules.is_urban(Some(99.0)));
        assert!(!rules.is_urban(None));
        assert!(rules.near_aerodrome(4.99));
        assert!(!rules.near_aerodrome(5.0));
    }
}
