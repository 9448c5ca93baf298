//! Core data models for airspace risk classification.

use std::fmt;
use std::str::FromStr;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Final risk tier assigned to an evaluation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

impl RiskClass {
    /// Numeric code used in persisted results (0 = low, 1 = medium, 2 = high).
    pub fn code(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Short label used in persisted results.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LR",
            Self::Medium => "MR",
            Self::High => "HR",
        }
    }
}

/// Why a point was eliminated by a rule stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// Low-risk altitude gate.
    AltitudeAtOrAbove500,
    /// Low-risk density gate (urban area).
    UrbanArea,
    /// Low-risk aerodrome gate.
    AerodromeWithin5Nm,
    /// Low-risk airspace gate.
    NotClassG,
    /// Either airspace gate could not convert MSL bounds to AGL.
    ElevationUnavailable,
    /// Medium-risk density+altitude gate.
    AltitudeOverUrbanArea,
    /// Medium-risk aerodrome gate, aerodrome in class E/F/G and point at or above 500 ft.
    AerodromeUncontrolledAbove500,
    /// Medium-risk aerodrome gate, aerodrome in class B/C/D.
    AerodromeControlled,
    /// Medium-risk airspace gate, at or above 500 ft in B/C/D/E.
    AltitudeInControlledAirspace,
    /// Medium-risk airspace gate, active class outside B/C/D/E.
    RestrictedAirspaceClass,
}

impl StatusReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AltitudeAtOrAbove500 => ">= 500 ft AGL",
            Self::UrbanArea => "UA",
            Self::AerodromeWithin5Nm => "d_ap < 5nm",
            Self::NotClassG => "not in class G airspace",
            Self::ElevationUnavailable => "elevation unavailable",
            Self::AltitudeOverUrbanArea => "alt >= 500ft AGL over UA",
            Self::AerodromeUncontrolledAbove500 => {
                "d_ap < 5nm, in class [E,F,G] and alt >= 500ft AGL"
            }
            Self::AerodromeControlled => "d_ap < 5nm, in class [B,C,D]",
            Self::AltitudeInControlledAirspace => ">= 500 ft AGL in controlled [B,C,D,E] airspace",
            Self::RestrictedAirspaceClass => "in airspace class outside [B,C,D,E]",
        }
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regulatory airspace class. Ordering follows strictness (A strictest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AirspaceClass {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl AirspaceClass {
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
        }
    }

    /// Class D or stricter.
    pub fn is_at_least_d(self) -> bool {
        self <= Self::D
    }
}

impl fmt::Display for AirspaceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for AirspaceClass {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            "F" => Ok(Self::F),
            "G" => Ok(Self::G),
            _ => Err(ModelError::UnknownAirspaceClass(value.to_string())),
        }
    }
}

/// Vertical reference frame of an airspace bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltitudeFrame {
    /// Relative to the ground (AGL).
    Surface,
    /// Mean sea level.
    Msl,
}

impl AltitudeFrame {
    /// Map an FAA NASR altitude code. Only `SFC` is surface-referenced.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("SFC") {
            Self::Surface
        } else {
            Self::Msl
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalBound {
    pub value_ft: f64,
    pub frame: AltitudeFrame,
}

impl VerticalBound {
    pub fn surface(value_ft: f64) -> Self {
        Self {
            value_ft,
            frame: AltitudeFrame::Surface,
        }
    }

    pub fn msl(value_ft: f64) -> Self {
        Self {
            value_ft,
            frame: AltitudeFrame::Msl,
        }
    }
}

/// One controlled-airspace polygon with its vertical extent.
#[derive(Debug, Clone)]
pub struct AirspaceLayer {
    pub polygon: MultiPolygon<f64>,
    pub lower: VerticalBound,
    /// A negative value means unlimited.
    pub upper: VerticalBound,
    pub class: AirspaceClass,
}

/// Census block group polygon with its population density (persons/sq-mile).
#[derive(Debug, Clone)]
pub struct BlockGroupDensity {
    pub polygon: MultiPolygon<f64>,
    pub density: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aerodrome {
    pub lon: f64,
    pub lat: f64,
}

/// A grid point to classify.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPoint {
    pub lon: f64,
    pub lat: f64,
    pub altitude_agl_ft: f64,
}

impl EvaluationPoint {
    pub fn new(lon: f64, lat: f64, altitude_agl_ft: f64) -> Self {
        Self {
            lon,
            lat,
            altitude_agl_ft,
        }
    }
}

/// Altitude requested for a batch: one value for every point or one per point.
#[derive(Debug, Clone, PartialEq)]
pub enum AltitudeAgl {
    Uniform(f64),
    PerPoint(Vec<f64>),
}

/// Build evaluation points from lon/lat pairs and the requested altitude.
pub fn build_points(
    lonlats: &[(f64, f64)],
    altitude: &AltitudeAgl,
) -> Result<Vec<EvaluationPoint>, ModelError> {
    match altitude {
        AltitudeAgl::Uniform(alt) => Ok(lonlats
            .iter()
            .map(|&(lon, lat)| EvaluationPoint::new(lon, lat, *alt))
            .collect()),
        AltitudeAgl::PerPoint(alts) => {
            if alts.len() != lonlats.len() {
                return Err(ModelError::AltitudeLengthMismatch {
                    points: lonlats.len(),
                    altitudes: alts.len(),
                });
            }
            Ok(lonlats
                .iter()
                .zip(alts)
                .map(|(&(lon, lat), &alt)| EvaluationPoint::new(lon, lat, alt))
                .collect())
        }
    }
}

/// Final outcome for one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPoint {
    pub point: EvaluationPoint,
    pub risk_class: RiskClass,
    pub status: Option<StatusReason>,
}

/// Two-class view produced by the low-risk stage alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowRiskOutcome {
    pub point: EvaluationPoint,
    pub low_risk: bool,
    pub status: Option<StatusReason>,
}
