//! Airspace risk classification for unmanned aircraft operations.
//!
//! Points are sorted into low, medium and high risk tiers from population
//! density, aerodrome proximity and the controlled-airspace structure at the
//! requested altitude.

pub mod airspace;
pub mod classifier;
pub mod density;
pub mod elevation;
pub mod error;
pub mod low_risk;
pub mod medium_risk;
pub mod models;
pub mod rules;
pub mod spatial;
pub mod stage;

pub use airspace::{
    active_classes_at, resolve, resolve_candidates, ActiveClasses, AirspaceIndex, AirspaceStack,
    ResolvedAirspace,
};
pub use classifier::{ClassificationReport, RiskClassifier};
pub use density::DensityResolver;
pub use elevation::{ElevationQueryResult, ElevationSource};
pub use error::{ModelError, ResolveError};
pub use low_risk::LowRiskClassifier;
pub use medium_risk::MediumRiskClassifier;
pub use models::{
    build_points, Aerodrome, AirspaceClass, AirspaceLayer, AltitudeAgl, AltitudeFrame,
    BlockGroupDensity, ClassifiedPoint, EvaluationPoint, LowRiskOutcome, RiskClass, StatusReason,
    VerticalBound,
};
pub use rules::RiskThresholds;
pub use spatial::{distance_nm, haversine_distance, AerodromeIndex, NearestAerodrome, PolygonIndex};
pub use stage::{Elimination, ReferenceLayers, RuleContext, StagePartition};
