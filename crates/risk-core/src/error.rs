//! Error types for the classification core.

use thiserror::Error;

/// Input shape or attribute problems.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("altitude array has {altitudes} entries but {points} points were given")]
    AltitudeLengthMismatch { points: usize, altitudes: usize },
    #[error("unknown airspace class {0:?}")]
    UnknownAirspaceClass(String),
}

/// Outcome of the airspace hierarchy resolver when it cannot produce a class set.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ResolveError {
    #[error("ground elevation unavailable at ({lon:.6}, {lat:.6})")]
    ElevationUnavailable { lon: f64, lat: f64 },
}
