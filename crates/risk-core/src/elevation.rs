//! Ground elevation lookups.
//!
//! The classifier never talks to an elevation service directly; it is handed an
//! [`ElevationSource`] and receives either a value in feet or an explicit
//! [`ElevationQueryResult::Unavailable`].

use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElevationQueryResult {
    /// Ground elevation in feet above mean sea level.
    Available(f64),
    /// The lookup budget was exhausted or the service had no data.
    Unavailable,
}

impl ElevationQueryResult {
    /// Wrap a raw service value, rejecting non-finite readings.
    pub fn from_feet(value: f64) -> Self {
        if value.is_finite() {
            Self::Available(value)
        } else {
            Self::Unavailable
        }
    }
}

/// Something that can report ground elevation at a lon/lat point.
pub trait ElevationSource {
    fn elevation_ft(&self, lon: f64, lat: f64) -> impl Future<Output = ElevationQueryResult> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_readings_are_unavailable() {
        assert_eq!(
            ElevationQueryResult::from_feet(f64::NAN),
            ElevationQueryResult::Unavailable
        );
        assert_eq!(
            ElevationQueryResult::from_feet(312.5),
            ElevationQueryResult::Available(312.5)
        );
    }
}
