//! Airspace hierarchy resolution.
//!
//! For one point, collect every controlled-airspace layer whose polygon contains
//! it (the *stack*), bring each layer's vertical bounds into the AGL frame and
//! report which classes are active at the requested altitude.
//!
//! Stacks are plain values built per point and dropped after resolution, so
//! resolving many points concurrently shares nothing but the read-only layer
//! index.

use std::collections::{BTreeSet, HashMap};

use futures::stream::{self, StreamExt};

use crate::elevation::{ElevationQueryResult, ElevationSource};
use crate::error::ResolveError;
use crate::models::{AirspaceClass, AirspaceLayer, AltitudeFrame, EvaluationPoint, VerticalBound};
use crate::spatial::PolygonIndex;

pub type AirspaceIndex = PolygonIndex<AirspaceLayer>;

impl PolygonIndex<AirspaceLayer> {
    /// Every layer whose polygon contains the point.
    pub fn stack_at(&self, lon: f64, lat: f64) -> AirspaceStack<'_> {
        AirspaceStack::new(
            self.containing(lon, lat)
                .into_iter()
                .filter_map(|idx| self.get(idx))
                .collect(),
        )
    }
}

/// Layers overlapping a single point. Empty means class G at every altitude.
#[derive(Debug, Clone, Default)]
pub struct AirspaceStack<'a> {
    layers: Vec<&'a AirspaceLayer>,
}

impl<'a> AirspaceStack<'a> {
    pub fn new(layers: Vec<&'a AirspaceLayer>) -> Self {
        Self { layers }
    }

    /// True when some bound is MSL-referenced and ground elevation is needed.
    pub fn needs_elevation(&self) -> bool {
        self.layers.iter().any(|layer| {
            layer.lower.frame == AltitudeFrame::Msl || layer.upper.frame == AltitudeFrame::Msl
        })
    }

    /// Strictest class present at any altitude; class G when the stack is empty.
    pub fn representative_class(&self) -> AirspaceClass {
        self.layers
            .iter()
            .map(|layer| layer.class)
            .min()
            .unwrap_or(AirspaceClass::G)
    }
}

/// Distinct controlled classes active at one altitude. Empty means class G.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveClasses(BTreeSet<AirspaceClass>);

impl ActiveClasses {
    pub fn is_uncontrolled(&self) -> bool {
        self.0.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = AirspaceClass> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, class: AirspaceClass) -> bool {
        self.0.contains(&class)
    }

    pub fn all_within(&self, allowed: &[AirspaceClass]) -> bool {
        self.0.iter().all(|class| allowed.contains(class))
    }
}

impl FromIterator<AirspaceClass> for ActiveClasses {
    fn from_iter<I: IntoIterator<Item = AirspaceClass>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn bound_to_agl(bound: VerticalBound, ground_ft: f64) -> f64 {
    match bound.frame {
        AltitudeFrame::Surface => bound.value_ft,
        AltitudeFrame::Msl => bound.value_ft - ground_ft,
    }
}

/// Select the classes whose AGL envelope contains `altitude_agl_ft`.
///
/// `ground_ft` is only read for MSL-referenced bounds. Explicit class G layers
/// are uncontrolled and never enter the active set.
pub fn active_classes_at(
    stack: &AirspaceStack<'_>,
    altitude_agl_ft: f64,
    ground_ft: f64,
    unlimited_ceiling_ft: f64,
) -> ActiveClasses {
    stack
        .layers
        .iter()
        .filter(|layer| layer.class != AirspaceClass::G)
        .filter(|layer| {
            let mut upper = layer.upper;
            if upper.value_ft < 0.0 {
                upper.value_ft = unlimited_ceiling_ft;
            }
            let lower_agl = bound_to_agl(layer.lower, ground_ft);
            let upper_agl = bound_to_agl(upper, ground_ft);
            lower_agl <= altitude_agl_ft && altitude_agl_ft <= upper_agl
        })
        .map(|layer| layer.class)
        .collect()
}

/// Resolve the active class set for a point, querying ground elevation only
/// when some layer in the stack is MSL-referenced.
pub async fn resolve<E: ElevationSource>(
    point: &EvaluationPoint,
    stack: &AirspaceStack<'_>,
    unlimited_ceiling_ft: f64,
    elevation: &E,
) -> Result<ActiveClasses, ResolveError> {
    if !stack.needs_elevation() {
        return Ok(active_classes_at(
            stack,
            point.altitude_agl_ft,
            0.0,
            unlimited_ceiling_ft,
        ));
    }

    match elevation.elevation_ft(point.lon, point.lat).await {
        ElevationQueryResult::Available(ground_ft) => Ok(active_classes_at(
            stack,
            point.altitude_agl_ft,
            ground_ft,
            unlimited_ceiling_ft,
        )),
        ElevationQueryResult::Unavailable => Err(ResolveError::ElevationUnavailable {
            lon: point.lon,
            lat: point.lat,
        }),
    }
}

/// Airspace outcomes already computed in this batch, keyed by point index.
///
/// A point that reaches a second airspace gate reuses its first outcome, so
/// each point costs at most one elevation lookup per batch.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAirspace {
    by_point: HashMap<usize, Result<ActiveClasses, ResolveError>>,
}

impl ResolvedAirspace {
    pub fn get(&self, idx: usize) -> Option<&Result<ActiveClasses, ResolveError>> {
        self.by_point.get(&idx)
    }
}

/// Resolve many points with at most `max_in_flight` elevation lookups running
/// at once. Points already present in `resolved` are not looked up again;
/// new outcomes are recorded there. Results come back in `candidates` order.
pub async fn resolve_candidates<E: ElevationSource>(
    index: &AirspaceIndex,
    points: &[EvaluationPoint],
    candidates: &[usize],
    unlimited_ceiling_ft: f64,
    elevation: &E,
    max_in_flight: usize,
    resolved: &mut ResolvedAirspace,
) -> Vec<(usize, Result<ActiveClasses, ResolveError>)> {
    let pending: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|idx| resolved.get(*idx).is_none())
        .collect();

    let fresh: Vec<(usize, Result<ActiveClasses, ResolveError>)> = stream::iter(pending)
        .map(|idx| {
            let point = points[idx];
            async move {
                let stack = index.stack_at(point.lon, point.lat);
                let result = resolve(&point, &stack, unlimited_ceiling_ft, elevation).await;
                (idx, result)
            }
        })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;
    resolved.by_point.extend(fresh);

    candidates
        .iter()
        .filter_map(|&idx| resolved.get(idx).map(|result| (idx, result.clone())))
        .collect()
}
