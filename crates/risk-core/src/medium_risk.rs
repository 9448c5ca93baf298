//! Medium-risk rule chain, applied to points that failed the low-risk chain.
//!
//! Gates, in order: altitude over urban area, nearest-aerodrome airspace class
//! and the airspace hierarchy at the point itself. Survivors are medium risk;
//! everything eliminated here is high risk.

use std::collections::HashMap;

use crate::airspace::{resolve_candidates, ResolvedAirspace};
use crate::elevation::ElevationSource;
use crate::models::{AirspaceClass, EvaluationPoint, StatusReason};
use crate::stage::{partition, Elimination, RuleContext, StagePartition, StageTimer};

const CHAIN: &str = "Medium risk";

pub struct MediumRiskClassifier<'c, 'a, E> {
    ctx: &'c RuleContext<'a, E>,
}

impl<'c, 'a, E: ElevationSource> MediumRiskClassifier<'c, 'a, E> {
    pub fn new(ctx: &'c RuleContext<'a, E>) -> Self {
        Self { ctx }
    }

    /// Run every gate over `candidates`; survivors are medium risk.
    pub async fn run(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
        resolved: &mut ResolvedAirspace,
    ) -> StagePartition {
        let timer = StageTimer::start(CHAIN, 1, "altitude over urban area", candidates.len());
        let chain = self.density_altitude_gate(points, candidates);
        timer.finish(&chain);
        if chain.survivors.is_empty() {
            return chain;
        }

        let timer = StageTimer::start(CHAIN, 2, "aerodrome airspace class", chain.survivors.len());
        let step = self.aerodrome_class_gate(points, &chain.survivors);
        timer.finish(&step);
        let chain = chain.then(step);
        if chain.survivors.is_empty() {
            return chain;
        }

        let timer = StageTimer::start(CHAIN, 3, "airspace hierarchy", chain.survivors.len());
        let step = self
            .airspace_gate(points, &chain.survivors, resolved)
            .await;
        timer.finish(&step);
        chain.then(step)
    }

    pub fn density_altitude_gate(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
    ) -> StagePartition {
        let rules = self.ctx.thresholds;
        let density = &self.ctx.layers.density;
        partition(candidates, |idx| {
            let point = &points[idx];
            (rules.above_altitude_limit(point.altitude_agl_ft)
                && rules.is_urban(density.density_at(point.lon, point.lat)))
            .then_some(StatusReason::AltitudeOverUrbanArea)
        })
    }

    /// Within the aerodrome radius, an aerodrome in B/C/D (or A) airspace fails
    /// at any altitude; one in E/F/G fails at or above the altitude limit.
    pub fn aerodrome_class_gate(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
    ) -> StagePartition {
        let rules = self.ctx.thresholds;
        let layers = self.ctx.layers;
        let mut class_by_aerodrome: HashMap<usize, AirspaceClass> = HashMap::new();

        partition(candidates, |idx| {
            let point = &points[idx];
            let nearest = layers.aerodromes.nearest(point.lon, point.lat)?;
            if !rules.near_aerodrome(nearest.distance_nm) {
                return None;
            }

            let class = *class_by_aerodrome.entry(nearest.index).or_insert_with(|| {
                layers
                    .airspace
                    .stack_at(nearest.aerodrome.lon, nearest.aerodrome.lat)
                    .representative_class()
            });

            if class.is_at_least_d() {
                Some(StatusReason::AerodromeControlled)
            } else if rules.above_altitude_limit(point.altitude_agl_ft) {
                Some(StatusReason::AerodromeUncontrolledAbove500)
            } else {
                None
            }
        })
    }

    /// Class G passes. B/C/D/E passes below the altitude limit. Any other
    /// active class fails, as does an unavailable ground elevation.
    pub async fn airspace_gate(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
        resolved: &mut ResolvedAirspace,
    ) -> StagePartition {
        let rules = self.ctx.thresholds;
        let outcomes = resolve_candidates(
            &self.ctx.layers.airspace,
            points,
            candidates,
            rules.unlimited_ceiling_ft,
            self.ctx.elevation,
            self.ctx.max_in_flight,
            resolved,
        )
        .await;

        let mut result = StagePartition::default();
        for (idx, outcome) in outcomes {
            let point = &points[idx];
            let reason = match outcome {
                Ok(active) if active.is_uncontrolled() => None,
                Ok(active) if active.all_within(&rules.medium_allowed_classes) => rules
                    .above_altitude_limit(point.altitude_agl_ft)
                    .then_some(StatusReason::AltitudeInControlledAirspace),
                Ok(active) => {
                    let classes: Vec<String> =
                        active.classes().map(|class| class.to_string()).collect();
                    tracing::warn!(
                        "Point ({:.6}, {:.6}) at {:.0} ft AGL is in class [{}] outside the medium risk set; classifying as high risk",
                        point.lon,
                        point.lat,
                        point.altitude_agl_ft,
                        classes.join(",")
                    );
                    Some(StatusReason::RestrictedAirspaceClass)
                }
                Err(err) => {
                    tracing::warn!("Medium risk airspace check: {}", err);
                    Some(StatusReason::ElevationUnavailable)
                }
            };
            match reason {
                Some(reason) => result.eliminated.push(Elimination { index: idx, reason }),
                None => result.survivors.push(idx),
            }
        }
        result
    }
}
