//! Low-risk rule chain.
//!
//! Gates, in order: altitude, block-group density, aerodrome proximity and
//! uncontrolled (class G) airspace. A point is low risk only if it clears all
//! four.

use crate::airspace::{resolve_candidates, ResolvedAirspace};
use crate::elevation::ElevationSource;
use crate::models::{EvaluationPoint, StatusReason};
use crate::stage::{partition, Elimination, RuleContext, StagePartition, StageTimer};

const CHAIN: &str = "Low risk";

pub struct LowRiskClassifier<'c, 'a, E> {
    ctx: &'c RuleContext<'a, E>,
}

impl<'c, 'a, E: ElevationSource> LowRiskClassifier<'c, 'a, E> {
    pub fn new(ctx: &'c RuleContext<'a, E>) -> Self {
        Self { ctx }
    }

    /// Run every gate over `candidates`; survivors are low risk.
    pub async fn run(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
        resolved: &mut ResolvedAirspace,
    ) -> StagePartition {
        let timer = StageTimer::start(CHAIN, 1, "altitude", candidates.len());
        let chain = self.altitude_gate(points, candidates);
        timer.finish(&chain);
        if chain.survivors.is_empty() {
            return chain;
        }

        let timer = StageTimer::start(CHAIN, 2, "population density", chain.survivors.len());
        let step = self.density_gate(points, &chain.survivors);
        timer.finish(&step);
        let chain = chain.then(step);
        if chain.survivors.is_empty() {
            return chain;
        }

        let timer = StageTimer::start(CHAIN, 3, "aerodrome distance", chain.survivors.len());
        let step = self.aerodrome_gate(points, &chain.survivors);
        timer.finish(&step);
        let chain = chain.then(step);
        if chain.survivors.is_empty() {
            return chain;
        }

        let timer = StageTimer::start(CHAIN, 4, "uncontrolled airspace", chain.survivors.len());
        let step = self
            .airspace_gate(points, &chain.survivors, resolved)
            .await;
        timer.finish(&step);
        chain.then(step)
    }

    pub fn altitude_gate(&self, points: &[EvaluationPoint], candidates: &[usize]) -> StagePartition {
        let rules = self.ctx.thresholds;
        partition(candidates, |idx| {
            rules
                .above_altitude_limit(points[idx].altitude_agl_ft)
                .then_some(StatusReason::AltitudeAtOrAbove500)
        })
    }

    pub fn density_gate(&self, points: &[EvaluationPoint], candidates: &[usize]) -> StagePartition {
        let rules = self.ctx.thresholds;
        let density = &self.ctx.layers.density;
        partition(candidates, |idx| {
            let point = &points[idx];
            rules
                .is_urban(density.density_at(point.lon, point.lat))
                .then_some(StatusReason::UrbanArea)
        })
    }

    pub fn aerodrome_gate(&self, points: &[EvaluationPoint], candidates: &[usize]) -> StagePartition {
        let rules = self.ctx.thresholds;
        let aerodromes = &self.ctx.layers.aerodromes;
        partition(candidates, |idx| {
            let point = &points[idx];
            aerodromes
                .nearest(point.lon, point.lat)
                .filter(|nearest| rules.near_aerodrome(nearest.distance_nm))
                .map(|_| StatusReason::AerodromeWithin5Nm)
        })
    }

    /// Any active controlled class fails. An unavailable elevation fails with
    /// its own reason instead of being reported as controlled airspace.
    pub async fn airspace_gate(
        &self,
        points: &[EvaluationPoint],
        candidates: &[usize],
        resolved: &mut ResolvedAirspace,
    ) -> StagePartition {
        let outcomes = resolve_candidates(
            &self.ctx.layers.airspace,
            points,
            candidates,
            self.ctx.thresholds.unlimited_ceiling_ft,
            self.ctx.elevation,
            self.ctx.max_in_flight,
            resolved,
        )
        .await;

        let mut result = StagePartition::default();
        for (idx, outcome) in outcomes {
            let reason = match outcome {
                Ok(active) if active.is_uncontrolled() => None,
                Ok(_) => Some(StatusReason::NotClassG),
                Err(err) => {
                    tracing::warn!("Low risk airspace check: {}", err);
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
