//! Three-tier risk classification.
//!
//! Runs the low-risk chain over every point, then the medium-risk chain over
//! the low-risk failures only, and merges both into one result per input point
//! in input order.

use std::time::Instant;

use crate::airspace::ResolvedAirspace;
use crate::elevation::ElevationSource;
use crate::low_risk::LowRiskClassifier;
use crate::medium_risk::MediumRiskClassifier;
use crate::models::{ClassifiedPoint, EvaluationPoint, LowRiskOutcome, RiskClass, StatusReason};
use crate::stage::RuleContext;

/// Both result sets for one batch, each in input order.
#[derive(Debug, Clone, Default)]
pub struct ClassificationReport {
    /// Full three-class result.
    pub classified: Vec<ClassifiedPoint>,
    /// Low vs. not-low view from the low-risk chain alone.
    pub low_risk_view: Vec<LowRiskOutcome>,
}

impl ClassificationReport {
    pub fn count(&self, class: RiskClass) -> usize {
        self.classified
            .iter()
            .filter(|point| point.risk_class == class)
            .count()
    }
}

pub struct RiskClassifier<'c, 'a, E> {
    ctx: &'c RuleContext<'a, E>,
}

impl<'c, 'a, E: ElevationSource> RiskClassifier<'c, 'a, E> {
    pub fn new(ctx: &'c RuleContext<'a, E>) -> Self {
        Self { ctx }
    }

    pub async fn classify(&self, points: &[EvaluationPoint]) -> ClassificationReport {
        let started = Instant::now();
        let all: Vec<usize> = (0..points.len()).collect();

        let mut resolved = ResolvedAirspace::default();
        let low = LowRiskClassifier::new(self.ctx)
            .run(points, &all, &mut resolved)
            .await;

        let mut low_status: Vec<Option<StatusReason>> = vec![None; points.len()];
        for elimination in &low.eliminated {
            low_status[elimination.index] = Some(elimination.reason);
        }
        let low_risk_view: Vec<LowRiskOutcome> = points
            .iter()
            .zip(&low_status)
            .map(|(point, status)| LowRiskOutcome {
                point: *point,
                low_risk: status.is_none(),
                status: *status,
            })
            .collect();

        // Low-risk failures, still in input order.
        let mut candidates: Vec<usize> = low.eliminated.iter().map(|e| e.index).collect();
        candidates.sort_unstable();

        tracing::info!(
            "Low risk check finished: {} low risk, {} forwarded to medium risk check",
            low.survivors.len(),
            candidates.len()
        );

        let mut risk_class = vec![RiskClass::Low; points.len()];
        let mut status = low_status;
        for &idx in &candidates {
            risk_class[idx] = RiskClass::Medium;
        }

        if !candidates.is_empty() {
            let medium = MediumRiskClassifier::new(self.ctx)
                .run(points, &candidates, &mut resolved)
                .await;
            for elimination in &medium.eliminated {
                risk_class[elimination.index] = RiskClass::High;
                status[elimination.index] = Some(elimination.reason);
            }
        }

        let classified: Vec<ClassifiedPoint> = points
            .iter()
            .zip(risk_class)
            .zip(status)
            .map(|((point, risk_class), status)| ClassifiedPoint {
                point: *point,
                risk_class,
                status,
            })
            .collect();

        let report = ClassificationReport {
            classified,
            low_risk_view,
        };
        tracing::info!(
            "Classified {} points in {:.2}s: {} low, {} medium, {} high",
            points.len(),
            started.elapsed().as_secs_f64(),
            report.count(RiskClass::Low),
            report.count(RiskClass::Medium),
            report.count(RiskClass::High)
        );
        report
    }
}
