//! Shared plumbing for the ordered rule chains.
//!
//! Every gate takes the indices that survived the previous gate and splits them
//! into survivors and eliminations. Nothing is mutated in place; eliminated
//! points never re-enter a later gate.

use std::time::Instant;

use crate::airspace::AirspaceIndex;
use crate::density::DensityResolver;
use crate::models::{Aerodrome, AirspaceLayer, BlockGroupDensity, StatusReason};
use crate::rules::RiskThresholds;
use crate::spatial::AerodromeIndex;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Static reference layers, loaded once and never mutated.
#[derive(Debug)]
pub struct ReferenceLayers {
    pub density: DensityResolver,
    pub airspace: AirspaceIndex,
    pub aerodromes: AerodromeIndex,
}

impl ReferenceLayers {
    pub fn new(
        block_groups: Vec<BlockGroupDensity>,
        airspace: Vec<AirspaceLayer>,
        aerodromes: Vec<Aerodrome>,
    ) -> Self {
        let layers = Self {
            density: DensityResolver::new(block_groups),
            airspace: AirspaceIndex::new(airspace),
            aerodromes: AerodromeIndex::new(aerodromes),
        };
        layers.log_summary();
        layers
    }

    fn log_summary(&self) {
        tracing::info!(
            "Indexed {} block groups, {} airspace layers, {} aerodromes",
            self.density.len(),
            self.airspace.len(),
            self.aerodromes.len()
        );
        if self.density.is_empty() {
            tracing::warn!("No block groups loaded; every point counts as non-urban");
        }
        if self.airspace.is_empty() {
            tracing::warn!("No airspace layers loaded; every point counts as class G");
        }
        if self.aerodromes.is_empty() {
            tracing::warn!("No aerodromes loaded; aerodrome gates pass every point");
        }
    }
}

/// Everything a gate needs besides the points themselves.
pub struct RuleContext<'a, E> {
    pub layers: &'a ReferenceLayers,
    pub thresholds: &'a RiskThresholds,
    pub elevation: &'a E,
    /// Upper bound on concurrent elevation lookups.
    pub max_in_flight: usize,
}

impl<'a, E> RuleContext<'a, E> {
    pub fn new(layers: &'a ReferenceLayers, thresholds: &'a RiskThresholds, elevation: &'a E) -> Self {
        Self {
            layers,
            thresholds,
            elevation,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elimination {
    pub index: usize,
    pub reason: StatusReason,
}

/// Result of one gate, or of a whole chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagePartition {
    pub survivors: Vec<usize>,
    pub eliminated: Vec<Elimination>,
}

impl StagePartition {
    /// Fold a later gate's result into this chain result.
    pub fn then(mut self, next: StagePartition) -> Self {
        self.survivors = next.survivors;
        self.eliminated.extend(next.eliminated);
        self
    }
}

/// Split `candidates` by a per-point check; `Some(reason)` eliminates.
pub fn partition<F>(candidates: &[usize], mut check: F) -> StagePartition
where
    F: FnMut(usize) -> Option<StatusReason>,
{
    let mut result = StagePartition::default();
    for &idx in candidates {
        match check(idx) {
            Some(reason) => result.eliminated.push(Elimination { index: idx, reason }),
            None => result.survivors.push(idx),
        }
    }
    result
}

/// Times a gate and logs how many points it removed.
pub(crate) struct StageTimer {
    chain: &'static str,
    step: usize,
    name: &'static str,
    checked: usize,
    started: Instant,
}

impl StageTimer {
    pub(crate) fn start(chain: &'static str, step: usize, name: &'static str, checked: usize) -> Self {
        tracing::info!(
            "{} step {}: {} - checking {} points",
            chain,
            step,
            name,
            checked
        );
        Self {
            chain,
            step,
            name,
            checked,
            started: Instant::now(),
        }
    }

    pub(crate) fn finish(self, partition: &StagePartition) {
        tracing::info!(
            "{} step {}: {} - {} of {} points eliminated in {:.2}s",
            self.chain,
            self.step,
            self.name,
            partition.eliminated.len(),
            self.checked,
            self.started.elapsed().as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_preserves_candidate_order() {
        let result = partition(&[4, 1, 7, 2], |idx| {
            (idx % 2 == 0).then_some(StatusReason::UrbanArea)
        });
        assert_eq!(result.survivors, vec![1, 7]);
        assert_eq!(
            result.eliminated,
            vec![
                Elimination {
                    index: 4,
                    reason: StatusReason::UrbanArea
                },
                Elimination {
                    index: 2,
                    reason: StatusReason::UrbanArea
                },
            ]
        );
    }

    #[test]
    fn reference_layers_index_every_input() {
        let empty = ReferenceLayers::new(Vec::new(), Vec::new(), Vec::new());
        assert!(empty.density.is_empty());
        assert!(empty.airspace.is_empty());
        assert!(empty.aerodromes.is_empty());

        let layers = ReferenceLayers::new(
            Vec::new(),
            Vec::new(),
            vec![Aerodrome { lon: 1.0, lat: 2.0 }, Aerodrome { lon: 3.0, lat: 4.0 }],
        );
        assert_eq!(layers.aerodromes.len(), 2);
        assert_eq!(layers.density.len(), 0);
    }

    #[test]
    fn then_accumulates_eliminations() {
        let first = partition(&[0, 1, 2], |idx| (idx == 0).then_some(StatusReason::UrbanArea));
        let second = partition(&first.survivors, |idx| {
            (idx == 2).then_some(StatusReason::NotClassG)
        });
        let chain = first.clone().then(second);
        assert_eq!(chain.survivors, vec![1]);
        assert_eq!(chain.eliminated.len(), 2);
    }
}
