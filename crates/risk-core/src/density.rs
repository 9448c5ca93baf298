//! Block-group population density lookups.

use crate::models::BlockGroupDensity;
use crate::spatial::PolygonIndex;

/// Point-in-polygon join against the block-group layer.
#[derive(Debug)]
pub struct DensityResolver {
    index: PolygonIndex<BlockGroupDensity>,
}

impl DensityResolver {
    pub fn new(block_groups: Vec<BlockGroupDensity>) -> Self {
        Self {
            index: PolygonIndex::new(block_groups),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Density (persons/sq-mile) of the block group containing the point.
    ///
    /// `None` when no block group contains the point or the matching block
    /// groups carry no density. Block groups should tile without overlap; if
    /// several match, the highest density wins.
    pub fn density_at(&self, lon: f64, lat: f64) -> Option<f64> {
        self.index
            .containing(lon, lat)
            .into_iter()
            .filter_map(|idx| self.index.get(idx).and_then(|bg| bg.density))
            .filter(|density| density.is_finite())
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn block(min_lon: f64, min_lat: f64, density: Option<f64>) -> BlockGroupDensity {
        BlockGroupDensity {
            polygon: MultiPolygon(vec![polygon![
                (x: min_lon, y: min_lat),
                (x: min_lon + 1.0, y: min_lat),
                (x: min_lon + 1.0, y: min_lat + 1.0),
                (x: min_lon, y: min_lat + 1.0),
                (x: min_lon, y: min_lat),
            ]]),
            density,
        }
    }

    #[test]
    fn unmatched_points_have_no_density() {
        let resolver = DensityResolver::new(vec![block(0.0, 0.0, Some(250.0))]);
        assert_eq!(resolver.density_at(0.5, 0.5), Some(250.0));
        assert_eq!(resolver.density_at(3.5, 0.5), None);
    }

    #[test]
    fn block_group_without_density_is_absent() {
        let resolver = DensityResolver::new(vec![block(0.0, 0.0, None)]);
        assert_eq!(resolver.density_at(0.5, 0.5), None);
    }
}
