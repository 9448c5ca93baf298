//! Candidate point grid over a region.

use anyhow::{anyhow, bail, Result};
use geo::{BoundingRect, Contains, MultiPolygon, Point};

/// Lon/lat points spaced `spacing_deg` apart that lie strictly inside
/// `region`. The grid starts at the floor of the region's minimum corner and
/// stops before the ceiling of its maximum corner; rows run south to north.
pub fn generate_grid(region: &MultiPolygon<f64>, spacing_deg: f64) -> Result<Vec<(f64, f64)>> {
    if !spacing_deg.is_finite() || spacing_deg <= 0.0 {
        bail!("grid spacing must be positive, got {}", spacing_deg);
    }
    let bounds = region
        .bounding_rect()
        .ok_or_else(|| anyhow!("region has no extent"))?;

    let xs = axis(bounds.min().x, bounds.max().x, spacing_deg);
    let ys = axis(bounds.min().y, bounds.max().y, spacing_deg);

    let mut points = Vec::new();
    for &lat in &ys {
        for &lon in &xs {
            if region.contains(&Point::new(lon, lat)) {
                points.push((lon, lat));
            }
        }
    }

    tracing::info!(
        "Generated {} grid points inside region ({} x {} candidates, spacing {})",
        points.len(),
        xs.len(),
        ys.len(),
        spacing_deg
    );
    Ok(points)
}

fn axis(min: f64, max: f64, spacing: f64) -> Vec<f64> {
    let start = min.floor();
    let end = max.ceil();
    (0u64..)
        .map(|i| start + i as f64 * spacing)
        .take_while(|v| *v < end)
        .collect()
}
