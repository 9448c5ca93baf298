//! Spatial math and R-tree indexes for the reference layers.

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::models::{Aerodrome, AirspaceLayer, BlockGroupDensity};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const METERS_PER_NM: f64 = 1_852.0;

/// Roughly 7 nm on the unit sphere.
const NEAREST_INITIAL_CHORD: f64 = 0.002;
/// Diameter of the unit sphere.
const MAX_CHORD: f64 = 2.0;

/// Great-circle distance in meters between two points in decimal degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance in nautical miles.
pub fn distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance(lat1, lon1, lat2, lon2) / METERS_PER_NM
}

/// Anything carrying a polygon footprint that can be indexed.
pub trait Footprint {
    fn footprint(&self) -> &MultiPolygon<f64>;
}

impl Footprint for BlockGroupDensity {
    fn footprint(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }
}

impl Footprint for AirspaceLayer {
    fn footprint(&self) -> &MultiPolygon<f64> {
        &self.polygon
    }
}

type EnvelopeEntry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Arena of polygon features with an R-tree over their bounding boxes.
///
/// Built once per run and read-only afterwards.
#[derive(Debug)]
pub struct PolygonIndex<T> {
    items: Vec<T>,
    tree: RTree<EnvelopeEntry>,
}

impl<T: Footprint> PolygonIndex<T> {
    pub fn new(items: Vec<T>) -> Self {
        let entries = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let rect = item.footprint().bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    idx,
                ))
            })
            .collect();
        Self {
            items,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    /// Arena indices of every feature whose polygon strictly contains the point,
    /// in ascending order.
    pub fn containing(&self, lon: f64, lat: f64) -> Vec<usize> {
        let point = Point::new(lon, lat);
        let query = AABB::from_point([lon, lat]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.data)
            .filter(|&idx| self.items[idx].footprint().contains(&point))
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// Point on the unit sphere. Straight-line (chord) distance between two such
/// points grows monotonically with their great-circle distance.
fn unit_vector(lon: f64, lat: f64) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn chord_2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

/// Nearest aerodrome and the surface distance to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestAerodrome {
    pub index: usize,
    pub aerodrome: Aerodrome,
    pub distance_nm: f64,
}

/// Great-circle nearest-neighbor index over aerodrome locations.
///
/// Aerodromes are stored as unit-sphere vectors, so the closest entry in the
/// tree is also the closest along the surface at any latitude.
#[derive(Debug)]
pub struct AerodromeIndex {
    aerodromes: Vec<Aerodrome>,
    tree: RTree<GeomWithData<[f64; 3], usize>>,
}

impl AerodromeIndex {
    pub fn new(aerodromes: Vec<Aerodrome>) -> Self {
        let entries = aerodromes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.lon.is_finite() && a.lat.is_finite())
            .map(|(idx, a)| GeomWithData::new(unit_vector(a.lon, a.lat), idx))
            .collect();
        Self {
            aerodromes,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.aerodromes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aerodromes.is_empty()
    }

    /// Returns `None` only when the index holds no aerodromes. Ties go to the
    /// lower index.
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<NearestAerodrome> {
        let query = unit_vector(lon, lat);
        // Grow a cube around the query until the best hit lies inside its
        // inscribed ball; a cube of half-size 2 holds the whole sphere.
        let mut radius = NEAREST_INITIAL_CHORD;
        let index = loop {
            let window = AABB::from_corners(
                [query[0] - radius, query[1] - radius, query[2] - radius],
                [query[0] + radius, query[1] + radius, query[2] + radius],
            );
            let best = self
                .tree
                .locate_in_envelope_intersecting(&window)
                .map(|entry| (entry.data, chord_2(entry.geom(), &query)))
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

            match best {
                Some((idx, dist_2)) if dist_2 <= radius * radius || radius >= MAX_CHORD => {
                    break idx
                }
                None if radius >= MAX_CHORD => return None,
                _ => radius *= 2.0,
            }
        };

        let aerodrome = self.aerodromes[index];
        Some(NearestAerodrome {
            index,
            aerodrome,
            distance_nm: distance_nm(lat, lon, aerodrome.lat, aerodrome.lon),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(min_lon: f64, min_lat: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: min_lon, y: min_lat),
            (x: min_lon + size, y: min_lat),
            (x: min_lon + size, y: min_lat + size),
            (x: min_lon, y: min_lat + size),
            (x: min_lon, y: min_lat),
        ]])
    }

    #[test]
    fn test_haversine_known_distance() {
        // one degree of latitude is ~60 nm
        let dist = distance_nm(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 60.04).abs() < 0.1);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(35.7796, -78.6382, 35.7796, -78.6382);
        assert!(dist < 0.001);
    }

    #[test]
    fn containing_returns_every_overlapping_polygon() {
        let index = PolygonIndex::new(vec![
            BlockGroupDensity {
                polygon: square(0.0, 0.0, 1.0),
                density: Some(10.0),
            },
            BlockGroupDensity {
                polygon: square(0.5, 0.5, 1.0),
                density: Some(20.0),
            },
        ]);

        assert_eq!(index.containing(0.75, 0.75), vec![0, 1]);
        assert_eq!(index.containing(0.25, 0.25), vec![0]);
        assert!(index.containing(5.0, 5.0).is_empty());
    }

    #[test]
    fn nearest_aerodrome_reports_surface_distance() {
        let index = AerodromeIndex::new(vec![
            Aerodrome { lon: -78.0, lat: 35.0 },
            Aerodrome { lon: -79.0, lat: 36.0 },
        ]);

        let nearest = index.nearest(-78.0, 35.05).unwrap();
        assert_eq!(nearest.index, 0);
        assert!((nearest.distance_nm - 3.0).abs() < 0.05);

        assert!(AerodromeIndex::new(Vec::new()).nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn nearest_aerodrome_accounts_for_converging_meridians() {
        // At 45N, 0.106 degrees of longitude is shorter than 0.1 of latitude.
        let index = AerodromeIndex::new(vec![
            Aerodrome { lon: 0.0, lat: 45.1 },
            Aerodrome { lon: 0.106, lat: 45.0 },
        ]);

        let nearest = index.nearest(0.0, 45.0).unwrap();
        assert_eq!(nearest.index, 1);
        assert!((nearest.distance_nm - 4.5).abs() < 0.05);
    }

    #[test]
    fn nearest_aerodrome_far_away_and_tied() {
        let index = AerodromeIndex::new(vec![
            Aerodrome { lon: 100.0, lat: -30.0 },
            Aerodrome { lon: 1.0, lat: 0.0 },
            Aerodrome { lon: -1.0, lat: 0.0 },
        ]);

        let tied = index.nearest(0.0, 0.0).unwrap();
        assert_eq!(tied.index, 1);

        let western = index.nearest(-80.0, 30.0).unwrap();
        assert_eq!(western.index, 2);
    }
}
