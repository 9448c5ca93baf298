//! Reference-layer loading from GeoJSON and CSV files.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::{MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, GeoJson};
use risk_core::{
    Aerodrome, AirspaceClass, AirspaceLayer, AltitudeFrame, BlockGroupDensity, VerticalBound,
};
use serde::Deserialize;
use serde_json::Value;

/// Census identifier columns, with the width each is zero-padded to.
const BLOCK_GROUP_KEYS: [(&str, usize); 4] = [
    ("STATEFP", 2),
    ("COUNTYFP", 3),
    ("TRACTCE", 6),
    ("BLKGRPCE", 1),
];

/// One row of the density table produced by the census preprocessing step.
#[derive(Debug, Deserialize)]
pub struct DensityRow {
    #[serde(rename = "STATEFP")]
    pub state: String,
    #[serde(rename = "COUNTYFP")]
    pub county: String,
    #[serde(rename = "TRACTCE")]
    pub tract: String,
    #[serde(rename = "BLKGRPCE")]
    pub block_group: String,
    pub density: Option<f64>,
}

impl DensityRow {
    fn key(&self) -> String {
        let parts = [&self.state, &self.county, &self.tract, &self.block_group];
        parts
            .iter()
            .zip(BLOCK_GROUP_KEYS)
            .map(|(value, (_, width))| pad_code(value, width))
            .collect()
    }
}

pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse().context("invalid GeoJSON")?;
    FeatureCollection::try_from(geojson).context("expected a FeatureCollection")
}

async fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_feature_collection(&text).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_density_csv(text: &str) -> Result<HashMap<String, f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut table = HashMap::new();
    for result in reader.deserialize::<DensityRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Skipping malformed density row: {}", e);
                continue;
            }
        };
        if let Some(density) = row.density.filter(|d| d.is_finite()) {
            table.insert(row.key(), density);
        }
    }
    Ok(table)
}

/// Block groups with their density. When `densities` is given, it overrides
/// any `density` property on the features.
pub fn parse_block_groups(
    collection: &FeatureCollection,
    densities: Option<&HashMap<String, f64>>,
) -> Vec<BlockGroupDensity> {
    let mut block_groups = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in &collection.features {
        let Some(polygon) = feature_polygon(feature) else {
            skipped += 1;
            continue;
        };
        let density = match densities {
            Some(table) => block_group_key(feature).and_then(|key| table.get(&key).copied()),
            None => number_property(feature, "density"),
        };
        block_groups.push(BlockGroupDensity { polygon, density });
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} block groups without polygon geometry", skipped);
    }
    block_groups
}

pub fn parse_airspace(collection: &FeatureCollection) -> Vec<AirspaceLayer> {
    let mut layers = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.iter().enumerate() {
        match airspace_layer(feature) {
            Ok(layer) => layers.push(layer),
            Err(e) => tracing::warn!("Skipping airspace feature {}: {:#}", idx, e),
        }
    }
    layers
}

fn airspace_layer(feature: &Feature) -> Result<AirspaceLayer> {
    let polygon = feature_polygon(feature).ok_or_else(|| anyhow!("no polygon geometry"))?;
    let class: AirspaceClass = string_property(feature, "CLASS")
        .ok_or_else(|| anyhow!("missing CLASS"))?
        .parse()?;
    Ok(AirspaceLayer {
        polygon,
        lower: vertical_bound(feature, "LOWER_VAL", "LOWER_CODE")?,
        upper: vertical_bound(feature, "UPPER_VAL", "UPPER_CODE")?,
        class,
    })
}

fn vertical_bound(feature: &Feature, value_key: &str, code_key: &str) -> Result<VerticalBound> {
    let value_ft =
        number_property(feature, value_key).ok_or_else(|| anyhow!("missing {}", value_key))?;
    let code = string_property(feature, code_key).unwrap_or_default();
    Ok(VerticalBound {
        value_ft,
        frame: AltitudeFrame::from_code(&code),
    })
}

pub fn parse_aerodromes(collection: &FeatureCollection) -> Vec<Aerodrome> {
    let mut aerodromes = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in &collection.features {
        match feature_geometry(feature) {
            Some(geo::Geometry::Point(p)) => aerodromes.push(to_aerodrome(p)),
            Some(geo::Geometry::MultiPoint(mp)) => {
                aerodromes.extend(mp.0.into_iter().map(to_aerodrome))
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} aerodrome features without point geometry", skipped);
    }
    aerodromes
}

fn to_aerodrome(point: Point<f64>) -> Aerodrome {
    Aerodrome {
        lon: point.x(),
        lat: point.y(),
    }
}

/// Union of the region features, optionally restricted to those whose
/// `property` equals `value` (compared as text).
pub fn parse_region(
    collection: &FeatureCollection,
    filter: Option<(&str, &str)>,
) -> Result<MultiPolygon<f64>> {
    let polygons: Vec<_> = collection
        .features
        .iter()
        .filter(|feature| match filter {
            Some((property, value)) => {
                string_property(feature, property).is_some_and(|v| v.eq_ignore_ascii_case(value))
            }
            None => true,
        })
        .filter_map(feature_polygon)
        .flat_map(|mp| mp.0)
        .collect();

    if polygons.is_empty() {
        return Err(match filter {
            Some((property, value)) => anyhow!("no region polygon with {} = {}", property, value),
            None => anyhow!("region file has no polygon features"),
        });
    }
    Ok(MultiPolygon(polygons))
}

pub async fn load_block_groups(
    path: &Path,
    density_csv: Option<&Path>,
) -> Result<Vec<BlockGroupDensity>> {
    let collection = read_collection(path).await?;
    let densities = match density_csv {
        Some(csv_path) => {
            let text = tokio::fs::read_to_string(csv_path)
                .await
                .with_context(|| format!("failed to read {}", csv_path.display()))?;
            let table = parse_density_csv(&text)
                .with_context(|| format!("failed to parse {}", csv_path.display()))?;
            tracing::info!("Loaded {} density rows from {}", table.len(), csv_path.display());
            Some(table)
        }
        None => None,
    };

    let block_groups = parse_block_groups(&collection, densities.as_ref());
    let missing = block_groups.iter().filter(|bg| bg.density.is_none()).count();
    tracing::info!(
        "Loaded {} block groups from {} ({} without density)",
        block_groups.len(),
        path.display(),
        missing
    );
    Ok(block_groups)
}

pub async fn load_airspace(path: &Path) -> Result<Vec<AirspaceLayer>> {
    let layers = parse_airspace(&read_collection(path).await?);
    tracing::info!("Loaded {} airspace layers from {}", layers.len(), path.display());
    Ok(layers)
}

pub async fn load_aerodromes(path: &Path) -> Result<Vec<Aerodrome>> {
    let aerodromes = parse_aerodromes(&read_collection(path).await?);
    tracing::info!("Loaded {} aerodromes from {}", aerodromes.len(), path.display());
    Ok(aerodromes)
}

pub async fn load_region(path: &Path, filter: Option<(&str, &str)>) -> Result<MultiPolygon<f64>> {
    let region = parse_region(&read_collection(path).await?, filter)?;
    tracing::info!(
        "Loaded region with {} polygons from {}",
        region.0.len(),
        path.display()
    );
    Ok(region)
}

fn feature_geometry(feature: &Feature) -> Option<geo::Geometry<f64>> {
    let geometry = feature.geometry.clone()?;
    geometry.try_into().ok()
}

fn feature_polygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    match feature_geometry(feature)? {
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    }
}

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a Value> {
    feature.properties.as_ref()?.get(key)
}

fn number_property(feature: &Feature, key: &str) -> Option<f64> {
    let value = match property(feature, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    match property(feature, key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn block_group_key(feature: &Feature) -> Option<String> {
    let mut key = String::new();
    for (name, width) in BLOCK_GROUP_KEYS {
        key.push_str(&pad_code(&string_property(feature, name)?, width));
    }
    Some(key)
}

/// Numeric census codes lose their leading zeros in some exports.
fn pad_code(code: &str, width: usize) -> String {
    format!("{:0>width$}", code.trim(), width = width)
}
