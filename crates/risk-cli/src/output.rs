//! GeoJSON persistence of classification results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use risk_core::{ClassificationReport, EvaluationPoint, RiskClass, StatusReason};
use serde_json::json;

pub const RISK_CLASS_FILE: &str = "RiskClass.geojson";
pub const LOW_RISK_CLASS_FILE: &str = "LowRiskClass.geojson";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenResults {
    pub risk_class: PathBuf,
    pub low_risk_class: PathBuf,
}

/// `output/<region>/alt_<alt>/spacing_<spacing>` under `root`.
pub fn default_output_dir(root: &Path, region: &str, altitude_ft: f64, spacing_deg: f64) -> PathBuf {
    root.join(region)
        .join(format!("alt_{}", altitude_ft))
        .join(format!("spacing_{}", spacing_deg))
}

pub fn risk_class_collection(report: &ClassificationReport) -> FeatureCollection {
    let features = report
        .classified
        .iter()
        .map(|point| {
            point_feature(
                &point.point,
                point.risk_class.code(),
                point.risk_class.label(),
                point.status,
            )
        })
        .collect();
    collection(features)
}

/// Two-class view: `Risk_Class` 1 for low risk, 0 otherwise.
pub fn low_risk_collection(report: &ClassificationReport) -> FeatureCollection {
    let features = report
        .low_risk_view
        .iter()
        .map(|outcome| {
            let (code, label) = if outcome.low_risk {
                (1, RiskClass::Low.label())
            } else {
                (0, "Not LR")
            };
            point_feature(&outcome.point, code, label, outcome.status)
        })
        .collect();
    collection(features)
}

pub async fn write_results(dir: &Path, report: &ClassificationReport) -> Result<WrittenResults> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let written = WrittenResults {
        risk_class: dir.join(RISK_CLASS_FILE),
        low_risk_class: dir.join(LOW_RISK_CLASS_FILE),
    };
    write_collection(&written.risk_class, &risk_class_collection(report)).await?;
    write_collection(&written.low_risk_class, &low_risk_collection(report)).await?;

    tracing::info!("Wrote results to {}", dir.display());
    Ok(written)
}

pub fn log_summary(region: &str, report: &ClassificationReport) {
    let generated_at = chrono::Utc::now().to_rfc3339();
    let total = report.classified.len();
    tracing::info!(
        "Run summary for {}: {} points, {} low / {} medium / {} high (generated_at {})",
        region,
        total,
        report.count(RiskClass::Low),
        report.count(RiskClass::Medium),
        report.count(RiskClass::High),
        generated_at
    );
}

async fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let body = serde_json::to_vec(collection).context("failed to encode GeoJSON")?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn point_feature(
    point: &EvaluationPoint,
    code: u8,
    label: &str,
    status: Option<StatusReason>,
) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("Risk_Class".to_string(), json!(code));
    properties.insert("Type".to_string(), json!(label));
    properties.insert("Status".to_string(), json!(status.map(StatusReason::as_str)));
    properties.insert("Alt_AGL_ft".to_string(), json!(point.altitude_agl_ft));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.lon, point.lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::{ClassifiedPoint, LowRiskOutcome};

    fn report() -> ClassificationReport {
        let low = EvaluationPoint::new(-78.0, 35.0, 200.0);
        let high = EvaluationPoint::new(-78.5, 35.5, 600.0);
        ClassificationReport {
            classified: vec![
                ClassifiedPoint {
                    point: low,
                    risk_class: RiskClass::Low,
                    status: None,
                },
                ClassifiedPoint {
                    point: high,
                    risk_class: RiskClass::High,
                    status: Some(StatusReason::AerodromeControlled),
                },
            ],
            low_risk_view: vec![
                LowRiskOutcome {
                    point: low,
                    low_risk: true,
                    status: None,
                },
                LowRiskOutcome {
                    point: high,
                    low_risk: false,
                    status: Some(StatusReason::AltitudeAtOrAbove500),
                },
            ],
        }
    }

    fn props(feature: &Feature) -> &JsonObject {
        feature.properties.as_ref().unwrap()
    }

    #[test]
    fn risk_class_properties() {
        let fc = risk_class_collection(&report());
        assert_eq!(fc.features.len(), 2);
        assert_eq!(props(&fc.features[0])["Risk_Class"], json!(0));
        assert_eq!(props(&fc.features[0])["Type"], json!("LR"));
        assert!(props(&fc.features[0])["Status"].is_null());
        assert_eq!(props(&fc.features[1])["Risk_Class"], json!(2));
        assert_eq!(props(&fc.features[1])["Type"], json!("HR"));
        assert_eq!(
            props(&fc.features[1])["Status"],
            json!(StatusReason::AerodromeControlled.as_str())
        );
    }

    #[test]
    fn low_risk_view_properties() {
        let fc = low_risk_collection(&report());
        assert_eq!(props(&fc.features[0])["Risk_Class"], json!(1));
        assert_eq!(props(&fc.features[0])["Type"], json!("LR"));
        assert_eq!(props(&fc.features[1])["Risk_Class"], json!(0));
        assert_eq!(props(&fc.features[1])["Type"], json!("Not LR"));
        assert_eq!(props(&fc.features[1])["Status"], json!(">= 500 ft AGL"));
    }

    #[test]
    fn default_dir_layout() {
        let dir = default_output_dir(Path::new("output"), "NC", 400.0, 0.01);
        assert_eq!(dir, PathBuf::from("output/NC/alt_400/spacing_0.01"));
    }

    #[tokio::test]
    async fn writes_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("NC").join("alt_400");

        let written = write_results(&dir, &report()).await.unwrap();

        let text = tokio::fs::read_to_string(&written.risk_class).await.unwrap();
        let parsed = crate::layers::parse_feature_collection(&text).unwrap();
        assert_eq!(parsed.features.len(), 2);
        assert!(written.low_risk_class.ends_with(LOW_RISK_CLASS_FILE));
        assert!(tokio::fs::metadata(&written.low_risk_class).await.is_ok());
    }
}
