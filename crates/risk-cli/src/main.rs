//! Classify a region's grid points into low, medium and high risk airspace.
//!
//! Usage:
//!   classify-region --region states.geojson --region-property STUSPS --region-value NC \
//!     --block-groups bg.geojson --airspace class_airspace.geojson \
//!     --aerodromes airports.geojson --altitude 400 --spacing 0.01

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use risk_cli::config::{load_thresholds, Config};
use risk_cli::elevation::HttpElevationSource;
use risk_cli::{grid, layers, output};
use risk_core::{build_points, AltitudeAgl, ReferenceLayers, RiskClassifier, RuleContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "UAS airspace risk classification over a region grid")]
struct Args {
    /// GeoJSON FeatureCollection with the region polygon(s)
    #[arg(long)]
    region: PathBuf,

    /// Property used to select region features (e.g. STUSPS)
    #[arg(long, requires = "region_value")]
    region_property: Option<String>,

    /// Value the region property must equal (e.g. NC)
    #[arg(long, requires = "region_property")]
    region_value: Option<String>,

    /// Grid spacing in degrees
    #[arg(long, default_value_t = 0.01)]
    spacing: f64,

    /// Altitude above ground level in feet
    #[arg(long, default_value_t = 400.0)]
    altitude: f64,

    /// Census block group polygons
    #[arg(long)]
    block_groups: PathBuf,

    /// Optional density table joined onto the block groups
    #[arg(long)]
    density_csv: Option<PathBuf>,

    /// Class airspace polygons (FAA NASR attributes)
    #[arg(long)]
    airspace: PathBuf,

    /// Aerodrome points
    #[arg(long)]
    aerodromes: PathBuf,

    /// JSON file overriding rule thresholds
    #[arg(long)]
    thresholds: Option<PathBuf>,

    /// Output directory (default: output/<region>/alt_<alt>/spacing_<spacing>)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Args {
    fn region_filter(&self) -> Option<(&str, &str)> {
        match (&self.region_property, &self.region_value) {
            (Some(property), Some(value)) => Some((property.as_str(), value.as_str())),
            _ => None,
        }
    }

    fn region_name(&self) -> String {
        self.region_value.clone().unwrap_or_else(|| {
            self.region
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "region".to_string())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("risk_cli=info".parse()?)
                .add_directive("risk_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    let rules = load_thresholds(args.thresholds.as_deref()).await?;
    let region_name = args.region_name();

    tracing::info!(
        "Classifying {} at {} ft AGL with {} degree spacing",
        region_name,
        args.altitude,
        args.spacing
    );

    let region = layers::load_region(&args.region, args.region_filter()).await?;
    let lonlats = grid::generate_grid(&region, args.spacing)?;
    let points = build_points(&lonlats, &AltitudeAgl::Uniform(args.altitude))?;

    let reference = ReferenceLayers::new(
        layers::load_block_groups(&args.block_groups, args.density_csv.as_deref()).await?,
        layers::load_airspace(&args.airspace).await?,
        layers::load_aerodromes(&args.aerodromes).await?,
    );

    let elevation = HttpElevationSource::from_config(&config)?;
    let ctx = RuleContext::new(&reference, &rules, &elevation)
        .with_max_in_flight(config.max_concurrent_lookups);
    let report = RiskClassifier::new(&ctx).classify(&points).await;

    let out_dir = args.output_dir.clone().unwrap_or_else(|| {
        output::default_output_dir(
            &PathBuf::from("output"),
            &region_name,
            args.altitude,
            args.spacing,
        )
    });
    output::write_results(&out_dir, &report).await?;
    output::log_summary(&region_name, &report);

    Ok(())
}
