use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use tile_labels::config::{
    default_worker_count, FontDefaults, RunSettings, ZoomRange, DEFAULT_END_ZOOM,
    DEFAULT_FONT_FILE, DEFAULT_MAX_CITIES_PER_TILE, DEFAULT_START_ZOOM,
};
use tile_labels::data::{GeoJsonSource, DEFAULT_NAME_KEY};
use tile_labels::dispatch::run_jobs;
use tile_labels::error::ConfigError;
use tile_labels::geo::Extent;
use tile_labels::data::StoreConnector;
use tile_labels::job::{compute_baseline, run_zoom_level, ZoomOutput};
use tile_labels::label::FontSizeTable;

/// Generate per-zoom city label CSV files from a GeoJSON place layer
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-labels", version)]
struct Args {
    /// GeoJSON file holding point features with place and population properties
    #[arg(short, long, env = "TILE_LABELS_FEATURES")]
    features: PathBuf,

    #[arg(short, long, default_value_t = DEFAULT_START_ZOOM)]
    start_zoom: u8,

    #[arg(short, long, default_value_t = DEFAULT_END_ZOOM)]
    end_zoom: u8,

    /// Area to label in Web Mercator meters; defaults to the data extent
    #[arg(long, num_args = 4, value_names = ["MINX", "MINY", "MAXX", "MAXY"], allow_negative_numbers = true)]
    extent: Option<Vec<f64>>,

    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Most populous places kept per tile
    #[arg(short, long, default_value_t = DEFAULT_MAX_CITIES_PER_TILE)]
    max_cities_per_tile: usize,

    /// Feature property holding the label text
    #[arg(short, long, default_value = DEFAULT_NAME_KEY)]
    name_column: String,

    /// Concurrent zoom jobs; 1 runs sequentially and stops at the first failure
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, default_value = DEFAULT_FONT_FILE)]
    font_file: String,

    #[arg(long, default_value_t = 0)]
    point_size: u32,

    #[arg(long, default_value = "")]
    preferred_placement: String,

    /// Override the default font size of a zoom, e.g. `--font-size 9=14`
    #[arg(long = "font-size", value_name = "ZOOM=SIZE")]
    font_sizes: Vec<String>,
}

impl Args {
    fn zoom_range(&self) -> Result<ZoomRange, ConfigError> {
        ZoomRange::new(self.start_zoom, self.end_zoom)
    }

    fn explicit_extent(&self) -> Result<Option<Extent>, ConfigError> {
        match self.extent.as_deref() {
            Some(&[minx, miny, maxx, maxy]) => Extent::new(minx, miny, maxx, maxy)
                .map(Some)
                .map_err(ConfigError::InvalidExtent),
            Some(_) => Err(ConfigError::EmptyExtent),
            None => Ok(None),
        }
    }

    fn worker_count(&self) -> Result<usize, ConfigError> {
        match self.workers {
            Some(0) => Err(ConfigError::InvalidWorkerCount),
            Some(n) => Ok(n),
            None => Ok(default_worker_count()),
        }
    }

    fn font_defaults(&self) -> FontDefaults {
        FontDefaults {
            font_file: self.font_file.clone(),
            point_size: self.point_size,
            preferred_placement: self.preferred_placement.clone(),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every zoom job succeeded
fn run(args: Args) -> Result<bool> {
    let started = Instant::now();

    let zooms = args.zoom_range().context("invalid zoom range")?;
    let workers = args.worker_count()?;
    let font_sizes = FontSizeTable::default()
        .with_overrides(&args.font_sizes)
        .context("invalid font size override")?;
    let explicit_extent = args.explicit_extent().context("invalid extent")?;

    let source = GeoJsonSource::new(&args.features, args.name_column.as_str());
    let baseline = compute_baseline(&source, explicit_extent)
        .with_context(|| format!("failed to prepare run from {}", args.features.display()))?;

    let mut settings = RunSettings::new(baseline.extent, baseline.max_population, &args.output_dir);
    settings.max_features_per_tile = args.max_cities_per_tile;
    settings.font_sizes = font_sizes;
    settings.font = args.font_defaults();

    let zoom_levels = zooms.zooms();
    info!(
        "Labelling zooms {}..={} over {} with {} worker(s)",
        zooms.start(),
        zooms.end(),
        settings.extent,
        workers
    );

    let summary = run_jobs(
        &zoom_levels,
        workers,
        |zoom| run_zoom(&settings, zoom, &source),
        |done, total, _, result| match result {
            Ok(output) => println!(
                "({}/{}): {} ({} labels in {} tiles)",
                done,
                total,
                output.path.display(),
                output.report.labels_written,
                output.report.tiles_with_labels
            ),
            Err(err) => eprintln!("({}/{}): {:#}", done, total, err),
        },
    )?;

    if !summary.skipped.is_empty() {
        error!("Skipped zooms after failure: {:?}", summary.skipped);
    }
    info!(
        "{} of {} zoom levels written in {:.2?}",
        summary.completed.len(),
        zoom_levels.len(),
        started.elapsed()
    );

    Ok(summary.is_success())
}

/// One zoom job with its error lifted into `anyhow` for `{:#}` reporting
fn run_zoom<C: StoreConnector>(settings: &RunSettings, zoom: u8, connector: &C) -> Result<ZoomOutput> {
    Ok(run_zoom_level(settings, zoom, connector)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["tile-labels", "--features", "places.geojson"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!((args.start_zoom, args.end_zoom), (8, 16));
        assert_eq!(args.max_cities_per_tile, 7);
        assert_eq!(args.name_column, "name");
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.font_defaults(), FontDefaults::default());
        assert!(args.explicit_extent().unwrap().is_none());
        assert!(args.worker_count().unwrap() >= 1);
    }

    #[test]
    fn test_negative_extent_values() {
        let args = parse(&["--extent", "-1000", "-2000.5", "3000", "4000"]);
        let extent = args.explicit_extent().unwrap().unwrap();
        assert_eq!(extent.to_array(), [-1000.0, -2000.5, 3000.0, 4000.0]);
    }

    #[test]
    fn test_degenerate_extent_rejected() {
        let args = parse(&["--extent", "10", "0", "10", "5"]);
        assert!(matches!(
            args.explicit_extent(),
            Err(ConfigError::InvalidExtent(_))
        ));
    }

    #[test]
    fn test_zoom_range_validation() {
        assert!(parse(&["-s", "3", "-e", "5"]).zoom_range().is_ok());
        assert!(parse(&["-s", "9", "-e", "9"]).zoom_range().is_err());
        assert!(parse(&["-s", "0", "-e", "23"]).zoom_range().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            parse(&["--workers", "0"]).worker_count(),
            Err(ConfigError::InvalidWorkerCount)
        ));
        assert_eq!(parse(&["--workers", "3"]).worker_count().unwrap(), 3);
    }

    #[test]
    fn test_job_failure_reports_full_chain() {
        let dir = tempfile::tempdir().unwrap();
        let source = GeoJsonSource::new(dir.path().join("missing.geojson"), DEFAULT_NAME_KEY);
        let settings = RunSettings::new(
            Extent::world(),
            tile_labels::label::MaxPopulation::new(1_000.0).unwrap(),
            dir.path(),
        );

        let err = run_zoom(&settings, 9, &source).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("zoom 9 failed while initializing: store query error: failed to read feature store"));
        assert!(message.contains("missing.geojson"));
    }

    #[test]
    fn test_font_size_overrides_repeat() {
        let args = parse(&["--font-size", "9=15", "--font-size", "10=11"]);
        assert_eq!(args.font_sizes, vec!["9=15", "10=11"]);
    }
}
