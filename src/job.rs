//! One zoom level, end to end: tiles → per-tile selection → font scaling →
//! label rows.
//!
//! A failure anywhere aborts the job. Rows already written stay in the
//! output file; there is no cleanup and no retry.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{debug, info, trace};

use crate::config::{RunSettings, ZoomJobConfig};
use crate::data::{FeatureStore, StoreConnector};
use crate::error::{ConfigError, JobError, JobFailure, OutputError, SetupError};
use crate::geo::Extent;
use crate::label::{LabelRecord, MaxPopulation};
use crate::map::{iterate_tiles, TileIndex};
use crate::output::{label_file_path, CsvLabelWriter, LabelSink};
use crate::select::{select_top_features, LABEL_CATEGORIES};

/// Where a zoom job is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Initialized,
    ComputingExtentTiles,
    Querying,
    Scaling,
    Emitting,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Initialized => "initializing",
            JobState::ComputingExtentTiles => "computing extent tiles",
            JobState::Querying => "querying",
            JobState::Scaling => "scaling",
            JobState::Emitting => "emitting",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Counters reported by a finished job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub zoom: u8,
    pub tiles_visited: u64,
    pub tiles_with_labels: u64,
    pub labels_written: u64,
}

/// Runs a single zoom level against a store and a sink
pub struct ZoomJob<'a> {
    config: &'a ZoomJobConfig,
    state: JobState,
    tile: Option<TileIndex>,
}

impl<'a> ZoomJob<'a> {
    pub fn new(config: &'a ZoomJobConfig) -> Self {
        Self {
            config,
            state: JobState::Initialized,
            tile: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn transition(&mut self, next: JobState) {
        trace!("z{}: {} -> {}", self.config.zoom, self.state, next);
        self.state = next;
    }

    /// Record the failure context and move to `Failed`
    fn fail(&mut self, failure: impl Into<JobFailure>) -> JobError {
        let err = JobError {
            zoom: self.config.zoom,
            tile: self.tile,
            state: self.state,
            source: failure.into(),
        };
        self.transition(JobState::Failed);
        err
    }

    /// Process every tile of the configured extent, strictly in sequence
    pub fn run<S, K>(&mut self, store: &mut S, sink: &mut K) -> Result<JobReport, JobError>
    where
        S: FeatureStore + ?Sized,
        K: LabelSink + ?Sized,
    {
        let config = self.config;
        let mut report = JobReport {
            zoom: config.zoom,
            ..JobReport::default()
        };

        self.transition(JobState::ComputingExtentTiles);
        let tiles = iterate_tiles(&config.extent, config.zoom, config.tile_size)
            .map_err(|e| self.fail(e))?;
        info!(
            "z{}: {} tiles over {} (default font {}, big font {})",
            config.zoom,
            tiles.len(),
            config.extent,
            config.default_font_size,
            config.big_font_size
        );

        for tile in tiles {
            let tile = tile.map_err(|e| self.fail(e))?;
            self.tile = Some(tile.index);
            report.tiles_visited += 1;

            self.transition(JobState::Querying);
            let features = select_top_features(&tile.bounds, config.max_features_per_tile, store)
                .map_err(|e| self.fail(e))?;
            if features.is_empty() {
                continue;
            }

            self.transition(JobState::Scaling);
            let records: Vec<LabelRecord> = features
                .iter()
                .map(|f| LabelRecord::from_feature(f, config.font_size_for(f.population), &config.font))
                .collect();

            self.transition(JobState::Emitting);
            for record in &records {
                sink.write_label(record).map_err(|e| self.fail(e))?;
            }
            report.tiles_with_labels += 1;
            report.labels_written += records.len() as u64;
        }

        self.tile = None;
        sink.finish().map_err(|e| self.fail(e))?;
        self.transition(JobState::Completed);

        info!(
            "z{}: wrote {} labels from {} of {} tiles",
            config.zoom, report.labels_written, report.tiles_with_labels, report.tiles_visited
        );
        Ok(report)
    }
}

/// Baseline values computed once per run, before any job starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunBaseline {
    pub max_population: MaxPopulation,
    pub extent: Extent,
}

/// Query the global max population and, unless given, the data extent.
///
/// An empty store is a configuration error: without a maximum there is
/// nothing to scale against.
pub fn compute_baseline<C: StoreConnector>(
    connector: &C,
    explicit_extent: Option<Extent>,
) -> Result<RunBaseline, SetupError> {
    let mut store = connector.connect()?;

    let max_population = store
        .max_population(&LABEL_CATEGORIES)?
        .ok_or(ConfigError::NoQualifyingFeatures)?;
    let max_population = MaxPopulation::try_from(max_population)?;

    let extent = match explicit_extent {
        Some(extent) => extent,
        None => store.data_extent()?.ok_or(ConfigError::EmptyExtent)?,
    };

    info!(
        "Baseline: max population {}, extent {}",
        max_population.get(),
        extent
    );

    Ok(RunBaseline {
        max_population,
        extent,
    })
}

/// Label file written by [`run_zoom_level`] and the job's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomOutput {
    pub path: PathBuf,
    pub report: JobReport,
}

/// Run one zoom level into `city_labels_z{zoom}.csv` under the output directory.
///
/// The job configuration is resolved before the store is touched, so an
/// invalid zoom fails without issuing any query. Each call opens its own
/// store connection.
pub fn run_zoom_level<C: StoreConnector>(
    settings: &RunSettings,
    zoom: u8,
    connector: &C,
) -> Result<ZoomOutput, JobError> {
    let setup_error = |failure: JobFailure| JobError {
        zoom,
        tile: None,
        state: JobState::Initialized,
        source: failure,
    };

    let config = settings.job_config(zoom).map_err(|e| setup_error(e.into()))?;
    let mut store = connector.connect().map_err(|e| setup_error(e.into()))?;

    fs::create_dir_all(&settings.output_dir).map_err(|source| {
        setup_error(
            OutputError::Create {
                path: settings.output_dir.clone(),
                source,
            }
            .into(),
        )
    })?;
    let path = label_file_path(&settings.output_dir, zoom);
    debug!("z{}: writing {}", zoom, path.display());
    let mut sink = CsvLabelWriter::create(&path).map_err(|e| setup_error(e.into()))?;

    let report = ZoomJob::new(&config).run(&mut store, &mut sink)?;
    Ok(ZoomOutput { path, report })
}
