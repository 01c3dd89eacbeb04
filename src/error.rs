use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::job::JobState;
use crate::label::MAX_LABEL_ZOOM;
use crate::map::{TileIndex, MAX_TILE_ZOOM};

/// Invalid run or job configuration. Always raised before any tile work.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid zoom range: start {start}, end {end} (must satisfy 0 <= start < end <= {})", MAX_LABEL_ZOOM)]
    InvalidZoomRange { start: u8, end: u8 },

    #[error("zoom level {0} is outside the font size table (0..={})", MAX_LABEL_ZOOM)]
    ZoomOutOfRange(u8),

    #[error("invalid max population {0} (must be finite and > 0)")]
    InvalidMaxPopulation(f64),

    #[error("no qualifying features in the store (a name, a population and a city/suburb/town/village place are required)")]
    NoQualifyingFeatures,

    #[error("the store has no data extent; pass --extent explicitly")]
    EmptyExtent,

    #[error("invalid extent")]
    InvalidExtent(#[source] ProjectionError),

    #[error("invalid font size override '{0}' (expected ZOOM=SIZE)")]
    InvalidFontSizeOverride(String),

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("failed to build worker pool")]
    WorkerPool(#[source] rayon::ThreadPoolBuildError),
}

/// Web Mercator domain violations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("latitude {0} is outside the Web Mercator domain (-90, 90)")]
    LatitudeOutOfDomain(f64),

    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("zoom level {0} exceeds the largest representable zoom {}", MAX_TILE_ZOOM)]
    ZoomOutOfRange(u8),

    #[error("tile {0} is outside the tile grid")]
    TileOutOfRange(TileIndex),

    #[error("invalid tile size {0}")]
    InvalidTileSize(u32),

    #[error("degenerate extent ({minx}, {miny}, {maxx}, {maxy}) (requires minx < maxx and miny < maxy)")]
    DegenerateExtent {
        minx: f64,
        miny: f64,
        maxx: f64,
        maxy: f64,
    },
}

/// Feature store failures (the store's "connection" or query failed).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read feature store {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse GeoJSON feature store {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("feature store {} is a bare geometry, expected a Feature or FeatureCollection", .path.display())]
    UnsupportedDocument { path: PathBuf },
}

/// Label file write failures.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create label file {}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write label record")]
    Csv(#[from] csv::Error),

    #[error("failed to flush label file")]
    Io(#[from] io::Error),
}

/// Errors raised while establishing the per-run baseline (max population, extent).
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The underlying cause of a failed zoom job.
#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("projection error")]
    Projection(#[from] ProjectionError),

    #[error("store query error")]
    Store(#[from] StoreError),

    #[error("output write error")]
    Output(#[from] OutputError),
}

/// A zoom job failure with enough context to reproduce it.
#[derive(Debug, Error)]
#[error("zoom {zoom}{} failed while {state}", TileContext(.tile))]
pub struct JobError {
    pub zoom: u8,
    pub tile: Option<TileIndex>,
    pub state: JobState,
    #[source]
    pub source: JobFailure,
}

impl JobError {
    pub fn is_config(&self) -> bool {
        matches!(self.source, JobFailure::Config(_))
    }
}

struct TileContext<'a>(&'a Option<TileIndex>);

impl fmt::Display for TileContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(tile) => write!(f, " (tile {tile})"),
            None => Ok(()),
        }
    }
}
