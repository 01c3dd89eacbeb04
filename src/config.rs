use std::path::PathBuf;
use std::thread;

use crate::error::ConfigError;
use crate::geo::Extent;
use crate::label::{
    big_font_size, choose_font_size, scaled_percentile, FontSizeTable, MaxPopulation,
    MAX_LABEL_ZOOM,
};
use crate::map::DEFAULT_TILE_SIZE;

pub const DEFAULT_MAX_CITIES_PER_TILE: usize = 7;
pub const DEFAULT_FONT_FILE: &str = "./fonts/Arial-Unicode-Bold.ttf";
pub const DEFAULT_START_ZOOM: u8 = 8;
pub const DEFAULT_END_ZOOM: u8 = 16;

/// Presentation columns copied verbatim into every label row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDefaults {
    pub font_file: String,
    pub point_size: u32,
    pub preferred_placement: String,
}

impl Default for FontDefaults {
    fn default() -> Self {
        Self {
            font_file: DEFAULT_FONT_FILE.to_string(),
            point_size: 0,
            preferred_placement: String::new(),
        }
    }
}

/// Validated inclusive zoom range, `0 <= start < end <= 22`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    start: u8,
    end: u8,
}

impl ZoomRange {
    pub fn new(start: u8, end: u8) -> Result<Self, ConfigError> {
        if start >= end || end > MAX_LABEL_ZOOM {
            return Err(ConfigError::InvalidZoomRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn zooms(&self) -> Vec<u8> {
        (self.start..=self.end).collect()
    }
}

/// Worker count used when none is given: all cores but one, at least one
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Settings shared read-only by every zoom job of a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub extent: Extent,
    pub max_features_per_tile: usize,
    pub max_population: MaxPopulation,
    pub font_sizes: FontSizeTable,
    pub font: FontDefaults,
    pub tile_size: u32,
    pub output_dir: PathBuf,
}

impl RunSettings {
    pub fn new(extent: Extent, max_population: MaxPopulation, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            extent,
            max_features_per_tile: DEFAULT_MAX_CITIES_PER_TILE,
            max_population,
            font_sizes: FontSizeTable::default(),
            font: FontDefaults::default(),
            tile_size: DEFAULT_TILE_SIZE,
            output_dir: output_dir.into(),
        }
    }

    /// Resolve the configuration of one zoom job
    pub fn job_config(&self, zoom: u8) -> Result<ZoomJobConfig, ConfigError> {
        ZoomJobConfig::new(
            self.extent,
            zoom,
            self.max_features_per_tile,
            self.max_population,
            &self.font_sizes,
            self.font.clone(),
        )
        .map(|config| config.with_tile_size(self.tile_size))
    }
}

/// Everything one zoom job needs, resolved up front and never mutated
#[derive(Debug, Clone)]
pub struct ZoomJobConfig {
    pub extent: Extent,
    pub zoom: u8,
    pub max_features_per_tile: usize,
    pub max_population: MaxPopulation,
    pub default_font_size: u32,
    pub big_font_size: u32,
    pub font: FontDefaults,
    pub tile_size: u32,
}

impl ZoomJobConfig {
    /// Fails with [`ConfigError::ZoomOutOfRange`] for zooms beyond the font tables
    pub fn new(
        extent: Extent,
        zoom: u8,
        max_features_per_tile: usize,
        max_population: MaxPopulation,
        font_sizes: &FontSizeTable,
        font: FontDefaults,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            extent,
            zoom,
            max_features_per_tile,
            max_population,
            default_font_size: font_sizes.get(zoom)?,
            big_font_size: big_font_size(zoom)?,
            font,
            tile_size: DEFAULT_TILE_SIZE,
        })
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Font size for a population at this job's zoom
    #[inline]
    pub fn font_size_for(&self, population: u64) -> u32 {
        choose_font_size(
            scaled_percentile(population, self.max_population),
            self.big_font_size,
            self.default_font_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RunSettings {
        RunSettings::new(Extent::world(), MaxPopulation::new(500_000.0).unwrap(), ".")
    }

    #[test]
    fn test_zoom_range_validation() {
        assert!(ZoomRange::new(0, 22).is_ok());
        assert!(ZoomRange::new(8, 8).is_err());
        assert!(ZoomRange::new(9, 8).is_err());
        assert!(ZoomRange::new(0, 23).is_err());
        assert_eq!(ZoomRange::new(3, 5).unwrap().zooms(), vec![3, 4, 5]);
    }

    #[test]
    fn test_job_config_resolves_fonts() {
        let config = settings().job_config(10).unwrap();
        assert_eq!(config.default_font_size, 13);
        assert_eq!(config.big_font_size, 20);
        assert_eq!(config.font_size_for(500_000), 20);
        assert_eq!(config.font_size_for(200_000), 20);
        assert_eq!(config.font_size_for(100_000), 13);
        assert_eq!(config.font_size_for(50_000), 13);

        let config = settings().job_config(6).unwrap();
        assert_eq!((config.default_font_size, config.big_font_size), (12, 18));
    }

    #[test]
    fn test_job_config_rejects_zoom_23() {
        assert!(matches!(
            settings().job_config(23),
            Err(ConfigError::ZoomOutOfRange(23))
        ));
    }

    #[test]
    fn test_default_worker_count_is_positive() {
        assert!(default_worker_count() >= 1);
    }
}
