//! Population-driven label sizing.
//!
//! A feature's population is rescaled against the run-wide maximum into a
//! 0–100 percentile. Above [`BIG_FONT_PERCENTILE`] the label gets the zoom
//! tier's big font, otherwise the zoom's default font.

use crate::config::FontDefaults;
use crate::data::Feature;
use crate::error::ConfigError;

/// Highest zoom level covered by the font tables
pub const MAX_LABEL_ZOOM: u8 = 22;

/// Percentile a feature must exceed to be drawn with the big font
pub const BIG_FONT_PERCENTILE: f64 = 30.0;

/// Big font size per zoom tier as `(min_zoom, size)`, highest tier first
const BIG_FONT_TIERS: [(u8, u32); 3] = [(8, 20), (6, 18), (0, 16)];

/// Default (non-big) font size per zoom level 0..=22
pub const DEFAULT_FONT_SIZES: [u32; MAX_LABEL_ZOOM as usize + 1] = [
    10, 10, 10, 10, 10, // 0-4
    12, 12, 12, // 5-7
    13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, // 8-22
];

/// Dataset-wide maximum population, strictly positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxPopulation(f64);

impl MaxPopulation {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidMaxPopulation(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<u64> for MaxPopulation {
    type Error = ConfigError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value as f64)
    }
}

/// Linear rescale of `population` into `[0, 100]` relative to the maximum
#[inline]
pub fn scaled_percentile(population: u64, max: MaxPopulation) -> f64 {
    (population as f64 / max.get() * 100.0).clamp(0.0, 100.0)
}

fn check_zoom(zoom: u8) -> Result<(), ConfigError> {
    if zoom > MAX_LABEL_ZOOM {
        return Err(ConfigError::ZoomOutOfRange(zoom));
    }
    Ok(())
}

/// Big font size for the zoom's tier
pub fn big_font_size(zoom: u8) -> Result<u32, ConfigError> {
    check_zoom(zoom)?;
    let size = BIG_FONT_TIERS
        .iter()
        .find(|(min_zoom, _)| zoom >= *min_zoom)
        .map(|(_, size)| *size)
        .unwrap_or(BIG_FONT_TIERS[BIG_FONT_TIERS.len() - 1].1);
    Ok(size)
}

/// Pick between the big and default font for a percentile
#[inline]
pub(crate) fn choose_font_size(percentile: f64, big: u32, default: u32) -> u32 {
    if percentile > BIG_FONT_PERCENTILE {
        big
    } else {
        default
    }
}

/// Font size for a feature at a zoom level
pub fn font_size(
    population: u64,
    max: MaxPopulation,
    zoom: u8,
    default_font_size: u32,
) -> Result<u32, ConfigError> {
    let big = big_font_size(zoom)?;
    Ok(choose_font_size(
        scaled_percentile(population, max),
        big,
        default_font_size,
    ))
}

/// Per-zoom default font sizes, starting from [`DEFAULT_FONT_SIZES`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSizeTable {
    sizes: [u32; MAX_LABEL_ZOOM as usize + 1],
}

impl FontSizeTable {
    pub fn get(&self, zoom: u8) -> Result<u32, ConfigError> {
        check_zoom(zoom)?;
        Ok(self.sizes[zoom as usize])
    }

    pub fn set(&mut self, zoom: u8, size: u32) -> Result<(), ConfigError> {
        check_zoom(zoom)?;
        self.sizes[zoom as usize] = size;
        Ok(())
    }

    /// Apply `ZOOM=SIZE` overrides
    pub fn with_overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Result<Self, ConfigError> {
        for entry in overrides {
            let (zoom, size) = parse_font_size_override(entry.as_ref())?;
            self.set(zoom, size)?;
        }
        Ok(self)
    }
}

impl Default for FontSizeTable {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_FONT_SIZES,
        }
    }
}

/// Parse a `ZOOM=SIZE` override such as `9=14`
pub fn parse_font_size_override(entry: &str) -> Result<(u8, u32), ConfigError> {
    let invalid = || ConfigError::InvalidFontSizeOverride(entry.to_string());
    let (zoom, size) = entry.split_once('=').ok_or_else(invalid)?;
    let zoom = zoom.trim().parse::<u8>().map_err(|_| invalid())?;
    let size = size.trim().parse::<u32>().map_err(|_| invalid())?;
    if size == 0 {
        return Err(invalid());
    }
    Ok((zoom, size))
}

/// One row of a label file
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub font_size: u32,
    pub font_file: String,
    pub point_size: u32,
    pub preferred_placement: String,
}

impl LabelRecord {
    pub fn from_feature(feature: &Feature, font_size: u32, defaults: &FontDefaults) -> Self {
        Self {
            name: feature.name.clone(),
            latitude: feature.lat,
            longitude: feature.lon,
            font_size,
            font_file: defaults.font_file.clone(),
            point_size: defaults.point_size,
            preferred_placement: defaults.preferred_placement.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max(v: f64) -> MaxPopulation {
        MaxPopulation::new(v).unwrap()
    }

    #[test]
    fn test_percentile_endpoints() {
        for m in [1u64, 500, 13_900_000] {
            assert_eq!(scaled_percentile(m, max(m as f64)), 100.0);
            assert_eq!(scaled_percentile(0, max(m as f64)), 0.0);
        }
        assert_eq!(scaled_percentile(250, max(1000.0)), 25.0);
    }

    #[test]
    fn test_percentile_clamps_above_max() {
        assert_eq!(scaled_percentile(2_000, max(1_000.0)), 100.0);
    }

    #[test]
    fn test_max_population_must_be_positive() {
        assert!(MaxPopulation::new(0.0).is_err());
        assert!(MaxPopulation::new(-3.0).is_err());
        assert!(MaxPopulation::new(f64::NAN).is_err());
        assert!(MaxPopulation::try_from(0u64).is_err());
        assert_eq!(MaxPopulation::try_from(7u64).unwrap().get(), 7.0);
    }

    #[test]
    fn test_big_font_tiers() {
        let expected = [16, 16, 16, 16, 16, 16, 18, 18, 20, 20, 20];
        for (zoom, size) in expected.iter().enumerate() {
            assert_eq!(big_font_size(zoom as u8).unwrap(), *size, "zoom {}", zoom);
        }
        assert_eq!(big_font_size(22).unwrap(), 20);
        assert!(matches!(big_font_size(23), Err(ConfigError::ZoomOutOfRange(23))));
    }

    #[test]
    fn test_font_size_threshold_at_zoom_10() {
        let table = FontSizeTable::default();
        let default = table.get(10).unwrap();
        assert_eq!(default, 13);
        // 31% and 29% of a 100 max
        assert_eq!(font_size(31, max(100.0), 10, default).unwrap(), 20);
        assert_eq!(font_size(29, max(100.0), 10, default).unwrap(), default);
        // Exactly 30% stays default
        assert_eq!(font_size(30, max(100.0), 10, default).unwrap(), default);
    }

    #[test]
    fn test_font_size_rejects_zoom_23() {
        assert!(matches!(
            font_size(100, max(100.0), 23, 13),
            Err(ConfigError::ZoomOutOfRange(23))
        ));
    }

    #[test]
    fn test_default_table() {
        let table = FontSizeTable::default();
        assert_eq!(table.get(0).unwrap(), 10);
        assert_eq!(table.get(5).unwrap(), 12);
        assert_eq!(table.get(7).unwrap(), 12);
        assert_eq!(table.get(8).unwrap(), 13);
        assert_eq!(table.get(22).unwrap(), 13);
        assert!(matches!(table.get(23), Err(ConfigError::ZoomOutOfRange(23))));
    }

    #[test]
    fn test_table_overrides() {
        let table = FontSizeTable::default().with_overrides(&["9=15", " 0 = 8 "]).unwrap();
        assert_eq!(table.get(9).unwrap(), 15);
        assert_eq!(table.get(0).unwrap(), 8);
        assert_eq!(table.get(10).unwrap(), 13);

        assert!(FontSizeTable::default().with_overrides(&["23=10"]).is_err());
        assert!(parse_font_size_override("9").is_err());
        assert!(parse_font_size_override("9=zero").is_err());
        assert!(parse_font_size_override("9=0").is_err());
    }
}
