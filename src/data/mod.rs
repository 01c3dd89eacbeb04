//! Feature model and the feature store interface.
//!
//! The core only ever talks to a store through [`FeatureStore`]; a run opens
//! one store per zoom job through a [`StoreConnector`].

mod geojson_source;
mod memory;

pub use self::geojson_source::{parse_population, GeoJsonSource, DEFAULT_NAME_KEY};
pub use self::memory::MemoryStore;

use std::fmt;

use crate::error::StoreError;
use crate::geo::Extent;

/// OSM `place` values that qualify for labelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceCategory {
    City,
    Suburb,
    Town,
    Village,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 4] = [
        PlaceCategory::City,
        PlaceCategory::Suburb,
        PlaceCategory::Town,
        PlaceCategory::Village,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "city" => Some(PlaceCategory::City),
            "suburb" => Some(PlaceCategory::Suburb),
            "town" => Some(PlaceCategory::Town),
            "village" => Some(PlaceCategory::Village),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceCategory::City => "city",
            PlaceCategory::Suburb => "suburb",
            PlaceCategory::Town => "town",
            PlaceCategory::Village => "village",
        }
    }
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A populated place with its WGS84 position
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub category: PlaceCategory,
    pub population: u64,
    pub lon: f64,
    pub lat: f64,
}

/// One bounded store request: the features of a tile
#[derive(Debug, Clone, Copy)]
pub struct FeatureQuery<'a> {
    /// Box in planar meters
    pub bounds: Extent,
    pub categories: &'a [PlaceCategory],
    pub limit: usize,
}

/// A connection to a feature store.
///
/// Implementations only return features with a non-empty name and a
/// population; the core does no filtering of its own.
pub trait FeatureStore {
    /// Features inside `query.bounds` whose category is in `query.categories`,
    /// ordered by population descending and truncated to `query.limit`
    fn features_in(&mut self, query: &FeatureQuery<'_>) -> Result<Vec<Feature>, StoreError>;

    /// Largest population over all qualifying features, `None` when there are none
    fn max_population(&mut self, categories: &[PlaceCategory]) -> Result<Option<u64>, StoreError>;

    /// Planar extent of the stored points
    fn data_extent(&mut self) -> Result<Option<Extent>, StoreError>;
}

impl<S: FeatureStore + ?Sized> FeatureStore for &mut S {
    fn features_in(&mut self, query: &FeatureQuery<'_>) -> Result<Vec<Feature>, StoreError> {
        (**self).features_in(query)
    }

    fn max_population(&mut self, categories: &[PlaceCategory]) -> Result<Option<u64>, StoreError> {
        (**self).max_population(categories)
    }

    fn data_extent(&mut self) -> Result<Option<Extent>, StoreError> {
        (**self).data_extent()
    }
}

/// Opens store connections; each zoom job gets its own
pub trait StoreConnector: Sync {
    type Store: FeatureStore;

    fn connect(&self) -> Result<Self::Store, StoreError>;
}
