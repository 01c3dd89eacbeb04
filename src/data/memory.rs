use std::cmp::Reverse;

use glam::DVec2;
use log::debug;

use crate::data::{Feature, FeatureQuery, FeatureStore, PlaceCategory};
use crate::error::StoreError;
use crate::geo::Extent;
use crate::map::{project_to_planar, SpatialGrid, DEFAULT_CELL_SIZE};

/// Margin around the stored points when reporting the data extent (meters)
const EXTENT_PAD: f64 = 1.0;

/// In-memory feature store indexed by planar position.
///
/// Ties in population keep insertion order, which stands in for a
/// database's natural row order.
pub struct MemoryStore {
    grid: SpatialGrid<Feature>,
}

impl MemoryStore {
    /// Index features by their projected position. Features outside the
    /// Web Mercator latitude range cannot belong to any tile and are dropped.
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut grid = SpatialGrid::new(DEFAULT_CELL_SIZE);
        let mut skipped = 0usize;

        for feature in features {
            match project_to_planar(feature.lon, feature.lat) {
                Ok((x, y)) => grid.insert(DVec2::new(x, y), feature),
                Err(err) => {
                    debug!("Skipping '{}': {}", feature.name, err);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            debug!("Skipped {} features outside the projection domain", skipped);
        }

        Self { grid }
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }
}

impl FeatureStore for MemoryStore {
    fn features_in(&mut self, query: &FeatureQuery<'_>) -> Result<Vec<Feature>, StoreError> {
        let mut hits: Vec<&Feature> = self
            .grid
            .query_bbox(&query.bounds)
            .into_iter()
            .filter_map(|idx| self.grid.get(idx))
            .filter(|f| query.categories.contains(&f.category))
            .collect();

        // Stable, so equal populations stay in insertion order
        hits.sort_by_key(|f| Reverse(f.population));
        hits.truncate(query.limit);

        Ok(hits.into_iter().cloned().collect())
    }

    fn max_population(&mut self, categories: &[PlaceCategory]) -> Result<Option<u64>, StoreError> {
        Ok(self
            .grid
            .iter()
            .filter(|(_, f)| categories.contains(&f.category))
            .map(|(_, f)| f.population)
            .max())
    }

    fn data_extent(&mut self) -> Result<Option<Extent>, StoreError> {
        Ok(Extent::from_points(self.grid.iter().map(|(p, _)| p), EXTENT_PAD))
    }
}
