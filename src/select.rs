use log::trace;

use crate::data::{Feature, FeatureQuery, FeatureStore, PlaceCategory};
use crate::error::StoreError;
use crate::geo::Extent;

/// Place categories that qualify for labelling
pub const LABEL_CATEGORIES: [PlaceCategory; 4] = PlaceCategory::ALL;

/// The `max_count` most populous qualifying features inside `bounds`.
///
/// Issues exactly one store query; ordering and truncation come from the
/// store. Equal populations come back in the store's natural order.
pub fn select_top_features<S: FeatureStore + ?Sized>(
    bounds: &Extent,
    max_count: usize,
    store: &mut S,
) -> Result<Vec<Feature>, StoreError> {
    if max_count == 0 {
        return Ok(Vec::new());
    }

    let query = FeatureQuery {
        bounds: *bounds,
        categories: &LABEL_CATEGORIES,
        limit: max_count,
    };
    let features = store.features_in(&query)?;
    debug_assert!(features.len() <= max_count);

    trace!("{} features in {}", features.len(), bounds);
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;

    /// Counts queries and forwards to an in-memory store
    struct CountingStore {
        inner: MemoryStore,
        queries: usize,
    }

    impl FeatureStore for CountingStore {
        fn features_in(&mut self, query: &FeatureQuery<'_>) -> Result<Vec<Feature>, StoreError> {
            self.queries += 1;
            assert_eq!(query.categories, &LABEL_CATEGORIES);
            self.inner.features_in(query)
        }

        fn max_population(&mut self, categories: &[PlaceCategory]) -> Result<Option<u64>, StoreError> {
            self.inner.max_population(categories)
        }

        fn data_extent(&mut self) -> Result<Option<Extent>, StoreError> {
            self.inner.data_extent()
        }
    }

    fn store_with(populations: &[u64]) -> CountingStore {
        let features = populations.iter().enumerate().map(|(i, &population)| Feature {
            name: format!("place-{}", i),
            category: PlaceCategory::Town,
            population,
            lon: 10.0 + i as f64 * 0.01,
            lat: 50.0,
        });
        CountingStore {
            inner: MemoryStore::from_features(features),
            queries: 0,
        }
    }

    #[test]
    fn test_never_exceeds_max_count_and_is_descending() {
        let mut store = store_with(&[40, 900, 10, 900, 7_000, 3, 250, 61]);
        for max_count in 1..=10 {
            let features = select_top_features(&Extent::world(), max_count, &mut store).unwrap();
            assert!(features.len() <= max_count);
            assert!(features.windows(2).all(|w| w[0].population >= w[1].population));
        }
        assert_eq!(store.queries, 10);
    }

    #[test]
    fn test_one_query_per_call() {
        let mut store = store_with(&[1, 2, 3]);
        let features = select_top_features(&Extent::world(), 2, &mut store).unwrap();
        assert_eq!(store.queries, 1);
        let populations: Vec<_> = features.iter().map(|f| f.population).collect();
        assert_eq!(populations, vec![3, 2]);
    }

    #[test]
    fn test_zero_max_count_skips_query() {
        let mut store = store_with(&[1, 2, 3]);
        assert!(select_top_features(&Extent::world(), 0, &mut store).unwrap().is_empty());
        assert_eq!(store.queries, 0);
    }
}
