use std::fs;
use std::path::PathBuf;

use geojson::{GeoJson, JsonObject, JsonValue, Value};
use log::{debug, info};

use crate::data::{Feature, MemoryStore, PlaceCategory, StoreConnector};
use crate::error::StoreError;

/// Property holding the label text unless overridden (e.g. `name:ja`)
pub const DEFAULT_NAME_KEY: &str = "name";

/// Property holding the OSM place category
const PLACE_KEY: &str = "place";

/// Property holding the population count
const POPULATION_KEY: &str = "population";

/// A GeoJSON file of OSM place points, opened as an in-memory store
#[derive(Debug, Clone)]
pub struct GeoJsonSource {
    path: PathBuf,
    name_key: String,
}

impl GeoJsonSource {
    pub fn new(path: impl Into<PathBuf>, name_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name_key: name_key.into(),
        }
    }

    /// Read and parse the file, keeping only qualifying place points
    pub fn load(&self) -> Result<Vec<Feature>, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let geojson: GeoJson = content.parse().map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source: Box::new(source),
        })?;

        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc
                .features
                .iter()
                .filter_map(|f| place_from_feature(f, &self.name_key))
                .collect::<Vec<_>>(),
            GeoJson::Feature(f) => place_from_feature(&f, &self.name_key).into_iter().collect(),
            GeoJson::Geometry(_) => {
                return Err(StoreError::UnsupportedDocument {
                    path: self.path.clone(),
                })
            }
        };

        info!(
            "Loaded {} places from {} (name key '{}')",
            features.len(),
            self.path.display(),
            self.name_key
        );

        Ok(features)
    }
}

impl StoreConnector for GeoJsonSource {
    type Store = MemoryStore;

    fn connect(&self) -> Result<MemoryStore, StoreError> {
        Ok(MemoryStore::from_features(self.load()?))
    }
}

/// Convert one GeoJSON feature into a place, or `None` if it does not qualify
fn place_from_feature(feature: &geojson::Feature, name_key: &str) -> Option<Feature> {
    let props = feature.properties.as_ref()?;

    let name = string_property(props, name_key)?;
    let category = string_property(props, PLACE_KEY).and_then(PlaceCategory::parse)?;
    let Some(population) = props.get(POPULATION_KEY).and_then(parse_population) else {
        debug!("Skipping '{}': missing or unparsable population", name);
        return None;
    };

    let geometry = feature.geometry.as_ref()?;
    let Value::Point(coords) = &geometry.value else {
        debug!("Skipping '{}': geometry is not a point", name);
        return None;
    };
    if coords.len() < 2 {
        return None;
    }

    Some(Feature {
        name: name.to_string(),
        category,
        population,
        lon: coords[0],
        lat: coords[1],
    })
}

/// Non-empty, trimmed string property
fn string_property<'a>(props: &'a JsonObject, key: &str) -> Option<&'a str> {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Population from a JSON number or a numeric string.
///
/// OSM tags are free text, so `"12,500"` and `"1 200"` are accepted.
/// Negative, non-finite and non-numeric values yield `None`.
pub fn parse_population(value: &JsonValue) -> Option<u64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s
            .chars()
            .filter(|c| !matches!(c, ',' | '_' | ' '))
            .collect::<String>()
            .parse::<f64>()
            .ok(),
        _ => None,
    }?;

    if !parsed.is_finite() || parsed < 0.0 {
        return None;
    }

    Some(parsed.round() as u64)
}
