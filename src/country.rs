//! Country hit-testing against a polygon dataset
//!
//! Features are read once from GeoJSON or TopoJSON, from a file or a URL, and
//! kept for the session. Lookups walk
//! the features in dataset order and return the first whose polygons contain
//! the point. A feature whose geometry could not be converted is kept (so
//! indices stay stable) but never matches.

use crate::forecast::WeatherApiClient;
use crate::models::Coordinate;
use crate::{Result, WeatherLensError};
use geo::{Contains, Geometry, MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::{Map, Value};
use topojson::TopoJson;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Property keys probed, in order, for a country's display name
pub const NAME_KEYS: [&str; 5] = ["ADMIN", "name", "NAME", "NAME_LONG", "SOVEREIGNT"];

/// TopoJSON object preferred when a topology carries several
pub const COUNTRIES_OBJECT: &str = "countries";

/// One country outline with its resolved name
#[derive(Debug, Clone)]
pub struct CountryFeature {
    pub name: Option<String>,
    pub properties: Map<String, Value>,
    geometry: Option<MultiPolygon<f64>>,
}

impl CountryFeature {
    #[must_use]
    pub fn new(name: Option<String>, geometry: Option<MultiPolygon<f64>>) -> Self {
        Self {
            name,
            properties: Map::new(),
            geometry,
        }
    }

    fn from_geojson(feature: Feature) -> Self {
        let properties = feature.properties.unwrap_or_default();
        let name = resolve_name(&properties);
        let geometry = feature.geometry.and_then(|g| {
            match Geometry::<f64>::try_from(g.value) {
                Ok(geometry) => to_multi_polygon(geometry),
                Err(e) => {
                    warn!("Skipping geometry of {:?}: {}", name, e);
                    None
                }
            }
        });
        Self {
            name,
            properties,
            geometry,
        }
    }

    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        if !coordinate.is_finite() {
            return false;
        }
        let point = Point::new(coordinate.longitude, coordinate.latitude);
        self.geometry.as_ref().is_some_and(|mp| mp.contains(&point))
    }

    /// Exterior and interior rings as (longitude, latitude) pairs
    pub fn rings(&self) -> impl Iterator<Item = Vec<(f64, f64)>> + '_ {
        self.geometry
            .iter()
            .flat_map(|mp| mp.0.iter())
            .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors().iter()))
            .map(|ring| ring.0.iter().map(|c| (c.x, c.y)).collect())
    }
}

fn to_multi_polygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(p.into()),
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<Polygon<f64>> = gc
                .0
                .into_iter()
                .filter_map(to_multi_polygon)
                .flat_map(|mp| mp.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// First non-empty string value among [`NAME_KEYS`]
#[must_use]
pub fn resolve_name(properties: &Map<String, Value>) -> Option<String> {
    NAME_KEYS.iter().find_map(|key| {
        properties
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Loaded country features in dataset order
#[derive(Debug, Clone, Default)]
pub struct CountryIndex {
    features: Vec<CountryFeature>,
}

impl CountryIndex {
    #[must_use]
    pub fn new(features: Vec<CountryFeature>) -> Self {
        Self { features }
    }

    /// Parse GeoJSON or TopoJSON, told apart by a top-level `"type": "Topology"`
    pub fn parse(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| WeatherLensError::geometry(e.to_string()))?;
        if value.get("type").and_then(Value::as_str) == Some("Topology") {
            Self::from_topojson_str(input)
        } else {
            Self::from_geojson_str(input)
        }
    }

    /// Parse a GeoJSON `FeatureCollection`, `Feature` or bare geometry
    pub fn from_geojson_str(input: &str) -> Result<Self> {
        let geojson: GeoJson = input
            .parse()
            .map_err(|e: geojson::Error| WeatherLensError::geometry(e.to_string()))?;

        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(geometry) => vec![Feature {
                geometry: Some(geometry),
                ..Feature::default()
            }],
        };
        Ok(Self::from_features(features))
    }

    /// Parse a TopoJSON topology, such as the world-atlas `countries-110m.json`.
    ///
    /// Only the `countries` object is used when present; otherwise every
    /// object contributes features in declaration order.
    pub fn from_topojson_str(input: &str) -> Result<Self> {
        let topology = match input
            .parse::<TopoJson>()
            .map_err(|e| WeatherLensError::geometry(e.to_string()))?
        {
            TopoJson::Topology(topology) => topology,
            _ => {
                return Err(WeatherLensError::geometry("TopoJSON input is not a topology"));
            }
        };

        let names: Vec<&str> = if topology.objects.iter().any(|o| o.name == COUNTRIES_OBJECT) {
            vec![COUNTRIES_OBJECT]
        } else {
            topology.objects.iter().map(|o| o.name.as_str()).collect()
        };

        let mut features = Vec::new();
        for name in names {
            let collection = topojson::to_geojson(&topology, name)
                .map_err(|e| WeatherLensError::geometry(format!("object '{name}': {e}")))?;
            // Round-trip through JSON so the features land in this crate's geojson types.
            let value = serde_json::to_value(&collection)
                .map_err(|e| WeatherLensError::geometry(e.to_string()))?;
            let collection: FeatureCollection = serde_json::from_value(value)
                .map_err(|e| WeatherLensError::geometry(e.to_string()))?;
            features.extend(collection.features);
        }
        Ok(Self::from_features(features))
    }

    fn from_features(features: Vec<Feature>) -> Self {
        let features: Vec<CountryFeature> =
            features.into_iter().map(CountryFeature::from_geojson).collect();
        let broken = features.iter().filter(|f| !f.has_geometry()).count();
        if broken > 0 {
            warn!("{} of {} country features have no usable geometry", broken, features.len());
        }
        Self { features }
    }

    /// Read and parse a GeoJSON or TopoJSON file
    #[instrument(level = "info")]
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let index = Self::parse(&text)?;
        info!("Loaded {} country features from {}", index.len(), path.display());
        Ok(index)
    }

    /// Download and parse a dataset
    #[instrument(level = "info", skip(client))]
    pub async fn fetch(client: &WeatherApiClient, url: &str) -> Result<Self> {
        let text = client.fetch_text(url).await?;
        let index = Self::parse(&text)?;
        info!("Loaded {} country features from {}", index.len(), url);
        Ok(index)
    }

    /// Load from an `http(s)` URL or a local path
    pub async fn open(client: &WeatherApiClient, source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::fetch(client, source).await
        } else {
            Self::load(Path::new(source)).await
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn features(&self) -> &[CountryFeature] {
        &self.features
    }
}

/// Outcome of a country lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryMatch {
    Found { index: usize, name: Option<String> },
    NoMatch,
}

impl CountryMatch {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            CountryMatch::Found { name, .. } => name.as_deref(),
            CountryMatch::NoMatch => None,
        }
    }

    #[must_use]
    pub fn into_name(self) -> Option<String> {
        match self {
            CountryMatch::Found { name, .. } => name,
            CountryMatch::NoMatch => None,
        }
    }
}

/// Country lookups over a dataset that may still be loading
#[derive(Debug, Clone, Default)]
pub struct CountryResolver {
    index: Option<Arc<CountryIndex>>,
}

impl CountryResolver {
    /// A resolver with no dataset yet; every lookup is a miss
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(index: CountryIndex) -> Self {
        Self {
            index: Some(Arc::new(index)),
        }
    }

    pub fn set_index(&mut self, index: CountryIndex) {
        self.index = Some(Arc::new(index));
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    #[must_use]
    pub fn index(&self) -> Option<&CountryIndex> {
        self.index.as_deref()
    }

    #[must_use]
    pub fn resolve(&self, coordinate: Coordinate) -> CountryMatch {
        let Some(index) = self.index.as_deref() else {
            debug!("Country lookup before dataset loaded");
            return CountryMatch::NoMatch;
        };
        index
            .features
            .iter()
            .position(|f| f.contains(coordinate))
            .map_or(CountryMatch::NoMatch, |i| CountryMatch::Found {
                index: i,
                name: index.features[i].name.clone(),
            })
    }
}
