use crate::geo::{GeoBounds, GeoPoint};
use anyhow::{anyhow, Context, Result};
use geojson::{GeoJson, Geometry, JsonObject, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A closed ring of lon/lat coordinates
pub type Ring = Vec<GeoPoint>;

/// Per-neighbourhood statistics carried in the feature properties.
///
/// Every field is optional: one bad record must not stop the rest of the
/// map from rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingStats {
    /// Total listings
    pub n: Option<f64>,
    /// Entire-home listings
    pub entire: Option<f64>,
    /// log10 of `n`, drives the fill colour
    pub log_n: Option<f64>,
    /// Share of the city's listings
    pub pct: Option<f64>,
    pub mean_price: Option<f64>,
    pub sd_price: Option<f64>,
    pub mean_score: Option<f64>,
    pub sd_score: Option<f64>,
    /// `entire / n`, filled in by [`Feature::derive_entire_share`]
    pub entp: Option<f64>,
}

/// One neighbourhood polygon with its statistics
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: Option<String>,
    /// All rings of all polygon parts (exterior and holes alike)
    pub rings: Vec<Ring>,
    pub stats: ListingStats,
}

impl Feature {
    pub fn new(name: Option<String>, rings: Vec<Ring>, stats: ListingStats) -> Self {
        Self { name, rings, stats }
    }

    /// Compute and cache the entire-home share; stays `None` when undefined
    pub fn derive_entire_share(&mut self) {
        self.stats.entp = match (self.stats.entire, self.stats.n) {
            (Some(entire), Some(n)) => Some(entire / n).filter(|v| v.is_finite()),
            _ => None,
        };
    }

    /// Lon/lat bounds of every ring coordinate
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.rings.iter().flatten().copied())
    }

    /// Build from a GeoJSON feature; `None` if it has no polygon geometry
    pub fn from_geojson(feature: &geojson::Feature) -> Option<Self> {
        let mut rings = Vec::new();
        if let Some(ref geometry) = feature.geometry {
            collect_rings(geometry, &mut rings);
        }
        if rings.is_empty() {
            return None;
        }

        let props = feature.properties.as_ref();
        let name = props
            .and_then(|p| p.get("neighbourhood").or_else(|| p.get("name")))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let stats = props.map(ListingStats::from_properties).unwrap_or_default();
        Some(Self::new(name, rings, stats))
    }
}

impl ListingStats {
    pub fn from_properties(props: &JsonObject) -> Self {
        Self {
            n: numeric_property(props, "n"),
            entire: numeric_property(props, "entire"),
            log_n: numeric_property(props, "log_n"),
            pct: numeric_property(props, "pct"),
            mean_price: numeric_property(props, "mean_price"),
            sd_price: numeric_property(props, "sd_price"),
            mean_score: numeric_property(props, "mean_score"),
            sd_score: numeric_property(props, "sd_score"),
            entp: None,
        }
    }
}

/// Read a property that may be a JSON number or a numeric string.
/// Non-finite and unparsable values come back as `None`.
pub fn numeric_property(props: &JsonObject, key: &str) -> Option<f64> {
    let value = match props.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Load the neighbourhood feature collection from disk
pub fn load_features(path: &Path) -> Result<Vec<Feature>> {
    let mut bytes = fs::read(path).with_context(|| format!("Failed to read dataset: {:?}", path))?;
    let features = parse_features(&mut bytes).with_context(|| format!("Failed to parse dataset: {:?}", path))?;
    info!(path = %path.display(), features = features.len(), "loaded dataset");
    Ok(features)
}

/// Parse a GeoJSON FeatureCollection held in a mutable buffer (simd-json parses in place)
pub fn parse_features(bytes: &mut [u8]) -> Result<Vec<Feature>> {
    let json: serde_json::Value = simd_json::serde::from_slice(bytes).context("Invalid JSON")?;
    let geojson = GeoJson::from_json_value(json).context("Invalid GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.iter().enumerate() {
        match Feature::from_geojson(feature) {
            Some(f) => features.push(f),
            None => warn!(index = idx, "skipping feature without polygon geometry"),
        }
    }
    Ok(features)
}

/// Bounds of the whole dataset
pub fn dataset_bounds(features: &[Feature]) -> Option<GeoBounds> {
    let mut bounds: Option<GeoBounds> = None;
    for b in features.iter().filter_map(Feature::bounds) {
        match bounds.as_mut() {
            Some(acc) => acc.merge(&b),
            None => bounds = Some(b),
        }
    }
    bounds
}

fn to_ring(coords: &[Vec<f64>]) -> Ring {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| GeoPoint::from((c[0], c[1])))
        .filter(GeoPoint::is_valid)
        .collect()
}

fn collect_rings(geometry: &Geometry, rings: &mut Vec<Ring>) {
    match &geometry.value {
        Value::Polygon(polygon) => {
            rings.extend(polygon.iter().map(|r| to_ring(r)).filter(|r| r.len() >= 3));
        }
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                rings.extend(polygon.iter().map(|r| to_ring(r)).filter(|r| r.len() >= 3));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_rings(g, rings);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"neighbourhood": "Copacabana", "n": 20, "entire": "5", "log_n": 1.30103},
                "geometry": {"type": "Polygon", "coordinates": [[[-43.19, -22.96], [-43.18, -22.96], [-43.18, -22.97], [-43.19, -22.96]]]}
            },
            {
                "type": "Feature",
                "properties": {"neighbourhood": "Ilha", "n": "abc", "log_n": null},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[-43.2, -22.8], [-43.1, -22.8], [-43.1, -22.7], [-43.2, -22.8]]],
                    [[[-43.3, -22.9], [-43.25, -22.9], [-43.25, -22.85], [-43.3, -22.9]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"name": "marker"},
                "geometry": {"type": "Point", "coordinates": [-43.2, -22.9]}
            }
        ]
    }"#;

    #[test]
    fn test_parse_collection() {
        let mut bytes = SAMPLE.as_bytes().to_vec();
        let features = parse_features(&mut bytes).unwrap();

        // Point feature is skipped
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name.as_deref(), Some("Copacabana"));
        assert_eq!(features[0].stats.n, Some(20.0));
        assert_eq!(features[0].stats.entire, Some(5.0));
        assert_eq!(features[1].rings.len(), 2);
        assert_eq!(features[1].stats.n, None);
        assert_eq!(features[1].stats.log_n, None);
    }

    #[test]
    fn test_not_a_collection() {
        let mut bytes = br#"{"type": "Point", "coordinates": [0.0, 0.0]}"#.to_vec();
        assert!(parse_features(&mut bytes).is_err());
    }

    #[test]
    fn test_entire_share() {
        let mut f = Feature::new(
            None,
            Vec::new(),
            ListingStats {
                n: Some(20.0),
                entire: Some(5.0),
                ..Default::default()
            },
        );
        f.derive_entire_share();
        assert_eq!(f.stats.entp, Some(0.25));

        f.stats.n = Some(0.0);
        f.stats.entire = Some(0.0);
        f.derive_entire_share();
        assert_eq!(f.stats.entp, None);

        f.stats.n = None;
        f.derive_entire_share();
        assert_eq!(f.stats.entp, None);
    }

    #[test]
    fn test_dataset_bounds() {
        let mut bytes = SAMPLE.as_bytes().to_vec();
        let features = parse_features(&mut bytes).unwrap();
        let bounds = dataset_bounds(&features).unwrap();
        assert_eq!(bounds.west, -43.3);
        assert_eq!(bounds.east, -43.1);
        assert_eq!(bounds.south, -22.97);
        assert_eq!(bounds.north, -22.7);
        assert!(dataset_bounds(&[]).is_none());
    }
}
