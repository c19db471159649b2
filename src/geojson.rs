//! Minimal GeoJSON decoding for the quakes feed.
//!
//! Only the parts the feed actually uses are modelled: the feature list, the
//! point geometry and a property bag of JSON scalars.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::geo::Coordinates;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl Geometry {
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: Value::from(vec![longitude, latitude]),
        }
    }

    /// Position of a `Point` geometry. GeoJSON stores `[lon, lat, ...]`.
    pub fn coordinates(&self) -> Option<Coordinates> {
        if self.kind != "Point" {
            return None;
        }
        let pos = self.coordinates.as_array()?;
        let longitude = pos.first()?.as_f64()?;
        let latitude = pos.get(1)?.as_f64()?;
        Some(Coordinates::new(latitude, longitude))
    }
}

/// Typed accessors over the untyped `properties` object of a feature.
///
/// Every getter returns `None` for a missing key or an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        let v = self.get(key)?;
        v.as_i64().or_else(|| {
            // some payloads encode integral values as floats (5.0)
            v.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `"properties": null` is valid GeoJSON
        let map = Option::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(Self(map.unwrap_or_default()))
    }
}

pub fn parse_feature_collection(body: &str) -> Result<FeatureCollection> {
    serde_json::from_str(body).context("parsing geojson feature collection")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn property_getters_treat_null_as_absent() {
        let props: Properties = serde_json::from_value(json!({
            "depth": 0.0,
            "mmi": 4,
            "quality": null,
            "locality": "Wellington"
        }))
        .unwrap();

        assert_eq!(props.get_f64("depth"), Some(0.0));
        assert_eq!(props.get_i64("mmi"), Some(4));
        assert_eq!(props.get_str("quality"), None);
        assert_eq!(props.get_str("missing"), None);
        assert_eq!(props.get_str("locality"), Some("Wellington"));
    }

    #[test]
    fn integral_float_reads_as_i64() {
        let props: Properties = serde_json::from_value(json!({"mmi": 5.0, "x": 5.5})).unwrap();
        assert_eq!(props.get_i64("mmi"), Some(5));
        assert_eq!(props.get_i64("x"), None);
    }

    #[test]
    fn point_is_lon_lat_and_other_geometries_have_no_position() {
        let fc = parse_feature_collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[178.25,-38.07]},"properties":null},
                {"type":"Feature","geometry":{"type":"LineString","coordinates":[[1,2],[3,4]]},"properties":{}},
                {"type":"Feature","geometry":null,"properties":{}}
            ]}"#,
        )
        .unwrap();

        let c = fc.features[0].geometry.as_ref().unwrap().coordinates().unwrap();
        assert_eq!(c.latitude, -38.07);
        assert_eq!(c.longitude, 178.25);
        assert!(fc.features[1].geometry.as_ref().unwrap().coordinates().is_none());
        assert!(fc.features[2].geometry.is_none());
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(parse_feature_collection("<html>").is_err());
    }
}
