//! Vector features produced by vectorization

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

/// A polygon (or other geometry) with attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    /// Attributes, ordered by key for stable output
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// The `label` attribute, if it is a string
    pub fn label(&self) -> Option<&str> {
        match self.properties.get("label") {
            Some(AttributeValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};

    #[test]
    fn test_feature_properties() {
        let f = Feature::new(Geometry::Point(Point::new(1.0, 2.0)))
            .with_property("label", "flood")
            .with_property("cells", 12_i64);
        assert_eq!(f.label(), Some("flood"));
        assert_eq!(f.get_property("cells"), Some(&AttributeValue::Int(12)));
        assert!(f.get_property("missing").is_none());
    }
}
