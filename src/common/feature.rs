//! Features, feature sets and edit results

use super::geometry::{Geometry, SpatialReference};
use crate::types::{GeometryType, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// A row with optional geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: JsonObject,
    /// Empty shapes (`{}`, `{"x": null, "y": null}`) decode to `None`
    #[serde(
        default,
        deserialize_with = "empty_geometry_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub geometry: Option<Geometry>,
}

fn empty_geometry_as_none<'de, D>(deserializer: D) -> Result<Option<Geometry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    match value {
        Some(value) if !Geometry::is_empty_json(&value) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl Feature {
    /// Create a feature from attributes
    pub fn new(attributes: JsonObject) -> Self {
        Self {
            attributes,
            geometry: None,
        }
    }

    /// Attach a geometry
    #[must_use]
    pub fn with_geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    /// Set an attribute (builder style)
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.attributes.get(name)
    }

    /// Integer value of an id field (e.g. "OBJECTID")
    pub fn id(&self, field: &str) -> Option<i64> {
        self.attributes.get(field).and_then(JsonValue::as_i64)
    }
}

/// Field definition of a layer or feature set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Result of a feature query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<GeometryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl FeatureSet {
    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the set has no features
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append the features of another page
    pub fn extend(&mut self, other: FeatureSet) {
        if self.fields.is_empty() {
            self.fields = other.fields;
        }
        self.object_id_field_name = self.object_id_field_name.take().or(other.object_id_field_name);
        self.geometry_type = self.geometry_type.or(other.geometry_type);
        self.spatial_reference = self.spatial_reference.take().or(other.spatial_reference);
        self.features.extend(other.features);
        self.exceeded_transfer_limit = other.exceeded_transfer_limit;
    }
}

/// Per-feature error of an edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

/// Outcome of one feature in an edit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EditError>,
}

/// Results of an edit operation (`addFeatures`, `applyEdits`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResults {
    #[serde(default)]
    pub add_results: Vec<EditResult>,
    #[serde(default)]
    pub update_results: Vec<EditResult>,
    #[serde(default)]
    pub delete_results: Vec<EditResult>,
    /// Responses of chunked requests that carried no results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonValue>,
}

impl EditResults {
    /// Check if every edited feature succeeded
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty() && self.results().all(|r| r.success)
    }

    /// Results that failed
    pub fn failures(&self) -> Vec<&EditResult> {
        self.results().filter(|r| !r.success).collect()
    }

    /// Merge the results of another request
    pub fn merge(&mut self, other: EditResults) {
        self.add_results.extend(other.add_results);
        self.update_results.extend(other.update_results);
        self.delete_results.extend(other.delete_results);
        self.errors.extend(other.errors);
    }

    fn results(&self) -> impl Iterator<Item = &EditResult> {
        self.add_results
            .iter()
            .chain(&self.update_results)
            .chain(&self.delete_results)
    }
}
