//! Common types used throughout arcrest
//!
//! This module contains shared type definitions, type aliases,
//! and the enumerated values the ArcGIS REST API accepts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Geometry Type
// ============================================================================

/// Esri geometry type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    #[serde(rename = "esriGeometryPoint")]
    Point,
    #[serde(rename = "esriGeometryMultipoint")]
    Multipoint,
    #[serde(rename = "esriGeometryPolyline")]
    Polyline,
    #[serde(rename = "esriGeometryPolygon")]
    Polygon,
    #[serde(rename = "esriGeometryEnvelope")]
    Envelope,
}

impl GeometryType {
    /// The REST name of the geometry type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "esriGeometryPoint",
            Self::Multipoint => "esriGeometryMultipoint",
            Self::Polyline => "esriGeometryPolyline",
            Self::Polygon => "esriGeometryPolygon",
            Self::Envelope => "esriGeometryEnvelope",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Spatial Relationship
// ============================================================================

/// Spatial relationship applied by geometry filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpatialRelationship {
    #[default]
    #[serde(rename = "esriSpatialRelIntersects")]
    Intersects,
    #[serde(rename = "esriSpatialRelContains")]
    Contains,
    #[serde(rename = "esriSpatialRelCrosses")]
    Crosses,
    #[serde(rename = "esriSpatialRelEnvelopeIntersects")]
    EnvelopeIntersects,
    #[serde(rename = "esriSpatialRelIndexIntersects")]
    IndexIntersects,
    #[serde(rename = "esriSpatialRelOverlaps")]
    Overlaps,
    #[serde(rename = "esriSpatialRelTouches")]
    Touches,
    #[serde(rename = "esriSpatialRelWithin")]
    Within,
}

impl SpatialRelationship {
    /// The REST name of the relationship
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intersects => "esriSpatialRelIntersects",
            Self::Contains => "esriSpatialRelContains",
            Self::Crosses => "esriSpatialRelCrosses",
            Self::EnvelopeIntersects => "esriSpatialRelEnvelopeIntersects",
            Self::IndexIntersects => "esriSpatialRelIndexIntersects",
            Self::Overlaps => "esriSpatialRelOverlaps",
            Self::Touches => "esriSpatialRelTouches",
            Self::Within => "esriSpatialRelWithin",
        }
    }
}

// ============================================================================
// SQL Options
// ============================================================================

/// SQL dialect of a calculate expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFormat {
    /// SQL-92
    #[default]
    Standard,
    /// Native database SQL
    Native,
}

impl SqlFormat {
    /// The REST name of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Native => "native",
        }
    }
}

impl FromStr for SqlFormat {
    type Err = Error;

    /// Unknown formats fall back to `standard`, matching the server default
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_str() {
            "native" => Self::Native,
            _ => Self::Standard,
        })
    }
}

/// Kind of SQL accepted by `validateSQL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    /// A WHERE clause
    #[default]
    Where,
    /// An SQL-92 expression
    Expression,
    /// A full SQL-92 statement
    Statement,
}

impl SqlType {
    /// The REST name of the SQL type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Expression => "expression",
            Self::Statement => "statement",
        }
    }
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "where" => Ok(Self::Where),
            "expression" => Ok(Self::Expression),
            "statement" => Ok(Self::Statement),
            _ => Err(Error::invalid_argument(
                "sqlType",
                format!("'{s}' is not one of where, expression, statement"),
            )),
        }
    }
}

// ============================================================================
// Service Type
// ============================================================================

/// Service types published on an ArcGIS Server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    MapServer,
    FeatureServer,
    ImageServer,
    GeometryServer,
    GPServer,
    MobileServer,
    NAServer,
    GeocodeServer,
    GeoDataServer,
    GlobeServer,
    StreamServer,
    SearchServer,
    IndexGenerator,
    IndexingLauncher,
    /// Any type this crate does not know about
    #[serde(untagged)]
    Other(String),
}

impl ServiceType {
    /// The REST name of the service type
    pub fn as_str(&self) -> &str {
        match self {
            Self::MapServer => "MapServer",
            Self::FeatureServer => "FeatureServer",
            Self::ImageServer => "ImageServer",
            Self::GeometryServer => "GeometryServer",
            Self::GPServer => "GPServer",
            Self::MobileServer => "MobileServer",
            Self::NAServer => "NAServer",
            Self::GeocodeServer => "GeocodeServer",
            Self::GeoDataServer => "GeoDataServer",
            Self::GlobeServer => "GlobeServer",
            Self::StreamServer => "StreamServer",
            Self::SearchServer => "SearchServer",
            Self::IndexGenerator => "IndexGenerator",
            Self::IndexingLauncher => "IndexingLauncher",
            Self::Other(name) => name,
        }
    }

    /// Internal server services that are never exposed as wrappers
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::IndexGenerator | Self::IndexingLauncher | Self::SearchServer
        )
    }
}

impl From<&str> for ServiceType {
    fn from(s: &str) -> Self {
        match s {
            "MapServer" => Self::MapServer,
            "FeatureServer" => Self::FeatureServer,
            "ImageServer" => Self::ImageServer,
            "GeometryServer" => Self::GeometryServer,
            "GPServer" => Self::GPServer,
            "MobileServer" => Self::MobileServer,
            "NAServer" => Self::NAServer,
            "GeocodeServer" => Self::GeocodeServer,
            "GeoDataServer" => Self::GeoDataServer,
            "GlobeServer" => Self::GlobeServer,
            "StreamServer" => Self::StreamServer,
            "SearchServer" => Self::SearchServer,
            "IndexGenerator" => Self::IndexGenerator,
            "IndexingLauncher" => Self::IndexingLauncher,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sort Order
// ============================================================================

/// Sort order for portal searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// The REST name of the sort order
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_type_serde() {
        let gt: GeometryType = serde_json::from_str("\"esriGeometryPolygon\"").unwrap();
        assert_eq!(gt, GeometryType::Polygon);

        let json = serde_json::to_string(&GeometryType::Point).unwrap();
        assert_eq!(json, "\"esriGeometryPoint\"");
        assert_eq!(GeometryType::Envelope.to_string(), "esriGeometryEnvelope");
    }

    #[test]
    fn test_service_type_from_str() {
        assert_eq!(ServiceType::from("FeatureServer"), ServiceType::FeatureServer);
        assert_eq!(
            ServiceType::from("VectorTileServer"),
            ServiceType::Other("VectorTileServer".to_string())
        );
        assert!(ServiceType::SearchServer.is_internal());
        assert!(!ServiceType::MapServer.is_internal());
    }

    #[test]
    fn test_service_type_serde() {
        let st: ServiceType = serde_json::from_str("\"GPServer\"").unwrap();
        assert_eq!(st, ServiceType::GPServer);
        let st: ServiceType = serde_json::from_str("\"SceneServer\"").unwrap();
        assert_eq!(st, ServiceType::Other("SceneServer".to_string()));
    }

    #[test]
    fn test_sql_format_falls_back_to_standard() {
        assert_eq!("NATIVE".parse::<SqlFormat>().unwrap(), SqlFormat::Native);
        assert_eq!("bogus".parse::<SqlFormat>().unwrap(), SqlFormat::Standard);
    }

    #[test]
    fn test_sql_type_rejects_unknown() {
        assert_eq!("Expression".parse::<SqlType>().unwrap(), SqlType::Expression);
        assert!("select".parse::<SqlType>().is_err());
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
        assert_eq!(String::new().none_if_empty(), None);
    }
}
