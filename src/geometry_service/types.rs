//! Geometry service option types

use crate::common::SpatialReference;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spatial relation tested by the `relation` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "esriGeometryRelationCross")]
    Cross,
    #[serde(rename = "esriGeometryRelationDisjoint")]
    Disjoint,
    #[serde(rename = "esriGeometryRelationIn")]
    In,
    #[serde(rename = "esriGeometryRelationInteriorIntersection")]
    InteriorIntersection,
    #[default]
    #[serde(rename = "esriGeometryRelationIntersection")]
    Intersection,
    #[serde(rename = "esriGeometryRelationLineCoincidence")]
    LineCoincidence,
    #[serde(rename = "esriGeometryRelationLineTouch")]
    LineTouch,
    #[serde(rename = "esriGeometryRelationOverlap")]
    Overlap,
    #[serde(rename = "esriGeometryRelationPointTouch")]
    PointTouch,
    #[serde(rename = "esriGeometryRelationTouch")]
    Touch,
    #[serde(rename = "esriGeometryRelationWithin")]
    Within,
    /// Custom relation given by a shape comparison language string
    #[serde(rename = "esriGeometryRelationRelation")]
    Relation,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cross => "esriGeometryRelationCross",
            Self::Disjoint => "esriGeometryRelationDisjoint",
            Self::In => "esriGeometryRelationIn",
            Self::InteriorIntersection => "esriGeometryRelationInteriorIntersection",
            Self::Intersection => "esriGeometryRelationIntersection",
            Self::LineCoincidence => "esriGeometryRelationLineCoincidence",
            Self::LineTouch => "esriGeometryRelationLineTouch",
            Self::Overlap => "esriGeometryRelationOverlap",
            Self::PointTouch => "esriGeometryRelationPointTouch",
            Self::Touch => "esriGeometryRelationTouch",
            Self::Within => "esriGeometryRelationWithin",
            Self::Relation => "esriGeometryRelationRelation",
        }
    }
}

/// Corner treatment of the `offset` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OffsetHow {
    #[default]
    #[serde(rename = "esriGeometryOffsetRounded")]
    Rounded,
    #[serde(rename = "esriGeometryOffsetBevelled")]
    Bevelled,
    #[serde(rename = "esriGeometryOffsetMitered")]
    Mitered,
}

impl OffsetHow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rounded => "esriGeometryOffsetRounded",
            Self::Bevelled => "esriGeometryOffsetBevelled",
            Self::Mitered => "esriGeometryOffsetMitered",
        }
    }
}

/// How areas and lengths are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationType {
    #[default]
    Planar,
    Geodesic,
    PreserveShape,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planar => "planar",
            Self::Geodesic => "geodesic",
            Self::PreserveShape => "preserveShape",
        }
    }
}

impl FromStr for CalculationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "planar" => Ok(Self::Planar),
            "geodesic" => Ok(Self::Geodesic),
            "preserveShape" => Ok(Self::PreserveShape),
            other => Err(Error::invalid_argument(
                "calculationType",
                format!("'{other}' is not one of planar, geodesic, preserveShape"),
            )),
        }
    }
}

/// Coordinate notation of geo coordinate strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversionType {
    #[default]
    #[serde(rename = "mgrs")]
    Mgrs,
    #[serde(rename = "usng")]
    Usng,
    #[serde(rename = "utm")]
    Utm,
    #[serde(rename = "geoRef")]
    GeoRef,
    #[serde(rename = "gars")]
    Gars,
    #[serde(rename = "dms")]
    Dms,
    #[serde(rename = "ddm")]
    Ddm,
    #[serde(rename = "dd")]
    Dd,
}

impl ConversionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mgrs => "mgrs",
            Self::Usng => "usng",
            Self::Utm => "utm",
            Self::GeoRef => "geoRef",
            Self::Gars => "gars",
            Self::Dms => "dms",
            Self::Ddm => "ddm",
            Self::Dd => "dd",
        }
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags accepted by `trimExtend` (`extendHow`)
pub const EXTEND_HOW_VALUES: &[u8] = &[0, 1, 2, 4, 8, 16];

/// Options of the `buffer` operation
#[derive(Debug, Clone, PartialEq)]
pub struct BufferOptions {
    /// Buffer distances, one buffer per distance
    pub distances: Vec<f64>,
    /// Linear unit of the distances (e.g. `9001` for meters)
    pub unit: Option<String>,
    pub in_sr: Option<SpatialReference>,
    pub out_sr: Option<SpatialReference>,
    pub buffer_sr: Option<SpatialReference>,
    pub union_results: bool,
    pub geodesic: bool,
}

impl BufferOptions {
    pub fn new(distances: Vec<f64>) -> Self {
        Self {
            distances,
            unit: None,
            in_sr: None,
            out_sr: None,
            buffer_sr: None,
            union_results: true,
            geodesic: true,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Options of the `offset` operation
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetOptions {
    pub distance: f64,
    pub unit: Option<String>,
    pub how: OffsetHow,
    pub bevel_ratio: f64,
    pub simplify_result: bool,
}

impl OffsetOptions {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            unit: None,
            how: OffsetHow::default(),
            bevel_ratio: 10.0,
            simplify_result: false,
        }
    }
}

/// Options of the `toGeoCoordinateString` operation
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateStringOptions {
    pub conversion_type: ConversionType,
    pub conversion_mode: Option<String>,
    pub num_of_digits: Option<u32>,
    pub rounding: bool,
    pub add_spaces: bool,
}

impl Default for CoordinateStringOptions {
    fn default() -> Self {
        Self {
            conversion_type: ConversionType::default(),
            conversion_mode: Some("mgrsDefault".to_string()),
            num_of_digits: None,
            rounding: true,
            add_spaces: true,
        }
    }
}
