//! Esri JSON geometries

use crate::types::GeometryType;
use serde::{Deserialize, Serialize};

/// Spatial reference by well-known id or text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl SpatialReference {
    /// Spatial reference from a well-known id
    pub fn wkid(wkid: i64) -> Self {
        Self {
            wkid: Some(wkid),
            ..Default::default()
        }
    }

    /// Spatial reference from well-known text
    pub fn wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            ..Default::default()
        }
    }

    /// WGS 1984 geographic coordinates
    pub fn wgs84() -> Self {
        Self::wkid(4326)
    }

    /// Web Mercator
    pub fn web_mercator() -> Self {
        Self {
            wkid: Some(102100),
            latest_wkid: Some(3857),
            wkt: None,
        }
    }

    /// Value for `inSR`/`outSR` style parameters: the wkid, or the full JSON for WKT
    pub fn to_param(&self) -> serde_json::Value {
        match self.wkid {
            Some(wkid) => wkid.into(),
            None => serde_json::to_value(self).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

impl Point {
    /// 2D point
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
            spatial_reference: None,
        }
    }

    /// Attach a spatial reference
    #[must_use]
    pub fn with_sr(mut self, sr: SpatialReference) -> Self {
        self.spatial_reference = Some(sr);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Multipoint {
    pub points: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    pub paths: Vec<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polygon {
    pub rings: Vec<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

impl Envelope {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            spatial_reference: None,
        }
    }

    #[must_use]
    pub fn with_sr(mut self, sr: SpatialReference) -> Self {
        self.spatial_reference = Some(sr);
        self
    }
}

/// Any Esri JSON geometry, recognized by its keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Point(Point),
    Multipoint(Multipoint),
    Polyline(Polyline),
    Polygon(Polygon),
    Envelope(Envelope),
}

impl Geometry {
    /// The `esriGeometry*` type of this geometry
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::Multipoint(_) => GeometryType::Multipoint,
            Self::Polyline(_) => GeometryType::Polyline,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::Envelope(_) => GeometryType::Envelope,
        }
    }

    /// Spatial reference carried by the geometry
    pub fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            Self::Point(g) => g.spatial_reference.as_ref(),
            Self::Multipoint(g) => g.spatial_reference.as_ref(),
            Self::Polyline(g) => g.spatial_reference.as_ref(),
            Self::Polygon(g) => g.spatial_reference.as_ref(),
            Self::Envelope(g) => g.spatial_reference.as_ref(),
        }
    }

    /// Well-known id of the spatial reference, if any
    pub fn wkid(&self) -> Option<i64> {
        self.spatial_reference().and_then(|sr| sr.wkid)
    }

    /// Whether a JSON geometry is ArcGIS's empty shape
    ///
    /// Null shapes come back as `{}`, as `{"x": null, "y": null}` (or `"NaN"`
    /// coordinates), optionally with only a `spatialReference`.
    pub fn is_empty_json(value: &serde_json::Value) -> bool {
        let Some(object) = value.as_object() else {
            return value.is_null();
        };
        object
            .iter()
            .filter(|(key, _)| key.as_str() != "spatialReference")
            .all(|(_, v)| v.is_null() || v.as_str() == Some("NaN"))
    }
}

impl From<Point> for Geometry {
    fn from(value: Point) -> Self {
        Self::Point(value)
    }
}

impl From<Multipoint> for Geometry {
    fn from(value: Multipoint) -> Self {
        Self::Multipoint(value)
    }
}

impl From<Polyline> for Geometry {
    fn from(value: Polyline) -> Self {
        Self::Polyline(value)
    }
}

impl From<Polygon> for Geometry {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

impl From<Envelope> for Geometry {
    fn from(value: Envelope) -> Self {
        Self::Envelope(value)
    }
}
