//! Dynamic layer sources
//!
//! Map services with dynamic layers enabled draw and query layers whose
//! source is chosen per request: a layer of the service itself, or a
//! table, raster, query table or join from a registered workspace.
//! These types serialize to the `source` objects of the `layer` and
//! `dynamicLayers` parameters.

use crate::common::SpatialReference;
use crate::error::{Error, Result};
use crate::types::{GeometryType, JsonValue};
use serde::Serialize;

/// How the two sides of a join table are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinType {
    #[serde(rename = "esriLeftOuterJoin")]
    LeftOuter,
    #[serde(rename = "esriLeftInnerJoin")]
    LeftInner,
}

/// Data in a registered workspace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DataSource {
    /// Table, feature class or raster in a folder or geodatabase
    #[serde(rename_all = "camelCase")]
    Table {
        workspace_id: String,
        data_source_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        gdb_version: Option<String>,
    },
    /// File raster in a raster workspace
    #[serde(rename_all = "camelCase")]
    Raster {
        workspace_id: String,
        data_source_name: String,
    },
    /// Result of a SQL query against a database workspace
    #[serde(rename_all = "camelCase")]
    QueryTable {
        workspace_id: String,
        query: String,
        oid_fields: String,
        spatial_reference: SpatialReference,
        #[serde(skip_serializing_if = "Option::is_none")]
        geometry_type: Option<GeometryType>,
    },
    /// Join of two sources; either side may itself be a join
    #[serde(rename_all = "camelCase")]
    JoinTable {
        left_table_source: Box<LayerSource>,
        right_table_source: Box<LayerSource>,
        left_table_key: String,
        right_table_key: String,
        join_type: JoinType,
    },
}

impl DataSource {
    pub fn table(workspace_id: impl Into<String>, data_source_name: impl Into<String>) -> Self {
        Self::Table {
            workspace_id: workspace_id.into(),
            data_source_name: data_source_name.into(),
            gdb_version: None,
        }
    }

    pub fn raster(workspace_id: impl Into<String>, data_source_name: impl Into<String>) -> Self {
        Self::Raster {
            workspace_id: workspace_id.into(),
            data_source_name: data_source_name.into(),
        }
    }

    /// A query table; envelopes are not a valid geometry type here
    pub fn query_table(
        workspace_id: impl Into<String>,
        query: impl Into<String>,
        oid_fields: impl Into<String>,
        wkid: i64,
        geometry_type: Option<GeometryType>,
    ) -> Result<Self> {
        if geometry_type == Some(GeometryType::Envelope) {
            return Err(Error::invalid_argument(
                "geometry_type",
                "query tables hold points, multipoints, polylines or polygons",
            ));
        }
        Ok(Self::QueryTable {
            workspace_id: workspace_id.into(),
            query: query.into(),
            oid_fields: oid_fields.into(),
            spatial_reference: SpatialReference::wkid(wkid),
            geometry_type,
        })
    }

    pub fn join(
        left: LayerSource,
        right: LayerSource,
        left_key: impl Into<String>,
        right_key: impl Into<String>,
        join_type: JoinType,
    ) -> Self {
        Self::JoinTable {
            left_table_source: Box::new(left),
            right_table_source: Box::new(right),
            left_table_key: left_key.into(),
            right_table_key: right_key.into(),
            join_type,
        }
    }

    /// Use a geodatabase version other than the registered one
    #[must_use]
    pub fn gdb_version(mut self, version: impl Into<String>) -> Self {
        if let Self::Table { gdb_version, .. } = &mut self {
            *gdb_version = Some(version.into());
        }
        self
    }
}

/// Where a dynamic layer reads its features from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerSource {
    /// A layer of the map service
    #[serde(rename_all = "camelCase")]
    MapLayer {
        map_layer_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        gdb_version: Option<String>,
    },
    /// Data from a registered workspace
    #[serde(rename_all = "camelCase")]
    DataLayer {
        data_source: DataSource,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<JsonValue>>,
    },
}

impl LayerSource {
    pub fn map_layer(map_layer_id: i64) -> Self {
        Self::MapLayer {
            map_layer_id,
            gdb_version: None,
        }
    }

    pub fn data_layer(data_source: DataSource) -> Self {
        Self::DataLayer {
            data_source,
            fields: None,
        }
    }

    /// Restrict or alias the fields of a data layer
    #[must_use]
    pub fn fields(mut self, value: Vec<JsonValue>) -> Self {
        if let Self::DataLayer { fields, .. } = &mut self {
            *fields = Some(value);
        }
        self
    }
}

/// The `layer` parameter of a dynamic layer request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicLayer {
    pub id: i64,
    pub source: LayerSource,
}

impl DynamicLayer {
    pub fn new(id: i64, source: LayerSource) -> Self {
        Self { id, source }
    }
}
