//! Feature services

use super::layer::{FeatureLayer, GroupLayer};
use crate::common::{GeometryFilter, LayerDefinitionFilter, SpatialReference, TimeFilter};
use crate::error::Result;
use crate::http::{HttpClient, Params};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use serde::Deserialize;
use std::sync::Arc;

/// Layer or table reference in a service description
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_layer_id: Option<i64>,
    #[serde(default)]
    pub geometry_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureServiceInfo {
    pub current_version: Option<f64>,
    pub service_description: Option<String>,
    pub description: Option<String>,
    pub copyright_text: Option<String>,
    pub capabilities: Option<String>,
    pub max_record_count: Option<i64>,
    pub supported_query_formats: Option<String>,
    #[serde(default)]
    pub has_versioned_data: bool,
    #[serde(default)]
    pub has_static_data: bool,
    #[serde(default)]
    pub supports_disconnected_editing: bool,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub allow_geometry_updates: bool,
    pub units: Option<String>,
    pub spatial_reference: Option<SpatialReference>,
    pub initial_extent: Option<JsonValue>,
    pub full_extent: Option<JsonValue>,
    #[serde(default)]
    pub layers: Vec<LayerRef>,
    #[serde(default)]
    pub tables: Vec<LayerRef>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(FeatureServiceInfo, "FeatureService");

/// Service-wide query across layers (`/query`)
#[derive(Debug, Clone)]
pub struct ServiceQuery {
    pub layer_defs: LayerDefinitionFilter,
    pub geometry_filter: Option<GeometryFilter>,
    pub time_filter: Option<TimeFilter>,
    pub return_geometry: bool,
    pub return_ids_only: bool,
    pub return_count_only: bool,
    pub return_z: bool,
    pub return_m: bool,
    pub out_sr: Option<SpatialReference>,
}

impl ServiceQuery {
    pub fn new(layer_defs: LayerDefinitionFilter) -> Self {
        Self {
            layer_defs,
            geometry_filter: None,
            time_filter: None,
            return_geometry: true,
            return_ids_only: false,
            return_count_only: false,
            return_z: false,
            return_m: false,
            out_sr: None,
        }
    }

    fn to_params(&self) -> Result<Params> {
        let mut params = Params::new()
            .with("returnGeometry", self.return_geometry)
            .with("returnIdsOnly", self.return_ids_only)
            .with("returnCountOnly", self.return_count_only)
            .with("returnZ", self.return_z)
            .with("returnM", self.return_m);
        if !self.layer_defs.is_empty() {
            params.set_json("layerDefs", self.layer_defs.definitions())?;
        }
        if let Some(filter) = &self.geometry_filter {
            filter.apply(&mut params)?;
        }
        if let Some(time) = &self.time_filter {
            params.set("time", time.value());
        }
        if let Some(sr) = &self.out_sr {
            params.set("outSR", sr.to_param());
        }
        Ok(params)
    }
}

/// A feature service (`.../FeatureServer`)
#[derive(Debug)]
pub struct FeatureService {
    resource: Resource<FeatureServiceInfo>,
}

impl FeatureService {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    /// Service description
    pub async fn info(&self) -> Result<Arc<Loaded<FeatureServiceInfo>>> {
        self.resource.get().await
    }

    /// Layer by id (not fetched until used)
    pub fn layer(&self, id: i64) -> FeatureLayer {
        FeatureLayer::new(
            Arc::clone(self.resource.client()),
            self.resource.child(&id.to_string()),
        )
    }

    /// Group layer by id
    pub fn group_layer(&self, id: i64) -> GroupLayer {
        GroupLayer::new(
            Arc::clone(self.resource.client()),
            self.resource.child(&id.to_string()),
        )
    }

    /// All feature layers
    pub async fn layers(&self) -> Result<Vec<FeatureLayer>> {
        let info = self.resource.get().await?;
        Ok(info.layers.iter().map(|l| self.layer(l.id)).collect())
    }

    /// All tables
    pub async fn tables(&self) -> Result<Vec<FeatureLayer>> {
        let info = self.resource.get().await?;
        Ok(info.tables.iter().map(|t| self.layer(t.id)).collect())
    }

    /// Query several layers at once
    pub async fn query(&self, query: &ServiceQuery) -> Result<JsonValue> {
        let url = self.resource.child("query");
        self.resource
            .client()
            .post_json(&url, query.to_params()?)
            .await
    }
}

impl ResourceWrapper for FeatureService {
    type Props = FeatureServiceInfo;

    fn resource(&self) -> &Resource<FeatureServiceInfo> {
        &self.resource
    }
}
