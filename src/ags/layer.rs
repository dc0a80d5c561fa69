//! Feature layers and tables
//!
//! A [`FeatureLayer`] wraps `.../FeatureServer/<id>`: the layer description
//! is loaded lazily, queries and edits are plain requests against its
//! child endpoints.

use super::dynamic::DynamicLayer;
use super::feature_service::FeatureService;
use crate::common::{
    EditResults, Feature, FeatureSet, Field, GeometryFilter, SpatialReference,
    StatisticFilter, TimeFilter,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params, UploadFile};
use crate::pagination::{pages, OffsetPaginator, PageStream};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue, SqlFormat, SqlType};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum features sent in one `addFeatures` request
pub const MAX_ADD_CHUNK: usize = 250;

/// Record limit assumed when the layer does not report one
const DEFAULT_MAX_RECORD_COUNT: i64 = 1000;

/// Relationship class of a layer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub related_table_id: Option<i64>,
    pub cardinality: Option<String>,
    pub role: Option<String>,
    pub key_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub layer_type: Option<String>,
    pub description: Option<String>,
    pub geometry_type: Option<String>,
    pub object_id_field: Option<String>,
    pub global_id_field: Option<String>,
    pub display_field: Option<String>,
    pub type_id_field: Option<String>,
    pub max_record_count: Option<i64>,
    #[serde(default)]
    pub has_attachments: bool,
    #[serde(default)]
    pub has_z: bool,
    #[serde(default)]
    pub has_m: bool,
    pub capabilities: Option<String>,
    pub supported_query_formats: Option<String>,
    pub extent: Option<JsonValue>,
    pub time_info: Option<JsonValue>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub types: Vec<JsonValue>,
    #[serde(default)]
    pub templates: Vec<JsonValue>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(LayerInfo, "FeatureLayer");

/// Parameters of a layer query
#[derive(Debug, Clone)]
pub struct Query {
    pub where_clause: String,
    pub out_fields: String,
    pub object_ids: Vec<i64>,
    pub return_geometry: bool,
    pub return_ids_only: bool,
    pub return_count_only: bool,
    pub return_distinct_values: bool,
    pub return_extent_only: bool,
    pub out_sr: Option<SpatialReference>,
    pub max_allowable_offset: Option<f64>,
    pub geometry_precision: Option<u32>,
    pub order_by: Option<String>,
    pub group_by_fields: Option<String>,
    pub statistics: Option<StatisticFilter>,
    pub geometry_filter: Option<GeometryFilter>,
    pub time_filter: Option<TimeFilter>,
    /// Source of a `dynamicLayer` query
    pub dynamic_layer: Option<DynamicLayer>,
    /// Additional parameters sent verbatim
    pub extra: Params,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            where_clause: "1=1".to_string(),
            out_fields: "*".to_string(),
            object_ids: Vec::new(),
            return_geometry: true,
            return_ids_only: false,
            return_count_only: false,
            return_distinct_values: false,
            return_extent_only: false,
            out_sr: None,
            max_allowable_offset: None,
            geometry_precision: None,
            order_by: None,
            group_by_fields: None,
            statistics: None,
            geometry_filter: None,
            time_filter: None,
            dynamic_layer: None,
            extra: Params::new(),
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    #[must_use]
    pub fn out_fields(mut self, fields: impl Into<String>) -> Self {
        self.out_fields = fields.into();
        self
    }

    #[must_use]
    pub fn object_ids(mut self, ids: Vec<i64>) -> Self {
        self.object_ids = ids;
        self
    }

    #[must_use]
    pub fn return_geometry(mut self, value: bool) -> Self {
        self.return_geometry = value;
        self
    }

    #[must_use]
    pub fn ids_only(mut self) -> Self {
        self.return_ids_only = true;
        self
    }

    #[must_use]
    pub fn count_only(mut self) -> Self {
        self.return_count_only = true;
        self
    }

    #[must_use]
    pub fn distinct_values(mut self) -> Self {
        self.return_distinct_values = true;
        self
    }

    #[must_use]
    pub fn extent_only(mut self) -> Self {
        self.return_extent_only = true;
        self
    }

    #[must_use]
    pub fn out_sr(mut self, sr: SpatialReference) -> Self {
        self.out_sr = Some(sr);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn statistics(mut self, group_by: Option<String>, statistics: StatisticFilter) -> Self {
        self.group_by_fields = group_by;
        self.statistics = Some(statistics);
        self
    }

    #[must_use]
    pub fn geometry_filter(mut self, filter: GeometryFilter) -> Self {
        self.geometry_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn time_filter(mut self, filter: TimeFilter) -> Self {
        self.time_filter = Some(filter);
        self
    }

    /// Query a map service's `dynamicLayer` endpoint against this source
    #[must_use]
    pub fn dynamic_layer(mut self, layer: DynamicLayer) -> Self {
        self.dynamic_layer = Some(layer);
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.set(key, value);
        self
    }

    /// Whether the server answers with something other than a feature set
    pub fn returns_raw(&self) -> bool {
        self.return_ids_only
            || self.return_count_only
            || self.return_distinct_values
            || self.return_extent_only
    }

    /// Render the request parameters
    pub fn to_params(&self) -> Result<Params> {
        let mut params = Params::new()
            .with("where", self.where_clause.as_str())
            .with("outFields", self.out_fields.as_str())
            .with(
                "returnGeometry",
                self.return_geometry && !self.return_distinct_values,
            )
            .with("returnIdsOnly", self.return_ids_only)
            .with("returnCountOnly", self.return_count_only)
            .with("returnDistinctValues", self.return_distinct_values)
            .with("returnExtentOnly", self.return_extent_only)
            .with_opt("maxAllowableOffset", self.max_allowable_offset)
            .with_opt("geometryPrecision", self.geometry_precision)
            .with_opt("orderByFields", self.order_by.clone())
            .with_opt("groupByFieldsForStatistics", self.group_by_fields.clone());

        if !self.object_ids.is_empty() {
            let ids: Vec<String> = self.object_ids.iter().map(i64::to_string).collect();
            params.set("objectIds", ids.join(","));
        }
        if let Some(sr) = &self.out_sr {
            params.set("outSR", sr.to_param());
        }
        if let Some(stats) = self.statistics.as_ref().filter(|s| !s.is_empty()) {
            params.set_json("outStatistics", stats.statistics())?;
        }
        if let Some(filter) = &self.geometry_filter {
            filter.apply(&mut params)?;
        }
        if let Some(time) = &self.time_filter {
            params.set("time", time.value());
        }
        if let Some(layer) = &self.dynamic_layer {
            params.set_json("layer", layer)?;
        }
        params.merge(&self.extra);
        Ok(params)
    }
}

/// Result of [`FeatureLayer::query`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Features(FeatureSet),
    /// Count, ids, distinct values or extent responses
    Raw(JsonValue),
}

impl QueryResult {
    /// The feature set, if the query returned features
    pub fn into_features(self) -> Option<FeatureSet> {
        match self {
            Self::Features(set) => Some(set),
            Self::Raw(_) => None,
        }
    }
}

/// Parameters of `queryRelatedRecords`
#[derive(Debug, Clone, Default)]
pub struct RelatedRecordsQuery {
    pub object_ids: Vec<i64>,
    pub relationship_id: i64,
    pub out_fields: Option<String>,
    pub definition_expression: Option<String>,
    pub return_geometry: bool,
    pub out_wkid: Option<i64>,
    pub max_allowable_offset: Option<f64>,
    pub geometry_precision: Option<u32>,
    pub gdb_version: Option<String>,
}

/// Parameters of `deleteFeatures`
#[derive(Debug, Clone, Default)]
pub struct DeleteFeatures {
    pub object_ids: Vec<i64>,
    pub where_clause: Option<String>,
    pub geometry_filter: Option<GeometryFilter>,
    pub gdb_version: Option<String>,
    pub rollback_on_failure: bool,
}

/// A feature layer or table
#[derive(Debug)]
pub struct FeatureLayer {
    resource: Resource<LayerInfo>,
}

impl FeatureLayer {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    /// Layer description
    pub async fn info(&self) -> Result<Arc<Loaded<LayerInfo>>> {
        self.resource.get().await
    }

    /// Maximum records returned by one query
    pub async fn max_record_count(&self) -> Result<i64> {
        Ok(self
            .info()
            .await?
            .max_record_count
            .unwrap_or(DEFAULT_MAX_RECORD_COUNT))
    }

    /// The service this layer belongs to
    pub fn parent_service(&self) -> FeatureService {
        let url = self.resource.url();
        let parent = url.rsplit_once('/').map_or(url, |(parent, _)| parent);
        FeatureService::new(Arc::clone(self.client()), parent)
    }

    /// Run a query
    pub async fn query(&self, query: &Query) -> Result<QueryResult> {
        let body = self
            .client()
            .post_json(&self.resource.child("query"), query.to_params()?)
            .await?;
        if query.returns_raw() {
            return Ok(QueryResult::Raw(body));
        }
        Ok(QueryResult::Features(serde_json::from_value(body)?))
    }

    /// Number of features matching a query
    pub async fn query_count(&self, query: &Query) -> Result<u64> {
        let query = query.clone().count_only();
        match self.query(&query).await? {
            QueryResult::Raw(body) => body
                .get("count")
                .and_then(JsonValue::as_u64)
                .ok_or_else(|| Error::resource(self.resource.url(), "count missing from response")),
            QueryResult::Features(set) => Ok(set.len() as u64),
        }
    }

    /// Object ids of the features matching a query
    pub async fn query_ids(&self, query: &Query) -> Result<Vec<i64>> {
        let query = query.clone().ids_only();
        let body = match self.query(&query).await? {
            QueryResult::Raw(body) => body,
            QueryResult::Features(_) => return Ok(Vec::new()),
        };
        let ids = body
            .get("objectIds")
            .and_then(JsonValue::as_array)
            .map(|ids| ids.iter().filter_map(JsonValue::as_i64).collect())
            .unwrap_or_default();
        Ok(ids)
    }

    /// Fetch every matching feature, bypassing the record limit
    ///
    /// The matching ids are queried first, then fetched in batches of
    /// `chunk_size` (the layer's record limit when `None`).
    pub async fn query_all(&self, query: &Query, chunk_size: Option<usize>) -> Result<FeatureSet> {
        let ids = self.query_ids(query).await?;
        let chunk_size = match chunk_size {
            Some(size) => size.max(1),
            None => usize::try_from(self.max_record_count().await?)
                .unwrap_or(1)
                .max(1),
        };

        let mut result = FeatureSet::default();
        for batch in ids.chunks(chunk_size) {
            let batch_query = Query {
                where_clause: "1=1".to_string(),
                object_ids: batch.to_vec(),
                ..query.clone()
            };
            if let QueryResult::Features(set) = self.query(&batch_query).await? {
                debug!("Fetched {} features from {}", set.len(), self.resource.url());
                result.extend(set);
            }
        }
        result.exceeded_transfer_limit = false;
        Ok(result)
    }

    /// Pages of a query, following `exceededTransferLimit`
    pub fn query_pages(&self, query: &Query, page_size: u32) -> Result<PageStream<'_>> {
        Ok(pages(
            self.client(),
            self.resource.child("query"),
            query.to_params()?,
            OffsetPaginator::feature_query(page_size),
            "features",
        ))
    }

    /// Collect every page of a query into one feature set
    pub async fn query_paged(&self, query: &Query, page_size: u32) -> Result<FeatureSet> {
        self.query_pages(query, page_size)?
            .try_fold(FeatureSet::default(), |mut acc, page| async move {
                acc.extend(serde_json::from_value(page)?);
                Ok::<_, Error>(acc)
            })
            .await
    }

    /// Records related to features through a relationship class
    pub async fn query_related_records(&self, query: &RelatedRecordsQuery) -> Result<JsonValue> {
        let ids: Vec<String> = query.object_ids.iter().map(i64::to_string).collect();
        let mut params = Params::new()
            .with("objectIds", ids.join(","))
            .with("relationshipId", query.relationship_id)
            .with("outFields", query.out_fields.as_deref().unwrap_or("*"))
            .with("returnGeometry", query.return_geometry)
            .with_opt("definitionExpression", query.definition_expression.clone())
            .with_opt("maxAllowableOffset", query.max_allowable_offset)
            .with_opt("geometryPrecision", query.geometry_precision)
            .with_opt("gdbVersion", query.gdb_version.clone());
        if let Some(wkid) = query.out_wkid {
            params.set("outSR", json!({ "wkid": wkid }));
        }
        self.client()
            .get_json(&self.resource.child("queryRelatedRecords"), params)
            .await
    }

    /// Add features in one request
    pub async fn add_features(
        &self,
        features: &[Feature],
        gdb_version: Option<&str>,
        rollback_on_failure: bool,
    ) -> Result<EditResults> {
        let mut params = Params::new()
            .with("rollbackOnFailure", rollback_on_failure)
            .with_opt("gdbVersion", gdb_version);
        params.set_json("features", features)?;
        self.edit("addFeatures", params).await
    }

    /// Add any number of features, at most [`MAX_ADD_CHUNK`] per request
    ///
    /// Chunks are sent one after another. A chunk rejected by the server is
    /// recorded under `errors` and the remaining chunks are still sent.
    pub async fn add_features_chunked(
        &self,
        features: &[Feature],
        gdb_version: Option<&str>,
    ) -> Result<EditResults> {
        if features.len() <= MAX_ADD_CHUNK {
            return self.add_features(features, gdb_version, true).await;
        }

        // even chunks, none above the limit
        let bins = features.len().div_ceil(MAX_ADD_CHUNK);
        let chunk_size = features.len().div_ceil(bins);
        let mut results = EditResults::default();
        for chunk in features.chunks(chunk_size) {
            info!("Adding {} features to {}", chunk.len(), self.resource.url());
            match self.add_features(chunk, gdb_version, true).await {
                Ok(chunk_results) if chunk_results.add_results.is_empty() => {
                    results.errors.push(json!({ "addResults": [] }));
                }
                Ok(chunk_results) => results.merge(chunk_results),
                Err(Error::Api {
                    code,
                    message,
                    details,
                }) => {
                    results.errors.push(json!({
                        "error": { "code": code, "message": message, "details": details }
                    }));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    /// Update features, matched by object id
    pub async fn update_features(
        &self,
        features: &[Feature],
        gdb_version: Option<&str>,
        rollback_on_failure: bool,
    ) -> Result<EditResults> {
        let mut params = Params::new()
            .with("rollbackOnFailure", rollback_on_failure)
            .with_opt("gdbVersion", gdb_version);
        params.set_json("features", features)?;
        self.edit("updateFeatures", params).await
    }

    /// Delete features by ids, where clause or geometry
    ///
    /// The cached layer description is dropped afterwards.
    pub async fn delete_features(&self, delete: &DeleteFeatures) -> Result<EditResults> {
        let mut params = Params::new()
            .with("rollbackOnFailure", delete.rollback_on_failure)
            .with_opt("gdbVersion", delete.gdb_version.clone())
            .with_opt("where", delete.where_clause.clone());
        if !delete.object_ids.is_empty() {
            let ids: Vec<String> = delete.object_ids.iter().map(i64::to_string).collect();
            params.set("objectIds", ids.join(","));
        }
        if let Some(filter) = &delete.geometry_filter {
            params.set_json("geometry", &filter.geometry)?;
            params.set("geometryType", filter.geometry.geometry_type().as_str());
            params.set("spatialRel", filter.spatial_rel.as_str());
            params.set_opt("inSR", filter.in_sr.or_else(|| filter.geometry.wkid()));
        }

        let results = self.edit("deleteFeatures", params).await?;
        self.resource.invalidate().await;
        Ok(results)
    }

    /// Adds, updates and deletes in one transaction
    pub async fn apply_edits(
        &self,
        adds: &[Feature],
        updates: &[Feature],
        deletes: &[i64],
        gdb_version: Option<&str>,
        rollback_on_failure: bool,
    ) -> Result<EditResults> {
        let mut params = Params::new()
            .with("rollbackOnFailure", rollback_on_failure)
            .with_opt("gdbVersion", gdb_version);
        if !adds.is_empty() {
            params.set_json("adds", adds)?;
        }
        if !updates.is_empty() {
            params.set_json("updates", updates)?;
        }
        if !deletes.is_empty() {
            let ids: Vec<String> = deletes.iter().map(i64::to_string).collect();
            params.set("deletes", ids.join(","));
        }
        self.edit("applyEdits", params).await
    }

    /// Attach a file to a feature
    pub async fn add_attachment(
        &self,
        feature_id: i64,
        file: UploadFile,
        gdb_version: Option<&str>,
        upload_id: Option<&str>,
    ) -> Result<JsonValue> {
        if !self.info().await?.has_attachments {
            return Err(Error::invalid_argument(
                "feature_id",
                format!("layer {} does not support attachments", self.resource.url()),
            ));
        }
        let params = Params::new()
            .with_opt("gdbVersion", gdb_version)
            .with_opt("uploadId", upload_id);
        let url = self.resource.child(&format!("{feature_id}/addAttachment"));
        self.client()
            .post_multipart(&url, params, vec![file.with_field("attachment")])
            .await
    }

    /// Update field values of the features matching `where`
    ///
    /// Each expression is an object such as `{"field": "F", "value": 1}`
    /// or `{"field": "F", "sqlExpression": "G * 2"}`.
    pub async fn calculate(
        &self,
        where_clause: &str,
        expressions: &[JsonValue],
        sql_format: SqlFormat,
    ) -> Result<JsonValue> {
        let mut params = Params::new()
            .with("where", where_clause)
            .with("sqlFormat", sql_format.as_str());
        params.set_json("calcExpression", expressions)?;
        self.client()
            .post_json(&self.resource.child("calculate"), params)
            .await
    }

    /// Check the syntax of a SQL fragment
    pub async fn validate_sql(&self, sql: &str, sql_type: SqlType) -> Result<JsonValue> {
        let params = Params::new()
            .with("sql", sql)
            .with("sqlType", sql_type.as_str());
        self.client()
            .post_json(&self.resource.child("validateSQL"), params)
            .await
    }

    fn client(&self) -> &Arc<HttpClient> {
        self.resource.client()
    }

    async fn edit(&self, operation: &str, params: Params) -> Result<EditResults> {
        let body = self
            .client()
            .post_json(&self.resource.child(operation), params)
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

impl ResourceWrapper for FeatureLayer {
    type Props = LayerInfo;

    fn resource(&self) -> &Resource<LayerInfo> {
        &self.resource
    }
}

/// Raster layers share the feature layer description and query surface
pub type RasterLayer = FeatureLayer;

/// Tables are layers without geometry
pub type TableLayer = FeatureLayer;

/// A group layer: a named container of other layers of the service
#[derive(Debug)]
pub struct GroupLayer {
    resource: Resource<LayerInfo>,
}

impl GroupLayer {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    pub async fn info(&self) -> Result<Arc<Loaded<LayerInfo>>> {
        self.resource.get().await
    }

    /// Ids listed under `subLayers`
    pub async fn sub_layer_ids(&self) -> Result<Vec<i64>> {
        let info = self.info().await?;
        Ok(info
            .get("subLayers")
            .and_then(JsonValue::as_array)
            .map(|layers| {
                layers
                    .iter()
                    .filter_map(|layer| layer.get("id").and_then(JsonValue::as_i64))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The member layers, addressed beside the group in its service
    pub async fn sub_layers(&self) -> Result<Vec<FeatureLayer>> {
        let url = self.resource.url();
        let parent = url.rsplit_once('/').map_or(url, |(parent, _)| parent);
        Ok(self
            .sub_layer_ids()
            .await?
            .into_iter()
            .map(|id| {
                FeatureLayer::new(Arc::clone(self.resource.client()), format!("{parent}/{id}"))
            })
            .collect())
    }
}

impl ResourceWrapper for GroupLayer {
    type Props = LayerInfo;

    fn resource(&self) -> &Resource<LayerInfo> {
        &self.resource
    }
}
