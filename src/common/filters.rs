//! Query filters
//!
//! Each filter renders the parameters a query operation expects.

use super::geometry::Geometry;
use super::util::to_epoch_ms;
use crate::error::{Error, Result};
use crate::http::Params;
use crate::types::SpatialRelationship;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Restrict a query to features related spatially to a geometry
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFilter {
    pub geometry: Geometry,
    pub spatial_rel: SpatialRelationship,
    /// Spatial reference of the geometry; taken from the geometry when absent
    pub in_sr: Option<i64>,
    pub buffer: Option<f64>,
    pub units: Option<String>,
}

impl GeometryFilter {
    /// Intersects filter for a geometry
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            geometry: geometry.into(),
            spatial_rel: SpatialRelationship::default(),
            in_sr: None,
            buffer: None,
            units: None,
        }
    }

    #[must_use]
    pub fn relationship(mut self, rel: SpatialRelationship) -> Self {
        self.spatial_rel = rel;
        self
    }

    #[must_use]
    pub fn in_sr(mut self, wkid: i64) -> Self {
        self.in_sr = Some(wkid);
        self
    }

    /// Buffer the geometry by a distance (e.g. `esriSRUnit_Meter`)
    #[must_use]
    pub fn buffer(mut self, distance: f64, units: impl Into<String>) -> Self {
        self.buffer = Some(distance);
        self.units = Some(units.into());
        self
    }

    /// Parameters for a layer query
    pub fn apply(&self, params: &mut Params) -> Result<()> {
        params.set_json("geometry", &self.geometry)?;
        params.set("geometryType", self.geometry.geometry_type().as_str());
        params.set("spatialRel", self.spatial_rel.as_str());
        params.set_opt("inSR", self.in_sr.or_else(|| self.geometry.wkid()));
        params.set_opt("buffer", self.buffer);
        params.set_opt("units", self.units.clone());
        Ok(())
    }
}

/// Time extent as epoch milliseconds (`start` or `start,end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilter {
    pub start: i64,
    pub end: Option<i64>,
}

impl TimeFilter {
    /// Instant in time
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self {
            start: to_epoch_ms(at),
            end: None,
        }
    }

    /// Time range
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: to_epoch_ms(start),
            end: Some(to_epoch_ms(end)),
        }
    }

    /// The `time` parameter value
    pub fn value(&self) -> String {
        match self.end {
            Some(end) => format!("{},{}", self.start, end),
            None => self.start.to_string(),
        }
    }
}

/// Statistic types accepted by `outStatistics`
const STATISTIC_TYPES: &[&str] = &["count", "sum", "min", "max", "avg", "stddev", "var"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub statistic_type: String,
    pub on_statistic_field: String,
    pub out_statistic_field_name: String,
}

/// Statistics computed by a query (`outStatistics`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticFilter {
    statistics: Vec<Statistic>,
}

impl StatisticFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statistic; the type must be one of count, sum, min, max, avg, stddev, var
    pub fn add(
        &mut self,
        statistic_type: &str,
        on_field: impl Into<String>,
        out_name: impl Into<String>,
    ) -> Result<&mut Self> {
        let statistic_type = statistic_type.to_lowercase();
        if !STATISTIC_TYPES.contains(&statistic_type.as_str()) {
            return Err(Error::invalid_argument(
                "statisticType",
                format!(
                    "'{statistic_type}' is not one of {}",
                    STATISTIC_TYPES.join(", ")
                ),
            ));
        }
        self.statistics.push(Statistic {
            statistic_type,
            on_statistic_field: on_field.into(),
            out_statistic_field_name: out_name.into(),
        });
        Ok(self)
    }

    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    pub fn is_empty(&self) -> bool {
        self.statistics.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    pub layer_id: i64,
    #[serde(rename = "where")]
    pub where_clause: String,
}

/// Per-layer where clauses for service-level queries (`layerDefs`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerDefinitionFilter {
    definitions: Vec<LayerDefinition>,
}

impl LayerDefinitionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a where clause for a layer
    #[must_use]
    pub fn add(mut self, layer_id: i64, where_clause: impl Into<String>) -> Self {
        self.definitions.push(LayerDefinition {
            layer_id,
            where_clause: where_clause.into(),
        });
        self
    }

    pub fn definitions(&self) -> &[LayerDefinition] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
