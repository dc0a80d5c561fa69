//! GeoEnrichment request options

use crate::common::Geometry;
use crate::error::{Error, Result};
use crate::http::Params;
use crate::types::JsonValue;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Values accepted for `addDerivativeVariables` by data collection discovery
pub const DERIVATIVE_VARIABLES: &[&str] = &["percent", "index", "average", "all", "*"];

/// A study area made from a geometry (`{"geometry": {...}}`)
///
/// Points only keep their coordinates; the service buffers them.
pub fn study_area(geometry: &Geometry) -> Result<JsonValue> {
    let value = match geometry {
        Geometry::Point(point) => json!({"x": point.x, "y": point.y}),
        other => serde_json::to_value(other)?,
    };
    Ok(json!({ "geometry": value }))
}

/// Options of the `Enrich` operation
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub data_collections: Option<Vec<String>>,
    pub analysis_variables: Option<Vec<String>>,
    pub add_derivative_variables: String,
    pub study_areas_options: Option<JsonValue>,
    /// Country or dataset to use, e.g. `{"sourceCountry": "US"}`
    pub use_data: Option<JsonValue>,
    pub intersecting_geographies: Option<JsonValue>,
    pub return_geometry: bool,
    pub in_sr: i64,
    pub out_sr: i64,
    pub suppress_null_values: bool,
    /// Whether the results are persisted (billed differently)
    pub for_storage: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            data_collections: None,
            analysis_variables: None,
            add_derivative_variables: "all".to_string(),
            study_areas_options: None,
            use_data: None,
            intersecting_geographies: None,
            return_geometry: false,
            in_sr: 4326,
            out_sr: 4326,
            suppress_null_values: false,
            for_storage: true,
        }
    }
}

impl EnrichOptions {
    pub(crate) fn to_params(&self, study_areas: &[JsonValue]) -> Result<Params> {
        let mut params = Params::new()
            .with("inSR", self.in_sr)
            .with("outSR", self.out_sr)
            .with("suppressNullValues", self.suppress_null_values)
            .with("addDerivativeVariables", self.add_derivative_variables.as_str())
            .with("forStorage", self.for_storage)
            .with("returnGeometry", self.return_geometry)
            .with_opt("studyAreasOptions", self.study_areas_options.clone())
            .with_opt("useData", self.use_data.clone())
            .with_opt("intersectingGeographies", self.intersecting_geographies.clone());
        params.set_json("studyareas", study_areas)?;
        if let Some(collections) = &self.data_collections {
            params.set_json("dataCollections", collections)?;
        }
        if let Some(variables) = &self.analysis_variables {
            params.set_json("analysisVariables", variables)?;
        }
        Ok(params)
    }
}

/// Output format of `createReport`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Pdf,
    Xlsx,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(Error::invalid_argument(
                "format",
                format!("report format must be pdf or xlsx, got {other}"),
            )),
        }
    }
}

/// Options of `createReport`
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Report template id; the service default when absent
    pub report: Option<String>,
    pub format: ReportFormat,
    pub report_fields: Option<JsonValue>,
    pub study_areas_options: Option<JsonValue>,
    pub use_data: Option<JsonValue>,
    pub in_sr: i64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            report: None,
            format: ReportFormat::Pdf,
            report_fields: None,
            study_areas_options: None,
            use_data: None,
            in_sr: 4326,
        }
    }
}

/// Parameters of the standard geography query
#[derive(Debug, Clone)]
pub struct StandardGeographyQuery {
    pub source_country: Option<String>,
    pub optional_country_dataset: Option<String>,
    pub geography_layers: Option<Vec<String>>,
    pub geography_ids: Option<Vec<String>>,
    pub geography_query: Option<String>,
    pub return_sub_geography_layer: bool,
    pub sub_geography_layer: Option<String>,
    pub sub_geography_query: Option<String>,
    pub out_sr: i64,
    pub return_geometry: bool,
    pub return_centroids: bool,
    /// 0 (most detailed) to 6 (most generalized)
    pub generalization_level: u8,
    pub use_fuzzy_search: bool,
    pub feature_limit: u32,
}

impl Default for StandardGeographyQuery {
    fn default() -> Self {
        Self {
            source_country: None,
            optional_country_dataset: None,
            geography_layers: None,
            geography_ids: None,
            geography_query: None,
            return_sub_geography_layer: false,
            sub_geography_layer: None,
            sub_geography_query: None,
            out_sr: 4326,
            return_geometry: false,
            return_centroids: false,
            generalization_level: 0,
            use_fuzzy_search: false,
            feature_limit: 1000,
        }
    }
}

impl StandardGeographyQuery {
    pub(crate) fn to_params(&self) -> Result<Params> {
        if self.generalization_level > 6 {
            return Err(Error::invalid_argument(
                "generalization_level",
                format!("must be 0 through 6, got {}", self.generalization_level),
            ));
        }

        let mut params = Params::new()
            .with_opt("sourceCountry", self.source_country.as_deref())
            .with_opt("optionalCountryDataset", self.optional_country_dataset.as_deref())
            .with_opt("geographyQuery", self.geography_query.as_deref())
            .with_opt("subGeographyQuery", self.sub_geography_query.as_deref())
            .with("returnSubGeographyLayer", self.return_sub_geography_layer)
            .with("outSR", self.out_sr)
            .with("returnGeometry", self.return_geometry)
            .with("returnCentroids", self.return_centroids)
            .with("generalizationLevel", self.generalization_level)
            .with("useFuzzySearch", self.use_fuzzy_search)
            .with("featureLimit", self.feature_limit);
        if let Some(layers) = &self.geography_layers {
            params.set_json("geographylayers", layers)?;
        }
        if let Some(ids) = &self.geography_ids {
            params.set_json("geographyids", ids)?;
        }
        if let Some(layer) = &self.sub_geography_layer {
            params.set_json("subGeographyLayer", layer)?;
        }
        Ok(params)
    }
}
