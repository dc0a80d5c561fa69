//! GeoEnrichment service
//!
//! Demographic and landscape facts about study areas. The service lives
//! outside the organization; portals advertise their own instance under
//! `helperServices.geoenrichment`.

mod types;

pub use types::{
    study_area, EnrichOptions, ReportFormat, ReportOptions, StandardGeographyQuery,
    DERIVATIVE_VARIABLES,
};

use crate::error::{Error, Result};
use crate::http::{HttpClient, Params};
use crate::portal::Administration;
use crate::types::JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Public GeoEnrichment server used when a portal does not name one
pub const DEFAULT_GEOENRICHMENT_URL: &str =
    "http://geoenrich.arcgis.com/arcgis/rest/services/World/geoenrichmentserver";

#[derive(Debug, Clone)]
pub struct GeoEnrichment {
    client: Arc<HttpClient>,
    base_url: String,
}

impl GeoEnrichment {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Use the portal's GeoEnrichment helper service, or the public one
    pub async fn from_portal(admin: &Administration) -> Result<Self> {
        let portal = admin.portal_self().await?;
        let url = portal
            .helper_service_url("geoenrichment")
            .unwrap_or(DEFAULT_GEOENRICHMENT_URL);
        debug!("GeoEnrichment server: {}", url);
        Ok(Self::new(Arc::clone(admin.client()), url))
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Enrich study areas with the requested data collections or variables
    pub async fn enrich(
        &self,
        study_areas: &[JsonValue],
        options: &EnrichOptions,
    ) -> Result<JsonValue> {
        if study_areas.is_empty() {
            return Err(Error::invalid_argument(
                "study_areas",
                "at least one study area is required",
            ));
        }
        let params = options.to_params(study_areas)?;
        self.client
            .get_json(&self.endpoint("Geoenrichment/Enrich"), params)
            .await
    }

    /// Render a report for study areas and save it into `dir`
    pub async fn create_report(
        &self,
        study_areas: &[JsonValue],
        options: &ReportOptions,
        dir: &Path,
        file_name: Option<&str>,
    ) -> Result<PathBuf> {
        let mut params = Params::new()
            .with("f", "bin")
            .with("format", options.format.as_str())
            .with("inSR", options.in_sr)
            .with_opt("report", options.report.as_deref())
            .with_opt("reportFields", options.report_fields.clone())
            .with_opt("studyAreasOptions", options.study_areas_options.clone())
            .with_opt("useData", options.use_data.clone());
        params.set_json("studyAreas", study_areas)?;

        let default_name = format!("report.{}", options.format);
        self.client
            .download(
                &self.endpoint("GeoEnrichment/createreport"),
                params,
                dir,
                Some(file_name.unwrap_or(&default_name)),
            )
            .await
    }

    /// Report templates available in a country (two-letter code)
    pub async fn reports(&self, country: &str) -> Result<JsonValue> {
        self.client
            .post_json(
                &self.endpoint(&format!("Geoenrichment/Reports/{country}")),
                Params::new(),
            )
            .await
    }

    /// Discover data collections, globally or for one country
    ///
    /// `add_derivative_variables` must be one of [`DERIVATIVE_VARIABLES`];
    /// `out_fields` defaults to every field.
    pub async fn data_collections<S: AsRef<str>>(
        &self,
        country: Option<&str>,
        add_derivative_variables: Option<&str>,
        out_fields: Option<&[S]>,
        suppress_null_values: bool,
    ) -> Result<JsonValue> {
        let derivative = add_derivative_variables.unwrap_or("*");
        if !DERIVATIVE_VARIABLES.contains(&derivative) {
            return Err(Error::invalid_argument(
                "add_derivative_variables",
                format!(
                    "{derivative} is not one of {}",
                    DERIVATIVE_VARIABLES.join(", ")
                ),
            ));
        }
        let out_fields = out_fields
            .map(|fields| {
                fields
                    .iter()
                    .map(|f| f.as_ref())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| "*".to_string());

        let path = match country {
            Some(country) => format!("Geoenrichment/dataCollections/{country}"),
            None => "Geoenrichment/dataCollections".to_string(),
        };
        let params = Params::new()
            .with("addDerivativeVariables", derivative)
            .with("outFields", out_fields)
            .with("suppressNullValues", suppress_null_values);
        self.client.post_json(&self.endpoint(&path), params).await
    }

    /// Search the variables of a country's data
    pub async fn get_variables(
        &self,
        source_country: &str,
        optional_country_dataset: Option<&str>,
        search_text: Option<&str>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("sourceCountry", source_country)
            .with_opt("optionalCountryDataset", optional_country_dataset)
            .with_opt("searchText", search_text);
        self.client
            .post_json(&self.endpoint("GetVariables/execute"), params)
            .await
    }

    /// Find standard geographies (states, counties, postal codes...) by id
    /// or name
    pub async fn standard_geography_query(
        &self,
        query: &StandardGeographyQuery,
    ) -> Result<JsonValue> {
        let params = query.to_params()?;
        self.client
            .post_json(&self.endpoint("StandardGeographyQuery/execute"), params)
            .await
    }

    /// Geography levels available, globally or for one country
    pub async fn standard_geography_levels(&self, country: Option<&str>) -> Result<JsonValue> {
        let path = match country {
            Some(country) => format!("StandardGeographyLevels/{country}"),
            None => "StandardGeographyLevels".to_string(),
        };
        self.client
            .get_json(&self.endpoint(&path), Params::new())
            .await
    }
}
