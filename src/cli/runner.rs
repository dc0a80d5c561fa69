//! CLI runner - executes commands

use crate::ags::{FeatureLayer, Query, Server};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::common::{Feature, FeatureSet};
use crate::config::ConnectionProfile;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, Params};
use crate::portal::{Administration, ItemData, SearchParams};
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let client = self.client()?;
        match &self.cli.command {
            Commands::Token => self.token(&client).await,
            Commands::Info { url } => {
                let body = client.get_json(url, Params::new()).await?;
                self.output(&body)
            }
            Commands::Query {
                url,
                r#where,
                out_fields,
                no_geometry,
                all,
            } => {
                let query = Query::new()
                    .where_clause(r#where.as_str())
                    .out_fields(out_fields.as_str())
                    .return_geometry(!no_geometry);
                self.query(client, url, &query, *all).await
            }
            Commands::Count { url, r#where } => {
                let layer = FeatureLayer::new(client, url.as_str());
                let count = layer
                    .query_count(&Query::new().where_clause(r#where.as_str()))
                    .await?;
                self.output(&json!({ "count": count }))
            }
            Commands::AddFeatures { url, file } => self.add_features(client, url, file).await,
            Commands::Search {
                query,
                item_type,
                num,
                all,
            } => self.search(client, query, item_type.as_deref(), *num, *all).await,
            Commands::FindItem {
                title,
                item_types,
                org,
            } => {
                let admin = self.portal(client)?;
                let items = admin.find_item(title, item_types.as_slice(), *org).await?;
                self.output(&Value::Array(items))
            }
            Commands::Services { url, folder } => self.services(client, url, folder.as_deref()).await,
            Commands::Item { id, data } => self.item(client, id, data.as_deref()).await,
        }
    }

    /// Client from the profile, or an anonymous one
    fn client(&self) -> Result<Arc<HttpClient>> {
        match &self.cli.profile {
            Some(path) => ConnectionProfile::from_file(path)?.build_client(),
            None => Ok(Arc::new(HttpClient::with_config(HttpClientConfig::default())?)),
        }
    }

    fn portal(&self, client: Arc<HttpClient>) -> Result<Administration> {
        Administration::new(client, self.cli.portal.as_deref())
    }

    async fn token(&self, client: &HttpClient) -> Result<()> {
        let auth = client
            .authenticator()
            .ok_or_else(|| Error::config("the token command needs a profile with credentials"))?;
        let token = auth.token().await?;
        self.output(&json!({ "token": token, "securityType": auth.config().kind() }))
    }

    async fn query(
        &self,
        client: Arc<HttpClient>,
        url: &str,
        query: &Query,
        all: bool,
    ) -> Result<()> {
        let layer = FeatureLayer::new(client, url);
        if all {
            let features = layer.query_all(query, None).await?;
            debug!("Fetched {} features", features.len());
            return self.output(&serde_json::to_value(features)?);
        }
        let result = layer.query(query).await?;
        match result.into_features() {
            Some(features) => self.output(&serde_json::to_value(features)?),
            None => Err(Error::Other("query returned no feature set".to_string())),
        }
    }

    async fn add_features(&self, client: Arc<HttpClient>, url: &str, file: &Path) -> Result<()> {
        let features = read_features(file)?;
        let layer = FeatureLayer::new(client, url);
        let results = layer.add_features_chunked(&features, None).await?;
        self.output(&serde_json::to_value(results)?)
    }

    async fn search(
        &self,
        client: Arc<HttpClient>,
        query: &str,
        item_type: Option<&str>,
        num: u32,
        all: bool,
    ) -> Result<()> {
        let admin = self.portal(client)?;
        let mut params = SearchParams::new(query).page(1, num);
        if let Some(item_type) = item_type {
            params = params.item_type(item_type);
        }

        if all {
            let pages: Vec<Value> = admin.search_all(&params).try_collect().await?;
            let results: Vec<Value> = pages
                .iter()
                .filter_map(|page| page.get("results").and_then(Value::as_array))
                .flatten()
                .cloned()
                .collect();
            return self.output(&Value::Array(results));
        }
        let results = admin.search(&params).await?;
        self.output(&json!({
            "total": results.total,
            "nextStart": results.next_start,
            "results": results.results,
        }))
    }

    async fn services(
        &self,
        client: Arc<HttpClient>,
        url: &str,
        folder: Option<&str>,
    ) -> Result<()> {
        let mut server = Server::new(client, url)?;
        if let Some(folder) = folder {
            server.set_current_folder(folder).await?;
        }
        let services: Vec<Value> = server
            .services()
            .await?
            .iter()
            .map(|s| json!({ "url": s.url(), "type": s.service_type().as_str() }))
            .collect();
        self.output(&json!({
            "folders": server.folders().await?,
            "services": services,
        }))
    }

    async fn item(&self, client: Arc<HttpClient>, id: &str, data: Option<&Path>) -> Result<()> {
        let item = self.portal(client)?.content().item(id);
        let info = item.info().await?;
        let mut body = info.raw().clone();
        if let Some(dir) = data {
            let data = match item.data(Some(dir)).await? {
                ItemData::Json(value) => value,
                ItemData::File(path) => json!({ "path": path.display().to_string() }),
            };
            body.insert("data".to_string(), data);
        }
        self.output(&Value::Object(body))
    }

    fn output(&self, value: &Value) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{text}");
        Ok(())
    }
}

/// Features from a JSON array or a feature set document
fn read_features(path: &Path) -> Result<Vec<Feature>> {
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let value: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let set: FeatureSet = serde_json::from_value(value)?;
    Ok(set.features)
}
