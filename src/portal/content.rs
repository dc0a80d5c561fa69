//! Portal content root (`/sharing/rest/content`)

use super::item::{file_name, Item};
use super::types::FeatureSource;
use super::user::User;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params, UploadFile};
use crate::resource::{Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use std::sync::Arc;

/// Entry point to users' content, items and groups
#[derive(Debug, Clone)]
pub struct Content {
    client: Arc<HttpClient>,
    url: String,
}

impl Content {
    /// `url` may be the sharing root or the content root itself
    pub fn new(client: Arc<HttpClient>, url: &str) -> Self {
        let url = url.trim_end_matches('/');
        let url = if url.to_lowercase().contains("/content") {
            url.to_string()
        } else {
            format!("{url}/content")
        };
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// A user's content; without a name, the user the client signs in as
    pub fn user(&self, username: Option<&str>) -> Result<User> {
        let username = match username {
            Some(name) => name.to_string(),
            None => self
                .client
                .authenticator()
                .and_then(|auth| auth.username())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::invalid_argument("username", "no username given and none signed in")
                })?,
        };
        Ok(User::new(
            Arc::clone(&self.client),
            format!("{}/users/{username}", self.url),
        ))
    }

    pub fn item(&self, item_id: &str) -> Item {
        Item::new(
            Arc::clone(&self.client),
            format!("{}/items/{item_id}", self.url),
        )
    }

    pub fn group(&self, group_id: &str) -> Group {
        Group::new(
            Arc::clone(&self.client),
            format!("{}/groups/{group_id}", self.url),
        )
    }

    pub fn feature_content(&self) -> FeatureContent {
        FeatureContent::new(Arc::clone(&self.client), &self.url)
    }
}

/// Items shared with a group (`/content/groups/<id>`)
#[derive(Debug)]
pub struct Group {
    resource: Resource<JsonObject>,
}

impl Group {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    pub fn id(&self) -> &str {
        self.resource.url().rsplit('/').next().unwrap_or_default()
    }

    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.resource.get().await
    }

    /// Items registered with the group
    pub async fn items(&self) -> Result<Vec<JsonValue>> {
        let info = self.info().await?;
        Ok(info
            .get("items")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

impl ResourceWrapper for Group {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.resource
    }
}

/// Feature operations on uploaded content (`/content/features`)
#[derive(Debug, Clone)]
pub struct FeatureContent {
    client: Arc<HttpClient>,
    url: String,
}

impl FeatureContent {
    pub fn new(client: Arc<HttpClient>, url: &str) -> Self {
        let url = url.trim_end_matches('/');
        let url = if url.to_lowercase().contains("/features") {
            url.to_string()
        } else {
            format!("{url}/features")
        };
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Inspect a CSV before publishing it
    ///
    /// The response carries suggested `publishParameters` and detected
    /// location fields.
    pub async fn analyze(
        &self,
        source: &FeatureSource,
        file_type: &str,
        analyze_parameters: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        let mut params = Params::new().with("fileType", file_type);
        if let Some(parameters) = analyze_parameters {
            params.set_json("analyzeParameters", parameters)?;
        }

        match source {
            FeatureSource::Item(item_id) => {
                params.set("itemId", item_id.as_str());
            }
            FeatureSource::Text(text) => {
                params.set("text", text.as_str());
            }
            FeatureSource::File(path) => {
                params.set("text", read_text(path).await?);
            }
        }

        self.client
            .post_json(&format!("{}/analyze", self.url), params)
            .await
    }

    /// Generate a feature collection from a CSV or a zipped shapefile
    ///
    /// Local files must be `csv` or `shapefile`. CSV content is sent as
    /// text, shapefiles as a file part.
    pub async fn generate(
        &self,
        publish_parameters: &JsonValue,
        source: &FeatureSource,
        file_type: &str,
        option: Option<&str>,
    ) -> Result<JsonValue> {
        let mut params = Params::new()
            .with("fileType", file_type)
            .with("option", option.unwrap_or("on"));
        params.set_json("publishParameters", publish_parameters)?;
        let url = format!("{}/generate", self.url);

        match source {
            FeatureSource::Item(item_id) => {
                params.set("itemId", item_id.as_str());
                self.client.post_json(&url, params).await
            }
            FeatureSource::Text(text) => {
                params.set("text", text.as_str());
                self.client.post_json(&url, params).await
            }
            FeatureSource::File(path) => match file_type.to_lowercase().as_str() {
                "csv" => {
                    params.set("text", read_text(path).await?);
                    self.client.post_json(&url, params).await
                }
                "shapefile" => {
                    let file = UploadFile::from_path("file", path)
                        .await?
                        .with_content_type("application/zip");
                    self.client.post_multipart(&url, params, vec![file]).await
                }
                other => Err(Error::invalid_argument(
                    "file_type",
                    format!(
                        "{other} cannot be generated from {}; use csv or shapefile",
                        file_name(path)
                    ),
                )),
            },
        }
    }
}

async fn read_text(path: &std::path::Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(tokio::fs::read_to_string(path).await?)
}
