//! Service administration (`/admin/services`)

use crate::error::{Error, Result};
use crate::http::{HttpClient, Params, UploadFile};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Name of the root folder in administrative listings
pub const ADMIN_ROOT_FOLDER: &str = "/";

/// Service types accepted by [`Services::find_services`]
pub const FINDABLE_SERVICE_TYPES: &[&str] = &[
    "GPSERVER",
    "GLOBESERVER",
    "MAPSERVER",
    "GEOMETRYSERVER",
    "IMAGESERVER",
    "SEARCHSERVER",
    "GEODATASERVER",
    "GEOCODESERVER",
    "*",
];

/// Report sections requested by [`Services::service_report`]
const REPORT_SECTIONS: &[&str] = &["description", "status", "instances", "iteminfo", "properties"];

/// Folder listing of the services administration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesInfo {
    pub folder_name: Option<String>,
    pub description: Option<String>,
    pub web_encrypted: Option<bool>,
    pub is_default: Option<bool>,
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub folders_detail: Vec<JsonValue>,
    #[serde(default)]
    pub services: Vec<AdminServiceEntry>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(ServicesInfo, "Services");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminServiceEntry {
    pub service_name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub folder_name: Option<String>,
    pub description: Option<String>,
}

/// The services of a server, one folder at a time
#[derive(Debug)]
pub struct Services {
    client: Arc<HttpClient>,
    url: String,
    root: Resource<ServicesInfo>,
    folder: Option<(String, Resource<ServicesInfo>)>,
}

impl Services {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            root: Resource::new(Arc::clone(&client), url.clone()),
            client,
            url,
            folder: None,
        }
    }

    /// Root URL (`.../admin/services`)
    pub fn root_url(&self) -> &str {
        &self.url
    }

    /// Current folder, `None` at the root
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_ref().map(|(name, _)| name.as_str())
    }

    /// Listing of the current folder
    pub async fn info(&self) -> Result<Arc<Loaded<ServicesInfo>>> {
        self.current().get().await
    }

    /// Folder names; the root appears as `/`
    pub async fn folders(&self) -> Result<Vec<String>> {
        let info = self.root.get().await?;
        let mut folders = info.folders.clone();
        if !folders.iter().any(|f| f == ADMIN_ROOT_FOLDER) {
            folders.push(ADMIN_ROOT_FOLDER.to_string());
        }
        Ok(folders)
    }

    /// Move to a folder; `""` or `/` goes back to the root
    pub async fn set_folder(&mut self, folder: &str) -> Result<()> {
        if folder.is_empty() || folder == ADMIN_ROOT_FOLDER {
            self.folder = None;
            return Ok(());
        }
        if !self.folders().await?.iter().any(|f| f == folder) {
            return Err(Error::invalid_argument(
                "folder",
                format!("'{folder}' does not exist on {}", self.url),
            ));
        }
        let resource = Resource::new(Arc::clone(&self.client), format!("{}/{folder}", self.url));
        self.folder = Some((folder.to_string(), resource));
        Ok(())
    }

    /// Services of the current folder, listed fresh from the server
    pub async fn services(&self) -> Result<Vec<AgsService>> {
        let current = self.current();
        let info = current.refresh().await?;
        Ok(info
            .services
            .iter()
            .map(|s| {
                AgsService::new(
                    Arc::clone(&self.client),
                    format!(
                        "{}/{}.{}",
                        current.url(),
                        s.service_name,
                        s.service_type
                    ),
                )
            })
            .collect())
    }

    /// Services of the given types (comma separated, `*` for all) across every folder
    ///
    /// Each returned entry carries its admin URL under `URL`.
    pub async fn find_services(&self, service_type: &str) -> Result<Vec<JsonValue>> {
        let wanted: Vec<String> = service_type
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .collect();
        if let Some(bad) = wanted
            .iter()
            .find(|t| !FINDABLE_SERVICE_TYPES.contains(&t.to_uppercase().as_str()))
        {
            return Err(Error::invalid_argument(
                "service_type",
                format!("{bad} is not an allowed service type"),
            ));
        }
        let all = wanted.iter().any(|t| t == "*");

        let mut found = Vec::new();
        for folder in self.folders().await? {
            let url = if folder == ADMIN_ROOT_FOLDER {
                self.url.clone()
            } else {
                format!("{}/{folder}", self.url)
            };
            let listing = self.client.get_json(&url, Params::new()).await?;
            let Some(services) = listing.get("services").and_then(JsonValue::as_array) else {
                continue;
            };
            for service in services {
                let kind = service.get("type").and_then(JsonValue::as_str).unwrap_or("");
                if !all && !wanted.iter().any(|t| t == &kind.to_lowercase()) {
                    continue;
                }
                let name = service
                    .get("serviceName")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("");
                let mut entry = service.clone();
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert("URL".to_string(), json!(format!("{url}/{name}.{kind}")));
                }
                found.push(entry);
            }
        }
        Ok(found)
    }

    /// Grant or deny a principal access to a folder (the root when `None`)
    pub async fn add_folder_permission(
        &self,
        principal: &str,
        is_allowed: bool,
        folder: Option<&str>,
    ) -> Result<JsonValue> {
        let url = match folder {
            Some(folder) => format!("{}/{folder}/permissions/add", self.url),
            None => format!("{}/permissions/add", self.url),
        };
        let params = Params::new()
            .with("principal", principal)
            .with("isAllowed", is_allowed);
        self.client.post_json(&url, params).await
    }

    /// Permissions of a folder
    pub async fn list_folder_permissions(&self, folder: &str) -> Result<JsonValue> {
        self.client
            .post_json(&format!("{}/{folder}/permissions", self.url), Params::new())
            .await
    }

    /// Remove every permission of a principal
    pub async fn clean_permissions(&self, principal: &str) -> Result<JsonValue> {
        self.client
            .post_json(
                &format!("{}/permissions/clean", self.url),
                Params::new().with("principal", principal),
            )
            .await
    }

    pub async fn create_folder(&self, name: &str, description: &str) -> Result<JsonValue> {
        let params = Params::new()
            .with("folderName", name)
            .with("description", description);
        self.client
            .post_json(&format!("{}/createFolder", self.url), params)
            .await
    }

    /// Delete an existing folder
    pub async fn delete_folder(&self, name: &str) -> Result<JsonValue> {
        if !self.folders().await?.iter().any(|f| f == name) {
            return Err(Error::invalid_argument(
                "folder",
                format!("'{name}' does not exist"),
            ));
        }
        self.client
            .post_json(&format!("{}/{name}/deleteFolder", self.url), Params::new())
            .await
    }

    /// Change the description and encryption of the current folder
    pub async fn edit_folder(&self, description: &str, web_encrypted: bool) -> Result<JsonValue> {
        let params = Params::new()
            .with("description", description)
            .with("webEncrypted", web_encrypted);
        self.client
            .post_json(&self.current().child("editFolder"), params)
            .await
    }

    pub async fn delete_service(
        &self,
        name: &str,
        service_type: &str,
        folder: Option<&str>,
    ) -> Result<JsonValue> {
        let url = format!("{}/{name}.{service_type}/delete", self.folder_url(folder));
        self.client.post_json(&url, Params::new()).await
    }

    pub async fn rename_service(
        &self,
        name: &str,
        service_type: &str,
        new_name: &str,
        folder: Option<&str>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("serviceName", name)
            .with("serviceType", service_type)
            .with("serviceNewName", new_name);
        self.client
            .post_json(&format!("{}/renameService", self.folder_url(folder)), params)
            .await
    }

    /// Create a service from its JSON definition
    pub async fn create_service(&self, service: &JsonValue) -> Result<JsonValue> {
        let mut params = Params::new();
        params.set_json("service", service)?;
        self.client
            .post_json(&format!("{}/createService", self.url), params)
            .await
    }

    /// Report on the services of a folder
    pub async fn service_report(&self, folder: Option<&str>) -> Result<JsonValue> {
        let mut params = Params::new();
        params.set_json("parameters", REPORT_SECTIONS)?;
        self.client
            .get_json(&format!("{}/report", self.folder_url(folder)), params)
            .await
    }

    /// Service types supported by the server
    pub async fn types(&self) -> Result<JsonValue> {
        self.client
            .get_json(&format!("{}/types", self.url), Params::new())
            .await
    }

    /// Start services given as `{"folderName", "serviceName", "type"}` objects
    pub async fn start_services(&self, services: &[JsonValue]) -> Result<JsonValue> {
        self.batch("startServices", services).await
    }

    /// Stop services given as `{"folderName", "serviceName", "type"}` objects
    pub async fn stop_services(&self, services: &[JsonValue]) -> Result<JsonValue> {
        self.batch("stopServices", services).await
    }

    /// Check whether a folder or a service exists
    pub async fn exists(
        &self,
        folder: &str,
        service_name: Option<&str>,
        service_type: Option<&str>,
    ) -> Result<bool> {
        let params = Params::new()
            .with("folderName", folder)
            .with_opt("serviceName", service_name)
            .with_opt("type", service_type);
        let body = self
            .client
            .post_json(&format!("{}/exists", self.url), params)
            .await?;
        Ok(body.get("exists").and_then(JsonValue::as_bool).unwrap_or(false))
    }

    fn current(&self) -> &Resource<ServicesInfo> {
        self.folder.as_ref().map_or(&self.root, |(_, resource)| resource)
    }

    fn folder_url(&self, folder: Option<&str>) -> String {
        match folder {
            Some(folder) => format!("{}/{folder}", self.url),
            None => self.url.clone(),
        }
    }

    async fn batch(&self, operation: &str, services: &[JsonValue]) -> Result<JsonValue> {
        let mut params = Params::new();
        params.set_json("services", &json!({ "services": services }))?;
        self.client
            .post_json(&format!("{}/{operation}", self.url), params)
            .await
    }
}

impl ResourceWrapper for Services {
    type Props = ServicesInfo;

    fn resource(&self) -> &Resource<ServicesInfo> {
        self.current()
    }
}

/// Administrative properties of a service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgsServiceInfo {
    pub service_name: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub capabilities: Option<String>,
    pub provider: Option<String>,
    pub interceptor: Option<JsonValue>,
    pub cluster_name: Option<String>,
    pub min_instances_per_node: Option<i64>,
    pub max_instances_per_node: Option<i64>,
    pub instances_per_container: Option<i64>,
    pub max_wait_time: Option<i64>,
    pub max_startup_time: Option<i64>,
    pub max_idle_time: Option<i64>,
    pub max_usage_time: Option<i64>,
    pub load_balancing: Option<String>,
    pub isolation_level: Option<String>,
    pub configured_state: Option<String>,
    pub recycle_interval: Option<i64>,
    pub recycle_start_time: Option<String>,
    pub keep_alive_interval: Option<i64>,
    pub private: Option<bool>,
    pub is_default: Option<bool>,
    pub max_upload_file_size: Option<i64>,
    pub allowed_upload_file_types: Option<String>,
    pub properties: Option<JsonObject>,
    #[serde(default)]
    pub extensions: Vec<JsonValue>,
    pub datasets: Option<JsonValue>,
    pub framework_properties: Option<JsonValue>,
    pub portal_properties: Option<JsonValue>,
    pub json_properties: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(AgsServiceInfo, "AgsService");

/// A service seen from the administration (`.../<name>.<type>`)
#[derive(Debug)]
pub struct AgsService {
    resource: Resource<AgsServiceInfo>,
}

impl AgsService {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    pub async fn info(&self) -> Result<Arc<Loaded<AgsServiceInfo>>> {
        self.resource.get().await
    }

    pub async fn start(&self) -> Result<JsonValue> {
        self.post("start", Params::new()).await
    }

    pub async fn stop(&self) -> Result<JsonValue> {
        self.post("stop", Params::new()).await
    }

    /// Stop then start the service
    pub async fn restart(&self) -> Result<()> {
        info!("Restarting {}", self.resource.url());
        self.stop().await?;
        self.start().await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<JsonValue> {
        self.post("delete", Params::new()).await
    }

    /// Configured and real-time state
    pub async fn status(&self) -> Result<JsonValue> {
        self.get("status").await
    }

    pub async fn statistics(&self) -> Result<JsonValue> {
        self.get("statistics").await
    }

    pub async fn permissions(&self) -> Result<JsonValue> {
        self.get("permissions").await
    }

    pub async fn add_permission(&self, principal: &str, is_allowed: bool) -> Result<JsonValue> {
        let params = Params::new()
            .with("principal", principal)
            .with("isAllowed", is_allowed);
        self.post("permissions/add", params).await
    }

    pub async fn item_info(&self) -> Result<JsonValue> {
        self.get("iteminfo").await
    }

    pub async fn edit_item_info(&self, item_info: &JsonValue) -> Result<JsonValue> {
        let mut params = Params::new();
        params.set_json("serviceItemInfo", item_info)?;
        self.post("iteminfo/edit", params).await
    }

    /// Upload a file into a folder of the item info (e.g. a thumbnail)
    pub async fn upload_item_info(&self, folder: &str, file: UploadFile) -> Result<JsonValue> {
        let url = self.resource.child("iteminfo/upload");
        self.resource
            .client()
            .post_multipart(
                &url,
                Params::new().with("folder", folder),
                vec![file.with_field("file")],
            )
            .await
    }

    /// Download the service manifest (`json` or `xml`) into `dir`
    pub async fn service_manifest(&self, file_type: &str, dir: &Path) -> Result<PathBuf> {
        let name = format!("manifest.{file_type}");
        let url = self.resource.child(&format!("iteminfo/manifest/{name}"));
        self.resource
            .client()
            .download(&url, Params::new(), dir, Some(&name))
            .await
    }

    /// Replace the service definition; the cached properties are dropped
    pub async fn edit(&self, service: &JsonValue) -> Result<JsonValue> {
        let mut params = Params::new();
        params.set_json("service", service)?;
        let body = self.post("edit", params).await?;
        self.resource.invalidate().await;
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<JsonValue> {
        self.resource
            .client()
            .get_json(&self.resource.child(path), Params::new())
            .await
    }

    async fn post(&self, path: &str, params: Params) -> Result<JsonValue> {
        self.resource
            .client()
            .post_json(&self.resource.child(path), params)
            .await
    }
}

impl ResourceWrapper for AgsService {
    type Props = AgsServiceInfo;

    fn resource(&self) -> &Resource<AgsServiceInfo> {
        &self.resource
    }
}
