//! ArcGIS Server services directory

use super::feature_service::FeatureService;
use crate::error::{Error, Result};
use crate::geometry_service::GeometryService;
use crate::http::{HttpClient, Params};
use crate::manage_ags::AgsAdministration;
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue, ServiceType};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Name of the top-level folder
pub const ROOT_FOLDER: &str = "root";

/// Path segments that end the instance part of a server URL
const URL_TYPES: &[&str] = &["admin", "manager", "rest", "tokens"];

/// Services directory listing (`/rest/services[/<folder>]`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub current_version: Option<f64>,
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(ServerInfo, "Server");

/// A service listed in a folder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEntry {
    /// Service name, prefixed with its folder (`Folder/Name`) outside root
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
}

/// A service that is not wrapped by a dedicated type
#[derive(Debug)]
pub struct GenericService {
    service_type: ServiceType,
    resource: Resource<JsonObject>,
}

impl GenericService {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>, service_type: ServiceType) -> Self {
        Self {
            service_type,
            resource: Resource::new(client, url),
        }
    }

    pub fn service_type(&self) -> &ServiceType {
        &self.service_type
    }

    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.resource.get().await
    }
}

impl ResourceWrapper for GenericService {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.resource
    }
}

/// Handle to a service of a folder
#[derive(Debug)]
pub enum ServiceHandle {
    Feature(FeatureService),
    Geometry(GeometryService),
    Other(GenericService),
}

impl ServiceHandle {
    /// Service URL
    pub fn url(&self) -> &str {
        match self {
            Self::Feature(s) => s.resource().url(),
            Self::Geometry(s) => s.resource().url(),
            Self::Other(s) => s.resource().url(),
        }
    }

    /// Service type
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Feature(_) => ServiceType::FeatureServer,
            Self::Geometry(_) => ServiceType::GeometryServer,
            Self::Other(s) => s.service_type().clone(),
        }
    }
}

/// An ArcGIS Server instance (non-administrative side)
#[derive(Debug)]
pub struct Server {
    client: Arc<HttpClient>,
    admin_url: String,
    root: Resource<ServerInfo>,
    current_folder: String,
    folder: Option<Resource<ServerInfo>>,
}

impl Server {
    /// Connect to a server from any URL on it
    pub fn new(client: Arc<HttpClient>, url: &str) -> Result<Self> {
        let (services_url, admin_url) = validate_url(url)?;
        Ok(Self {
            root: Resource::new(Arc::clone(&client), services_url),
            client,
            admin_url,
            current_folder: ROOT_FOLDER.to_string(),
            folder: None,
        })
    }

    /// Services directory root (`.../rest/services`)
    pub fn root_url(&self) -> &str {
        self.root.url()
    }

    /// Administration root (`.../admin`)
    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    /// URL of the current folder
    pub fn location(&self) -> &str {
        self.location_resource().url()
    }

    /// Name of the current folder
    pub fn current_folder(&self) -> &str {
        &self.current_folder
    }

    /// Directory listing of the root folder
    pub async fn info(&self) -> Result<Arc<Loaded<ServerInfo>>> {
        self.root.get().await
    }

    /// Server version
    pub async fn current_version(&self) -> Result<Option<f64>> {
        Ok(self.root.get().await?.current_version)
    }

    /// Folder names, starting with `root`
    pub async fn folders(&self) -> Result<Vec<String>> {
        let info = self.root.get().await?;
        let mut folders = Vec::with_capacity(info.folders.len() + 1);
        folders.push(ROOT_FOLDER.to_string());
        folders.extend(info.folders.iter().cloned());
        Ok(folders)
    }

    /// Move to another folder
    pub async fn set_current_folder(&mut self, folder: &str) -> Result<()> {
        let folders = self.folders().await?;
        if !folders.iter().any(|f| f == folder) {
            return Err(Error::invalid_argument(
                "folder",
                format!("'{folder}' does not exist on {}", self.root.url()),
            ));
        }

        if folder.eq_ignore_ascii_case(ROOT_FOLDER) {
            self.folder = None;
        } else {
            let url = self.root.child(folder);
            self.folder = Some(Resource::new(Arc::clone(&self.client), url));
        }
        self.current_folder = folder.to_string();
        Ok(())
    }

    /// Services of the current folder
    ///
    /// Internal services (index and search) are skipped.
    pub async fn services(&self) -> Result<Vec<ServiceHandle>> {
        let info = self.location_resource().get().await?;
        let mut services = Vec::with_capacity(info.services.len());

        for entry in &info.services {
            let url = format!("{}/{}/{}", self.root.url(), entry.name, entry.service_type);
            let client = Arc::clone(&self.client);
            let handle = match &entry.service_type {
                ServiceType::FeatureServer => ServiceHandle::Feature(FeatureService::new(client, url)),
                ServiceType::GeometryServer => {
                    ServiceHandle::Geometry(GeometryService::new(client, url))
                }
                t if t.is_internal() => continue,
                ServiceType::Other(name) => {
                    warn!("Unknown service type {} for {}", name, entry.name);
                    ServiceHandle::Other(GenericService::new(client, url, entry.service_type.clone()))
                }
                t => ServiceHandle::Other(GenericService::new(client, url, t.clone())),
            };
            services.push(handle);
        }

        Ok(services)
    }

    /// The signed-in user as seen by the server (`/rest/self`)
    pub async fn self_info(&self) -> Result<JsonValue> {
        let url = format!("{}/self", self.root.url().trim_end_matches("/services"));
        self.client.get_json(&url, Params::new()).await
    }

    /// Administrative side of the server; requires credentials
    pub fn admin(&self) -> Result<AgsAdministration> {
        if !self.client.is_authenticated() {
            return Err(Error::auth(
                "cannot connect to the server administration without authentication",
            ));
        }
        Ok(AgsAdministration::new(
            Arc::clone(&self.client),
            self.admin_url.clone(),
        ))
    }

    fn location_resource(&self) -> &Resource<ServerInfo> {
        self.folder.as_ref().unwrap_or(&self.root)
    }
}

impl ResourceWrapper for Server {
    type Props = ServerInfo;

    fn resource(&self) -> &Resource<ServerInfo> {
        self.location_resource()
    }
}

/// Rebuild the services and admin URLs of a server from any URL on it
pub fn validate_url(url: &str) -> Result<(String, String)> {
    let base = server_base_url(url)?;
    Ok((format!("{base}/rest/services"), format!("{base}/admin")))
}

/// `scheme://host[:port]/<instance>` of a server from any URL on it
///
/// The instance is the path before the last `admin`, `manager`, `rest` or
/// `tokens` segment (or before `services`); it defaults to `arcgis`.
pub fn server_base_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::config(format!("server URL has no host: {url}")))?;
    let netloc = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut parts: Vec<&str> = parsed
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|p| !p.is_empty())
        .collect();

    let cut = parts
        .iter()
        .rposition(|p| URL_TYPES.contains(p))
        .or_else(|| parts.iter().rposition(|p| *p == "services"));
    if let Some(idx) = cut {
        parts.truncate(idx);
    }

    let instance = if parts.is_empty() {
        "arcgis".to_string()
    } else {
        parts.join("/")
    };

    Ok(format!("{}://{netloc}/{instance}", parsed.scheme()))
}
