//! Portal / ArcGIS Online site root (`/sharing/rest`)

use super::community::Community;
use super::content::Content;
use super::types::{SearchParams, SearchResults};
use crate::auth::{PortalUrls, SecurityConfig};
use crate::common::find_item_query;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params};
use crate::manage_ags::AgsAdministration;
use crate::pagination::{fetch_all, pages, PageStream, StartPaginator};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Host of the public ArcGIS Online site
const AGOL_HOST: &str = "www.arcgis.com";

/// `portals/self`: the organization the caller belongs to
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSelf {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url_key: Option<String>,
    pub custom_base_url: Option<String>,
    pub portal_hostname: Option<String>,
    pub portal_mode: Option<String>,
    #[serde(default)]
    pub is_portal: bool,
    pub helper_services: Option<JsonObject>,
    pub user: Option<JsonObject>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(PortalSelf, "Portal");

impl PortalSelf {
    /// URL of a helper service (e.g. `geoenrichment`, `geometry`)
    pub fn helper_service_url(&self, name: &str) -> Option<&str> {
        self.helper_services
            .as_ref()?
            .get(name)?
            .get("url")?
            .as_str()
    }
}

/// A server that hosts the organization's services
#[derive(Debug)]
pub enum HostingServer {
    /// A federated ArcGIS Server (Portal)
    Federated(AgsAdministration),
    /// ArcGIS Online hosted services admin root
    Hosted(Resource<JsonObject>),
}

impl HostingServer {
    pub fn url(&self) -> &str {
        match self {
            Self::Federated(admin) => admin.resource().url(),
            Self::Hosted(resource) => resource.url(),
        }
    }
}

/// Administration of a Portal or ArcGIS Online organization
#[derive(Debug)]
pub struct Administration {
    client: Arc<HttpClient>,
    root: Resource<JsonObject>,
    portal_self: Resource<PortalSelf>,
}

impl Administration {
    /// Bind to a site without contacting it
    ///
    /// Without `url` the organization of the client's credentials is used.
    /// `/sharing/rest` is appended when missing.
    pub fn new(client: Arc<HttpClient>, url: Option<&str>) -> Result<Self> {
        let org_url = match url {
            Some(url) => url.to_string(),
            None => client
                .authenticator()
                .and_then(|auth| auth.org_url())
                .ok_or_else(|| {
                    Error::config("a portal URL or portal credentials are required")
                })?,
        };
        let url = PortalUrls::from_org_url(&org_url)?.url;
        Ok(Self::at(client, url))
    }

    /// Bind to a site, resolving `www.arcgis.com` to the organization's own
    /// host (`<urlKey>.<customBaseUrl>`)
    pub async fn connect(client: Arc<HttpClient>, url: Option<&str>) -> Result<Self> {
        let admin = Self::new(client, url)?;
        let host = Url::parse(admin.url())?
            .host_str()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if host != AGOL_HOST {
            return Ok(admin);
        }

        let portal = admin.portal_self().await?;
        let org_url = organization_url(admin.url(), &portal)?;
        info!("Using organization URL {}", org_url);
        Ok(Self::at(Arc::clone(&admin.client), org_url))
    }

    fn at(client: Arc<HttpClient>, url: String) -> Self {
        Self {
            root: Resource::new(Arc::clone(&client), url.as_str()),
            portal_self: Resource::new(Arc::clone(&client), format!("{url}/portals/self")),
            client,
        }
    }

    /// Sharing REST root
    pub fn url(&self) -> &str {
        self.root.url()
    }

    pub fn token_url(&self) -> String {
        self.root.child("generateToken")
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Site root document (`currentVersion`)
    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.root.get().await
    }

    pub async fn portal_self(&self) -> Result<Arc<Loaded<PortalSelf>>> {
        self.portal_self.get().await
    }

    pub fn content(&self) -> Content {
        Content::new(Arc::clone(&self.client), self.url())
    }

    /// Users and groups (`/community`)
    pub fn community(&self) -> Community {
        Community::new(Arc::clone(&self.client), self.url())
    }

    /// One page of an item search
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let body = self
            .client
            .get_json(&self.root.child("search"), params.to_params())
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Every page of a search, following `nextStart`
    pub fn search_all(&self, params: &SearchParams) -> PageStream<'_> {
        pages(
            &self.client,
            self.root.child("search"),
            params.filter_params(),
            StartPaginator::new(params.start, params.num),
            "results",
        )
    }

    /// Find items by title, optionally restricted to some item types
    ///
    /// Unless `search_org` is set only the signed-in user's items are
    /// searched.
    pub async fn find_item<S: AsRef<str>>(
        &self,
        title: &str,
        item_types: &[S],
        search_org: bool,
    ) -> Result<Vec<JsonValue>> {
        let username = self.client.authenticator().and_then(|auth| auth.username());
        let query = find_item_query(title, item_types, username, search_org);
        debug!("Searching items with q={}", query);
        fetch_all(
            &self.client,
            &self.root.child("search"),
            SearchParams::new(query).filter_params(),
            StartPaginator::new(1, 100),
            "results",
        )
        .await
    }

    /// Servers that host the organization's services
    ///
    /// A Portal without hosting URLs lists its federated servers; each is
    /// administered with a server token exchanged from the portal login.
    pub async fn hosting_servers(&self) -> Result<Vec<HostingServer>> {
        let portal = self.portal_self().await?;
        let urls = self
            .client
            .get_json(&self.portal_self.child("urls"), Params::new())
            .await?;

        if urls.as_object().is_some_and(JsonObject::is_empty) {
            return self.federated_servers().await;
        }

        let features = urls.get("urls").and_then(|u| u.get("features"));
        let (scheme, hosts) = match features {
            Some(f) if f.get("https").is_some() => ("https", f.get("https")),
            Some(f) if f.get("http").is_some() => ("http", f.get("http")),
            _ => {
                warn!("Publishing servers not found for {}", self.url());
                return Ok(Vec::new());
            }
        };

        let hosts = hosts
            .and_then(JsonValue::as_array)
            .map(|hosts| hosts.iter().filter_map(JsonValue::as_str).collect::<Vec<_>>())
            .unwrap_or_default();

        let mut servers = Vec::with_capacity(hosts.len());
        for host in hosts {
            if portal.is_portal {
                let url = with_scheme(host, scheme);
                servers.push(HostingServer::Federated(AgsAdministration::new(
                    Arc::clone(&self.client),
                    format!("{url}/admin"),
                )));
            } else {
                let portal_id = portal.id.as_deref().unwrap_or_default();
                servers.push(HostingServer::Hosted(Resource::new(
                    Arc::clone(&self.client),
                    format!("{scheme}://{host}/{portal_id}/ArcGIS/rest/admin"),
                )));
            }
        }
        Ok(servers)
    }

    async fn federated_servers(&self) -> Result<Vec<HostingServer>> {
        let body = self
            .client
            .get_json(&self.portal_self.child("servers"), Params::new())
            .await?;

        let mut servers = Vec::new();
        for server in body
            .get("servers")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
        {
            let Some(admin_url) = server.get("adminUrl").and_then(JsonValue::as_str) else {
                continue;
            };
            let admin_url = format!("{}/admin", admin_url.trim_end_matches('/'));
            let client = self.server_client(&admin_url)?;
            servers.push(HostingServer::Federated(AgsAdministration::new(client, admin_url)));
        }
        Ok(servers)
    }

    /// Client for a federated server: portal logins are exchanged for a
    /// server token, anything else is reused as is
    fn server_client(&self, server_url: &str) -> Result<Arc<HttpClient>> {
        match self.client.authenticator().map(|auth| auth.config()) {
            Some(SecurityConfig::Portal(creds)) => {
                let security = SecurityConfig::PortalServer {
                    portal: creds.clone(),
                    server_url: server_url.to_string(),
                };
                Ok(Arc::new(HttpClient::with_security(
                    self.client.config().clone(),
                    security,
                )?))
            }
            _ => Ok(Arc::clone(&self.client)),
        }
    }
}

impl ResourceWrapper for Administration {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.root
    }
}

/// Replace the host of an ArcGIS Online URL with the organization's host
pub fn organization_url(url: &str, portal: &PortalSelf) -> Result<String> {
    let (Some(key), Some(base)) = (portal.url_key.as_deref(), portal.custom_base_url.as_deref())
    else {
        return Err(Error::resource(
            url,
            "portals/self has no urlKey/customBaseUrl",
        ));
    };
    let parsed = Url::parse(url)?;
    Ok(format!("https://{key}.{base}{}", parsed.path().trim_end_matches('/')))
}

fn with_scheme(host: &str, scheme: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("{scheme}://{}", host.trim_end_matches('/'))
    }
}
