//! Lazily loaded REST resources
//!
//! Every ArcGIS entity (service, layer, item, user, ...) is a JSON document
//! at a URL. Wrappers hold a [`Resource<T>`] that fetches `?f=json` on first
//! access, deserializes the commonly used keys into a typed struct `T`, and
//! keeps the whole document for everything else.
//!
//! ```text
//! Resource<T> ──get()──► HttpClient::get_json ──► Loaded<T> { properties: T, raw }
//!      ▲                                               │
//!      └────────── refresh() / invalidate() ◄──────────┘
//! ```

use crate::error::{Error, Result};
use crate::http::{HttpClient, Params};
use crate::types::{JsonObject, JsonValue};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Typed view of a resource's JSON document
///
/// Implementors are plain serde structs. Keys without a matching field land
/// in a `#[serde(flatten)] extra` map and are reported on load.
pub trait Properties: DeserializeOwned + Send + Sync + 'static {
    /// Label used in logs (e.g. "FeatureLayer")
    const KIND: &'static str;

    /// Keys of the document that have no typed field
    fn unmapped(&self) -> Option<&JsonObject> {
        None
    }
}

/// Untyped resources keep the document as-is
impl Properties for JsonObject {
    const KIND: &'static str = "Resource";
}

/// Implement [`Properties`] for a struct with an `extra` catch-all map
macro_rules! impl_properties {
    ($ty:ty, $kind:literal) => {
        impl $crate::resource::Properties for $ty {
            const KIND: &'static str = $kind;

            fn unmapped(&self) -> Option<&$crate::types::JsonObject> {
                Some(&self.extra)
            }
        }
    };
}
pub(crate) use impl_properties;

/// A loaded document: typed properties plus the full JSON
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    properties: T,
    raw: JsonObject,
}

impl<T: Properties> Loaded<T> {
    /// Map a JSON document onto `T`
    pub fn from_value(url: &str, value: JsonValue) -> Result<Self> {
        let raw = match value {
            JsonValue::Object(map) => map,
            other => {
                return Err(Error::resource(
                    url,
                    format!("expected a JSON object, got {other}"),
                ))
            }
        };

        let properties: T = serde_json::from_value(JsonValue::Object(raw.clone()))
            .map_err(|e| Error::resource(url, format!("cannot map {}: {e}", T::KIND)))?;

        if let Some(extra) = properties.unmapped() {
            for key in extra.keys() {
                debug!("{} attribute not implemented: {} ({})", T::KIND, key, url);
            }
        }

        Ok(Self { properties, raw })
    }
}

impl<T> Loaded<T> {
    /// Typed properties
    pub fn properties(&self) -> &T {
        &self.properties
    }

    /// The complete JSON document
    pub fn raw(&self) -> &JsonObject {
        &self.raw
    }

    /// Look up any top-level key of the document
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.raw.get(key)
    }
}

impl<T> Deref for Loaded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.properties
    }
}

/// Lazy loader bound to a URL
pub struct Resource<T> {
    client: Arc<HttpClient>,
    url: String,
    params: Params,
    state: RwLock<Option<Arc<Loaded<T>>>>,
}

impl<T: Properties> Resource<T> {
    /// Create a resource that loads on first access
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            params: Params::new(),
            state: RwLock::new(None),
        }
    }

    /// Create a resource from a document that was already fetched
    /// (e.g. an entry of a search result)
    pub fn preloaded(
        client: Arc<HttpClient>,
        url: impl Into<String>,
        value: JsonValue,
    ) -> Result<Self> {
        let resource = Self::new(client, url);
        let loaded = Loaded::from_value(&resource.url, value)?;
        Ok(Self {
            state: RwLock::new(Some(Arc::new(loaded))),
            ..resource
        })
    }

    /// Extra parameters sent with every load
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Resource URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Client used for requests
    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Build the URL of a child endpoint
    pub fn child(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }

    /// Get the document, loading it on first access
    pub async fn get(&self) -> Result<Arc<Loaded<T>>> {
        {
            let state = self.state.read().await;
            if let Some(loaded) = state.as_ref() {
                return Ok(Arc::clone(loaded));
            }
        }

        let mut state = self.state.write().await;

        // Another task may have loaded while we waited for the write lock
        if let Some(loaded) = state.as_ref() {
            return Ok(Arc::clone(loaded));
        }

        let loaded = Arc::new(self.fetch().await?);
        *state = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Reload the document from the server
    pub async fn refresh(&self) -> Result<Arc<Loaded<T>>> {
        let mut state = self.state.write().await;
        let loaded = Arc::new(self.fetch().await?);
        *state = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Forget the cached document; the next access reloads it
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        *state = None;
    }

    /// Check if the document has been loaded
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// The full JSON document
    pub async fn raw(&self) -> Result<JsonObject> {
        Ok(self.get().await?.raw().clone())
    }

    async fn fetch(&self) -> Result<Loaded<T>> {
        debug!("Loading {} from {}", T::KIND, self.url);
        let value = self.client.get_json(&self.url, self.params.clone()).await?;
        Loaded::from_value(&self.url, value)
    }
}

impl<T> std::fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Wrappers that are backed by a single lazily loaded document
pub trait ResourceWrapper: Send + Sync {
    /// Typed properties of the document
    type Props: Properties;

    /// The underlying loader
    fn resource(&self) -> &Resource<Self::Props>;
}

impl<T: Properties> ResourceWrapper for Resource<T> {
    type Props = T;

    fn resource(&self) -> &Resource<T> {
        self
    }
}

/// Common surface of every REST entity
#[async_trait]
pub trait RestResource: Send + Sync {
    /// Resource URL
    fn url(&self) -> &str;

    /// The resource's full JSON document
    async fn json(&self) -> Result<JsonObject>;

    /// Reload the resource from the server
    async fn refresh(&self) -> Result<()>;
}

#[async_trait]
impl<W: ResourceWrapper> RestResource for W {
    fn url(&self) -> &str {
        self.resource().url()
    }

    async fn json(&self) -> Result<JsonObject> {
        self.resource().raw().await
    }

    async fn refresh(&self) -> Result<()> {
        self.resource().refresh().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests;
