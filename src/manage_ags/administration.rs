//! Administration root of an ArcGIS Server (`.../admin`)

use super::services::Services;
use crate::ags::Uploads;
use crate::error::Result;
use crate::http::{HttpClient, Params};
use crate::resource::{Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use std::sync::Arc;

#[derive(Debug)]
pub struct AgsAdministration {
    resource: Resource<JsonObject>,
}

impl AgsAdministration {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    /// Administration root document (`resources`, `currentVersion`, ...)
    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.resource.get().await
    }

    /// Service administration
    pub fn services(&self) -> Services {
        Services::new(
            Arc::clone(self.resource.client()),
            self.resource.child("services"),
        )
    }

    /// Items uploaded to the server
    pub fn uploads(&self) -> Uploads {
        Uploads::admin(Arc::clone(self.resource.client()), self.resource.url())
    }

    /// Security configuration of the site
    pub async fn security_config(&self) -> Result<JsonValue> {
        self.resource
            .client()
            .get_json(&self.resource.child("security/config"), Params::new())
            .await
    }

    /// Update the security configuration
    ///
    /// `changes` holds the parameters to send, e.g. `sslEnabled`,
    /// `allowDirectAccess` or `authenticationTier`.
    pub async fn update_security_config(&self, changes: &JsonObject) -> Result<JsonValue> {
        let mut params = Params::new();
        params.extend_object(changes);
        self.resource
            .client()
            .post_json(&self.resource.child("security/config/update"), params)
            .await
    }
}

impl ResourceWrapper for AgsAdministration {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.resource
    }
}
