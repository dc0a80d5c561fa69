//! Portal community: users and groups (`/sharing/rest/community`)

use super::types::{SearchParams, SearchResults};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params};
use crate::pagination::{pages, PageStream, StartPaginator};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Group and user administration of a site
#[derive(Debug, Clone)]
pub struct Community {
    client: Arc<HttpClient>,
    url: String,
}

impl Community {
    /// `url` may be the sharing root or the community root itself
    pub fn new(client: Arc<HttpClient>, url: &str) -> Self {
        let url = url.trim_end_matches('/');
        let url = if url.to_lowercase().ends_with("/community") {
            url.to_string()
        } else {
            format!("{url}/community")
        };
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The signed-in user as the community sees it
    pub async fn self_info(&self) -> Result<JsonValue> {
        self.client
            .get_json(&format!("{}/self", self.url), Params::new())
            .await
    }

    pub fn users(&self) -> CommunityUsers {
        CommunityUsers {
            client: Arc::clone(&self.client),
            url: format!("{}/users", self.url),
        }
    }

    pub fn groups(&self) -> CommunityGroups {
        CommunityGroups {
            client: Arc::clone(&self.client),
            url: format!("{}/groups", self.url),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// `/community/users`
#[derive(Debug, Clone)]
pub struct CommunityUsers {
    client: Arc<HttpClient>,
    url: String,
}

impl CommunityUsers {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// One page of a user search
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let body = self.client.get_json(&self.url, params.to_params()).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Every page of a user search
    pub fn search_all(&self, params: &SearchParams) -> PageStream<'_> {
        pages(
            &self.client,
            self.url.as_str(),
            params.filter_params(),
            StartPaginator::new(params.start, params.num),
            "results",
        )
    }

    pub fn user(&self, username: &str) -> CommunityUser {
        CommunityUser {
            resource: Resource::new(
                Arc::clone(&self.client),
                format!("{}/{}", self.url, username.trim()),
            ),
        }
    }
}

/// A user's profile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityUserInfo {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub role: Option<String>,
    pub access: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(CommunityUserInfo, "CommunityUser");

/// Profile fields to change; unset fields are left alone
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    /// `private`, `org` or `public`
    pub access: Option<String>,
    pub tags: Option<Vec<String>>,
    pub culture: Option<String>,
    pub region: Option<String>,
    pub preferred_view: Option<String>,
    /// Clear profile fields sent empty (`clearEmptyFields`)
    pub clear_empty_fields: bool,
}

impl UserUpdate {
    pub(crate) fn to_params(&self) -> Result<Params> {
        if let Some(access) = self.access.as_deref() {
            if !matches!(access, "private" | "org" | "public") {
                return Err(Error::invalid_argument(
                    "access",
                    format!("'{access}' is not one of private, org, public"),
                ));
            }
        }
        Ok(Params::new()
            .with_opt("password", self.password.as_deref())
            .with_opt("fullname", self.full_name.as_deref())
            .with_opt("email", self.email.as_deref())
            .with_opt("description", self.description.as_deref())
            .with_opt("access", self.access.as_deref())
            .with_opt("tags", self.tags.as_ref().map(|tags| tags.join(",")))
            .with_opt("culture", self.culture.as_deref())
            .with_opt("region", self.region.as_deref())
            .with_opt("preferredView", self.preferred_view.as_deref())
            .with("clearEmptyFields", self.clear_empty_fields))
    }
}

/// `/community/users/<name>`
#[derive(Debug)]
pub struct CommunityUser {
    resource: Resource<CommunityUserInfo>,
}

impl CommunityUser {
    pub fn username(&self) -> &str {
        self.resource.url().rsplit('/').next().unwrap_or_default()
    }

    pub async fn info(&self) -> Result<Arc<Loaded<CommunityUserInfo>>> {
        self.resource.get().await
    }

    /// Change profile fields (password, name, email, ...)
    pub async fn update(&self, update: &UserUpdate) -> Result<JsonValue> {
        let body = self.post("update", update.to_params()?).await?;
        self.resource.invalidate().await;
        Ok(body)
    }

    /// Block sign-in without deleting the account
    pub async fn disable(&self) -> Result<JsonValue> {
        info!("Disabling user {}", self.username());
        self.post("disable", Params::new()).await
    }

    pub async fn enable(&self) -> Result<JsonValue> {
        self.post("enable", Params::new()).await
    }

    /// Delete the account; the user must own no content or groups
    pub async fn delete(&self) -> Result<JsonValue> {
        info!("Deleting user {}", self.username());
        self.post("delete", Params::new()).await
    }

    /// Tags the user has applied to content
    pub async fn tags(&self) -> Result<JsonValue> {
        self.resource
            .client()
            .get_json(&self.resource.child("tags"), Params::new())
            .await
    }

    async fn post(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.resource
            .client()
            .post_json(&self.resource.child(operation), params)
            .await
    }
}

impl ResourceWrapper for CommunityUser {
    type Props = CommunityUserInfo;

    fn resource(&self) -> &Resource<CommunityUserInfo> {
        &self.resource
    }
}

// ============================================================================
// Groups
// ============================================================================

/// Settings of a new or updated group
#[derive(Debug, Clone)]
pub struct GroupOptions {
    pub title: String,
    pub description: Option<String>,
    pub snippet: Option<String>,
    pub tags: Vec<String>,
    /// `private`, `org` or `public`
    pub access: String,
    /// Only invited users may join
    pub is_invitation_only: bool,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

impl GroupOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            snippet: None,
            tags: Vec::new(),
            access: "private".to_string(),
            is_invitation_only: false,
            sort_field: None,
            sort_order: None,
        }
    }

    #[must_use]
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    #[must_use]
    pub fn access(mut self, access: impl Into<String>) -> Self {
        self.access = access.into();
        self
    }

    pub(crate) fn to_params(&self) -> Result<Params> {
        if !matches!(self.access.as_str(), "private" | "org" | "public") {
            return Err(Error::invalid_argument(
                "access",
                format!("'{}' is not one of private, org, public", self.access),
            ));
        }
        Ok(Params::new()
            .with("title", self.title.as_str())
            .with("tags", self.tags.join(","))
            .with("access", self.access.as_str())
            .with("isInvitationOnly", self.is_invitation_only)
            .with_opt("description", self.description.as_deref())
            .with_opt("snippet", self.snippet.as_deref())
            .with_opt("sortField", self.sort_field.as_deref())
            .with_opt("sortOrder", self.sort_order.as_deref()))
    }
}

/// `/community/groups`
#[derive(Debug, Clone)]
pub struct CommunityGroups {
    client: Arc<HttpClient>,
    url: String,
}

impl CommunityGroups {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// One page of a group search
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let body = self.client.get_json(&self.url, params.to_params()).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub fn group(&self, group_id: &str) -> CommunityGroup {
        CommunityGroup {
            resource: Resource::new(
                Arc::clone(&self.client),
                format!("{}/{group_id}", self.url),
            ),
        }
    }

    /// Create a group owned by the signed-in user
    ///
    /// The response's `group.id` addresses the new group.
    pub async fn create(&self, options: &GroupOptions) -> Result<CommunityGroup> {
        let create_url = self.url.replace("/community/groups", "/community/createGroup");
        let body = self
            .client
            .post_json(&create_url, options.to_params()?)
            .await?;
        let id = body
            .pointer("/group/id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::resource(&create_url, "no group id in the response"))?;
        info!("Created group {} ({})", options.title, id);
        Ok(self.group(id))
    }
}

/// Group description
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub owner: Option<String>,
    pub access: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_invitation_only: bool,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(GroupInfo, "Group");

/// `/community/groups/<id>`
#[derive(Debug)]
pub struct CommunityGroup {
    resource: Resource<GroupInfo>,
}

impl CommunityGroup {
    pub fn id(&self) -> &str {
        self.resource.url().rsplit('/').next().unwrap_or_default()
    }

    pub async fn info(&self) -> Result<Arc<Loaded<GroupInfo>>> {
        self.resource.get().await
    }

    pub async fn update(&self, options: &GroupOptions) -> Result<JsonValue> {
        let body = self.post("update", options.to_params()?).await?;
        self.resource.invalidate().await;
        Ok(body)
    }

    pub async fn delete(&self) -> Result<JsonValue> {
        info!("Deleting group {}", self.id());
        self.post("delete", Params::new()).await
    }

    /// Owner, admins and members
    pub async fn users(&self) -> Result<JsonValue> {
        self.resource
            .client()
            .get_json(&self.resource.child("users"), Params::new())
            .await
    }

    /// Add users directly; the response lists `notAdded` names
    pub async fn add_users(&self, usernames: &[&str]) -> Result<JsonValue> {
        self.post("addUsers", Params::new().with("users", usernames.join(",")))
            .await
    }

    pub async fn remove_users(&self, usernames: &[&str]) -> Result<JsonValue> {
        self.post("removeUsers", Params::new().with("users", usernames.join(",")))
            .await
    }

    async fn post(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.resource
            .client()
            .post_json(&self.resource.child(operation), params)
            .await
    }
}

impl ResourceWrapper for CommunityGroup {
    type Props = GroupInfo;

    fn resource(&self) -> &Resource<GroupInfo> {
        &self.resource
    }
}
