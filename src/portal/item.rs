//! Portal items
//!
//! [`Item`] is the public side of an item (`/content/items/<id>`),
//! [`UserItem`] the owner's side (`/content/users/<user>[/<folder>]/items/<id>`)
//! where the item is changed.

use super::types::{
    is_file_item_type, is_pending_status, status_of, ItemParameters, JobPolling, MetadataFormat,
    PART_SIZE,
};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params, UploadFile};
use crate::resource::{impl_properties, Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub id: Option<String>,
    pub owner: Option<String>,
    pub owner_folder: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub access: Option<String>,
    pub snippet: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub type_keywords: Vec<String>,
    pub size: Option<i64>,
    pub created: Option<i64>,
    pub modified: Option<i64>,
    pub protected: Option<bool>,
    pub num_views: Option<i64>,
    pub num_comments: Option<i64>,
    pub num_ratings: Option<i64>,
    pub avg_rating: Option<f64>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(ItemInfo, "Item");

/// Result of [`Item::data`]
#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    /// JSON content (web maps, feature collections, ...)
    Json(JsonValue),
    /// Path of the downloaded file
    File(PathBuf),
}

/// An item in the portal's content
#[derive(Debug)]
pub struct Item {
    resource: Resource<ItemInfo>,
}

impl Item {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    /// Item id, taken from the URL
    pub fn id(&self) -> &str {
        last_segment(self.resource.url())
    }

    pub async fn info(&self) -> Result<Arc<Loaded<ItemInfo>>> {
        self.resource.get().await
    }

    /// Item content
    ///
    /// File items (packages, documents, CSV, ...) are downloaded into
    /// `save_dir` under the item name; other items return their JSON.
    pub async fn data(&self, save_dir: Option<&Path>) -> Result<ItemData> {
        let info = self.info().await?;
        let url = self.resource.child("data");
        let item_type = info.item_type.as_deref().unwrap_or_default();

        if !is_file_item_type(item_type) {
            let body = self.client().get_json(&url, Params::new()).await?;
            return Ok(ItemData::Json(body));
        }

        let dir = save_dir.ok_or_else(|| {
            Error::invalid_argument(
                "save_dir",
                format!("a directory is required to save an item of type {item_type}"),
            )
        })?;
        let path = self
            .client()
            .download(&url, Params::new(), dir, info.name.as_deref())
            .await?;
        Ok(ItemData::File(path))
    }

    /// Groups the item is shared with
    pub async fn groups(&self) -> Result<JsonValue> {
        self.client()
            .get_json(&self.resource.child("groups"), Params::new())
            .await
    }

    pub async fn rating(&self) -> Result<JsonValue> {
        self.client()
            .get_json(&self.resource.child("rating"), Params::new())
            .await
    }

    /// Rate the item; the rating is clamped to 1.0..=5.0
    pub async fn add_rating(&self, rating: f64) -> Result<JsonValue> {
        let rating = rating.clamp(1.0, 5.0);
        self.client()
            .post_json(
                &self.resource.child("addRating"),
                Params::new().with("rating", rating),
            )
            .await
    }

    /// Remove the caller's rating
    pub async fn delete_rating(&self) -> Result<JsonValue> {
        self.client()
            .post_json(&self.resource.child("deleteRating"), Params::new())
            .await
    }

    pub async fn add_comment(&self, comment: &str) -> Result<JsonValue> {
        self.client()
            .post_json(
                &self.resource.child("addComment"),
                Params::new().with("comment", comment),
            )
            .await
    }

    pub async fn comment(&self, comment_id: &str) -> Result<JsonValue> {
        self.client()
            .get_json(
                &self.resource.child(&format!("comments/{comment_id}")),
                Params::new(),
            )
            .await
    }

    pub async fn comments(&self) -> Result<JsonValue> {
        self.client()
            .get_json(&self.resource.child("comments"), Params::new())
            .await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<JsonValue> {
        self.client()
            .post_json(
                &self.resource.child(&format!("comments/{comment_id}/delete")),
                Params::new(),
            )
            .await
    }

    /// Share the item with groups, the organization or everyone
    pub async fn share<S: AsRef<str>>(
        &self,
        groups: &[S],
        everyone: bool,
        org: bool,
    ) -> Result<JsonValue> {
        let body = self
            .client()
            .post_json(&self.resource.child("share"), share_params(groups, everyone, org))
            .await?;
        self.resource.invalidate().await;
        Ok(body)
    }

    pub async fn unshare<S: AsRef<str>>(&self, groups: &[S]) -> Result<JsonValue> {
        self.client()
            .post_json(
                &self.resource.child("unshare"),
                Params::new().with("groups", join(groups)),
            )
            .await
    }

    /// Download the item metadata as `metadata.xml` (or `file_name`)
    pub async fn metadata(
        &self,
        format: MetadataFormat,
        dir: &Path,
        file_name: Option<&str>,
    ) -> Result<PathBuf> {
        let params = Params::new().with("format", format.param());
        self.client()
            .download(
                &self.resource.child("info/metadata/metadata.xml"),
                params,
                dir,
                Some(file_name.unwrap_or("metadata.xml")),
            )
            .await
    }

    /// Delete an info file; defaults to the metadata document
    pub async fn delete_info(&self, info_file: Option<&str>) -> Result<JsonValue> {
        delete_info(self.client(), &self.resource.child("deleteInfo"), info_file).await
    }

    /// Download the item's package information file
    pub async fn package_info(&self, dir: &Path) -> Result<PathBuf> {
        self.client()
            .download(&self.resource.child("item.pkinfo"), Params::new(), dir, None)
            .await
    }

    /// The owner's view of this item
    pub async fn user_item(&self) -> Result<UserItem> {
        let info = self.info().await?;
        let owner = info.owner.as_deref().ok_or_else(|| {
            Error::resource(self.resource.url(), "item has no owner")
        })?;
        let content_root = content_root(self.resource.url(), "/items/")?;
        let url = match info.owner_folder.as_deref().filter(|f| !f.is_empty()) {
            Some(folder) => format!("{content_root}/users/{owner}/{folder}/items/{}", self.id()),
            None => format!("{content_root}/users/{owner}/items/{}", self.id()),
        };
        Ok(UserItem::new(Arc::clone(self.client()), url))
    }

    fn client(&self) -> &Arc<HttpClient> {
        self.resource.client()
    }
}

impl ResourceWrapper for Item {
    type Props = ItemInfo;

    fn resource(&self) -> &Resource<ItemInfo> {
        &self.resource
    }
}

// ============================================================================
// User items
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UserItemInfo {
    pub item: Option<ItemInfo>,
    pub sharing: Option<JsonObject>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl_properties!(UserItemInfo, "UserItem");

/// An item as seen by its owner
#[derive(Debug)]
pub struct UserItem {
    resource: Resource<UserItemInfo>,
    polling: JobPolling,
}

impl UserItem {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
            polling: JobPolling::default(),
        }
    }

    /// Poll this item's jobs at another pace or for longer
    #[must_use]
    pub fn with_polling(mut self, polling: JobPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn id(&self) -> &str {
        last_segment(self.resource.url())
    }

    pub async fn info(&self) -> Result<Arc<Loaded<UserItemInfo>>> {
        self.resource.get().await
    }

    /// The public view of this item
    pub fn item(&self) -> Result<Item> {
        let content_root = content_root(self.resource.url(), "/users/")?;
        Ok(Item::new(
            Arc::clone(self.client()),
            format!("{content_root}/items/{}", self.id()),
        ))
    }

    /// Remove the item and its folder link
    pub async fn delete(&self) -> Result<JsonValue> {
        self.post("delete", Params::new()).await
    }

    /// Move the item to a folder id; `/` is the root folder
    pub async fn move_to(&self, folder: &str) -> Result<JsonValue> {
        self.post("move", Params::new().with("folder", folder)).await
    }

    /// Protect the item from deletion
    pub async fn protect(&self) -> Result<JsonValue> {
        self.post("protect", Params::new()).await
    }

    pub async fn unprotect(&self) -> Result<JsonValue> {
        self.post("unprotect", Params::new()).await
    }

    /// Give the item to another member of the organization
    pub async fn reassign(&self, target_username: &str, target_folder: &str) -> Result<JsonValue> {
        let params = Params::new()
            .with("targetUsername", target_username)
            .with("targetFoldername", target_folder);
        self.post("reassign", params).await
    }

    pub async fn share<S: AsRef<str>>(
        &self,
        groups: &[S],
        everyone: bool,
        org: bool,
    ) -> Result<JsonValue> {
        self.post("share", share_params(groups, everyone, org)).await
    }

    pub async fn unshare<S: AsRef<str>>(&self, groups: &[S]) -> Result<JsonValue> {
        self.post("unshare", Params::new().with("groups", join(groups)))
            .await
    }

    /// Update item properties and optionally replace its data file
    ///
    /// Server-owned keys (`id`, `owner`, `numViews`, ...) are dropped.
    /// Thumbnails and metadata travel as file parts.
    pub async fn update(
        &self,
        parameters: &ItemParameters,
        data: Option<&Path>,
        clear_empty_fields: bool,
    ) -> Result<JsonValue> {
        let mut params = parameters.update_params();
        if clear_empty_fields {
            params.set("clearEmptyFields", true);
        }

        let mut files = parameters.file_parts().await?;
        if let Some(path) = data {
            files.push(UploadFile::from_path("file", path).await?);
        }

        let url = self.resource.child("update");
        let body = if files.is_empty() {
            self.client().post_json(&url, params).await?
        } else {
            self.client().post_multipart(&url, params, files).await?
        };
        self.resource.invalidate().await;
        Ok(body)
    }

    /// Replace the data file with a multipart upload, then commit
    pub async fn update_by_part(
        &self,
        parameters: &ItemParameters,
        path: &Path,
    ) -> Result<JsonValue> {
        let mut params = parameters.update_params();
        params.set("multipart", true);
        params.set("fileName", file_name(path));
        self.post("update", params).await?;

        self.add_by_part(path).await?;
        let mut commit_params = Params::new();
        if let Some(item_type) = parameters.get("type") {
            commit_params.set("type", item_type.clone());
        }
        let body = self.commit(true, commit_params).await?;
        self.resource.invalidate().await;
        Ok(body)
    }

    pub async fn delete_info(&self, info_file: Option<&str>) -> Result<JsonValue> {
        delete_info(self.client(), &self.resource.child("deleteInfo"), info_file).await
    }

    /// Status of the item or of one of its jobs
    ///
    /// `job_type` is one of `publish`, `generateFeatures`, `export` or
    /// `createService`.
    pub async fn status(&self, job_id: Option<&str>, job_type: Option<&str>) -> Result<JsonValue> {
        let params = Params::new()
            .with_opt("jobId", job_id)
            .with_opt("jobType", job_type);
        self.client()
            .get_json(&self.resource.child("status"), params)
            .await
    }

    /// Parts uploaded so far in a multipart upload
    pub async fn parts(&self) -> Result<JsonValue> {
        self.client()
            .get_json(&self.resource.child("parts"), Params::new())
            .await
    }

    /// Combine uploaded parts into the item's file
    ///
    /// With `wait` the item status is polled until it is no longer
    /// `partial` or `processing`, and the final status is returned. A
    /// status still pending after the last poll is a timeout.
    pub async fn commit(&self, wait: bool, extra: Params) -> Result<JsonValue> {
        let body = self.post("commit", extra).await?;
        if !wait {
            return Ok(body);
        }

        let mut polls = 0;
        loop {
            let status = self.status(None, None).await?;
            polls += 1;
            if !is_pending_status(&status_of(&status)) {
                return Ok(status);
            }
            if polls >= self.polling.max_polls {
                return Err(self.polling.gave_up(self.id(), &status));
            }
            tokio::time::sleep(self.polling.interval).await;
        }
    }

    /// Poll a publish or export job until it completes
    pub(crate) async fn wait_for_job(&self, job_id: &str, job_type: &str) -> Result<JsonValue> {
        let mut polls = 0;
        loop {
            let status = self.status(Some(job_id), Some(job_type)).await?;
            polls += 1;
            match status_of(&status).to_lowercase().as_str() {
                "completed" => return Ok(status),
                "failed" => {
                    warn!("{} job {} failed: {}", job_type, job_id, status);
                    return Err(Error::JobFailed {
                        job_id: job_id.to_string(),
                        status: status_of(&status),
                    });
                }
                _ if polls >= self.polling.max_polls => {
                    return Err(self.polling.gave_up(job_id, &status));
                }
                _ => tokio::time::sleep(self.polling.interval).await,
            }
        }
    }

    /// Upload one part of a multipart upload
    pub async fn add_part(&self, part_num: usize, part: UploadFile) -> Result<JsonValue> {
        let params = Params::new()
            .with("partNum", part_num)
            .with("itemType", "file");
        self.client()
            .post_multipart(
                &self.resource.child("addPart"),
                params,
                vec![part.with_field("file")],
            )
            .await
    }

    /// Upload a file in parts of [`PART_SIZE`] bytes, numbered from 1
    ///
    /// The parts still have to be committed.
    pub async fn add_by_part(&self, path: &Path) -> Result<Vec<JsonValue>> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let name = file_name(path);
        let mut file = tokio::fs::File::open(path).await?;
        let mut responses = Vec::new();
        let mut part_num = 1;

        loop {
            let mut chunk = Vec::with_capacity(PART_SIZE);
            (&mut file).take(PART_SIZE as u64).read_to_end(&mut chunk).await?;
            if chunk.is_empty() {
                break;
            }
            debug!("Uploading part {} of {} ({} bytes)", part_num, name, chunk.len());
            let part = UploadFile::new("file", name.clone(), chunk);
            responses.push(self.add_part(part_num, part).await?);
            part_num += 1;
        }

        info!("Uploaded {} in {} parts", name, responses.len());
        Ok(responses)
    }

    async fn post(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.client()
            .post_json(&self.resource.child(operation), params)
            .await
    }

    fn client(&self) -> &Arc<HttpClient> {
        self.resource.client()
    }
}

impl ResourceWrapper for UserItem {
    type Props = UserItemInfo;

    fn resource(&self) -> &Resource<UserItemInfo> {
        &self.resource
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub(crate) fn join<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

fn share_params<S: AsRef<str>>(groups: &[S], everyone: bool, org: bool) -> Params {
    let groups = join(groups);
    Params::new()
        .with("everyone", everyone)
        .with("org", org)
        .with_opt("groups", Some(groups).filter(|g| !g.is_empty()))
}

async fn delete_info(client: &HttpClient, url: &str, info_file: Option<&str>) -> Result<JsonValue> {
    let params = Params::new().with("infoFile", info_file.unwrap_or("metadata/metadata.xml"));
    client.post_json(url, params).await
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// `.../content` part of an item URL
fn content_root<'a>(url: &'a str, marker: &str) -> Result<&'a str> {
    url.find(marker)
        .map(|idx| &url[..idx])
        .ok_or_else(|| Error::resource(url, format!("not a content URL (missing {marker})")))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
