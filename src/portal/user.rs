//! A user's content (`/content/users/<username>`)

use super::item::{file_name, join, UserItem};
use super::types::{AddItemOptions, Folder, ItemParameters, PublishOptions, UserContent};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params, UploadFile};
use crate::pagination::{fetch_all, StartPaginator};
use crate::resource::{Loaded, Resource, ResourceWrapper};
use crate::types::{JsonObject, JsonValue};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Result of an export
#[derive(Debug)]
pub struct ExportedItem {
    pub job_id: String,
    pub item: UserItem,
}

/// A user's content folders and items
///
/// Item operations act on the current folder, which starts at the root.
#[derive(Debug)]
pub struct User {
    client: Arc<HttpClient>,
    resource: Resource<JsonObject>,
    url: String,
    location: String,
    current_folder: Folder,
}

impl User {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            resource: Resource::new(Arc::clone(&client), url.as_str()),
            client,
            location: url.clone(),
            url,
            current_folder: Folder::root(),
        }
    }

    /// Root listing of the user's content, loaded once
    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.resource.get().await
    }

    /// Root of the user's content
    pub fn root(&self) -> &str {
        &self.url
    }

    /// URL of the current folder
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn username(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or_default()
    }

    pub fn current_folder(&self) -> &Folder {
        &self.current_folder
    }

    /// One page of the current folder's listing
    pub async fn contents(&self, start: i64, num: u32) -> Result<UserContent> {
        let params = Params::new().with("start", start).with("num", num);
        let body = self.client.get_json(&self.location, params).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// The user's folders, root first
    pub async fn folders(&self) -> Result<Vec<Folder>> {
        let params = Params::new().with("start", 1).with("num", 100);
        let body = self.client.get_json(&self.url, params).await?;
        let listing: UserContent = serde_json::from_value(body)?;

        let mut folders = vec![Folder::root()];
        folders.extend(listing.folders);
        Ok(folders)
    }

    /// Change the current folder by title
    ///
    /// `None`, `/` and `root` select the root folder.
    pub async fn set_current_folder(&mut self, title: Option<&str>) -> Result<()> {
        let title = match title {
            None => None,
            Some(t) if t == "/" || t.eq_ignore_ascii_case("root") => None,
            Some(t) => Some(t),
        };

        let Some(title) = title else {
            self.location = self.url.clone();
            self.current_folder = Folder::root();
            return Ok(());
        };

        if self.current_folder.title.eq_ignore_ascii_case(title) {
            return Ok(());
        }

        let folder = self
            .folders()
            .await?
            .into_iter()
            .find(|f| !f.is_root() && f.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| {
                Error::invalid_argument("folder", format!("{} has no folder {title}", self.username()))
            })?;

        self.location = format!("{}/{}", self.url, folder.id.as_deref().unwrap_or_default());
        self.current_folder = folder;
        Ok(())
    }

    /// Every item of the current folder
    pub async fn items(&self) -> Result<Vec<UserItem>> {
        let records = fetch_all(
            &self.client,
            &self.location,
            Params::new(),
            StartPaginator::new(1, 100),
            "items",
        )
        .await?;

        let mut seen = HashSet::new();
        Ok(records
            .iter()
            .filter_map(|item| item.get("id").and_then(JsonValue::as_str))
            .filter(|id| seen.insert(id.to_string()))
            .map(|id| self.user_item(id))
            .collect())
    }

    /// Handle to an item of the current folder
    pub fn user_item(&self, item_id: &str) -> UserItem {
        UserItem::new(
            Arc::clone(&self.client),
            format!("{}/items/{item_id}", self.location),
        )
    }

    pub async fn add_relationship(
        &self,
        origin_item_id: &str,
        destination_item_id: &str,
        relationship_type: &str,
    ) -> Result<JsonValue> {
        let params = relationship_params(origin_item_id, destination_item_id, relationship_type);
        self.post_root("addRelationship", params).await
    }

    pub async fn delete_relationship(
        &self,
        origin_item_id: &str,
        destination_item_id: &str,
        relationship_type: &str,
    ) -> Result<JsonValue> {
        let params = relationship_params(origin_item_id, destination_item_id, relationship_type);
        self.post_root("deleteRelationship", params).await
    }

    /// Publish a hosted service from an item or an uploaded file
    ///
    /// Returns the new service item. With `wait` the publish job is polled
    /// until it completes.
    pub async fn publish_item(&self, options: &PublishOptions) -> Result<UserItem> {
        let file_type = options.validated_file_type()?;

        let mut params = Params::new()
            .with("fileType", file_type)
            .with("buildInitialCache", options.build_initial_cache)
            .with_opt("itemId", options.item_id.as_deref())
            .with_opt("outputType", options.output_type.as_deref());
        if let Some(parameters) = &options.publish_parameters {
            params.set_json("publishParameters", parameters)?;
        }
        if file_type == "csv" {
            params.set_opt("text", options.text.as_deref());
        }
        if options.overwrite {
            params.set("overwrite", true);
        }

        let url = format!("{}/publish", self.location);
        let body = match &options.file {
            Some(path) => {
                let file = UploadFile::from_path("file", path).await?;
                self.client.post_multipart(&url, params, vec![file]).await?
            }
            None => self.client.post_json(&url, params).await?,
        };

        let service = body
            .get("services")
            .and_then(JsonValue::as_array)
            .and_then(|services| services.first())
            .ok_or_else(|| Error::resource(&url, format!("nothing was published: {body}")))?;

        if let Some(err) = Error::from_envelope(service) {
            return Err(err);
        }

        let item_id = service
            .get("serviceItemId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::resource(&url, "publish response has no serviceItemId"))?;
        let item = self.user_item(item_id);

        if options.wait {
            let job_id = service
                .get("jobId")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            item.wait_for_job(job_id, "publish").await?;
        }
        Ok(item)
    }

    /// Export a service item to another format (Shapefile, CSV, ...)
    pub async fn export_item(
        &self,
        title: &str,
        item_id: &str,
        export_format: &str,
        tags: Option<&str>,
        snippet: Option<&str>,
        export_parameters: Option<&JsonValue>,
        wait: bool,
    ) -> Result<ExportedItem> {
        let mut params = Params::new()
            .with("title", title)
            .with("tags", tags.unwrap_or("export"))
            .with("itemId", item_id)
            .with("exportFormat", export_format)
            .with_opt("snippet", snippet);
        if let Some(parameters) = export_parameters {
            params.set_json("exportParameters", parameters)?;
        }

        let url = format!("{}/export", self.location);
        let body = self.client.post_json(&url, params).await?;
        let export_id = body
            .get("exportItemId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::resource(&url, "export response has no exportItemId"))?;
        let job_id = body
            .get("jobId")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        if let Some(folder_id) = self.current_folder.id.as_deref() {
            self.move_items(&[export_id], folder_id).await?;
        }

        let item = self.user_item(export_id);
        if wait {
            item.wait_for_job(&job_id, "export").await?;
        }
        Ok(ExportedItem { job_id, item })
    }

    /// Create an empty hosted feature service
    pub async fn create_service(
        &self,
        create_parameters: &JsonValue,
        description: Option<&str>,
        tags: Option<&str>,
        snippet: Option<&str>,
    ) -> Result<UserItem> {
        let mut params = Params::new()
            .with("outputType", "featureService")
            .with("tags", tags.unwrap_or("Feature Service"))
            .with_opt("snippet", snippet)
            .with_opt("description", description);
        params.set_json("createParameters", create_parameters)?;

        let url = format!("{}/createService", self.location);
        let body = self.client.post_json(&url, params).await?;
        let item_id = ["id", "serviceItemId"]
            .iter()
            .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
            .ok_or_else(|| Error::resource(&url, format!("service was not created: {body}")))?;
        Ok(self.user_item(item_id))
    }

    pub async fn create_folder(&self, title: &str) -> Result<JsonValue> {
        self.post_root("createFolder", Params::new().with("title", title))
            .await
    }

    /// Delete the current folder and its items, then return to the root
    pub async fn delete_folder(&mut self) -> Result<JsonValue> {
        if self.current_folder.is_root() {
            return Err(Error::invalid_argument(
                "folder",
                "the root folder cannot be deleted",
            ));
        }
        let body = self
            .client
            .post_json(&format!("{}/delete", self.location), Params::new())
            .await?;
        self.set_current_folder(None).await?;
        Ok(body)
    }

    pub async fn share_items<S: AsRef<str>>(
        &self,
        items: &[S],
        groups: &[S],
        everyone: bool,
        org: bool,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("items", join(items))
            .with("groups", join(groups))
            .with("everyone", everyone)
            .with("org", org);
        self.post_root("shareItems", params).await
    }

    pub async fn unshare_items<S: AsRef<str>>(&self, items: &[S], groups: &[S]) -> Result<JsonValue> {
        let params = Params::new()
            .with("items", join(items))
            .with("groups", join(groups));
        self.post_root("unshareItems", params).await
    }

    /// Move items to a folder id; `/` is the root folder
    pub async fn move_items<S: AsRef<str>>(&self, items: &[S], folder: &str) -> Result<JsonValue> {
        let params = Params::new()
            .with("items", join(items))
            .with("folder", folder);
        self.post_root("moveItems", params).await
    }

    pub async fn delete_items<S: AsRef<str>>(&self, items: &[S]) -> Result<JsonValue> {
        self.post_root("deleteItems", Params::new().with("items", join(items)))
            .await
    }

    /// Add an item to the current folder
    ///
    /// Booleans are sent JSON-encoded. A file upload is sent synchronously
    /// (`async=false`); with `multipart` the file goes up in parts and the
    /// item is committed and updated afterwards. The response must carry
    /// the new item's `id`.
    pub async fn add_item(
        &self,
        parameters: &ItemParameters,
        options: &AddItemOptions,
    ) -> Result<UserItem> {
        let location = match options.folder.as_deref() {
            Some(folder) if folder != "/" => format!("{}/{folder}", self.url),
            _ => self.location.clone(),
        };

        if options.multipart {
            let path = options.file.as_deref().ok_or_else(|| {
                Error::invalid_argument("file", "a multipart upload needs a file")
            })?;
            return self.add_item_by_part(&location, parameters, path).await;
        }

        let mut params = Params::new();
        params.extend_object(parameters.values());
        params
            .set("overwrite", options.overwrite)
            .set_opt("dataURL", options.data_url.as_deref())
            .set_opt("url", options.url.as_deref())
            .set_opt("text", options.text.as_deref())
            .set_opt("relationshipType", options.relationship_type.as_deref())
            .set_opt("originItemId", options.origin_item_id.as_deref())
            .set_opt("destinationItemId", options.destination_item_id.as_deref())
            .set_opt("serviceProxyParams", options.service_proxy_params.clone());

        let mut files = parameters.file_parts().await?;
        if let Some(path) = &options.file {
            files.push(UploadFile::from_path("file", path).await?);
            params.set("filename", file_name(path));
        }

        let url = format!("{location}/addItem");
        let body = if files.is_empty() {
            self.client.post_json(&url, params).await?
        } else {
            params.set("itemType", "file").set("async", false);
            self.client.post_multipart(&url, params, files).await?
        };

        let item_id = added_item_id(&url, &body)?;
        info!("Added item {}", item_id);
        Ok(UserItem::new(
            Arc::clone(&self.client),
            format!("{location}/items/{item_id}"),
        ))
    }

    /// addItem (multipart) → addPart × n → commit → update
    async fn add_item_by_part(
        &self,
        location: &str,
        parameters: &ItemParameters,
        path: &std::path::Path,
    ) -> Result<UserItem> {
        let name = file_name(path);
        let url = format!("{location}/addItem");
        let params = Params::new()
            .with("multipart", true)
            .with("filename", name.as_str());
        let body = self.client.post_json(&url, params).await?;
        let item_id = added_item_id(&url, &body)?;

        let item = UserItem::new(
            Arc::clone(&self.client),
            format!("{location}/items/{item_id}"),
        );
        item.add_by_part(path).await?;
        item.commit(true, Params::new()).await?;

        let update = parameters.clone().set("filename", name);
        item.update(&update, None, false).await?;
        Ok(item)
    }

    async fn post_root(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.client
            .post_json(&format!("{}/{operation}", self.url), params)
            .await
    }
}

fn relationship_params(origin: &str, destination: &str, relationship_type: &str) -> Params {
    Params::new()
        .with("originItemId", origin)
        .with("destinationItemId", destination)
        .with("relationshipType", relationship_type)
}

fn added_item_id(url: &str, body: &JsonValue) -> Result<String> {
    body.get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::resource(url, format!("cannot add the item: {body}")))
}

impl ResourceWrapper for User {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.resource
    }
}
