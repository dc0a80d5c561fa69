//! Uploaded items of a service or of the server administration

use crate::error::Result;
use crate::http::{HttpClient, Params, UploadFile};
use crate::types::JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `.../uploads` endpoint
#[derive(Debug, Clone)]
pub struct Uploads {
    client: Arc<HttpClient>,
    url: String,
    file_field: &'static str,
}

impl Uploads {
    /// Uploads of a service; `/uploads` is appended when missing
    pub fn new(client: Arc<HttpClient>, url: &str) -> Self {
        let url = url.trim_end_matches('/');
        let url = if url.to_lowercase().ends_with("uploads") {
            url.to_string()
        } else {
            format!("{url}/uploads")
        };
        Self {
            client,
            url,
            file_field: "file",
        }
    }

    /// Uploads of the server administration (`/admin/uploads`)
    pub fn admin(client: Arc<HttpClient>, admin_url: &str) -> Self {
        Self {
            file_field: "itemFile",
            ..Self::new(client, admin_url)
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upload limits (`maxUploadFileSize`)
    pub async fn info(&self) -> Result<JsonValue> {
        self.client
            .get_json(&format!("{}/info", self.url), Params::new())
            .await
    }

    /// All uploaded items
    pub async fn list(&self) -> Result<JsonValue> {
        self.client.get_json(&self.url, Params::new()).await
    }

    /// Description of one uploaded item
    pub async fn item(&self, item_id: &str) -> Result<JsonValue> {
        self.client
            .get_json(&format!("{}/{item_id}", self.url), Params::new())
            .await
    }

    /// Upload a file; the response carries the new item id
    pub async fn upload(&self, file: UploadFile, description: Option<&str>) -> Result<JsonValue> {
        let params = Params::new().with_opt("description", description);
        self.client
            .post_multipart(
                &format!("{}/upload", self.url),
                params,
                vec![file.with_field(self.file_field)],
            )
            .await
    }

    /// Delete an uploaded item
    pub async fn delete(&self, item_id: &str) -> Result<JsonValue> {
        self.client
            .post_json(&format!("{}/{item_id}/delete", self.url), Params::new())
            .await
    }

    /// Download an uploaded item into `dir`
    pub async fn download(&self, item_id: &str, dir: &Path) -> Result<PathBuf> {
        self.client
            .download(
                &format!("{}/{item_id}/download", self.url),
                Params::new(),
                dir,
                None,
            )
            .await
    }
}
