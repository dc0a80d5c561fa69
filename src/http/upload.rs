//! File parts for multipart uploads

use crate::error::{Error, Result};
use bytes::Bytes;
use std::path::Path;

/// A file sent as one part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Form field name (e.g. "file", "attachment", "thumbnail")
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// File content
    pub bytes: Bytes,
    /// MIME type of the content
    pub content_type: String,
}

impl UploadFile {
    /// Create an upload part from in-memory content
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name);
        Self {
            field: field.into(),
            file_name,
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Read an upload part from disk
    pub async fn from_path(field: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(field, file_name, bytes))
    }

    /// Override the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Rename the form field
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Size of the content in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the content is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn to_part(&self) -> Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.bytes.to_vec())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(Error::Http)
    }
}

/// Guess the content type of a file from its extension
///
/// Falls back to the Esri conventions: `.csv` is `text/csv`, `.sd` is
/// `File/sd`, anything else `File/<ext>`.
pub fn content_type_for(file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let known = match ext.as_str() {
        "json" | "geojson" => Some("application/json"),
        "xml" => Some("application/xml"),
        "zip" => Some("application/zip"),
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        "htm" | "html" => Some("text/html"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        "doc" => Some("application/msword"),
        _ => None,
    };

    match (known, ext.as_str()) {
        (Some(mime), _) => mime.to_string(),
        (None, "csv") => "text/csv".to_string(),
        (None, "sd") => "File/sd".to_string(),
        (None, ext) => format!("File/{ext}"),
    }
}
