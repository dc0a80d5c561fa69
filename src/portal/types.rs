//! Parameter and result types of the sharing API

use crate::error::{Error, Result};
use crate::http::{Params, UploadFile};
use crate::types::{JsonObject, JsonValue, SortOrder};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Interval between status checks of asynchronous portal jobs
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status checks made before a portal job is given up on (30 minutes)
pub const JOB_MAX_POLLS: u32 = 900;

/// Size of each part of a multipart item upload
pub const PART_SIZE: usize = 10_000_000;

/// Item keys the server owns; they are never sent with an update
pub const READ_ONLY_ITEM_KEYS: &[&str] = &[
    "id",
    "owner",
    "size",
    "numComments",
    "numRatings",
    "avgRating",
    "numViews",
    "overwrite",
];

/// File types accepted by `publish`
pub const PUBLISH_FILE_TYPES: &[&str] = &[
    "serviceDefinition",
    "shapefile",
    "csv",
    "tilePackage",
    "featureService",
    "featureCollection",
    "fileGeodatabase",
    "geojson",
    "scenePackage",
];

/// Item types whose `/data` is a file rather than a JSON document
pub const FILE_ITEM_TYPES: &[&str] = &[
    "Shapefile",
    "CityEngine Web Scene",
    "Web Scene",
    "KML",
    "Code Sample",
    "Code Attachment",
    "Operations Dashboard Add In",
    "CSV",
    "CSV Collection",
    "CAD Drawing",
    "Service Definition",
    "Microsoft Word",
    "Microsoft Powerpoint",
    "Microsoft Excel",
    "PDF",
    "Image",
    "Visio Document",
    "iWork Keynote",
    "iWork Pages",
    "iWork Numbers",
    "Map Document",
    "Map Package",
    "Basemap Package",
    "Tile Package",
    "Project Package",
    "Task File",
    "ArcPad Package",
    "Explorer Map",
    "Globe Document",
    "Scene Document",
    "Published Map",
    "Map Template",
    "Windows Mobile Package",
    "Pro Map",
    "Layout",
    "Layer",
    "Layer Package",
    "File Geodatabase",
    "Explorer Layer",
    "Geoprocessing Package",
    "Geoprocessing Sample",
    "Locator Package",
    "Rule Package",
    "Workflow Manager Package",
    "Desktop Application",
    "Desktop Application Template",
    "Desktop Add In",
    "Explorer Add In",
    "ArcGIS Desktop Add-In",
    "ArcGIS Explorer Add-In",
    "ArcGIS Explorer application configuration",
    "ArcGIS Explorer document",
];

/// Check if an item of this type downloads as a file
pub fn is_file_item_type(item_type: &str) -> bool {
    FILE_ITEM_TYPES.contains(&item_type)
}

// ============================================================================
// Search
// ============================================================================

/// Parameters of a portal item search
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Content type filter (`t`)
    pub item_type: Option<String>,
    pub focus: Option<String>,
    /// `minx,miny,maxx,maxy` in WGS84
    pub bbox: Option<String>,
    /// 1-based index of the first result
    pub start: i64,
    /// Results per page, at most 100
    pub num: u32,
    pub sort_field: Option<String>,
    pub sort_order: SortOrder,
    /// Restrict results to what the caller may see
    pub restrict: bool,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            item_type: None,
            focus: None,
            bbox: None,
            start: 1,
            num: 10,
            sort_field: None,
            sort_order: SortOrder::Asc,
            restrict: true,
        }
    }

    #[must_use]
    pub fn item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    #[must_use]
    pub fn focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    #[must_use]
    pub fn bbox(mut self, bbox: impl Into<String>) -> Self {
        self.bbox = Some(bbox.into());
        self
    }

    #[must_use]
    pub fn page(mut self, start: i64, num: u32) -> Self {
        self.start = start;
        self.num = num.min(100);
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = order;
        self
    }

    #[must_use]
    pub fn restrict(mut self, restrict: bool) -> Self {
        self.restrict = restrict;
        self
    }

    /// Request parameters without the paging keys
    pub(crate) fn filter_params(&self) -> Params {
        Params::new()
            .with("q", self.query.as_str())
            .with("sortOrder", self.sort_order.as_str())
            .with("restrict", self.restrict)
            .with_opt("t", self.item_type.as_deref())
            .with_opt("focus", self.focus.as_deref())
            .with_opt("bbox", self.bbox.as_deref())
            .with_opt("sortField", self.sort_field.as_deref())
    }

    pub(crate) fn to_params(&self) -> Params {
        self.filter_params()
            .with("start", self.start)
            .with("num", self.num)
    }
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub num: i64,
    /// `-1` on the last page
    #[serde(default = "last_page")]
    pub next_start: i64,
    #[serde(default)]
    pub results: Vec<JsonValue>,
}

fn last_page() -> i64 {
    -1
}

// ============================================================================
// Items
// ============================================================================

/// Metadata export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    Fgdc,
    Inspire,
    Iso19139,
    Iso19139_3_2,
    Iso19115,
    ArcGis,
    /// The organization's default format
    #[default]
    Default,
}

impl MetadataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fgdc => "fgdc",
            Self::Inspire => "inspire",
            Self::Iso19139 => "iso19139",
            Self::Iso19139_3_2 => "iso19139-3.2",
            Self::Iso19115 => "iso19115",
            Self::ArcGis => "arcgis",
            Self::Default => "default",
        }
    }

    /// Value of the `format` parameter; the default format sends nothing
    pub(crate) fn param(&self) -> &'static str {
        match self {
            Self::Default => "",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fgdc" => Ok(Self::Fgdc),
            "inspire" => Ok(Self::Inspire),
            "iso19139" => Ok(Self::Iso19139),
            "iso19139-3.2" => Ok(Self::Iso19139_3_2),
            "iso19115" => Ok(Self::Iso19115),
            "arcgis" => Ok(Self::ArcGis),
            "default" => Ok(Self::Default),
            other => Err(Error::invalid_argument(
                "format",
                format!("unsupported metadata format: {other}"),
            )),
        }
    }
}

/// Properties of an item to add or update
///
/// Plain properties travel as form fields. Thumbnails and metadata are file
/// paths sent as multipart parts.
#[derive(Debug, Clone, Default)]
pub struct ItemParameters {
    values: JsonObject,
    pub thumbnail: Option<PathBuf>,
    pub large_thumbnail: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
}

impl ItemParameters {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(self, title: impl Into<String>) -> Self {
        self.set("title", title.into())
    }

    #[must_use]
    pub fn item_type(self, item_type: impl Into<String>) -> Self {
        self.set("type", item_type.into())
    }

    /// Tags, sent comma separated
    #[must_use]
    pub fn tags<S: AsRef<str>>(self, tags: &[S]) -> Self {
        let joined = tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        self.set("tags", joined)
    }

    #[must_use]
    pub fn snippet(self, snippet: impl Into<String>) -> Self {
        self.set("snippet", snippet.into())
    }

    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        self.set("description", description.into())
    }

    #[must_use]
    pub fn thumbnail(mut self, path: impl Into<PathBuf>) -> Self {
        self.thumbnail = Some(path.into());
        self
    }

    #[must_use]
    pub fn large_thumbnail(mut self, path: impl Into<PathBuf>) -> Self {
        self.large_thumbnail = Some(path.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata = Some(path.into());
        self
    }

    /// Set any other item property
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    pub fn values(&self) -> &JsonObject {
        &self.values
    }

    /// Form fields for an update, without server-owned keys
    pub(crate) fn update_params(&self) -> Params {
        let mut params = Params::new();
        for (key, value) in &self.values {
            if !READ_ONLY_ITEM_KEYS.contains(&key.as_str()) {
                params.set(key.as_str(), value.clone());
            }
        }
        params
    }

    /// Thumbnail and metadata files as multipart parts
    pub(crate) async fn file_parts(&self) -> Result<Vec<UploadFile>> {
        let mut parts = Vec::new();
        if let Some(path) = &self.thumbnail {
            parts.push(UploadFile::from_path("thumbnail", path).await?);
        }
        if let Some(path) = &self.large_thumbnail {
            parts.push(UploadFile::from_path("largeThumbnail", path).await?);
        }
        if let Some(path) = &self.metadata {
            parts.push(metadata_part(path).await?);
        }
        Ok(parts)
    }
}

/// The server only accepts metadata uploaded as `metadata.xml`
async fn metadata_part(path: &Path) -> Result<UploadFile> {
    let part = UploadFile::from_path("metadata", path).await?;
    Ok(UploadFile::new("metadata", "metadata.xml", part.bytes).with_content_type("text/xml"))
}

// ============================================================================
// User content
// ============================================================================

/// A folder of a user's content
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// `None` for the root folder
    pub id: Option<String>,
    pub title: String,
    pub created: Option<i64>,
    pub username: Option<String>,
}

impl Folder {
    /// The user's root folder
    pub fn root() -> Self {
        Self {
            id: None,
            title: "root".to_string(),
            created: None,
            username: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id.is_none()
    }
}

/// One page of a user's content listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContent {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub num: i64,
    #[serde(default = "last_page")]
    pub next_start: i64,
    pub current_folder: Option<Folder>,
    #[serde(default)]
    pub items: Vec<JsonObject>,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// Where feature content comes from
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSource {
    /// An item already stored in the portal
    Item(String),
    /// CSV text
    Text(String),
    /// A local CSV or zipped shapefile
    File(PathBuf),
}

/// Options of `User::add_item`
#[derive(Debug, Clone, Default)]
pub struct AddItemOptions {
    /// Local file holding the item's data
    pub file: Option<PathBuf>,
    pub overwrite: bool,
    pub folder: Option<String>,
    pub data_url: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub relationship_type: Option<String>,
    pub origin_item_id: Option<String>,
    pub destination_item_id: Option<String>,
    pub service_proxy_params: Option<JsonValue>,
    /// Upload the file in parts of [`PART_SIZE`]
    pub multipart: bool,
}

/// Options of `User::publish_item`
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub file_type: String,
    pub publish_parameters: Option<JsonValue>,
    pub item_id: Option<String>,
    pub file: Option<PathBuf>,
    /// CSV content, only used with the `csv` file type
    pub text: Option<String>,
    pub output_type: Option<String>,
    pub build_initial_cache: bool,
    pub overwrite: bool,
    /// Poll the publish job until it completes
    pub wait: bool,
}

impl PublishOptions {
    pub fn new(file_type: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            publish_parameters: None,
            item_id: None,
            file: None,
            text: None,
            output_type: None,
            build_initial_cache: false,
            overwrite: false,
            wait: false,
        }
    }

    #[must_use]
    pub fn item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    #[must_use]
    pub fn publish_parameters(mut self, parameters: JsonValue) -> Self {
        self.publish_parameters = Some(parameters);
        self
    }

    #[must_use]
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Canonical spelling of the file type, if it can be published
    pub(crate) fn validated_file_type(&self) -> Result<&'static str> {
        PUBLISH_FILE_TYPES
            .iter()
            .find(|t| t.eq_ignore_ascii_case(&self.file_type))
            .copied()
            .ok_or_else(|| {
                Error::invalid_argument(
                    "file_type",
                    format!("cannot publish file type {}", self.file_type),
                )
            })
    }
}

/// Status values that mean an item job is still running
/// How asynchronous portal jobs (publish, export, commit) are polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPolling {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for JobPolling {
    fn default() -> Self {
        Self::new(JOB_POLL_INTERVAL, JOB_MAX_POLLS)
    }
}

impl JobPolling {
    /// At least one status check is always made
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls: max_polls.max(1),
        }
    }

    /// Longest time a job is waited for
    pub fn timeout(&self) -> Duration {
        self.interval * self.max_polls
    }

    pub(crate) fn gave_up(&self, job: &str, status: &JsonValue) -> Error {
        warn!(
            "Gave up on job {} after {} status checks, last status '{}'",
            job,
            self.max_polls,
            status_of(status)
        );
        Error::Timeout {
            timeout_ms: u64::try_from(self.timeout().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub(crate) fn is_pending_status(status: &str) -> bool {
    matches!(status.to_lowercase().as_str(), "partial" | "processing")
}

/// Status string of a status document
pub(crate) fn status_of(body: &JsonValue) -> String {
    body.get("status")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}
