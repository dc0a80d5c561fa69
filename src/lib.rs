// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # arcrest
//!
//! Typed async bindings for the ArcGIS REST API.
//!
//! ## Features
//!
//! - **Security handlers**: pre-issued tokens, portal and server logins,
//!   federated server tokens and OAuth app logins, cached until expiry
//! - **Feature services**: query with geometry, time and statistic filters,
//!   chunked edits, attachments
//! - **Server administration**: folders, service start/stop, uploads
//! - **Portal content**: search, items, users, folders, publishing
//! - **Geometry and GeoEnrichment services**
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arcrest::ags::{FeatureLayer, Query};
//! use arcrest::config::ConnectionProfile;
//!
//! #[tokio::main]
//! async fn main() -> arcrest::Result<()> {
//!     let client = ConnectionProfile::from_file("profile.yaml")?.build_client()?;
//!     let layer = FeatureLayer::new(
//!         client,
//!         "https://services.arcgis.com/org/arcgis/rest/services/Parcels/FeatureServer/0",
//!     );
//!
//!     let count = layer.query_count(&Query::new().where_clause("ACRES > 5")).await?;
//!     println!("{count} parcels");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ags      manage_ags     portal      geometry_service enrichment │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ Resource<T> (lazy JSON properties)
//! ┌──────────┬───────────┬───────┴───────┬───────────────────────────┐
//! │   Auth   │   HTTP    │   Paginate    │   Common                  │
//! ├──────────┼───────────┼───────────────┼───────────────────────────┤
//! │ Token    │ GET/POST  │ Offset        │ Geometry                  │
//! │ Portal   │ Multipart │ nextStart     │ Features                  │
//! │ Server   │ Retry     │               │ Filters                   │
//! │ OAuth    │ Rate Limit│               │                           │
//! └──────────┴───────────┴───────────────┴───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Security handlers and token management
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Lazily loaded REST resources
pub mod resource;

/// Paging through result sets
pub mod pagination;

/// Geometries, features and query filters
pub mod common;

/// ArcGIS Server services (feature services, layers, uploads)
pub mod ags;

/// Geometry service operations
pub mod geometry_service;

/// ArcGIS Server administration
pub mod manage_ags;

/// Portal / ArcGIS Online sharing API
pub mod portal;

/// GeoEnrichment service
pub mod enrichment;

/// Connection profiles
pub mod config;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
