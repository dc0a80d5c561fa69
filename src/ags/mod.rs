//! ArcGIS Server REST services
//!
//! ```text
//! Server ──services()──► ServiceHandle::Feature(FeatureService)
//!                              │
//!                              ├──layer(id)──► FeatureLayer ──► query / edits / attachments
//!                              └──group_layer(id)──► GroupLayer ──► sub_layers()
//!
//! Dynamic layer queries take a [`DynamicLayer`] whose [`LayerSource`] is a
//! service layer or a workspace [`DataSource`].
//! ```

mod dynamic;
mod feature_service;
mod layer;
mod server;
mod uploads;

pub use dynamic::{DataSource, DynamicLayer, JoinType, LayerSource};
pub use feature_service::{FeatureService, FeatureServiceInfo, LayerRef, ServiceQuery};
pub use layer::{
    DeleteFeatures, FeatureLayer, GroupLayer, LayerInfo, Query, QueryResult, RasterLayer,
    RelatedRecordsQuery, Relationship, TableLayer, MAX_ADD_CHUNK,
};
pub use server::{
    server_base_url, validate_url, GenericService, Server, ServerInfo, ServiceEntry, ServiceHandle,
    ROOT_FOLDER,
};
pub use uploads::Uploads;
