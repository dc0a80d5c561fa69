//! Shared ArcGIS data types
//!
//! Geometries, features, edit results, query filters and helpers used by
//! the server, portal and geometry service wrappers.

mod feature;
mod filters;
mod find;
mod geometry;
mod util;

pub use feature::{EditError, EditResult, EditResults, Feature, FeatureSet, Field};
pub use filters::{
    GeometryFilter, LayerDefinition, LayerDefinitionFilter, Statistic, StatisticFilter,
    TimeFilter,
};
pub use find::find_item_query;
pub use geometry::{Envelope, Geometry, Multipoint, Point, Polygon, Polyline, SpatialReference};
pub use util::{from_epoch_ms, join_list, split_into_bins, to_epoch_ms};

#[cfg(test)]
mod tests;
