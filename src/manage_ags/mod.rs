//! ArcGIS Server administration (`/admin`)
//!
//! Requires an authenticated client; see [`crate::ags::Server::admin`].

mod administration;
mod services;

pub use administration::AgsAdministration;
pub use services::{
    AdminServiceEntry, AgsService, AgsServiceInfo, Services, ServicesInfo, ADMIN_ROOT_FOLDER,
    FINDABLE_SERVICE_TYPES,
};
