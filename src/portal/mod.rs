//! ArcGIS Online / Portal sharing API
//!
//! ```text
//! Administration (/sharing/rest)
//!   ├── portal_self, search, find_item, hosting_servers
//!   ├── Community (/community)
//!   │     ├── CommunityUser (/users/<name>) ── update, disable, delete
//!   │     └── CommunityGroup (/groups/<id>)
//!   └── Content (/content)
//!         ├── User (/users/<name>[/<folder>]) ── UserItem
//!         ├── Item (/items/<id>) ─────────────── user_item()
//!         ├── Group (/groups/<id>)
//!         └── FeatureContent (/features)
//! ```

mod administration;
mod community;
mod content;
mod item;
mod types;
mod user;

pub use administration::{organization_url, Administration, HostingServer, PortalSelf};
pub use community::{
    Community, CommunityGroup, CommunityGroups, CommunityUser, CommunityUserInfo, CommunityUsers,
    GroupInfo, GroupOptions, UserUpdate,
};
pub use content::{Content, FeatureContent, Group};
pub use item::{Item, ItemData, ItemInfo, UserItem, UserItemInfo};
pub use types::{
    is_file_item_type, AddItemOptions, FeatureSource, Folder, ItemParameters, JobPolling,
    MetadataFormat, PublishOptions, SearchParams, SearchResults, UserContent, FILE_ITEM_TYPES,
    JOB_MAX_POLLS, JOB_POLL_INTERVAL, PART_SIZE, PUBLISH_FILE_TYPES, READ_ONLY_ITEM_KEYS,
};
pub use user::{ExportedItem, User};
