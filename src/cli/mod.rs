//! CLI module
//!
//! # Commands
//!
//! - `token` - Print a token for the profile's credentials
//! - `info` - Print any REST resource
//! - `query` / `count` - Query a feature layer
//! - `add-features` - Add features from a JSON file
//! - `search` / `find-item` - Search portal items
//! - `services` - List the services of a server folder
//! - `item` - Show a portal item

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
