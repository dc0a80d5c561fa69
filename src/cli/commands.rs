//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line access to ArcGIS Server, Portal and ArcGIS Online
#[derive(Parser, Debug)]
#[command(name = "arcrest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connection profile (YAML); anonymous access when omitted
    #[arg(short, long, global = true)]
    pub profile: Option<PathBuf>,

    /// Portal or organization URL, overriding the profile's org_url
    #[arg(long, global = true)]
    pub portal: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a token for the profile's credentials
    Token,

    /// Print the JSON description of any REST resource
    Info {
        /// Resource URL
        url: String,
    },

    /// Query a feature layer
    Query {
        /// Layer URL (`.../FeatureServer/0`)
        url: String,

        /// SQL where clause
        #[arg(short, long, default_value = "1=1")]
        r#where: String,

        /// Comma-separated output fields
        #[arg(long, default_value = "*")]
        out_fields: String,

        /// Skip geometries
        #[arg(long)]
        no_geometry: bool,

        /// Fetch every matching feature, past the layer's record limit
        #[arg(long)]
        all: bool,
    },

    /// Count the features of a layer
    Count {
        /// Layer URL
        url: String,

        /// SQL where clause
        #[arg(short, long, default_value = "1=1")]
        r#where: String,
    },

    /// Add features from a JSON file (feature array or feature set)
    AddFeatures {
        /// Layer URL
        url: String,

        /// Features file
        #[arg(long)]
        file: PathBuf,
    },

    /// Search the portal's items
    Search {
        /// Search query
        query: String,

        /// Restrict to an item type
        #[arg(short = 't', long = "type")]
        item_type: Option<String>,

        /// Results per page (max 100)
        #[arg(short, long, default_value = "10")]
        num: u32,

        /// Follow every page
        #[arg(long)]
        all: bool,
    },

    /// Find items by title
    FindItem {
        /// Item title
        title: String,

        /// Item types to match (repeatable)
        #[arg(short = 't', long = "type")]
        item_types: Vec<String>,

        /// Search the whole organization instead of the signed-in user
        #[arg(long)]
        org: bool,
    },

    /// List the services of an ArcGIS Server folder
    Services {
        /// Any URL on the server
        url: String,

        /// Folder to list
        #[arg(long)]
        folder: Option<String>,
    },

    /// Show a portal item, optionally saving its data
    Item {
        /// Item id
        id: String,

        /// Directory to save file data into
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON, one document per line
    Json,
    /// Indented JSON
    Pretty,
}
