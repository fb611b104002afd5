//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use nimbus_core::FacingMode;
use nimbus_store::DocumentKey;
use nimbus_types::Period;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "nimbus")]
#[command(author, version, about = "Offline-first weather companion", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Configuration file (shared with nimbus-service)
    #[arg(short, long, global = true, env = "NIMBUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file (overrides storage.path)
    #[arg(long, global = true, env = "NIMBUS_DB")]
    pub database: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch current weather and record it in the history
    Weather {
        /// Latitude in decimal degrees (defaults to location.latitude)
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude in decimal degrees (defaults to location.longitude)
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Use the local simulator instead of the configured provider
        #[arg(long)]
        simulate: bool,

        /// Do not add the reading to the history
        #[arg(long)]
        no_record: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show recorded weather history
    History {
        /// Time window (day, week, month)
        #[arg(short, long, default_value = "day")]
        period: Period,

        /// Show aggregates instead of individual entries
        #[arg(short, long)]
        summary: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage the photo gallery
    Photos {
        #[command(subcommand)]
        action: PhotoAction,
    },

    /// Import a document exported from the browser app
    Import {
        /// Storage key (weatherHistory, photoGallery, weatherData, lastWeatherData)
        key: DocumentKey,

        /// JSON file holding the exported value
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum PhotoAction {
    /// List photos, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Capture a still from the test-pattern camera
    Capture {
        /// Camera facing (user, environment)
        #[arg(long, default_value = "environment")]
        facing: FacingMode,

        /// Frame width in pixels
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "480")]
        height: u32,
    },

    /// Write a photo's image to a file
    Export {
        /// Photo identifier
        id: String,

        /// Destination file
        path: PathBuf,
    },

    /// Delete a photo
    Delete {
        /// Photo identifier
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show config file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
