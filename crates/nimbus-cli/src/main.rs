//! Command-line interface for the Nimbus weather companion.
//!
//! Reads and writes the same database and configuration file as
//! `nimbus-service`, so readings taken here show up in the app and the
//! other way round.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `weather` | Fetch current weather and record it in the history |
//! | `history` | Show recorded history or a summary for a period |
//! | `photos` | List, capture, export or delete gallery photos |
//! | `import` | Import a document exported from the browser app |
//! | `config` | Show or initialize the configuration file |

mod cli;
mod commands;
mod format;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{
    HistoryArgs, WeatherArgs, cmd_config, cmd_history, cmd_import, cmd_photos, cmd_weather,
};
use format::FormatOptions;
use util::{load_config, open_store};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet wins over verbose; otherwise honor RUST_LOG
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = FormatOptions::new(cli.no_color);
    let output = cli.output.as_ref();
    let database = cli.database.as_ref();

    match cli.command {
        Commands::Config { action } => cmd_config(action, cli.config.as_ref(), output),
        Commands::Weather {
            lat,
            lon,
            simulate,
            no_record,
            format,
        } => {
            let config = load_config(cli.config.as_ref())?;
            cmd_weather(WeatherArgs {
                lat,
                lon,
                simulate,
                no_record,
                format,
                output,
                database,
                config: &config,
                opts: &opts,
            })
            .await
        }
        Commands::History {
            period,
            summary,
            format,
        } => {
            let config = load_config(cli.config.as_ref())?;
            cmd_history(HistoryArgs {
                period,
                summary,
                format,
                output,
                database,
                config: &config,
                opts: &opts,
            })
        }
        Commands::Photos { action } => {
            let config = load_config(cli.config.as_ref())?;
            let store = open_store(database, &config)?;
            cmd_photos(&store, action, output, cli.quiet, &opts).await
        }
        Commands::Import { key, file } => {
            let config = load_config(cli.config.as_ref())?;
            let store = open_store(database, &config)?;
            cmd_import(&store, key, &file, cli.quiet)
        }
    }
}
