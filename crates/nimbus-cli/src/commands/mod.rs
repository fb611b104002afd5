//! Command implementations for the CLI.

mod config;
mod history;
mod import;
mod photos;
mod weather;

pub use config::cmd_config;
pub use history::{HistoryArgs, cmd_history};
pub use import::cmd_import;
pub use photos::cmd_photos;
pub use weather::{WeatherArgs, cmd_weather};
