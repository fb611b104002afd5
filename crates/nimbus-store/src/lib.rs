//! Local persistence for Nimbus.
//!
//! This crate stores the four documents the weather app keeps between
//! sessions in a single SQLite database:
//!
//! - `weatherHistory`: rolling list of recorded samples, newest first
//! - `photoGallery`: captured stills, newest first
//! - `weatherData`: the most recent provider response
//! - `lastWeatherData`: the last successful provider response, used as the
//!   offline fallback
//!
//! Documents are stored as versioned JSON. Values written by older releases
//! (or imported from the browser app's local storage) are upgraded lazily on
//! first read.
//!
//! # Example
//!
//! ```no_run
//! use nimbus_store::Store;
//!
//! let store = Store::open_default()?;
//! for entry in store.read_history()? {
//!     println!("{} {:.1}°C {}", entry.timestamp, entry.temperature, entry.condition);
//! }
//! # Ok::<(), nimbus_store::Error>(())
//! ```

mod error;
mod models;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{CachedWeather, DocumentInfo, DocumentKey};
pub use schema::{DOCUMENT_VERSION, LEGACY_DOCUMENT_VERSION};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/nimbus/data.db`
/// - macOS: `~/Library/Application Support/nimbus/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\nimbus\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("nimbus")
        .join("data.db")
}
