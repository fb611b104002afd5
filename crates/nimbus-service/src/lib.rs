//! HTTP REST API and offline cache worker endpoints for Nimbus.
//!
//! This crate provides a service that:
//! - Runs the weather app headless: fetches weather for the configured or
//!   reported location, records history and keeps the photo gallery
//! - Refreshes weather on a schedule while a client is visible
//! - Exposes a REST API for weather, history and photos
//! - Routes requests through the offline cache worker
//! - Pushes app events and offline status to WebSocket clients
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/weather` - Current weather view
//! - `POST /api/weather/refresh` - Fetch weather now
//! - `PUT /api/location` - Report a position
//! - `PUT /api/visibility` - Report client visibility
//! - `GET /api/history?period=day|week|month` - History entries
//! - `GET /api/history/summary?period=...` - History aggregates
//! - `GET /api/photos`, `POST /api/photos`, `DELETE /api/photos/{id}` - Gallery
//! - `GET /sw/fetch?url=...&mode=navigate|cors` - Fetch through the cache worker
//! - `POST /sw/message` - Post a message to the cache worker
//! - `GET /sw/status` - Cache worker lifecycle and cache inventory
//! - `WS /api/ws` - Real-time event stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/nimbus/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/nimbus/data.db"
//!
//! [weather]
//! provider = "http"
//! api_key = "your-api-key"
//! refresh_interval = 300
//!
//! [location]
//! latitude = 59.33
//! longitude = 18.06
//!
//! [history]
//! min_interval = 300
//! retention_days = 30
//! max_entries = 30
//!
//! [worker]
//! origin = "http://127.0.0.1:8080/"
//! skip_waiting = true
//! ```

pub mod api;
pub mod config;
pub mod refresher;
pub mod state;
pub mod ws;

pub use config::{
    Config, ConfigError, HistoryConfig, LocationConfig, ProviderKind, ServerConfig, StorageConfig,
    ValidationError, WeatherConfig, WorkerSettings,
};
pub use refresher::Refresher;
pub use state::{AppState, ServiceEvent, StartupError};
