//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nimbus_core::{AppOptions, GeoOptions, HistoryPolicy};
use nimbus_types::{DEFAULT_API_HOST, Location};
use nimbus_worker::{WorkerConfig, default_manifest};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Weather provider settings.
    pub weather: WeatherConfig,
    /// Fixed position and movement threshold.
    pub location: LocationConfig,
    /// History recording thresholds.
    pub history: HistoryConfig,
    /// Offline cache worker.
    pub worker: WorkerSettings,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// ```
    /// use nimbus_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.weather.validate());
        errors.extend(self.location.validate());
        errors.extend(self.history.validate());
        errors.extend(self.worker.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Component options derived from this configuration.
    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            history: self.history.policy(),
            location_threshold: self.location.change_threshold,
            geo: GeoOptions {
                timeout: Duration::from_secs(self.location.geo_timeout),
                ..GeoOptions::default()
            },
            refresh_interval: Duration::from_secs(self.weather.refresh_interval),
            ..AppOptions::default()
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        match self.bind.rsplit_once(':') {
            _ if self.bind.is_empty() => {
                errors.push(ValidationError::new(
                    "server.bind",
                    "bind address cannot be empty",
                ));
            }
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: nimbus_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }
        errors
    }
}

/// Which weather source to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Locally generated readings; needs no network or key.
    #[default]
    Simulator,
    /// The realtime weather HTTP API.
    Http,
}

/// Minimum scheduled refresh interval in seconds.
pub const MIN_REFRESH_INTERVAL: u64 = 60;
/// Maximum scheduled refresh interval in seconds (1 day).
pub const MAX_REFRESH_INTERVAL: u64 = 86_400;

/// Weather provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub provider: ProviderKind,
    /// Realtime endpoint for the HTTP provider.
    pub base_url: String,
    /// API key for the HTTP provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Seconds between scheduled refreshes while visible.
    pub refresh_interval: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: nimbus_core::provider::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            refresh_interval: 300,
        }
    }
}

impl WeatherConfig {
    /// Validate weather configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.provider == ProviderKind::Http {
            if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
                errors.push(ValidationError::new(
                    "weather.base_url",
                    format!("'{}' is not an http(s) URL", self.base_url),
                ));
            }
            if self.api_key.as_deref().is_none_or(str::is_empty) {
                errors.push(ValidationError::new(
                    "weather.api_key",
                    "api key is required for the http provider",
                ));
            }
        }

        if self.refresh_interval < MIN_REFRESH_INTERVAL {
            errors.push(ValidationError::new(
                "weather.refresh_interval",
                format!(
                    "refresh interval {} is too short (minimum {} seconds)",
                    self.refresh_interval, MIN_REFRESH_INTERVAL
                ),
            ));
        } else if self.refresh_interval > MAX_REFRESH_INTERVAL {
            errors.push(ValidationError::new(
                "weather.refresh_interval",
                format!(
                    "refresh interval {} is too long (maximum {} seconds / 1 day)",
                    self.refresh_interval, MAX_REFRESH_INTERVAL
                ),
            ));
        }

        errors
    }
}

/// Location configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed latitude reported to the app. Requires `longitude`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Fixed longitude reported to the app. Requires `latitude`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Minimum coordinate change, in degrees, that triggers a new fetch.
    pub change_threshold: f64,
    /// Seconds to wait for a position fix.
    pub geo_timeout: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            change_threshold: nimbus_core::location::DEFAULT_CHANGE_THRESHOLD,
            geo_timeout: nimbus_core::location::DEFAULT_GEO_TIMEOUT.as_secs(),
        }
    }
}

impl LocationConfig {
    /// The configured position, if both coordinates are set and valid.
    pub fn location(&self) -> Option<Location> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Location::new(lat, lon).ok(),
            _ => None,
        }
    }

    /// Validate location configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                if let Err(e) = Location::new(lat, lon) {
                    errors.push(ValidationError::new("location", e.to_string()));
                }
            }
            (Some(_), None) => errors.push(ValidationError::new(
                "location.longitude",
                "longitude is required when latitude is set",
            )),
            (None, Some(_)) => errors.push(ValidationError::new(
                "location.latitude",
                "latitude is required when longitude is set",
            )),
            (None, None) => {}
        }

        if !(self.change_threshold.is_finite() && self.change_threshold >= 0.0) {
            errors.push(ValidationError::new(
                "location.change_threshold",
                "change threshold must be a non-negative number",
            ));
        }
        if self.geo_timeout == 0 {
            errors.push(ValidationError::new(
                "location.geo_timeout",
                "geolocation timeout must be at least 1 second",
            ));
        }

        errors
    }
}

/// History configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Seconds that must pass before an unchanged reading is recorded again.
    pub min_interval: u64,
    /// Days an entry is kept.
    pub retention_days: u32,
    /// Maximum number of entries kept.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let policy = HistoryPolicy::default();
        Self {
            min_interval: policy.min_interval.whole_seconds().unsigned_abs(),
            retention_days: policy.retention.whole_days().unsigned_abs() as u32,
            max_entries: policy.max_entries,
        }
    }
}

impl HistoryConfig {
    pub fn policy(&self) -> HistoryPolicy {
        HistoryPolicy {
            min_interval: time::Duration::seconds(self.min_interval.min(i64::MAX as u64) as i64),
            retention: time::Duration::days(i64::from(self.retention_days)),
            max_entries: self.max_entries,
        }
    }

    /// Validate history configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.retention_days == 0 {
            errors.push(ValidationError::new(
                "history.retention_days",
                "retention must be at least 1 day",
            ));
        }
        if self.max_entries == 0 {
            errors.push(ValidationError::new(
                "history.max_entries",
                "max entries must be at least 1",
            ));
        }
        errors
    }
}

/// Offline cache worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Whether the `/sw/*` endpoints are served.
    pub enabled: bool,
    /// Origin the app shell is served from.
    pub origin: String,
    /// Hosts whose requests are treated as weather API calls.
    pub api_hosts: Vec<String>,
    /// Assets cached on install, relative to `origin`.
    pub manifest: Vec<String>,
    /// Activate immediately after install.
    pub skip_waiting: bool,
    /// Network timeout in seconds.
    pub timeout: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: "http://127.0.0.1:8080/".to_string(),
            api_hosts: vec![DEFAULT_API_HOST.to_string()],
            manifest: default_manifest(),
            skip_waiting: true,
            timeout: 10,
        }
    }
}

impl WorkerSettings {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            origin: self.origin.clone(),
            api_hosts: self.api_hosts.clone(),
            manifest: self.manifest.clone(),
            skip_waiting: self.skip_waiting,
        }
    }

    /// Validate worker configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if nimbus_worker::resolve_url(&self.origin, "./").is_err() {
            errors.push(ValidationError::new(
                "worker.origin",
                format!("invalid origin '{}': expected scheme://host", self.origin),
            ));
        }
        for (i, host) in self.api_hosts.iter().enumerate() {
            if host.trim().is_empty() || host.contains('/') {
                errors.push(ValidationError::new(
                    format!("worker.api_hosts[{}]", i),
                    format!("'{}' is not a host name", host),
                ));
            }
        }
        if self.timeout == 0 {
            errors.push(ValidationError::new(
                "worker.timeout",
                "timeout must be at least 1 second",
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `worker.api_hosts[0]`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nimbus")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(config: &Config) -> Vec<ValidationError> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors,
            Err(e) => panic!("unexpected error: {e}"),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.weather.provider, ProviderKind::Simulator);
        assert_eq!(config.weather.refresh_interval, 300);
        assert_eq!(config.history.min_interval, 300);
        assert_eq!(config.history.retention_days, 30);
        assert_eq!(config.history.max_entries, 30);
        assert_eq!(config.worker.manifest.len(), 7);
        assert!(config.location.location().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.storage.path = PathBuf::from("/tmp/nimbus-test.db");
        config.location.latitude = Some(59.33);
        config.location.longitude = Some(18.06);
        config.history.max_entries = 10;

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/nimbus-test.db"));
        assert_eq!(loaded.location.location(), Location::new(59.33, 18.06).ok());
        assert_eq!(loaded.history.max_entries, 10);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/server.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "192.168.1.1:8888"

            [storage]
            path = "/data/nimbus.db"

            [weather]
            provider = "http"
            api_key = "secret"
            refresh_interval = 600

            [location]
            latitude = 52.52
            longitude = 13.405
            change_threshold = 0.01

            [history]
            min_interval = 60
            retention_days = 7
            max_entries = 100

            [worker]
            origin = "https://nimbus.example/"
            api_hosts = ["api.tomorrow.io", "weather.internal"]
            skip_waiting = false
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "192.168.1.1:8888");
        assert_eq!(config.weather.provider, ProviderKind::Http);
        assert_eq!(config.weather.api_key.as_deref(), Some("secret"));
        assert_eq!(config.location.change_threshold, 0.01);
        assert_eq!(config.worker.api_hosts.len(), 2);
        assert_eq!(config.worker.manifest.len(), 7);
        config.validate().unwrap();

        let options = config.app_options();
        assert_eq!(options.history.min_interval, time::Duration::minutes(1));
        assert_eq!(options.history.retention, time::Duration::days(7));
        assert_eq!(options.history.max_entries, 100);
        assert_eq!(options.refresh_interval, Duration::from_secs(600));
        assert_eq!(options.location_threshold, 0.01);
    }

    #[test]
    fn test_server_validation() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        let errors = errors_of(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        config.server.bind = "localhost:0".to_string();
        assert!(errors_of(&config)[0].message.contains("cannot be 0"));

        config.server.bind = "localhost:http".to_string();
        assert!(errors_of(&config)[0].message.contains("invalid port"));
    }

    #[test]
    fn test_http_provider_requires_key() {
        let mut config = Config::default();
        config.weather.provider = ProviderKind::Http;
        let errors = errors_of(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "weather.api_key");
    }

    #[test]
    fn test_refresh_interval_bounds() {
        let mut config = Config::default();
        config.weather.refresh_interval = 5;
        assert!(errors_of(&config)[0].message.contains("too short"));
        config.weather.refresh_interval = 100_000;
        assert!(errors_of(&config)[0].message.contains("too long"));
    }

    #[test]
    fn test_location_validation() {
        let mut config = Config::default();
        config.location.latitude = Some(120.0);
        config.location.longitude = Some(0.0);
        assert_eq!(errors_of(&config)[0].field, "location");

        config.location.longitude = None;
        config.location.latitude = Some(10.0);
        assert_eq!(errors_of(&config)[0].field, "location.longitude");

        config.location.latitude = None;
        config.location.change_threshold = -1.0;
        assert_eq!(errors_of(&config)[0].field, "location.change_threshold");
    }

    #[test]
    fn test_history_and_worker_validation() {
        let mut config = Config::default();
        config.history.max_entries = 0;
        config.history.retention_days = 0;
        config.worker.origin = "nimbus".to_string();
        config.worker.api_hosts = vec!["https://api.tomorrow.io/v4".to_string()];

        let fields: Vec<_> = errors_of(&config).into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "history.retention_days",
                "history.max_entries",
                "worker.origin",
                "worker.api_hosts[0]",
            ]
        );
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigError::Validation(vec![
            ValidationError::new("server.bind", "port cannot be 0"),
            ValidationError::new("history.max_entries", "max entries must be at least 1"),
        ]);
        let display = error.to_string();
        assert!(display.contains("  - server.bind: port cannot be 0"));
        assert!(display.contains("history.max_entries"));
    }
}
