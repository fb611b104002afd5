//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use nimbus_types::{HistoryEntry, Photo};

use crate::error::{Error, Result};
use crate::models::{CachedWeather, DocumentInfo, DocumentKey};
use crate::schema::{self, DOCUMENT_VERSION};

/// SQLite-based document store for Nimbus data.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Raw document operations
impl Store {
    /// Read a document, upgrading it to the current version if needed.
    ///
    /// Upgraded documents are written back so the migration runs once.
    pub fn read_document<T: DeserializeOwned>(&self, key: DocumentKey) -> Result<Option<T>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT version, value FROM documents WHERE key = ?",
                [key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((version, text)) = row else {
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&text)?;
        let value = if version < DOCUMENT_VERSION {
            info!(
                "Migrating document {} from version {} to {}",
                key, version, DOCUMENT_VERSION
            );
            let upgraded = schema::upgrade_document(key, version, value)?;
            self.write_value(key, &upgraded)?;
            upgraded
        } else {
            schema::upgrade_document(key, version, value)?
        };

        Ok(Some(serde_json::from_value(value)?))
    }

    /// Write a document at the current version.
    pub fn write_document<T: Serialize + ?Sized>(&self, key: DocumentKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.write_value(key, &value)
    }

    fn write_value(&self, key: DocumentKey, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.conn.execute(
            "INSERT INTO documents (key, version, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                version = ?2,
                value = ?3,
                updated_at = ?4",
            rusqlite::params![key.as_str(), DOCUMENT_VERSION, text, now],
        )?;

        debug!("Wrote document {} ({} bytes)", key, text.len());
        Ok(())
    }

    /// Delete a document. Returns whether it existed.
    pub fn delete_document(&self, key: DocumentKey) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM documents WHERE key = ?", [key.as_str()])?;
        Ok(removed > 0)
    }

    /// Import a document exported from the browser app.
    ///
    /// `json` is the raw local-storage value. It is upgraded from the legacy
    /// shape and stored at the current version.
    pub fn import_legacy(&self, key: DocumentKey, json: &str) -> Result<()> {
        let value: Value = serde_json::from_str(json)?;
        let upgraded = schema::upgrade_document(key, schema::LEGACY_DOCUMENT_VERSION, value)?;
        self.write_value(key, &upgraded)?;
        info!("Imported legacy document {}", key);
        Ok(())
    }

    /// Store a raw value tagged with an explicit version, bypassing migration.
    #[doc(hidden)]
    pub fn write_versioned_raw(&self, key: DocumentKey, version: i64, json: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (key, version, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                key.as_str(),
                version,
                json,
                OffsetDateTime::now_utc().unix_timestamp()
            ],
        )?;
        Ok(())
    }

    /// List stored documents with their metadata.
    pub fn list_documents(&self) -> Result<Vec<DocumentInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, version, LENGTH(value), updated_at FROM documents ORDER BY key",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut documents = Vec::with_capacity(rows.len());
        for (key, version, size, updated_at) in rows {
            let Ok(key) = key.parse::<DocumentKey>() else {
                warn!("Ignoring unknown document key {}", key);
                continue;
            };
            let updated_at = OffsetDateTime::from_unix_timestamp(updated_at)
                .map_err(|e| Error::InvalidTimestamp(e.to_string()))?;
            documents.push(DocumentInfo {
                key,
                version,
                size: usize::try_from(size).unwrap_or(0),
                updated_at,
            });
        }

        Ok(documents)
    }
}

// Typed accessors
impl Store {
    /// Read the weather history (newest first). Missing history is empty.
    pub fn read_history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .read_document(DocumentKey::WeatherHistory)?
            .unwrap_or_default())
    }

    /// Replace the weather history.
    pub fn write_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        self.write_document(DocumentKey::WeatherHistory, entries)
    }

    /// Read the photo gallery (newest first). Missing gallery is empty.
    pub fn read_gallery(&self) -> Result<Vec<Photo>> {
        Ok(self
            .read_document(DocumentKey::PhotoGallery)?
            .unwrap_or_default())
    }

    /// Replace the photo gallery.
    pub fn write_gallery(&self, photos: &[Photo]) -> Result<()> {
        self.write_document(DocumentKey::PhotoGallery, photos)
    }

    /// Read the most recent provider response, successful or not yet superseded.
    pub fn read_weather(&self) -> Result<Option<CachedWeather>> {
        self.read_document(DocumentKey::WeatherData)
    }

    /// Read the last successfully fetched provider response.
    pub fn read_last_weather(&self) -> Result<Option<CachedWeather>> {
        self.read_document(DocumentKey::LastWeatherData)
    }

    /// Record a successful provider response as both current and last-known.
    pub fn write_weather(&self, cached: &CachedWeather) -> Result<()> {
        self.write_document(DocumentKey::WeatherData, cached)?;
        self.write_document(DocumentKey::LastWeatherData, cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::Condition;
    use serde_json::json;

    fn entry(id: &str, temperature: f64) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            temperature,
            condition: Condition::Sunny,
            timestamp: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_documents().unwrap().is_empty());
        assert!(store.read_history().unwrap().is_empty());
        assert!(store.read_gallery().unwrap().is_empty());
        assert!(store.read_weather().unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");
        let store = Store::open(&path).unwrap();
        store.write_history(&[entry("a", 1.0)]).unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.read_history().unwrap().len(), 1);
    }

    #[test]
    fn test_history_roundtrip_preserves_order() {
        let store = Store::open_in_memory().unwrap();
        let entries = vec![entry("newest", 3.0), entry("middle", 2.0), entry("oldest", 1.0)];
        store.write_history(&entries).unwrap();

        let read = store.read_history().unwrap();
        let ids: Vec<_> = read.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["newest", "middle", "oldest"]);
    }

    #[test]
    fn test_write_weather_sets_both_documents() {
        let store = Store::open_in_memory().unwrap();
        let cached = CachedWeather::new(
            json!({"data": {"values": {"temperature": 21.0, "cloudCover": 5, "precipitationProbability": 0}}}),
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        );
        store.write_weather(&cached).unwrap();

        assert_eq!(store.read_weather().unwrap(), Some(cached.clone()));
        assert_eq!(store.read_last_weather().unwrap(), Some(cached));
    }

    #[test]
    fn test_read_migrates_legacy_document_once() {
        let store = Store::open_in_memory().unwrap();
        store
            .write_versioned_raw(
                DocumentKey::PhotoGallery,
                1,
                r#"[{"id": 42, "url": "data:image/jpeg;base64,AA", "timestamp": 1000}]"#,
            )
            .unwrap();

        let gallery = store.read_gallery().unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].id, "42");

        let info = store.list_documents().unwrap();
        assert_eq!(info[0].key, DocumentKey::PhotoGallery);
        assert_eq!(info[0].version, DOCUMENT_VERSION);
    }

    #[test]
    fn test_import_legacy_history() {
        let store = Store::open_in_memory().unwrap();
        store
            .import_legacy(
                DocumentKey::WeatherHistory,
                r#"[{"id": 1, "temperature": 9.5, "condition": "Rainy", "timestamp": 1700000000000}]"#,
            )
            .unwrap();

        let history = store.read_history().unwrap();
        assert_eq!(history[0].condition, Condition::Rainy);
        assert_eq!(history[0].timestamp.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        store
            .write_versioned_raw(DocumentKey::WeatherHistory, DOCUMENT_VERSION, "{not json")
            .unwrap();
        assert!(matches!(
            store.read_history(),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_newer_document_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        store
            .write_versioned_raw(DocumentKey::PhotoGallery, DOCUMENT_VERSION + 1, "[]")
            .unwrap();
        assert!(matches!(
            store.read_gallery(),
            Err(Error::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_delete_document() {
        let store = Store::open_in_memory().unwrap();
        store.write_gallery(&[]).unwrap();
        assert!(store.delete_document(DocumentKey::PhotoGallery).unwrap());
        assert!(!store.delete_document(DocumentKey::PhotoGallery).unwrap());
    }
}
