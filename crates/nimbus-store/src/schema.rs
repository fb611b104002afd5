//! Database schema, document versions and migrations.
//!
//! Two layers are versioned independently:
//!
//! - the SQLite schema (`schema_version` table), and
//! - each JSON document (`documents.version` column).
//!
//! Document version 1 is the shape the browser app kept in local storage:
//! millisecond timestamps, numeric ids, display labels for conditions and a
//! `url` field for photos. Version 2 is the current typed shape. Documents
//! are upgraded lazily when read, and eagerly when imported.

use rusqlite::Connection;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use nimbus_types::{Condition, HistoryEntry, Photo};

use crate::error::{Error, Result};
use crate::models::{CachedWeather, DocumentKey};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Current document version.
pub const DOCUMENT_VERSION: i64 = 2;

/// Document version of data exported from the browser app.
pub const LEGACY_DOCUMENT_VERSION: i64 = 1;

/// Initialize the database schema.
///
/// Fails on a database written by a newer build.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            version,
            supported: SCHEMA_VERSION,
        });
    }
    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per persisted document (weatherHistory, photoGallery, ...)
        CREATE TABLE IF NOT EXISTS documents (
            key TEXT PRIMARY KEY,
            version INTEGER NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Upgrade a stored document value to [`DOCUMENT_VERSION`].
pub fn upgrade_document(key: DocumentKey, version: i64, value: Value) -> Result<Value> {
    if version > DOCUMENT_VERSION {
        return Err(Error::UnsupportedVersion {
            key: key.to_string(),
            version,
            supported: DOCUMENT_VERSION,
        });
    }
    if version == DOCUMENT_VERSION {
        return Ok(value);
    }

    let upgraded = match key {
        DocumentKey::WeatherHistory => serde_json::to_value(legacy_history(key, value)?)?,
        DocumentKey::PhotoGallery => serde_json::to_value(legacy_gallery(key, value)?)?,
        DocumentKey::WeatherData | DocumentKey::LastWeatherData => {
            serde_json::to_value(legacy_weather(key, value)?)?
        }
    };
    Ok(upgraded)
}

fn migration_error(key: DocumentKey, message: impl Into<String>) -> Error {
    Error::Migration {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Legacy history entries, newest first.
fn legacy_history(key: DocumentKey, value: Value) -> Result<Vec<HistoryEntry>> {
    let Value::Array(items) = value else {
        return Err(migration_error(key, "expected an array of entries"));
    };

    let mut entries = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(obj) = item else {
                return Err(migration_error(key, format!("entry {i} is not an object")));
            };
            let temperature = obj
                .get("temperature")
                .and_then(Value::as_f64)
                .ok_or_else(|| migration_error(key, format!("entry {i} has no temperature")))?;
            let label = obj
                .get("condition")
                .or_else(|| obj.get("description"))
                .and_then(Value::as_str)
                .ok_or_else(|| migration_error(key, format!("entry {i} has no condition")))?;
            let condition: Condition = label
                .parse()
                .map_err(|e| migration_error(key, format!("entry {i}: {e}")))?;
            let timestamp = legacy_timestamp(obj.get("timestamp"))
                .map_err(|e| migration_error(key, format!("entry {i}: {e}")))?;
            let id = legacy_id(&obj).unwrap_or_else(|| legacy_entry_id(i, timestamp));

            Ok(HistoryEntry {
                id,
                temperature,
                condition,
                timestamp,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(entries)
}

fn legacy_gallery(key: DocumentKey, value: Value) -> Result<Vec<Photo>> {
    let Value::Array(items) = value else {
        return Err(migration_error(key, "expected an array of photos"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(obj) = item else {
                return Err(migration_error(key, format!("photo {i} is not an object")));
            };
            let image_data = obj
                .get("imageData")
                .or_else(|| obj.get("url"))
                .and_then(Value::as_str)
                .ok_or_else(|| migration_error(key, format!("photo {i} has no image data")))?
                .to_string();
            let timestamp = legacy_timestamp(obj.get("timestamp"))
                .map_err(|e| migration_error(key, format!("photo {i}: {e}")))?;
            let id = legacy_id(&obj).unwrap_or_else(|| Photo::id_for(timestamp));

            Ok(Photo {
                id,
                image_data,
                timestamp,
            })
        })
        .collect()
}

fn legacy_weather(key: DocumentKey, value: Value) -> Result<CachedWeather> {
    let Value::Object(mut obj) = value else {
        return Err(migration_error(key, "expected an object"));
    };

    let timestamp = obj.remove("timestamp");
    let fetched_at =
        legacy_timestamp(timestamp.as_ref()).map_err(|e| migration_error(key, e.to_string()))?;

    // Some revisions wrapped the response under `response`, others stored it flat.
    let raw = match obj.remove("response") {
        Some(inner) => inner,
        None => Value::Object(obj),
    };

    Ok(CachedWeather::new(raw, fetched_at))
}

fn legacy_id(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn legacy_entry_id(index: usize, timestamp: OffsetDateTime) -> String {
    format!("legacy-{}-{}", Photo::id_for(timestamp), index)
}

/// Parse a timestamp stored as epoch milliseconds or an RFC 3339 string.
pub fn legacy_timestamp(value: Option<&Value>) -> Result<OffsetDateTime> {
    match value {
        Some(Value::Number(n)) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| Error::InvalidTimestamp(n.to_string()))?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .map_err(|e| Error::InvalidTimestamp(format!("{millis}: {e}")))
        }
        Some(Value::String(s)) => OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|e| Error::InvalidTimestamp(format!("{s}: {e}"))),
        Some(other) => Err(Error::InvalidTimestamp(other.to_string())),
        None => Err(Error::InvalidTimestamp("missing timestamp".to_string())),
    }
}
