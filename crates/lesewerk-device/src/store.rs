// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent device-settings store backed by SQLite.
//
// Holds the canonical `DeviceProperties` snapshot for the process and
// persists every replacement so settings survive restarts.  Readers get
// owned copies; a strategy mutating its private copy never affects the
// canonical snapshot until `set` is called explicitly.

use std::path::Path;
use std::sync::{Mutex, RwLock};

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument};

use lesewerk_core::error::{LesewerkError, Result};
use lesewerk_core::properties::DeviceProperties;

/// Single-row schema: the latest settings snapshot as JSON.
const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS device_settings (
        id         INTEGER PRIMARY KEY CHECK (id = 1),
        properties TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

/// Convert a `rusqlite::Error` into a `LesewerkError::Database`.
fn db_err(e: rusqlite::Error) -> LesewerkError {
    LesewerkError::Database(e.to_string())
}

/// Sole owner of the device configuration.
pub struct PropertyStore {
    current: RwLock<DeviceProperties>,
    conn: Mutex<Connection>,
    had_saved_settings: bool,
}

impl PropertyStore {
    /// Open (or create) the settings database at the given path and load the
    /// saved snapshot if one exists.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;

        // WAL survives unclean shutdowns more gracefully and lets the HTTP
        // handlers read while a write is in flight.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        let saved = load_saved(&conn)?;
        let had_saved_settings = saved.is_some();
        if had_saved_settings {
            info!("loaded saved device settings");
        } else {
            info!("no saved device settings, using defaults");
        }

        Ok(Self {
            current: RwLock::new(saved.unwrap_or_default()),
            conn: Mutex::new(conn),
            had_saved_settings,
        })
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory settings store opened");
        Ok(Self {
            current: RwLock::new(DeviceProperties::default()),
            conn: Mutex::new(conn),
            had_saved_settings: false,
        })
    }

    /// Whether a persisted snapshot existed when the store was opened.
    pub fn had_saved_settings(&self) -> bool {
        self.had_saved_settings
    }

    /// Owned copy of the current snapshot (copy-on-read).
    pub fn get(&self) -> DeviceProperties {
        self.current
            .read()
            .expect("settings lock poisoned")
            .clone()
    }

    /// Replace the snapshot atomically and persist it.
    #[instrument(skip_all)]
    pub fn set(&self, props: DeviceProperties) -> Result<()> {
        let json = serde_json::to_string(&props)?;

        {
            let conn = self.conn.lock().expect("settings db lock poisoned");
            conn.execute(
                "INSERT INTO device_settings (id, properties, updated_at)
                 VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     properties = excluded.properties,
                     updated_at = excluded.updated_at",
                params![json, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        }

        *self.current.write().expect("settings lock poisoned") = props;
        debug!("device settings replaced and persisted");
        Ok(())
    }
}

fn load_saved(conn: &Connection) -> Result<Option<DeviceProperties>> {
    let mut stmt = conn
        .prepare("SELECT properties FROM device_settings WHERE id = 1")
        .map_err(db_err)?;

    let mut rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(db_err)?;

    match rows.next() {
        Some(Ok(json)) => {
            let props: DeviceProperties = serde_json::from_str(&json)?;
            Ok(Some(props))
        }
        Some(Err(e)) => Err(db_err(e)),
        None => Ok(None),
    }
}
