// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every read and verification.
//
// Schema:
//   audit_log(
//     id           INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp    TEXT    NOT NULL,   -- RFC 3339
//     action       TEXT    NOT NULL,   -- e.g. "manual_read", "pa_verify"
//     document_ref TEXT    NOT NULL,   -- SHA-256 of the document number
//     success      INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details      TEXT                -- optional free-form context
//   )
//
// Document numbers are never stored in the clear; entries reference them by
// hash so the trail can correlate operations on the same document without
// retaining the number itself.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use lesewerk_core::error::LesewerkError;

/// Convert a `rusqlite::Error` into a `LesewerkError::Database`.
fn db_err(e: rusqlite::Error) -> LesewerkError {
    LesewerkError::Database(e.to_string())
}

/// Hash a document number (or other identifier) for audit storage.
pub fn document_ref(identifier: &str) -> String {
    hex::encode(Sha256::digest(identifier.as_bytes()))
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub document_ref: String,
    pub success: bool,
    pub details: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Mutex<Connection>,
}

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS audit_log (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp    TEXT    NOT NULL,
        action       TEXT    NOT NULL,
        document_ref TEXT    NOT NULL,
        success      INTEGER NOT NULL,
        details      TEXT
    );
";

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LesewerkError> {
        let conn = Connection::open(path).map_err(db_err)?;

        // Enable WAL for concurrent readers.
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, LesewerkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a new audit entry.
    ///
    /// `action` is a short verb describing the operation (e.g.
    /// `"manual_read"`, `"auto_read"`, `"pa_verify"`); `document_ref` should
    /// come from [`document_ref`].
    #[instrument(skip(self, details), fields(%action, success))]
    pub fn record(
        &self,
        action: &str,
        document_ref: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), LesewerkError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if success { 1 } else { 0 };

        self.conn
            .lock()
            .expect("audit db lock poisoned")
            .execute(
                "INSERT INTO audit_log (timestamp, action, document_ref, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, document_ref, success_int, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Retrieve all entries for a given document reference, ordered by
    /// timestamp ascending.
    pub fn entries_for_ref(&self, document_ref: &str) -> Result<Vec<AuditEntry>, LesewerkError> {
        let conn = self.conn.lock().expect("audit db lock poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, action, document_ref, success, details
                 FROM audit_log
                 WHERE document_ref = ?1
                 ORDER BY timestamp ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![document_ref], row_to_entry)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, LesewerkError> {
        let conn = self.conn.lock().expect("audit db lock poisoned");
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, action, document_ref, success, details
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt.query_map(params![limit], row_to_entry).map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, LesewerkError> {
        self.conn
            .lock()
            .expect("audit db lock poisoned")
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        action: row.get(2)?,
        document_ref: row.get(3)?,
        success: row.get::<_, i32>(4)? != 0,
        details: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);

        let doc = document_ref("L898902C3");
        log.record("manual_read", &doc, true, None).unwrap();
        log.record("pa_verify", &doc, true, Some("status VALID"))
            .unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_for_one_document() {
        let log = make_log();
        let first = document_ref("L898902C3");
        let second = document_ref("D23145890");

        log.record("manual_read", &first, true, None).unwrap();
        log.record("manual_read", &second, true, None).unwrap();
        log.record("pa_verify", &first, false, Some("status INVALID"))
            .unwrap();

        let entries = log.entries_for_ref(&first).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "manual_read");
        assert!(entries[0].success);
        assert_eq!(entries[1].action, "pa_verify");
        assert!(!entries[1].success);
    }

    #[test]
    fn recent_entries_ordering() {
        let log = make_log();
        for i in 0..5 {
            log.record("auto_read", &document_ref(&format!("doc_{i}")), true, None)
                .unwrap();
        }

        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first — IDs should be descending.
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
    }

    #[test]
    fn document_ref_never_stores_the_raw_number() {
        let reference = document_ref("L898902C3");
        assert_ne!(reference, "L898902C3");
        assert_eq!(reference.len(), 64);
        // Deterministic so entries for the same document correlate.
        assert_eq!(reference, document_ref("L898902C3"));
    }
}
