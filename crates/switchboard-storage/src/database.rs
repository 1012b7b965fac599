// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use switchboard_core::SwitchboardError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the single SQLite connection shared by every query module.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, SwitchboardError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SwitchboardError> {
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || prepare_file(&setup_path, wal_mode))
            .await
            .map_err(|e| SwitchboardError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(SwitchboardError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), SwitchboardError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .close()
            .await
            .map_err(|e| SwitchboardError::storage(e.to_string()))
    }
}

/// Creates the parent directory, sets the journal mode, and applies migrations
/// on a short-lived synchronous connection.
fn prepare_file(path: &str, wal_mode: bool) -> Result<(), SwitchboardError> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(SwitchboardError::storage)?;
    }
    let mut conn = rusqlite::Connection::open(path).map_err(SwitchboardError::storage)?;
    let journal = if wal_mode { "WAL" } else { "DELETE" };
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", journal, |row| row.get(0))
        .map_err(SwitchboardError::storage)?;
    debug!(mode, "journal mode set");
    run_migrations(&mut conn)
}

/// Map a tokio-rusqlite error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/switchboard.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for table in ["conversations", "messages", "archived_conversations", "users"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("fk.db").to_str().unwrap())
            .await
            .unwrap();
        let enabled: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(enabled, 1);
        db.close().await.unwrap();
    }
}
