//! SQLite WAL snapshot store for planner history
//!
//! Each save appends a new immutable snapshot row; load returns the latest
//! one and verifies its Blake3 integrity hash. WAL mode keeps concurrent
//! readers non-blocking while writes stay serialized.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::{PlannerError, Result};
use crate::history::PlannerHistory;
use crate::storage::HistoryStore;

/// SQLite-backed [`HistoryStore`]
#[derive(Debug)]
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Open (or create) the database in WAL mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Idempotent DDL migration
    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS history_snapshots (
                version        INTEGER PRIMARY KEY AUTOINCREMENT,
                integrity_hash TEXT NOT NULL,
                payload_json   TEXT NOT NULL,
                saved_at_ms    INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_saved_at
                ON history_snapshots(saved_at_ms DESC);
            ",
        )?;
        Ok(())
    }

    /// Number of stored snapshots
    pub fn snapshot_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM history_snapshots", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> Result<PlannerHistory> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT payload_json, integrity_hash
                 FROM history_snapshots
                 ORDER BY version DESC
                 LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, stored_hash)) = row else {
            return Ok(PlannerHistory::default());
        };

        let actual_hash = blake3::hash(payload.as_bytes()).to_hex().to_string();
        if actual_hash != stored_hash {
            return Err(PlannerError::Store(format!(
                "history snapshot integrity check failed: expected {stored_hash}, got {actual_hash}"
            )));
        }

        Ok(serde_json::from_str(&payload)?)
    }

    fn save(&mut self, history: &PlannerHistory) -> Result<()> {
        let payload = serde_json::to_string(history)?;
        let hash = blake3::hash(payload.as_bytes()).to_hex().to_string();

        self.conn.execute(
            "INSERT INTO history_snapshots (integrity_hash, payload_json, saved_at_ms)
             VALUES (?1, ?2, ?3)",
            params![hash, payload, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM history_snapshots", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarWeek;
    use chrono::NaiveDate;

    fn temp_store() -> (tempfile::TempDir, SqliteHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteHistoryStore::open(dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_empty_store_loads_default() {
        let (_dir, store) = temp_store();
        let history = store.load().unwrap();
        assert!(history.generated_weeks.is_empty());
        assert!(history.theme_usage.is_empty());
    }

    #[test]
    fn test_save_load_round_trip_preserves_dates() {
        let (_dir, mut store) = temp_store();

        let mut history = PlannerHistory::new();
        let week = CalendarWeek::new(
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            vec![],
            Utc::now(),
        );
        history.record_week(&week);
        store.save(&history).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.generated_weeks.len(), 1);
        assert_eq!(loaded.generated_weeks[0].week_start, week.week_start);
        assert_eq!(loaded.generated_weeks[0].generated_at, week.generated_at);
    }

    #[test]
    fn test_each_save_appends_a_snapshot() {
        let (_dir, mut store) = temp_store();
        let history = PlannerHistory::new();

        store.save(&history).unwrap();
        store.save(&history).unwrap();
        assert_eq!(store.snapshot_count().unwrap(), 2);

        store.clear().unwrap();
        assert_eq!(store.snapshot_count().unwrap(), 0);
        assert!(store.load().unwrap().generated_weeks.is_empty());
    }

    #[test]
    fn test_tampered_payload_fails_integrity() {
        let (_dir, mut store) = temp_store();
        store.save(&PlannerHistory::new()).unwrap();

        store
            .conn
            .execute(
                "UPDATE history_snapshots SET payload_json = '{\"theme_usage\":{}}'",
                [],
            )
            .unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("integrity"));
    }
}
