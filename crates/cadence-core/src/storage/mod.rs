//! History persistence
//!
//! The engine only requires the [`HistoryStore`] contract: read the full
//! history at run start, write the full history at run end. Implementations
//! must preserve all four history collections verbatim across round-trips,
//! date values included. Concurrent runs against the same store must be
//! serialized externally; the engine assumes a single writer.

pub mod sqlite;

pub use sqlite::SqliteHistoryStore;

use crate::error::Result;
use crate::history::PlannerHistory;

/// Key-value style history store, keyed implicitly by the owning account
pub trait HistoryStore {
    /// Load the full history, or an empty one if nothing was saved yet
    fn load(&self) -> Result<PlannerHistory>;

    /// Replace the stored history with `history`
    fn save(&mut self, history: &PlannerHistory) -> Result<()>;

    /// Drop all stored history
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store for tests and single-process callers
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    history: Option<PlannerHistory>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<PlannerHistory> {
        Ok(self.history.clone().unwrap_or_default())
    }

    fn save(&mut self, history: &PlannerHistory) -> Result<()> {
        self.history = Some(history.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.history = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarWeek;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryHistoryStore::new();
        assert!(store.load().unwrap().generated_weeks.is_empty());

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
        assert_eq!(loaded.generated_weeks[0].id, week.id);

        store.clear().unwrap();
        assert!(store.load().unwrap().generated_weeks.is_empty());
    }
}
