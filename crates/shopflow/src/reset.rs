//! Clearing the shop's persisted state between scenarios.

use crate::result::{FlowError, FlowResult};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tables emptied by a reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTables {
    /// Customer rows
    pub customers: String,
    /// Subscription rows
    pub subscriptions: String,
    /// Payment transaction rows
    pub transactions: String,
}

impl Default for ResetTables {
    fn default() -> Self {
        Self {
            customers: "person".to_string(),
            subscriptions: "subscription".to_string(),
            transactions: "transactions".to_string(),
        }
    }
}

impl ResetTables {
    /// Table names in deletion order
    #[must_use]
    pub fn names(&self) -> [&str; 3] {
        [
            self.subscriptions.as_str(),
            self.customers.as_str(),
            self.transactions.as_str(),
        ]
    }

    fn validate(&self) -> FlowResult<()> {
        for name in self.names() {
            let valid = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(FlowError::config(format!("invalid table name '{name}'")));
            }
        }
        Ok(())
    }
}

/// Row counts per table, as left after a reset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// `(table, rows deleted)` in deletion order
    pub deleted: Vec<(String, usize)>,
}

impl ResetReport {
    /// Total rows removed
    #[must_use]
    pub fn total(&self) -> usize {
        self.deleted.iter().map(|(_, n)| n).sum()
    }
}

/// Persisted state that can be wiped before a scenario
pub trait StateStore: Send + Sync {
    /// Delete every customer, subscription and transaction row
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::StoreConnection`] if the store cannot be opened and
    /// [`FlowError::StoreReset`] if the deletion fails.
    fn reset(&self) -> FlowResult<ResetReport>;

    /// Current row count of each reset table
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::reset`].
    fn row_counts(&self) -> FlowResult<Vec<(String, usize)>>;
}

/// The shop's SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    tables: ResetTables,
}

impl SqliteStore {
    /// Store backed by the database at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tables: ResetTables::default(),
        }
    }

    /// Reset different tables
    #[must_use]
    pub fn with_tables(mut self, tables: ResetTables) -> Self {
        self.tables = tables;
        self
    }

    /// Database path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> FlowResult<Connection> {
        self.tables.validate()?;
        // never create: a missing file means a misconfigured path
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| FlowError::StoreConnection {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

fn reset_error(e: rusqlite::Error) -> FlowError {
    FlowError::StoreReset {
        message: e.to_string(),
    }
}

fn close(conn: Connection) -> FlowResult<()> {
    conn.close().map_err(|(_, e)| reset_error(e))
}

impl StateStore for SqliteStore {
    fn reset(&self) -> FlowResult<ResetReport> {
        let mut conn = self.open()?;
        let mut report = ResetReport::default();
        {
            let tx = conn.transaction().map_err(reset_error)?;
            for table in self.tables.names() {
                let deleted = tx
                    .execute(&format!("DELETE FROM \"{table}\""), [])
                    .map_err(reset_error)?;
                debug!(table, deleted, "cleared table");
                report.deleted.push((table.to_string(), deleted));
            }
            tx.commit().map_err(reset_error)?;
        }
        close(conn)?;
        info!(path = %self.path.display(), rows = report.total(), "store reset");
        Ok(report)
    }

    fn row_counts(&self) -> FlowResult<Vec<(String, usize)>> {
        let conn = self.open()?;
        let mut counts = Vec::with_capacity(3);
        for table in self.tables.names() {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                    row.get(0)
                })
                .map_err(reset_error)?;
            counts.push((table.to_string(), usize::try_from(count).unwrap_or(0)));
        }
        close(conn)?;
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE person (id INTEGER PRIMARY KEY, email TEXT);
             CREATE TABLE subscription (id INTEGER PRIMARY KEY, person_id INTEGER);
             CREATE TABLE transactions (id INTEGER PRIMARY KEY, amount INTEGER);
             CREATE TABLE plan (id INTEGER PRIMARY KEY, title TEXT);
             INSERT INTO person (email) VALUES ('john@example.com'), ('jane@example.com');
             INSERT INTO subscription (person_id) VALUES (1);
             INSERT INTO transactions (amount) VALUES (699), (599), (1099);
             INSERT INTO plan (title) VALUES ('Hair Gel');",
        )
        .unwrap();
        path
    }

    mod reset_tests {
        use super::*;

        #[test]
        fn test_reset_empties_tables() {
            let dir = TempDir::new().unwrap();
            let store = SqliteStore::new(seeded_db(&dir));

            let report = store.reset().unwrap();
            assert_eq!(report.total(), 6);

            for (table, count) in store.row_counts().unwrap() {
                assert_eq!(count, 0, "{table} not empty");
            }
        }

        #[test]
        fn test_reset_leaves_other_tables() {
            let dir = TempDir::new().unwrap();
            let path = seeded_db(&dir);
            SqliteStore::new(&path).reset().unwrap();

            let conn = Connection::open(&path).unwrap();
            let plans: i64 = conn
                .query_row("SELECT COUNT(*) FROM plan", [], |row| row.get(0))
                .unwrap();
            assert_eq!(plans, 1);
        }

        #[test]
        fn test_reset_is_repeatable() {
            let dir = TempDir::new().unwrap();
            let store = SqliteStore::new(seeded_db(&dir));
            store.reset().unwrap();
            let second = store.reset().unwrap();
            assert_eq!(second.total(), 0);
        }

        #[test]
        fn test_missing_table_rolls_back() {
            let dir = TempDir::new().unwrap();
            let path = seeded_db(&dir);
            let store = SqliteStore::new(&path).with_tables(ResetTables {
                transactions: "payments".to_string(),
                ..ResetTables::default()
            });

            let err = store.reset().unwrap_err();
            assert_eq!(err.kind(), "store_reset");

            let counts = SqliteStore::new(&path).row_counts().unwrap();
            assert_eq!(counts[0], ("subscription".to_string(), 1));
            assert_eq!(counts[1], ("person".to_string(), 2));
        }
    }

    mod connection_tests {
        use super::*;

        #[test]
        fn test_missing_file_is_not_created() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("absent.db");
            let err = SqliteStore::new(&path).reset().unwrap_err();
            assert_eq!(err.kind(), "store_connection");
            assert!(!path.exists());
        }

        #[test]
        fn test_invalid_table_name_rejected() {
            let dir = TempDir::new().unwrap();
            let store = SqliteStore::new(seeded_db(&dir)).with_tables(ResetTables {
                customers: "person; DROP TABLE plan".to_string(),
                ..ResetTables::default()
            });
            assert_eq!(store.reset().unwrap_err().kind(), "config");
        }
    }
}
