//! Append-only row storage
//!
//! A store holds named sheets. Each sheet has an optional header (row 1)
//! followed by data rows numbered from 2. Rows are never updated or deleted.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{LedgerServerError, Result};

/// Header row written before the first data row
pub const HEADER: [&str; 8] = [
    "Email",
    "Completion (%)",
    "Bugs",
    "Satisfaction",
    "Comments",
    "Timestamp",
    "Month ID",
    "Month Name",
];

/// One data row, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub email: String,
    pub completion: f64,
    pub bugs: i64,
    pub satisfaction: f64,
    pub comments: String,
    pub timestamp: String,
    pub month_id: String,
    pub month_name: String,
}

/// Storage backend for ledger sheets
pub trait RowStore: Send + Sync {
    fn sheet_exists(&self, sheet: &str) -> Result<bool>;

    /// Create an empty sheet (no header, no rows). No-op if it exists.
    fn create_sheet(&self, sheet: &str) -> Result<()>;

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>>;

    fn write_header(&self, sheet: &str, header: &[&str]) -> Result<()>;

    /// Data rows in insertion order, header excluded
    fn data_rows(&self, sheet: &str) -> Result<Vec<LedgerRow>>;

    /// Append a data row and return its 1-based sheet row number
    fn append_row(&self, sheet: &str, row: &LedgerRow) -> Result<u64>;
}

#[derive(Debug, Default)]
struct MemorySheet {
    header: Option<Vec<String>>,
    rows: Vec<LedgerRow>,
}

/// In-process store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, MemorySheet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sheet<T>(&self, sheet: &str, f: impl FnOnce(&mut MemorySheet) -> T) -> Result<T> {
        let mut sheets = self.sheets.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sheets
            .get_mut(sheet)
            .ok_or_else(|| LedgerServerError::SheetNotFound(sheet.to_string()))?;
        Ok(f(entry))
    }
}

impl RowStore for MemoryStore {
    fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        Ok(self
            .sheets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(sheet))
    }

    fn create_sheet(&self, sheet: &str) -> Result<()> {
        self.sheets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(sheet.to_string())
            .or_default();
        Ok(())
    }

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>> {
        self.with_sheet(sheet, |s| s.header.clone())
    }

    fn write_header(&self, sheet: &str, header: &[&str]) -> Result<()> {
        self.with_sheet(sheet, |s| {
            s.header = Some(header.iter().map(|h| h.to_string()).collect());
        })
    }

    fn data_rows(&self, sheet: &str) -> Result<Vec<LedgerRow>> {
        self.with_sheet(sheet, |s| s.rows.clone())
    }

    fn append_row(&self, sheet: &str, row: &LedgerRow) -> Result<u64> {
        self.with_sheet(sheet, |s| {
            s.rows.push(row.clone());
            s.rows.len() as u64 + 1
        })
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!(path = %path.as_ref().display(), "Opened ledger database");
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sheets (
                name TEXT PRIMARY KEY,
                header TEXT
            );
            CREATE TABLE IF NOT EXISTS rows (
                sheet TEXT NOT NULL REFERENCES sheets(name),
                row_num INTEGER NOT NULL,
                email TEXT NOT NULL,
                completion REAL NOT NULL,
                bugs INTEGER NOT NULL,
                satisfaction REAL NOT NULL,
                comments TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                month_id TEXT NOT NULL,
                month_name TEXT NOT NULL,
                PRIMARY KEY (sheet, row_num)
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn require_sheet(conn: &Connection, sheet: &str) -> Result<()> {
        let found: Option<String> = conn
            .query_row("SELECT name FROM sheets WHERE name = ?1", [sheet], |row| row.get(0))
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(LedgerServerError::SheetNotFound(sheet.to_string())),
        }
    }
}

impl RowStore for SqliteStore {
    fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        let conn = self.conn();
        match Self::require_sheet(&conn, sheet) {
            Ok(()) => Ok(true),
            Err(LedgerServerError::SheetNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_sheet(&self, sheet: &str) -> Result<()> {
        self.conn()
            .execute("INSERT OR IGNORE INTO sheets (name) VALUES (?1)", [sheet])?;
        Ok(())
    }

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>> {
        let conn = self.conn();
        Self::require_sheet(&conn, sheet)?;
        let header: Option<String> =
            conn.query_row("SELECT header FROM sheets WHERE name = ?1", [sheet], |row| {
                row.get(0)
            })?;
        match header {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_header(&self, sheet: &str, header: &[&str]) -> Result<()> {
        let conn = self.conn();
        Self::require_sheet(&conn, sheet)?;
        let json = serde_json::to_string(header)?;
        conn.execute(
            "UPDATE sheets SET header = ?1 WHERE name = ?2",
            params![json, sheet],
        )?;
        Ok(())
    }

    fn data_rows(&self, sheet: &str) -> Result<Vec<LedgerRow>> {
        let conn = self.conn();
        Self::require_sheet(&conn, sheet)?;
        let mut stmt = conn.prepare(
            "SELECT email, completion, bugs, satisfaction, comments, timestamp, month_id, month_name
             FROM rows WHERE sheet = ?1 ORDER BY row_num",
        )?;
        let rows = stmt
            .query_map([sheet], |row| {
                Ok(LedgerRow {
                    email: row.get(0)?,
                    completion: row.get(1)?,
                    bugs: row.get(2)?,
                    satisfaction: row.get(3)?,
                    comments: row.get(4)?,
                    timestamp: row.get(5)?,
                    month_id: row.get(6)?,
                    month_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn append_row(&self, sheet: &str, row: &LedgerRow) -> Result<u64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        Self::require_sheet(&tx, sheet)?;

        // Row 1 is the header, so data starts at 2
        let row_num: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_num), 1) + 1 FROM rows WHERE sheet = ?1",
            [sheet],
            |r| r.get(0),
        )?;
        tx.execute(
            "INSERT INTO rows (sheet, row_num, email, completion, bugs, satisfaction,
                               comments, timestamp, month_id, month_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                sheet,
                row_num,
                row.email,
                row.completion,
                row.bugs,
                row.satisfaction,
                row.comments,
                row.timestamp,
                row.month_id,
                row.month_name,
            ],
        )?;
        tx.commit()?;
        Ok(row_num as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(email: &str, month_id: &str) -> LedgerRow {
        LedgerRow {
            email: email.to_string(),
            completion: 80.0,
            bugs: 1,
            satisfaction: 5.0,
            comments: String::new(),
            timestamp: "2024-05-01 10:00:00".to_string(),
            month_id: month_id.to_string(),
            month_name: "May 2024".to_string(),
        }
    }

    fn exercise(store: &dyn RowStore) {
        assert!(!store.sheet_exists("Responses").unwrap());
        assert!(matches!(
            store.data_rows("Responses"),
            Err(LedgerServerError::SheetNotFound(_))
        ));

        store.create_sheet("Responses").unwrap();
        store.create_sheet("Responses").unwrap();
        assert!(store.sheet_exists("Responses").unwrap());
        assert_eq!(store.header("Responses").unwrap(), None);

        store.write_header("Responses", &HEADER).unwrap();
        assert_eq!(store.header("Responses").unwrap().unwrap()[0], "Email");

        assert_eq!(store.append_row("Responses", &row("a@x.com", "2024-05")).unwrap(), 2);
        assert_eq!(store.append_row("Responses", &row("a@x.com", "2024-05")).unwrap(), 3);

        let rows = store.data_rows("Responses").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], row("a@x.com", "2024-05"));
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        exercise(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_rows_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_sheet("Responses").unwrap();
            store.append_row("Responses", &row("b@x.com", "2024-06")).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let rows = store.data_rows("Responses").unwrap();
        assert_eq!(rows, vec![row("b@x.com", "2024-06")]);
    }
}
