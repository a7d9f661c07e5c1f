//! SQLite-backed local mirror of the planetary-systems archive.
//!
//! The schema is rebuilt with `CREATE TABLE IF NOT EXISTS` on every open:
//! a generated `id` primary key, the configured remote columns (declared
//! without affinity so [`CellValue`] types land as-is), and a `last_write`
//! marker column holding the date of the last successful sync cycle.
//!
//! The identifier domain of the mirror is the first configured column
//! (`pl_name` by default); deletions and diffing key on it.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

use crate::error::ArchiveResult;
use crate::tap::TapRow;

/// One cycle's worth of writes, applied in a single transaction.
#[derive(Debug, Default)]
pub struct ApplyPlan {
    /// Identifiers deleted before any insert (changed rows being
    /// reinserted plus entities removed upstream).
    pub to_delete: Vec<String>,
    pub to_insert: Vec<TapRow>,
    /// Marker date written to every row after the apply.
    pub marker: String,
}

/// Row counts of an applied plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub deleted: usize,
    pub inserted: usize,
}

pub struct ArchiveStore {
    conn: Mutex<Connection>,
    table: String,
    columns: Vec<String>,
}

impl ArchiveStore {
    /// Open (or create) the mirror database at `path`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        table: &str,
        columns: &[String],
    ) -> ArchiveResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            columns: columns.to_vec(),
        };
        store.setup()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory(table: &str, columns: &[String]) -> ArchiveResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            columns: columns.to_vec(),
        };
        store.setup()?;
        Ok(store)
    }

    fn key_column(&self) -> &str {
        &self.columns[0]
    }

    fn setup(&self) -> ArchiveResult<()> {
        let conn = self.conn.lock();
        // Columns carry no declared type: SQLite then stores whatever the
        // permissive cast produced without coercion.
        let cols = self.columns.join(", ");
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {cols}, last_write)",
                self.table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{key} ON {} ({key})",
                self.table,
                self.table,
                key = self.key_column()
            ),
            [],
        )?;
        Ok(())
    }

    /// Total record count (rows, not distinct entities) — the number the
    /// synchronizer compares against the remote count.
    pub fn count(&self) -> ArchiveResult<i64> {
        let conn = self.conn.lock();
        let n = conn.query_row(&format!("SELECT COUNT(id) FROM {}", self.table), [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    /// The set of entity identifiers currently mirrored.
    pub fn local_identifiers(&self) -> ArchiveResult<HashSet<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {} FROM {}",
            self.key_column(),
            self.table
        ))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Marker date of the last successful cycle, `None` on a fresh mirror.
    pub fn last_marker(&self) -> ArchiveResult<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT last_write FROM {} LIMIT 1", self.table))?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }

    /// Delete all rows for the given identifiers.
    pub fn delete_by_name(&self, names: &[String]) -> ArchiveResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let deleted = delete_in_tx(&tx, &self.table, self.key_column(), names)?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Insert freshly fetched rows. `id` and `last_write` stay unset; the
    /// store generates the key and the marker update fills the date.
    pub fn insert_rows(&self, rows: &[TapRow]) -> ArchiveResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let inserted = insert_in_tx(&tx, &self.table, &self.columns, rows)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Stamp every row with the given marker date.
    pub fn set_marker(&self, marker: &str) -> ArchiveResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!("UPDATE {} SET last_write = ?1", self.table),
            params![marker],
        )?;
        Ok(())
    }

    /// Apply one sync cycle's writes atomically: deletions first, then
    /// insertions, then the marker stamp, committed together. A failure
    /// anywhere rolls the whole cycle back, leaving the mirror in its
    /// pre-cycle state.
    pub fn apply(&self, plan: &ApplyPlan) -> ArchiveResult<ApplyOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let deleted = delete_in_tx(&tx, &self.table, self.key_column(), &plan.to_delete)?;
        let inserted = insert_in_tx(&tx, &self.table, &self.columns, &plan.to_insert)?;
        tx.execute(
            &format!("UPDATE {} SET last_write = ?1", self.table),
            params![plan.marker],
        )?;
        tx.commit()?;
        Ok(ApplyOutcome { deleted, inserted })
    }
}

fn delete_in_tx(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    key: &str,
    names: &[String],
) -> ArchiveResult<usize> {
    let mut deleted = 0;
    let mut stmt = tx.prepare(&format!("DELETE FROM {table} WHERE {key} = ?1"))?;
    for name in names {
        deleted += stmt.execute(params![name])?;
    }
    Ok(deleted)
}

fn insert_in_tx(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    columns: &[String],
    rows: &[TapRow],
) -> ArchiveResult<usize> {
    let cols = columns.join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = tx.prepare(&format!("INSERT INTO {table} ({cols}) VALUES ({placeholders})"))?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(rusqlite::params_from_iter(row.cells.iter()))?;
    }
    Ok(inserted)
}
