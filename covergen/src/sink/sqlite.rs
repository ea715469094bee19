//! SQLite coverage table.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::debug;

use super::{CoverageRecord, CoverageStore};
use crate::error::{SetupError, StoreError};

/// Table written when none is configured.
pub const DEFAULT_COVERAGE_TABLE: &str = "temp";

/// Writes coverage records to `table(z, x, y, features)` in a SQLite database.
pub struct SqliteCoverageStore {
    conn: Connection,
    table: String,
    insert_sql: String,
}

impl SqliteCoverageStore {
    /// Opens (creating if needed) the database and the coverage table.
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let table = table.into();
        if !is_valid_identifier(&table) {
            return Err(SetupError::InvalidTableName(table));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SetupError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| SetupError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                z INTEGER,
                x INTEGER,
                y INTEGER,
                features BLOB
            );"
        ))
        .map_err(|source| SetupError::Schema {
            table: table.clone(),
            source,
        })?;

        debug!(path = %path.display(), table = %table, "Opened coverage store");

        Ok(Self {
            conn,
            insert_sql: format!("INSERT INTO {table} (z, x, y, features) VALUES (?1, ?2, ?3, ?4)"),
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All rows of the coverage table in record order.
    pub fn read_all(&self) -> Result<Vec<CoverageRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT z, x, y, features FROM {} ORDER BY z, x, y",
            self.table
        ))?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let blob: Vec<u8> = row.get(3)?;
            let feature_id = CoverageRecord::feature_id_from_blob(&blob).ok_or_else(|| {
                StoreError::Backend(format!("features blob has {} bytes", blob.len()))
            })?;
            records.push(CoverageRecord {
                z: row.get(0)?,
                x: row.get(1)?,
                y: row.get(2)?,
                feature_id,
            });
        }
        // Blob byte order is not id order.
        records.sort_unstable();
        Ok(records)
    }

    /// Number of rows in the coverage table.
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl CoverageStore for SqliteCoverageStore {
    fn truncate(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute(&format!("DELETE FROM {}", self.table), [])?;
        Ok(())
    }

    fn write_batch(&mut self, records: &[CoverageRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                stmt.execute(params![
                    record.z,
                    record.x,
                    record.y,
                    &record.features_blob()[..]
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use tempfile::TempDir;

    fn records() -> Vec<CoverageRecord> {
        vec![
            CoverageRecord::new(TileCoord::new(10, 5, 6), 2),
            CoverageRecord::new(TileCoord::new(10, 5, 5), 1),
            CoverageRecord::new(TileCoord::new(11, 0, 0), 1),
        ]
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteCoverageStore::open(dir.path().join("out.db"), "temp").unwrap();

        store.write_batch(&records()).unwrap();

        let mut expected = records();
        expected.sort();
        assert_eq!(store.read_all().unwrap(), expected);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_truncate_clears_table() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteCoverageStore::open(dir.path().join("out.db"), "temp").unwrap();
        store.write_batch(&records()).unwrap();

        store.truncate().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("db").join("out.db");
        SqliteCoverageStore::open(&path, "coverage").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.db");
        SqliteCoverageStore::open(&path, "temp")
            .unwrap()
            .write_batch(&records())
            .unwrap();

        let store = SqliteCoverageStore::open(&path, "temp").unwrap();
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.db");
        for name in ["", "1tiles", "temp; DROP TABLE x", "tiles-z"] {
            assert!(matches!(
                SqliteCoverageStore::open(&path, name),
                Err(SetupError::InvalidTableName(_))
            ));
        }
        assert!(is_valid_identifier("tile_cover_2"));
    }
}
