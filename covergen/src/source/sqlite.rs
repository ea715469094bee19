//! SQLite-backed geometry source.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, Rows};
use tracing::debug;

use super::{GeometrySource, SourceError, SourceRow};
use crate::error::SetupError;

/// Query used when none is configured.
pub const DEFAULT_SOURCE_QUERY: &str = "SELECT id, geom FROM polygons";

/// A lazy cursor over `(id, geometry)` rows of one query.
///
/// Wraps the statement's result rows; each call to `next` advances the
/// cursor by one row.
pub struct GeometryStream<'stmt> {
    rows: Rows<'stmt>,
}

impl<'stmt> GeometryStream<'stmt> {
    pub fn new(rows: Rows<'stmt>) -> Self {
        Self { rows }
    }
}

impl Iterator for GeometryStream<'_> {
    type Item = Result<SourceRow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Ok(Some(row)) => Some(read_row(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn read_row(row: &Row<'_>) -> Result<SourceRow, SourceError> {
    let id: i64 = row.get(0)?;
    // Storage classes other than BLOB are a decode problem for the reader's
    // policy, not a cursor failure.
    Ok(match row.get_ref(1)? {
        ValueRef::Blob(bytes) => SourceRow::new(id, bytes.to_vec()),
        ValueRef::Null => SourceRow::new(id, Vec::new()),
        ValueRef::Text(_) => SourceRow::not_binary(id, "text"),
        ValueRef::Integer(_) => SourceRow::not_binary(id, "integer"),
        ValueRef::Real(_) => SourceRow::not_binary(id, "real"),
    })
}

/// Reads polygons from a SQLite database.
///
/// The database is opened read-only; a missing file is a setup failure
/// rather than an empty source.
pub struct SqliteSource {
    conn: Connection,
    path: PathBuf,
    query: String,
    scanned: bool,
}

impl SqliteSource {
    /// Opens the store and checks that `query` prepares and yields at least
    /// two columns (`id`, then the WKB geometry).
    pub fn open(path: impl AsRef<Path>, query: impl Into<String>) -> Result<Self, SetupError> {
        let path = path.as_ref().to_path_buf();
        let query = query.into();

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| SetupError::Open {
            path: path.clone(),
            source,
        })?;

        let columns = conn
            .prepare(&query)
            .map_err(|source| SetupError::Query {
                query: query.clone(),
                source,
            })?
            .column_count();
        if columns < 2 {
            return Err(SetupError::QueryColumns { query, columns });
        }

        debug!(path = %path.display(), query = %query, "Opened geometry source");

        Ok(Self {
            conn,
            path,
            query,
            scanned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Runs the query and hands its cursor to `f`.
    pub fn with_stream<T>(
        &self,
        f: impl FnOnce(GeometryStream<'_>) -> T,
    ) -> Result<T, SourceError> {
        let mut stmt = self.conn.prepare(&self.query)?;
        let rows = stmt.query([])?;
        Ok(f(GeometryStream::new(rows)))
    }
}

impl GeometrySource for SqliteSource {
    fn scan(
        &mut self,
        visit: &mut dyn FnMut(SourceRow) -> ControlFlow<()>,
    ) -> Result<u64, SourceError> {
        if self.scanned {
            return Err(SourceError::Exhausted);
        }
        self.scanned = true;

        self.with_stream(|stream| {
            let mut visited = 0u64;
            for row in stream {
                visited += 1;
                if visit(row?).is_break() {
                    break;
                }
            }
            Ok(visited)
        })?
    }
}
