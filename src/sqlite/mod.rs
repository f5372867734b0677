//! Read-only SQLite access layer.
//!
//! `Connection` owns the database handle and compiles query strings;
//! every call to [`Connection::query`] hands back a [`Cursor`] that
//! solely owns its prepared statement, so multiple cursors from one
//! connection can coexist without invalidating each other. Cursors
//! borrow the connection, which guarantees statements are finalized
//! before the handle closes.
use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr;

use rusqlite::{ffi, OpenFlags};
use tracing::{debug, error};

use crate::core::{GpkgError, Result};

pub mod cursor;
pub use cursor::{ColumnIndex, ColumnType, ColumnValue, Cursor};

use cursor::StmtHandle;

/// A read-only connection to an SQLite database file.
pub struct Connection {
    conn: rusqlite::Connection,
    path: PathBuf,
}

impl Connection {
    /// Opens `path` strictly read-only.
    ///
    /// SQLite defers reading the file, so a non-database file would
    /// otherwise "open" successfully and fail on the first query; a
    /// schema probe is issued here to surface that case eagerly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| GpkgError::Open {
                path: path.display().to_string(),
                source: e,
            })?;

        if let Err(e) = conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0)) {
            error!("rejected {:?}: {}", path, e);
            return Err(GpkgError::Open {
                path: path.display().to_string(),
                source: e,
            });
        }

        debug!("opened {:?} read-only", path);
        Ok(Self { conn, path })
    }

    /// The file path this connection was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks the schema catalog for a table named `name`.
    ///
    /// Never fails on a well-formed connection; internal errors
    /// collapse to `false`.
    pub fn has_table(&self, name: &str) -> bool {
        self.conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .and_then(|mut stmt| stmt.exists([name]))
            .unwrap_or(false)
    }

    /// Compiles `sql` and returns a cursor over its result rows.
    ///
    /// Each parameter is bound positionally as stringified TEXT; there
    /// is no typed binding. SQLite applies column affinity on
    /// comparison, so numeric parameters still match numeric columns.
    pub fn query(&self, sql: &str, params: &[&dyn Display]) -> Result<Cursor<'_>> {
        debug!("preparing query: {}", sql);
        let text = CString::new(sql)
            .map_err(|_| GpkgError::Prepare("SQL contains an interior NUL byte".to_string()))?;

        let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.conn.handle(),
                text.as_ptr(),
                -1,
                &mut raw,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(GpkgError::Prepare(format!("{}: {}", self.last_error(), sql)));
        }

        // prepare reports OK but yields no statement for empty or
        // comment-only input
        let stmt = match StmtHandle::new(raw) {
            Some(stmt) => stmt,
            None => {
                return Err(GpkgError::Prepare(format!("no statement found in {:?}", sql)));
            }
        };

        for (i, param) in params.iter().enumerate() {
            let value = CString::new(param.to_string()).map_err(|_| {
                GpkgError::Prepare(format!("parameter {} contains an interior NUL byte", i + 1))
            })?;
            let rc = unsafe {
                ffi::sqlite3_bind_text(
                    stmt.ptr(),
                    (i + 1) as c_int,
                    value.as_ptr(),
                    -1,
                    ffi::SQLITE_TRANSIENT(),
                )
            };
            if rc != ffi::SQLITE_OK {
                return Err(GpkgError::Prepare(format!(
                    "binding parameter {}: {}",
                    i + 1,
                    self.last_error()
                )));
            }
        }

        Ok(Cursor::new(self, stmt))
    }

    /// Most recent error message recorded on this connection.
    pub(crate) fn last_error(&self) -> String {
        unsafe {
            let msg = ffi::sqlite3_errmsg(self.conn.handle());
            if msg.is_null() {
                String::new()
            } else {
                CStr::from_ptr(msg).to_string_lossy().into_owned()
            }
        }
    }
}
