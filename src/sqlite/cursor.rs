//! Lazy row cursor over one compiled statement.
//!
//! The cursor is a forward-moving state machine: it starts before the
//! first row (`current_row == -1`), each `next()` performs one engine
//! step, and once the result set is exhausted further `next()` calls
//! are no-ops until an explicit `reset()`. Column values are decoded
//! on demand, only while the cursor is positioned on a row.
use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::NonNull;

use rusqlite::ffi;

use super::Connection;
use crate::core::{GpkgError, Result};

/// Owned native statement handle, finalized exactly once on drop.
pub(crate) struct StmtHandle(NonNull<ffi::sqlite3_stmt>);

impl StmtHandle {
    /// `None` when the engine produced no statement (empty input).
    pub(crate) fn new(raw: *mut ffi::sqlite3_stmt) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub(crate) fn ptr(&self) -> *mut ffi::sqlite3_stmt {
        self.0.as_ptr()
    }
}

impl Drop for StmtHandle {
    fn drop(&mut self) {
        unsafe {
            ffi::sqlite3_finalize(self.0.as_ptr());
        }
    }
}

/// Storage class of one cell in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Null,
}

/// A stateful reader over one query's result rows.
///
/// Borrowing the [`Connection`] ties the statement's lifetime to the
/// open handle: the borrow checker guarantees every cursor is dropped
/// (finalizing its statement) before the connection closes.
pub struct Cursor<'conn> {
    conn: &'conn Connection,
    stmt: StmtHandle,
    current_row: i64,
    finished: bool,
    column_names: Vec<String>,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(conn: &'conn Connection, stmt: StmtHandle) -> Self {
        let count = unsafe { ffi::sqlite3_column_count(stmt.ptr()) } as usize;
        let mut column_names = Vec::with_capacity(count);
        for i in 0..count {
            let name = unsafe {
                let ptr = ffi::sqlite3_column_name(stmt.ptr(), i as c_int);
                if ptr.is_null() {
                    String::new()
                } else {
                    CStr::from_ptr(ptr).to_string_lossy().into_owned()
                }
            };
            column_names.push(name);
        }
        Self {
            conn,
            stmt,
            current_row: -1,
            finished: false,
            column_names,
        }
    }

    /// Advances to the next row.
    ///
    /// Once the result set is exhausted this is a no-op; `current_row`
    /// and the finished flag stay unchanged until [`Cursor::reset`].
    pub fn next(&mut self) -> Result<&mut Self> {
        if self.finished {
            return Ok(self);
        }
        match unsafe { ffi::sqlite3_step(self.stmt.ptr()) } {
            ffi::SQLITE_ROW => {
                self.current_row += 1;
                Ok(self)
            }
            ffi::SQLITE_DONE => {
                self.finished = true;
                Ok(self)
            }
            _ => Err(GpkgError::Sqlite(self.conn.last_error())),
        }
    }

    /// Rewinds the statement for re-execution.
    ///
    /// Fully returns the cursor to its pre-iteration state, clearing
    /// the finished flag, so a fresh `next()` sequence reproduces the
    /// original results.
    pub fn reset(&mut self) -> Result<&mut Self> {
        let rc = unsafe { ffi::sqlite3_reset(self.stmt.ptr()) };
        if rc != ffi::SQLITE_OK {
            return Err(GpkgError::Sqlite(self.conn.last_error()));
        }
        self.current_row = -1;
        self.finished = false;
        Ok(self)
    }

    /// True once iteration has passed the last row.
    pub fn done(&self) -> bool {
        self.finished
    }

    /// Index of the row the cursor is positioned on, or −1 before the
    /// first `next()`.
    pub fn current_row(&self) -> i64 {
        self.current_row
    }

    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Column names in result order, captured once at creation.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Position of `name` among the columns (case-sensitive exact
    /// match), or `None` if absent.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|n| n == name)
    }

    /// Storage class of the cell at `col` in the current row.
    pub fn column_type(&self, col: usize) -> Result<ColumnType> {
        self.require_row()?;
        let idx = col.resolve(self)?;
        let ty = unsafe { ffi::sqlite3_column_type(self.stmt.ptr(), idx as c_int) };
        Ok(match ty {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Real,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        })
    }

    /// Decodes the current row's cell at `col` (an index or a column
    /// name) as `T`.
    ///
    /// The cursor must be positioned on a row: calling before the
    /// first `next()` or after exhaustion is `InvalidAccess`, as is an
    /// out-of-range index or an unknown name.
    pub fn get<I, T>(&self, col: I) -> Result<T>
    where
        I: ColumnIndex,
        T: ColumnValue,
    {
        self.require_row()?;
        let idx = col.resolve(self)?;
        Ok(unsafe { T::read(self.stmt.ptr(), idx as c_int) })
    }

    fn require_row(&self) -> Result<()> {
        if self.current_row < 0 {
            Err(GpkgError::InvalidAccess(
                "cursor has not advanced to a row yet".to_string(),
            ))
        } else if self.finished {
            Err(GpkgError::InvalidAccess(
                "cursor is past the last row".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// A caller-supplied column reference: either a zero-based index or a
/// column name.
pub trait ColumnIndex {
    fn resolve(&self, cursor: &Cursor<'_>) -> Result<usize>;
}

impl ColumnIndex for usize {
    fn resolve(&self, cursor: &Cursor<'_>) -> Result<usize> {
        if *self < cursor.column_count() {
            Ok(*self)
        } else {
            Err(GpkgError::InvalidAccess(format!(
                "column index {} out of range ({} columns)",
                self,
                cursor.column_count()
            )))
        }
    }
}

impl ColumnIndex for &str {
    fn resolve(&self, cursor: &Cursor<'_>) -> Result<usize> {
        cursor
            .column_index(self)
            .ok_or_else(|| GpkgError::InvalidAccess(format!("no column named '{}'", self)))
    }
}

/// Decodes one cell of the current row into a native value.
///
/// `read` is only invoked with a live statement positioned on a row
/// and a bounds-checked index; the cursor enforces both.
pub trait ColumnValue: Sized {
    #[doc(hidden)]
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self;
}

impl ColumnValue for i64 {
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self {
        ffi::sqlite3_column_int64(stmt, idx)
    }
}

impl ColumnValue for i32 {
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self {
        ffi::sqlite3_column_int64(stmt, idx) as i32
    }
}

impl ColumnValue for f64 {
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self {
        ffi::sqlite3_column_double(stmt, idx)
    }
}

impl ColumnValue for String {
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self {
        // text must be requested before its byte length, per the
        // sqlite3_column_* conversion rules
        let ptr = ffi::sqlite3_column_text(stmt, idx);
        if ptr.is_null() {
            return String::new();
        }
        let len = ffi::sqlite3_column_bytes(stmt, idx) as usize;
        let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
        // only single-byte-safe text is guaranteed; anything else is
        // decoded lossily
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl ColumnValue for Vec<u8> {
    unsafe fn read(stmt: *mut ffi::sqlite3_stmt, idx: c_int) -> Self {
        let ptr = ffi::sqlite3_column_blob(stmt, idx);
        if ptr.is_null() {
            return Vec::new();
        }
        let len = ffi::sqlite3_column_bytes(stmt, idx) as usize;
        std::slice::from_raw_parts(ptr as *const u8, len).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_fixture(dir: &TempDir) -> Connection {
        let path = dir.path().join("cursor.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE cells (i INTEGER, r REAL, t TEXT, b BLOB, n TEXT);
             INSERT INTO cells VALUES (42, 1.5, 'hello', x'0102', NULL);",
        )
        .unwrap();
        drop(conn);
        Connection::open(path).unwrap()
    }

    #[test]
    fn test_column_metadata_is_captured_at_creation() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let cursor = db.query("SELECT i, t FROM cells", &[]).unwrap();

        assert_eq!(cursor.column_count(), 2);
        assert_eq!(cursor.column_names(), ["i".to_string(), "t".to_string()]);
        assert_eq!(cursor.column_index("i"), Some(0));
        assert_eq!(cursor.column_index("t"), Some(1));
        assert_eq!(cursor.column_index("__missing__"), None);
        assert_eq!(cursor.current_row(), -1);
        assert!(!cursor.done());
    }

    #[test]
    fn test_get_requires_a_row() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT i FROM cells", &[]).unwrap();

        assert!(matches!(
            cursor.get::<_, i64>(0usize),
            Err(GpkgError::InvalidAccess(_))
        ));

        cursor.next().unwrap();
        assert_eq!(cursor.get::<_, i64>(0usize).unwrap(), 42);

        cursor.next().unwrap();
        assert!(cursor.done());
        assert!(matches!(
            cursor.get::<_, i64>(0usize),
            Err(GpkgError::InvalidAccess(_))
        ));
    }

    #[test]
    fn test_out_of_range_and_unknown_column() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT i FROM cells", &[]).unwrap();
        cursor.next().unwrap();

        assert!(matches!(
            cursor.get::<_, i64>(7usize),
            Err(GpkgError::InvalidAccess(_))
        ));
        assert!(matches!(
            cursor.get::<_, i64>("ghost"),
            Err(GpkgError::InvalidAccess(_))
        ));
    }

    #[test]
    fn test_typed_decodes() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT i, r, t, b, n FROM cells", &[]).unwrap();
        cursor.next().unwrap();

        assert_eq!(cursor.get::<_, i64>("i").unwrap(), 42);
        assert_eq!(cursor.get::<_, i32>("i").unwrap(), 42);
        assert!((cursor.get::<_, f64>("r").unwrap() - 1.5).abs() < 1e-9);
        assert_eq!(cursor.get::<_, String>("t").unwrap(), "hello");
        assert_eq!(cursor.get::<_, Vec<u8>>("b").unwrap(), vec![0x01, 0x02]);
        // NULL decodes to the empty value rather than failing
        assert_eq!(cursor.get::<_, String>("n").unwrap(), "");
    }

    #[test]
    fn test_column_type_classification() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT i, r, t, b, n FROM cells", &[]).unwrap();
        cursor.next().unwrap();

        assert_eq!(cursor.column_type(0).unwrap(), ColumnType::Integer);
        assert_eq!(cursor.column_type(1).unwrap(), ColumnType::Real);
        assert_eq!(cursor.column_type(2).unwrap(), ColumnType::Text);
        assert_eq!(cursor.column_type(3).unwrap(), ColumnType::Blob);
        assert_eq!(cursor.column_type(4).unwrap(), ColumnType::Null);
    }

    #[test]
    fn test_next_is_idempotent_after_exhaustion() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT i FROM cells", &[]).unwrap();

        cursor.next().unwrap();
        assert_eq!(cursor.current_row(), 0);
        cursor.next().unwrap();
        assert!(cursor.done());
        assert_eq!(cursor.current_row(), 0);

        for _ in 0..3 {
            cursor.next().unwrap();
            assert!(cursor.done());
            assert_eq!(cursor.current_row(), 0);
        }
    }

    #[test]
    fn test_reset_fully_rewinds() {
        let dir = TempDir::new().unwrap();
        let db = open_fixture(&dir);
        let mut cursor = db.query("SELECT t FROM cells", &[]).unwrap();

        cursor.next().unwrap();
        let first = cursor.get::<_, String>(0usize).unwrap();
        cursor.next().unwrap();
        assert!(cursor.done());

        cursor.reset().unwrap();
        assert_eq!(cursor.current_row(), -1);
        assert!(!cursor.done());
        assert!(matches!(
            cursor.get::<_, String>(0usize),
            Err(GpkgError::InvalidAccess(_))
        ));

        cursor.next().unwrap();
        assert_eq!(cursor.current_row(), 0);
        assert_eq!(cursor.get::<_, String>(0usize).unwrap(), first);
    }
}
