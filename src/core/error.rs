/// gpkgio Error Module
///
/// Defines the error taxonomy for the accessor layer. Every failure is
/// raised immediately to the direct caller; there is no retry and no
/// silent suppression. The one absence-style result in the crate is
/// `GeoPackage::num_features`, which returns `Ok(None)` for a missing
/// layer instead of an error.
use thiserror::Error;

/// Error type covering the whole accessor layer.
#[derive(Error, Debug)]
pub enum GpkgError {
    /// The file could not be opened read-only, or is not a recognized
    /// SQLite database.
    #[error("failed to open database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// SQL failed to compile (malformed statement or schema mismatch),
    /// or a parameter could not be bound.
    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    /// A column read outside the row-available state, an out-of-range
    /// column index, an unknown column name, or a wrong-typed property.
    #[error("invalid access: {0}")]
    InvalidAccess(String),

    /// A feature property that is not present on the record.
    #[error("no such property: {0}")]
    KeyNotFound(String),

    /// The underlying engine failed while stepping a statement.
    #[error("sqlite error: {0}")]
    Sqlite(String),
}

/// Type alias for Result to use GpkgError as the error type.
pub type Result<T> = std::result::Result<T, GpkgError>;
