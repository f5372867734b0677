// Core infrastructure modules
pub mod core;

// Accessor modules
pub mod gpkg;
pub mod sqlite;

// Re-export the common entry points at the crate root
pub use crate::core::{GpkgError, Result};
pub use crate::gpkg::{Feature, GeoPackage, Value};
pub use crate::sqlite::{Connection, Cursor};
