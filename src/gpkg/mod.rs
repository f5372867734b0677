//! GeoPackage layer catalog.
//!
//! A GeoPackage is an SQLite container whose `gpkg_contents` table
//! lists one row per layer (feature table). [`GeoPackage`] snapshots
//! the ordered layer names once at construction and answers layer and
//! row-count queries against that snapshot; it never refreshes.
use std::path::Path;

use tracing::debug;

use crate::core::Result;
use crate::sqlite::{ColumnType, Connection};

pub mod feature;
pub use feature::{Feature, FromValue, Value};

/// Quotes an identifier for interpolation into a statement.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A read-only GeoPackage container.
pub struct GeoPackage {
    db: Connection,
    layers: Vec<String>,
}

impl GeoPackage {
    /// Opens the container and snapshots the layer list from
    /// `gpkg_contents`, ordered by `data_type` descending. The
    /// snapshot order is the query result order, never re-sorted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Connection::open(path)?;
        let mut layers = Vec::new();
        {
            let mut cursor = db.query(
                "SELECT table_name FROM gpkg_contents ORDER BY data_type DESC",
                &[],
            )?;
            loop {
                cursor.next()?;
                if cursor.done() {
                    break;
                }
                layers.push(cursor.get(0usize)?);
            }
        }
        debug!("discovered {} layers in {:?}", layers.len(), db.path());
        Ok(Self { db, layers })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layer names in metadata query order.
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Row count of `layer`, or `None` when no such table exists.
    ///
    /// This is the crate's one absence-style result: callers probing
    /// for a layer get `None` instead of an error.
    pub fn num_features(&self, layer: &str) -> Result<Option<i64>> {
        if !self.db.has_table(layer) {
            return Ok(None);
        }
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(layer));
        let mut cursor = self.db.query(&sql, &[])?;
        cursor.next()?;
        Ok(Some(cursor.get(0usize)?))
    }

    /// Materializes every row of `layer` into [`Feature`] records.
    ///
    /// Follows the GeoPackage feature-table convention: the `fid`
    /// column becomes the id, `geom` the geometry blob, and every
    /// other non-NULL cell a typed property. A missing layer fails at
    /// statement compilation.
    pub fn features(&self, layer: &str) -> Result<Vec<Feature>> {
        let sql = format!("SELECT * FROM {}", quote_ident(layer));
        let mut cursor = self.db.query(&sql, &[])?;
        let names = cursor.column_names().to_vec();

        let mut features = Vec::new();
        loop {
            cursor.next()?;
            if cursor.done() {
                break;
            }
            let mut feature = Feature::new();
            for (idx, name) in names.iter().enumerate() {
                match name.as_str() {
                    "fid" => feature.set_id(cursor.get(idx)?),
                    "geom" => feature.set_geometry(cursor.get::<_, Vec<u8>>(idx)?),
                    _ => {
                        let value = match cursor.column_type(idx)? {
                            ColumnType::Integer => Some(Value::Integer(cursor.get(idx)?)),
                            ColumnType::Real => Some(Value::Real(cursor.get(idx)?)),
                            ColumnType::Text => Some(Value::Text(cursor.get(idx)?)),
                            ColumnType::Blob => Some(Value::Blob(cursor.get(idx)?)),
                            ColumnType::Null => None,
                        };
                        if let Some(value) = value {
                            feature.set(name, value);
                        }
                    }
                }
            }
            features.push(feature);
        }
        debug!("materialized {} features from '{}'", features.len(), layer);
        Ok(features)
    }

    /// The underlying read-only connection.
    pub fn connection(&self) -> &Connection {
        &self.db
    }
}
