//! Decoded spatial record model.
//!
//! A [`Feature`] is one row of a feature table: an integer id, the raw
//! WKB geometry bytes (never interpreted here), and a name-to-value
//! property map over the tagged [`Value`] union.
use std::collections::HashMap;

use crate::core::{GpkgError, Result};

/// Tagged union over the property types a feature can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

/// Checked extraction of a native type from a [`Value`].
pub trait FromValue: Sized {
    /// `None` when the value holds a different variant.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// One decoded spatial record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    id: i64,
    geometry: Vec<u8>,
    properties: HashMap<String, Value>,
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub(crate) fn set_geometry(&mut self, wkb: Vec<u8>) {
        self.geometry = wkb;
    }

    /// The stored geometry bytes, uninterpreted.
    pub fn wkb(&self) -> &[u8] {
        &self.geometry
    }

    /// Typed read of a property.
    ///
    /// A property that was never set is `KeyNotFound` (the record is
    /// never mutated by a read); a present property holding a
    /// different variant is `InvalidAccess`.
    pub fn get<T: FromValue>(&self, property: &str) -> Result<T> {
        let value = self
            .properties
            .get(property)
            .ok_or_else(|| GpkgError::KeyNotFound(property.to_string()))?;
        T::from_value(value).ok_or_else(|| {
            GpkgError::InvalidAccess(format!("property '{}' holds a different type", property))
        })
    }

    /// Inserts or replaces a property.
    pub fn set<T: Into<Value>>(&mut self, property: &str, value: T) {
        self.properties.insert(property.to_string(), value.into());
    }

    /// Names of the properties present on this record (unordered).
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}
