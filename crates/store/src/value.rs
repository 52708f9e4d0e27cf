use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::collections::BTreeMap;

/// A scalar exchanged with the store, either as a bound parameter or as a
/// column value in a returned [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; aggregates like `AVG()` may come back as
    /// either depending on the input.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row: column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Required integer column.
    pub fn try_i64(&self, column: &str) -> Result<i64> {
        self.get(column).and_then(Value::as_i64).ok_or_raise(|| ErrorKind::Decode(column.to_string()))
    }

    /// Nullable numeric column; `NULL` becomes `None`, a missing column or a
    /// non-numeric value is an error.
    pub fn try_opt_f64(&self, column: &str) -> Result<Option<f64>> {
        match self.get(column) {
            Some(Value::Null) => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_raise(|| ErrorKind::Decode(column.to_string())),
            None => exn::bail!(ErrorKind::Decode(column.to_string())),
        }
    }

    /// Required text column.
    pub fn try_str(&self, column: &str) -> Result<&str> {
        self.get(column).and_then(Value::as_str).ok_or_raise(|| ErrorKind::Decode(column.to_string()))
    }

    /// Nullable text column.
    pub fn try_opt_str(&self, column: &str) -> Result<Option<&str>> {
        match self.get(column) {
            Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.as_str())),
            _ => exn::bail!(ErrorKind::Decode(column.to_string())),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
