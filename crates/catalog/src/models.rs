use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use folio_store::{Row, Value};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Opaque identifier of any catalog entity.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(i64);
impl Id {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}
impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A primary catalog item (a book).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: Id,
    pub title: String,
    pub modified_at: UtcDateTime,
}
impl TryFrom<&Row> for Item {
    type Error = Error;
    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row_id(row, "id")?,
            title: row.try_str("title").or_raise(|| ErrorKind::InvalidData("title"))?.to_string(),
            modified_at: row_timestamp(row, "modified_at")?,
        })
    }
}

/// One category, tag, author, publisher or translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRecord {
    pub id: Id,
    pub name: String,
    pub modified_at: UtcDateTime,
}
impl TryFrom<&Row> for FacetRecord {
    type Error = Error;
    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row_id(row, "id")?,
            name: row.try_str("name").or_raise(|| ErrorKind::InvalidData("name"))?.to_string(),
            modified_at: row_timestamp(row, "modified_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: Id,
    /// 1 to 5 stars.
    pub rating: u8,
    pub body: Option<String>,
    pub modified_at: UtcDateTime,
}
impl TryFrom<&Row> for Review {
    type Error = Error;
    fn try_from(row: &Row) -> Result<Self> {
        let rating = row.try_i64("rating").or_raise(|| ErrorKind::InvalidData("rating"))?;
        Ok(Self {
            id: row_id(row, "id")?,
            rating: u8::try_from(rating).or_raise(|| ErrorKind::InvalidData("rating"))?,
            body: row.try_opt_str("body").or_raise(|| ErrorKind::InvalidData("body"))?.map(str::to_string),
            modified_at: row_timestamp(row, "modified_at")?,
        })
    }
}

/// Review summary for one item. An item without reviews rates zero from zero
/// reviews.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rating {
    pub average: f64,
    pub total: u64,
}
impl TryFrom<&Row> for Rating {
    type Error = Error;
    fn try_from(row: &Row) -> Result<Self> {
        let average = row.try_opt_f64("average_rating").or_raise(|| ErrorKind::InvalidData("average rating"))?;
        let total = row.try_i64("total_reviews").or_raise(|| ErrorKind::InvalidData("total reviews"))?;
        Ok(Self {
            average: average.unwrap_or_default(),
            total: u64::try_from(total).or_raise(|| ErrorKind::InvalidData("total reviews"))?,
        })
    }
}

/// Free-form key/value pair from the metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}
impl TryFrom<&Row> for MetadataEntry {
    type Error = Error;
    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            key: row.try_str("key").or_raise(|| ErrorKind::InvalidData("metadata key"))?.to_string(),
            value: row.try_str("value").or_raise(|| ErrorKind::InvalidData("metadata value"))?.to_string(),
        })
    }
}

/// Limit/offset window for listing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}
impl Page {
    pub const fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }

    pub(crate) fn params(&self) -> Result<[Value; 2]> {
        if self.limit == 0 {
            exn::bail!(ErrorKind::InvalidData("limit"));
        }
        let offset = i64::try_from(self.offset).or_raise(|| ErrorKind::InvalidData("offset"))?;
        Ok([Value::Integer(i64::from(self.limit)), Value::Integer(offset)])
    }
}
impl Default for Page {
    fn default() -> Self {
        Self::new(50, 0)
    }
}

pub(crate) fn row_id(row: &Row, column: &'static str) -> Result<Id> {
    row.try_i64(column).map(Id).or_raise(|| ErrorKind::InvalidData(column))
}

fn row_timestamp(row: &Row, column: &'static str) -> Result<UtcDateTime> {
    let seconds = row.try_i64(column).or_raise(|| ErrorKind::InvalidData(column))?;
    UtcDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::InvalidData(column))
}

/// Bind a list of ids as one JSON array parameter, to be expanded in SQL with
/// `json_each(?)`.
pub(crate) fn id_list<'a>(ids: impl IntoIterator<Item = &'a Id>) -> Result<Value> {
    let ids = ids.into_iter().collect::<Vec<_>>();
    serde_json::to_string(&ids).map(Value::Text).or_raise(|| ErrorKind::InvalidData("id list"))
}
