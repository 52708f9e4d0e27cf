//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use exn::ResultExt;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Transport, pool or lock failure; the command never produced a result.
    #[display("store unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The store understood the request and refused it (syntax, schema).
    #[display("store rejected command: {_0}")]
    Command(#[error(not(source))] String),
    /// A returned row could not be decoded.
    #[display("cannot decode column: {_0}")]
    Decode(#[error(not(source))] String),
    #[display("store migration error")]
    Migration,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub(crate) fn from_sqlx(store: &str, err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(store.to_string()),
            sqlx::Error::Database(db) if db.code().is_some_and(|code| is_contention(&code)) => {
                Self::Unavailable(store.to_string())
            },
            sqlx::Error::ColumnDecode { index, .. } => Self::Decode(index.clone()),
            _ => Self::Command(store.to_string()),
        }
    }
}

/// SQLITE_BUSY or SQLITE_LOCKED: someone else holds the database.
///
/// The driver reports extended result codes (`SQLITE_BUSY_TIMEOUT` is 773),
/// whose low byte is the primary code.
fn is_contention(code: &str) -> bool {
    code.parse::<i32>().is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}

/// Raise driver errors into the store error tree, picking the kind from the
/// driver error itself.
pub(crate) trait SqlxResultExt<T> {
    fn or_classify(self, store: &str) -> Result<T>;
}
impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    #[track_caller]
    fn or_classify(self, store: &str) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = ErrorKind::from_sqlx(store, &err);
                Err(err).or_raise(|| kind)
            },
        }
    }
}
