//! Instrumented store wrapper for testing.

use super::{Executor, Store, Transaction};
use crate::error::{ErrorKind, Result};
use crate::{Row, StoreHandle, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Journal {
    /// Each command with the transaction it ran in, if any.
    commands: Vec<(String, Option<usize>)>,
    poison: Vec<String>,
    begun: usize,
    committed: Vec<usize>,
}
impl Journal {
    fn admit(&mut self, store: &str, command: &str, transaction: Option<usize>) -> Result<()> {
        self.commands.push((command.to_string(), transaction));
        if self.poison.iter().any(|needle| command.contains(needle.as_str())) {
            exn::bail!(ErrorKind::Unavailable(store.to_string()));
        }
        Ok(())
    }
}

/// Wraps a real store, records every command it is asked to run, and fails
/// commands that mention a poisoned fragment (usually a table name) with
/// [`ErrorKind::Unavailable`].
///
/// # Examples
///
/// ```
/// use folio_store::backend::{MockStore, SqliteStore};
/// use folio_store::{Store, error::ErrorKind};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let inner = SqliteStore::connect_in_memory("catalog").await.unwrap();
/// let store = MockStore::new(Arc::new(inner));
/// store.poison("book_authors").await;
///
/// let err = store.execute("SELECT * FROM book_authors", &[]).await.unwrap_err();
/// assert!(matches!(&*err, ErrorKind::Unavailable(_)));
/// assert_eq!(store.executed().await, 1);
/// # }
/// ```
#[derive(Clone)]
pub struct MockStore {
    inner: StoreHandle,
    journal: Arc<Mutex<Journal>>,
}

impl MockStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self {
            inner,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Fail every later command whose text contains `fragment`.
    pub async fn poison(&self, fragment: impl Into<String>) {
        self.journal.lock().await.poison.push(fragment.into());
    }

    /// Number of commands issued so far (including failed ones).
    pub async fn executed(&self) -> usize {
        self.journal.lock().await.commands.len()
    }

    /// Every command issued so far, in order.
    pub async fn commands(&self) -> Vec<String> {
        self.journal.lock().await.commands.iter().map(|(command, _)| command.clone()).collect()
    }

    /// For every command issued so far, the transaction it ran in. Transactions
    /// are numbered from 1 in the order they were begun; `None` means the
    /// command ran outside of any transaction.
    pub async fn transactions(&self) -> Vec<Option<usize>> {
        self.journal.lock().await.commands.iter().map(|(_, transaction)| *transaction).collect()
    }

    /// Number of transactions begun so far.
    pub async fn begun(&self) -> usize {
        self.journal.lock().await.begun
    }

    /// Transactions committed so far, in commit order.
    pub async fn committed(&self) -> Vec<usize> {
        self.journal.lock().await.committed.clone()
    }
}

#[async_trait]
impl Store for MockStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.journal.lock().await.admit(self.inner.name(), command, None)?;
        self.inner.execute(command, params).await
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let inner = self.inner.begin().await?;
        let id = {
            let mut journal = self.journal.lock().await;
            journal.begun += 1;
            journal.begun
        };
        Ok(Box::new(MockTransaction {
            id,
            name: self.inner.name().to_string(),
            inner,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct MockTransaction {
    id: usize,
    name: String,
    inner: Box<dyn Transaction>,
    journal: Arc<Mutex<Journal>>,
}

#[async_trait]
impl Executor for MockTransaction {
    async fn fetch_all(&mut self, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.journal.lock().await.admit(&self.name, command, Some(self.id))?;
        self.inner.fetch_all(command, params).await
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MockTransaction { id, inner, journal, .. } = *self;
        inner.commit().await?;
        journal.lock().await.committed.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteStore;

    async fn mock() -> MockStore {
        let inner = SqliteStore::connect_in_memory("mock").await.unwrap();
        MockStore::new(Arc::new(inner))
    }

    #[tokio::test]
    async fn test_records_commands() {
        let store = mock().await;
        store.execute("SELECT 1 AS one", &[]).await.unwrap();
        store.execute("SELECT 2 AS two", &[]).await.unwrap();
        assert_eq!(store.commands().await, vec!["SELECT 1 AS one", "SELECT 2 AS two"]);
    }

    #[tokio::test]
    async fn test_poison_applies_inside_transactions() {
        let store = mock().await;
        store.poison("two").await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.fetch_all("SELECT 1 AS one", &[]).await.is_ok());
        let err = tx.fetch_all("SELECT 2 AS two", &[]).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.executed().await, 2);
    }

    #[tokio::test]
    async fn test_records_transaction_boundaries() {
        let store = mock().await;
        store.execute("SELECT 1 AS one", &[]).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.fetch_all("SELECT 2 AS two", &[]).await.unwrap();
        tx.fetch_all("SELECT 3 AS three", &[]).await.unwrap();
        assert!(store.committed().await.is_empty());
        tx.commit().await.unwrap();

        // Dropped without commit: rolled back, never recorded as committed.
        let mut tx = store.begin().await.unwrap();
        tx.fetch_all("SELECT 4 AS four", &[]).await.unwrap();
        drop(tx);

        assert_eq!(store.transactions().await, vec![None, Some(1), Some(1), Some(2)]);
        assert_eq!(store.begun().await, 2);
        assert_eq!(store.committed().await, vec![1]);
    }
}
