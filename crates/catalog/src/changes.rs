//! Change detection.
//!
//! A cache holding copies of catalog records asks which of them are stale.
//! The answer is timestamp based only: a record is stale when its
//! modification time is strictly after the caller's `since`. Records that
//! were deleted, or never existed, are not reported.

use crate::catalog::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{Id, id_list, row_id};
use crate::registry::{Entity, EntityKind};
use folio_store::Value;
use std::collections::BTreeSet;
use time::UtcDateTime;
use tracing::instrument;

/// `"<alias>.<modified> > ?<placeholder>"` for the given entity.
pub(crate) fn modified_after(entity: &Entity, alias: Option<&str>, placeholder: usize) -> String {
    match alias {
        Some(alias) => format!("{alias}.{} > ?{placeholder}", entity.modified),
        None => format!("{} > ?{placeholder}", entity.modified),
    }
}

impl Catalog {
    /// Return the subset of `candidates` modified strictly after `since`.
    ///
    /// Without a `since` the cache is cold and every candidate is stale; the
    /// store is not consulted. An empty candidate set is answered without
    /// consulting the store either.
    #[instrument(level = "debug", skip(self, candidates), fields(since = ?since))]
    pub async fn stale_ids(
        &self,
        kind: EntityKind,
        candidates: impl IntoIterator<Item = Id>,
        since: Option<UtcDateTime>,
    ) -> Result<BTreeSet<Id>> {
        let candidates = candidates.into_iter().collect::<BTreeSet<_>>();
        let Some(since) = since else {
            tracing::trace!(candidates = candidates.len(), "Cold cache, everything is stale");
            return Ok(candidates);
        };
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let entity = kind.entity();
        let command = format!(
            "SELECT {key} AS id FROM {table} WHERE {key} IN (SELECT value FROM json_each(?1)) AND {modified}",
            key = entity.key,
            table = entity.table,
            modified = modified_after(entity, None, 2),
        );
        let params = [id_list(&candidates)?, Value::Integer(since.unix_timestamp())];
        let rows = self.store(entity.store).execute(&command, &params).await.map_err(ErrorKind::store)?;
        let stale = rows.iter().map(|row| row_id(row, "id")).collect::<Result<BTreeSet<_>>>()?;
        tracing::debug!(candidates = candidates.len(), stale = stale.len(), "Checked {kind} records for changes");
        Ok(stale)
    }
}
