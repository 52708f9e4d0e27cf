//! Plain listing and lookup calls: items, facets, reviews and metadata.

use crate::catalog::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{FacetRecord, Id, Item, MetadataEntry, Page, Rating, Review, id_list, row_id};
use crate::registry::{EntityKind, Facet, StoreRole};
use folio_store::{Row, Value};
use tracing::instrument;

/// Escape `LIKE` wildcards so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn ids(rows: &[Row]) -> Result<Vec<Id>> {
    rows.iter().map(|row| row_id(row, "id")).collect()
}

impl Catalog {
    async fn fetch(&self, role: StoreRole, command: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.store(role).execute(command, params).await.map_err(ErrorKind::store)
    }

    /// Item ids, ascending.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_items(&self, page: Page) -> Result<Vec<Id>> {
        let rows = self.fetch(StoreRole::Catalog, include_str!("../queries/list_items.sql"), &page.params()?).await?;
        ids(&rows)
    }

    pub async fn get_item(&self, id: Id) -> Result<Option<Item>> {
        let rows = self
            .fetch(StoreRole::Catalog, include_str!("../queries/get_item.sql"), &[Value::Integer(id.get())])
            .await?;
        rows.first().map(Item::try_from).transpose()
    }

    /// Items for the given ids, ascending. Unknown ids are skipped.
    pub async fn get_items(&self, ids: &[Id]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.fetch(StoreRole::Catalog, include_str!("../queries/get_items.sql"), &[id_list(ids)?]).await?;
        rows.iter().map(Item::try_from).collect()
    }

    /// Ids of items whose title contains `needle`, case-insensitively for
    /// ASCII.
    #[instrument(level = "debug", skip(self))]
    pub async fn find_items_by_title(&self, needle: &str, page: Page) -> Result<Vec<Id>> {
        let [limit, offset] = page.params()?;
        let params = [Value::Text(like_pattern(needle)), limit, offset];
        let rows = self.fetch(StoreRole::Catalog, include_str!("../queries/find_items_by_title.sql"), &params).await?;
        ids(&rows)
    }

    /// Ids of items with at least one author whose name contains `needle`.
    #[instrument(level = "debug", skip(self))]
    pub async fn find_items_by_author_name(&self, needle: &str, page: Page) -> Result<Vec<Id>> {
        let [limit, offset] = page.params()?;
        let params = [Value::Text(like_pattern(needle)), limit, offset];
        let rows = self
            .fetch(StoreRole::Catalog, include_str!("../queries/find_items_by_author_name.sql"), &params)
            .await?;
        ids(&rows)
    }

    /// Ids of items related to one facet record, ascending.
    #[instrument(level = "debug", skip(self), fields(%facet))]
    pub async fn items_with_facet(&self, facet: Facet, id: Id, page: Page) -> Result<Vec<Id>> {
        let relation = facet.relation();
        let command = format!(
            "SELECT {item_key} AS id FROM {join} WHERE {facet_key} = ?1 ORDER BY {item_key} LIMIT ?2 OFFSET ?3",
            item_key = relation.item_key,
            join = relation.table,
            facet_key = relation.facet_key,
        );
        let [limit, offset] = page.params()?;
        let rows = self.fetch(facet.entity().store, &command, &[Value::Integer(id.get()), limit, offset]).await?;
        ids(&rows)
    }

    /// Records of one facet, ascending by id.
    pub async fn list_facet(&self, facet: Facet, page: Page) -> Result<Vec<FacetRecord>> {
        let entity = facet.entity();
        let command = format!(
            "SELECT {key} AS id, {label} AS name, {modified} AS modified_at FROM {table} ORDER BY {key} LIMIT ?1 OFFSET ?2",
            key = entity.key,
            label = entity.label,
            modified = entity.modified,
            table = entity.table,
        );
        let rows = self.fetch(entity.store, &command, &page.params()?).await?;
        rows.iter().map(FacetRecord::try_from).collect()
    }

    pub async fn get_facet(&self, facet: Facet, id: Id) -> Result<Option<FacetRecord>> {
        let entity = facet.entity();
        let command = format!(
            "SELECT {key} AS id, {label} AS name, {modified} AS modified_at FROM {table} WHERE {key} = ?1",
            key = entity.key,
            label = entity.label,
            modified = entity.modified,
            table = entity.table,
        );
        let rows = self.fetch(entity.store, &command, &[Value::Integer(id.get())]).await?;
        rows.first().map(FacetRecord::try_from).transpose()
    }

    pub async fn reviews(&self, item: Id) -> Result<Vec<Review>> {
        let rows = self
            .fetch(StoreRole::Catalog, include_str!("../queries/list_reviews.sql"), &[Value::Integer(item.get())])
            .await?;
        rows.iter().map(Review::try_from).collect()
    }

    /// Average rating and review count. Zero from zero reviews when there are
    /// none.
    pub async fn rating(&self, item: Id) -> Result<Rating> {
        let rows = self
            .fetch(StoreRole::Catalog, include_str!("../queries/item_rating.sql"), &[Value::Integer(item.get())])
            .await?;
        match rows.first() {
            Some(row) => Rating::try_from(row),
            None => Ok(Rating::default()),
        }
    }

    /// Free-form key/value pairs for an item, from the metadata store.
    pub async fn metadata(&self, item: Id) -> Result<Vec<MetadataEntry>> {
        let rows = self
            .fetch(StoreRole::Metadata, include_str!("../queries/item_metadata.sql"), &[Value::Integer(item.get())])
            .await?;
        tracing::trace!(kind = %EntityKind::Item, %item, entries = rows.len(), "Loaded metadata");
        rows.iter().map(MetadataEntry::try_from).collect()
    }
}
