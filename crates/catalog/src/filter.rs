//! Multi-facet filtering.
//!
//! Ids inside one facet are alternatives (OR); facets are combined with AND.
//! A facet the request leaves out, or names with an empty list, is filled
//! with every id currently in that facet's table before the intersection
//! runs. An item that is linked to nothing in some facet can therefore never
//! be returned.

use crate::catalog::Catalog;
use crate::error::{ErrorKind, Result};
use crate::models::{Id, id_list, row_id};
use crate::registry::{EntityKind, Facet, StoreRole};
use folio_config::Consistency;
use folio_store::{Autocommit, Executor, Value};
use serde::Deserialize;
use tracing::instrument;

/// The ids requested per facet.
///
/// Deserializes from the request body shape callers already send:
/// `{"category_ids": [1, 2], "author_ids": [7]}`. Other keys in the body
/// (paging, sorting) are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FacetFilter {
    pub category_ids: Option<Vec<Id>>,
    pub tag_ids: Option<Vec<Id>>,
    pub author_ids: Option<Vec<Id>>,
    pub publisher_ids: Option<Vec<Id>>,
    pub translator_ids: Option<Vec<Id>>,
}

impl FacetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested ids for one facet, replacing any earlier list.
    pub fn with(mut self, facet: Facet, ids: impl IntoIterator<Item = Id>) -> Self {
        *self.slot(facet) = Some(ids.into_iter().collect());
        self
    }

    /// Requested ids for a facet; `None` when the facet is absent or empty.
    pub fn get(&self, facet: Facet) -> Option<&[Id]> {
        let ids = match facet {
            Facet::Category => &self.category_ids,
            Facet::Tag => &self.tag_ids,
            Facet::Author => &self.author_ids,
            Facet::Publisher => &self.publisher_ids,
            Facet::Translator => &self.translator_ids,
        };
        ids.as_deref().filter(|ids| !ids.is_empty())
    }

    /// True when no facet names a single id.
    pub fn is_empty(&self) -> bool {
        Facet::ALL.into_iter().all(|facet| self.get(facet).is_none())
    }

    fn slot(&mut self, facet: Facet) -> &mut Option<Vec<Id>> {
        match facet {
            Facet::Category => &mut self.category_ids,
            Facet::Tag => &mut self.tag_ids,
            Facet::Author => &mut self.author_ids,
            Facet::Publisher => &mut self.publisher_ids,
            Facet::Translator => &mut self.translator_ids,
        }
    }
}

/// Every id in a facet's table, ascending.
async fn facet_universe<E: Executor + ?Sized>(exec: &mut E, facet: Facet) -> Result<Vec<Id>> {
    let entity = facet.entity();
    let command = format!("SELECT {key} AS id FROM {table} ORDER BY {key}", key = entity.key, table = entity.table);
    let rows = exec.fetch_all(&command, &[]).await.map_err(ErrorKind::store)?;
    rows.iter().map(|row| row_id(row, "id")).collect()
}

/// `SELECT id FROM books WHERE id IN (..) AND id IN (..) ...`, one membership
/// test per facet, with placeholder `?n` carrying the nth facet's id list.
fn intersection_command() -> String {
    let item = EntityKind::Item.entity();
    let clauses = Facet::ALL
        .iter()
        .enumerate()
        .map(|(index, facet)| {
            let relation = facet.relation();
            format!(
                "{key} IN (SELECT {item_key} FROM {join} WHERE {facet_key} IN (SELECT value FROM json_each(?{n})))",
                key = item.key,
                item_key = relation.item_key,
                join = relation.table,
                facet_key = relation.facet_key,
                n = index + 1,
            )
        })
        .collect::<Vec<_>>();
    format!(
        "SELECT {key} AS id FROM {table} WHERE {clauses} ORDER BY {key}",
        key = item.key,
        table = item.table,
        clauses = clauses.join(" AND "),
    )
}

/// Default-fill every facet the filter leaves out, then intersect.
async fn compose<E: Executor + ?Sized>(exec: &mut E, filter: &FacetFilter) -> Result<Vec<Id>> {
    let mut params: Vec<Value> = Vec::with_capacity(Facet::ALL.len());
    for facet in Facet::ALL {
        let value = match filter.get(facet) {
            Some(ids) => id_list(ids)?,
            None => {
                let universe = facet_universe(exec, facet).await?;
                tracing::debug!(%facet, ids = universe.len(), "Facet omitted from filter, using every known id");
                id_list(&universe)?
            },
        };
        params.push(value);
    }
    let rows = exec.fetch_all(&intersection_command(), &params).await.map_err(ErrorKind::store)?;
    rows.iter().map(|row| row_id(row, "id")).collect()
}

impl Catalog {
    /// Ids of the items related to at least one requested id in every facet,
    /// ascending.
    ///
    /// At least one facet must name at least one id; otherwise this fails
    /// with [`ErrorKind::NoFilterProvided`] before the store is touched.
    #[instrument(level = "debug", skip(self, filter), fields(consistency = ?self.options().consistency))]
    pub async fn find_by_facets(&self, filter: &FacetFilter) -> Result<Vec<Id>> {
        if filter.is_empty() {
            exn::bail!(ErrorKind::NoFilterProvided);
        }
        let store = self.store(StoreRole::Catalog);
        let items = match self.options().consistency {
            Consistency::ReadCommitted => compose(&mut Autocommit(store.as_ref()), filter).await?,
            Consistency::Serializable => {
                let mut tx = store.begin().await.map_err(ErrorKind::store)?;
                let items = compose(tx.as_mut(), filter).await?;
                tx.commit().await.map_err(ErrorKind::store)?;
                items
            },
        };
        tracing::debug!(items = items.len(), "Resolved facet filter");
        Ok(items)
    }

    /// Every id currently known for one facet, ascending.
    pub async fn list_all_ids(&self, facet: Facet) -> Result<Vec<Id>> {
        let store = self.store(facet.entity().store);
        facet_universe(&mut Autocommit(store.as_ref()), facet).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use folio_config::QueryConfig;
    use rstest::rstest;

    fn ids(ids: &[i64]) -> Vec<Id> {
        ids.iter().copied().map(Id::new).collect()
    }

    fn serializable() -> QueryConfig {
        QueryConfig {
            consistency: Consistency::Serializable,
            ..QueryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_filter_is_rejected_before_any_query() {
        let (catalog, mock) = fixture::mocked(QueryConfig::default()).await;
        for filter in [FacetFilter::new(), FacetFilter::new().with(Facet::Tag, ids(&[]))] {
            let err = catalog.find_by_facets(&filter).await.unwrap_err();
            assert!(matches!(&*err, ErrorKind::NoFilterProvided));
            assert!(!err.is_retryable());
        }
        assert_eq!(mock.executed().await, 0);
    }

    #[rstest]
    // Categories 1 or 5, written by author 8: only Solaris.
    #[case(FacetFilter::new().with(Facet::Category, ids(&[1, 5])).with(Facet::Author, ids(&[8])), &[102])]
    #[case(FacetFilter::new().with(Facet::Category, ids(&[1])).with(Facet::Author, ids(&[7])), &[100, 101])]
    #[case(FacetFilter::new().with(Facet::Category, ids(&[5])), &[102, 103])]
    #[case(FacetFilter::new().with(Facet::Tag, ids(&[9, 10])), &[100, 101, 102, 103])]
    #[case(FacetFilter::new().with(Facet::Translator, ids(&[31])).with(Facet::Publisher, ids(&[22])), &[103])]
    #[case(FacetFilter::new().with(Facet::Category, ids(&[3])), &[])]
    #[case(FacetFilter::new().with(Facet::Category, ids(&[404])), &[])]
    #[tokio::test]
    async fn test_find_by_facets(#[case] filter: FacetFilter, #[case] expected: &[i64]) {
        let catalog = fixture::catalog().await;
        assert_eq!(catalog.find_by_facets(&filter).await.unwrap(), ids(expected));
    }

    #[tokio::test]
    async fn test_omitted_facet_equals_explicit_universe() {
        let catalog = fixture::catalog().await;
        let partial = FacetFilter::new().with(Facet::Category, ids(&[1]));
        let mut full = partial.clone();
        for facet in [Facet::Tag, Facet::Author, Facet::Publisher, Facet::Translator] {
            full = full.with(facet, catalog.list_all_ids(facet).await.unwrap());
        }
        let expected = catalog.find_by_facets(&full).await.unwrap();
        assert_eq!(catalog.find_by_facets(&partial).await.unwrap(), expected);
        assert_eq!(expected, ids(&[100, 101, 102, 103]));
    }

    #[tokio::test]
    async fn test_item_missing_a_facet_never_matches() {
        let catalog = fixture::catalog().await;
        // Book 42 has no translator, so default-filling translators drops it
        // even though every facet it does have is requested.
        let filter = FacetFilter::new()
            .with(Facet::Category, ids(&[1]))
            .with(Facet::Tag, ids(&[11]))
            .with(Facet::Author, ids(&[13]))
            .with(Facet::Publisher, ids(&[22]));
        assert!(catalog.find_by_facets(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adding_ids_never_shrinks_the_result() {
        let catalog = fixture::catalog().await;
        let narrow = FacetFilter::new().with(Facet::Tag, ids(&[9])).with(Facet::Author, ids(&[7]));
        let wide = narrow.clone().with(Facet::Tag, ids(&[9, 10]));
        let narrow = catalog.find_by_facets(&narrow).await.unwrap();
        let wide = catalog.find_by_facets(&wide).await.unwrap();
        assert!(narrow.iter().all(|id| wide.contains(id)));
        assert_eq!(wide, ids(&[100, 101]));
    }

    #[tokio::test]
    async fn test_serializable_runs_in_one_transaction() {
        let (catalog, mock) = fixture::mocked(serializable()).await;
        let filter = FacetFilter::new().with(Facet::Category, ids(&[1, 5])).with(Facet::Author, ids(&[8]));
        assert_eq!(catalog.find_by_facets(&filter).await.unwrap(), ids(&[102]));
        // Three default-fill lookups and the intersection, all inside the one
        // transaction, which is committed.
        assert_eq!(mock.transactions().await, vec![Some(1); 4]);
        assert_eq!(mock.begun().await, 1);
        assert_eq!(mock.committed().await, vec![1]);
    }

    #[tokio::test]
    async fn test_read_committed_runs_without_a_transaction() {
        let (catalog, mock) = fixture::mocked(QueryConfig::default()).await;
        let filter = FacetFilter::new().with(Facet::Category, ids(&[1, 5])).with(Facet::Author, ids(&[8]));
        assert_eq!(catalog.find_by_facets(&filter).await.unwrap(), ids(&[102]));
        assert_eq!(mock.transactions().await, vec![None; 4]);
        assert_eq!(mock.begun().await, 0);
    }

    #[rstest]
    #[case(QueryConfig::default())]
    #[case(serializable())]
    #[tokio::test]
    async fn test_unavailable_store(#[case] options: QueryConfig) {
        let (catalog, mock) = fixture::mocked(options).await;
        mock.poison("FROM publishers").await;
        let filter = FacetFilter::new().with(Facet::Category, ids(&[1]));
        let err = catalog.find_by_facets(&filter).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::StoreUnavailable));
    }

    #[tokio::test]
    async fn test_list_all_ids() {
        let catalog = fixture::catalog().await;
        assert_eq!(catalog.list_all_ids(Facet::Category).await.unwrap(), ids(&[1, 2, 3, 5]));
        assert_eq!(catalog.list_all_ids(Facet::Translator).await.unwrap(), ids(&[30, 31]));
    }

    #[test]
    fn test_filter_from_request_body() {
        let filter: FacetFilter = serde_json::from_str(r#"{"category_ids": [1, 5], "tag_ids": []}"#).unwrap();
        assert_eq!(filter.get(Facet::Category), Some(&ids(&[1, 5])[..]));
        assert_eq!(filter.get(Facet::Tag), None);
        assert_eq!(filter.get(Facet::Author), None);
        assert!(!filter.is_empty());

        let filter: FacetFilter = serde_json::from_str(r#"{"author_ids": [7], "page": 2, "genre_ids": [1]}"#).unwrap();
        assert_eq!(filter, FacetFilter::new().with(Facet::Author, ids(&[7])));

        let filter: FacetFilter = serde_json::from_str(r#"{"genre_ids": [1]}"#).unwrap();
        assert!(filter.is_empty());
    }
}
