//! Attachment views: everything related to one item, across all five facets.

use crate::catalog::Catalog;
use crate::changes::modified_after;
use crate::error::{ErrorKind, Result};
use crate::models::{FacetRecord, Id};
use crate::registry::{EntityKind, Facet};
use exn::ResultExt;
use folio_config::Fanout;
use folio_store::Value;
use time::UtcDateTime;
use tracing::instrument;

/// Related records of one facet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FacetAttachments {
    pub records: Vec<FacetRecord>,
    /// Whether `records` was restricted to changes after the requested
    /// `since`. False when no `since` was given, and for facets that don't
    /// track changes per item, which always come back in full.
    pub incremental: bool,
}

impl FacetAttachments {
    pub fn ids(&self) -> Vec<Id> {
        self.records.iter().map(|record| record.id).collect()
    }
}

/// Every facet related to one item. Only ever built whole: if any facet
/// lookup fails, there is no view.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Attachments {
    pub categories: FacetAttachments,
    pub tags: FacetAttachments,
    pub authors: FacetAttachments,
    pub publishers: FacetAttachments,
    pub translators: FacetAttachments,
}

impl Attachments {
    pub fn get(&self, facet: Facet) -> &FacetAttachments {
        match facet {
            Facet::Category => &self.categories,
            Facet::Tag => &self.tags,
            Facet::Author => &self.authors,
            Facet::Publisher => &self.publishers,
            Facet::Translator => &self.translators,
        }
    }
}

impl Catalog {
    /// Records of one facet related to `item`, ascending by id.
    ///
    /// With a `since`, only records modified strictly after it are returned,
    /// unless the facet doesn't track changes; see
    /// [`FacetAttachments::incremental`].
    #[instrument(level = "debug", skip(self), fields(%facet))]
    pub async fn related(&self, item: Id, facet: Facet, since: Option<UtcDateTime>) -> Result<FacetAttachments> {
        let entity = facet.entity();
        let relation = facet.relation();
        let incremental = since.is_some() && relation.tracks_changes;
        if since.is_some() && !incremental {
            tracing::debug!(%facet, "Facet does not track changes, returning the full set");
        }

        let mut command = format!(
            "SELECT f.{key} AS id, f.{label} AS name, f.{modified} AS modified_at \
             FROM {table} AS f JOIN {join} AS j ON j.{facet_key} = f.{key} \
             WHERE j.{item_key} = ?1",
            key = entity.key,
            label = entity.label,
            modified = entity.modified,
            table = entity.table,
            join = relation.table,
            facet_key = relation.facet_key,
            item_key = relation.item_key,
        );
        let mut params = vec![Value::Integer(item.get())];
        if let Some(since) = since.filter(|_| incremental) {
            command.push_str(" AND ");
            command.push_str(&modified_after(entity, Some("f"), 2));
            params.push(Value::Integer(since.unix_timestamp()));
        }
        command.push_str(&format!(" ORDER BY f.{}", entity.key));

        let rows = self.store(entity.store).execute(&command, &params).await.map_err(ErrorKind::store)?;
        let records = rows.iter().map(FacetRecord::try_from).collect::<Result<Vec<_>>>()?;
        Ok(FacetAttachments { records, incremental })
    }

    /// All five facets related to `item`.
    ///
    /// Fails with [`ErrorKind::Aggregation`] naming the first facet whose
    /// lookup failed. An item that doesn't exist has nothing attached and
    /// gets an empty view.
    #[instrument(level = "debug", skip(self), fields(fanout = ?self.options().fanout))]
    pub async fn attachments(&self, item: Id, since: Option<UtcDateTime>) -> Result<Attachments> {
        let fetch = |facet: Facet| async move {
            self.related(item, facet, since).await.or_raise(|| ErrorKind::Aggregation(facet))
        };
        let (categories, tags, authors, publishers, translators) = match self.options().fanout {
            Fanout::Concurrent => futures::try_join!(
                fetch(Facet::Category),
                fetch(Facet::Tag),
                fetch(Facet::Author),
                fetch(Facet::Publisher),
                fetch(Facet::Translator),
            )?,
            Fanout::Sequential => (
                fetch(Facet::Category).await?,
                fetch(Facet::Tag).await?,
                fetch(Facet::Author).await?,
                fetch(Facet::Publisher).await?,
                fetch(Facet::Translator).await?,
            ),
        };
        tracing::trace!(kind = %EntityKind::Item, %item, "Assembled attachment view");
        Ok(Attachments {
            categories,
            tags,
            authors,
            publishers,
            translators,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use folio_config::QueryConfig;
    use rstest::rstest;

    fn at(seconds: i64) -> Option<UtcDateTime> {
        Some(UtcDateTime::from_unix_timestamp(seconds).unwrap())
    }

    fn ids(ids: &[i64]) -> Vec<Id> {
        ids.iter().copied().map(Id::new).collect()
    }

    fn with_fanout(fanout: Fanout) -> QueryConfig {
        QueryConfig {
            fanout,
            ..QueryConfig::default()
        }
    }

    #[rstest]
    #[case(Fanout::Concurrent)]
    #[case(Fanout::Sequential)]
    #[tokio::test]
    async fn test_full_view(#[case] fanout: Fanout) {
        let catalog = fixture::catalog().await.with_options(with_fanout(fanout));
        let view = catalog.attachments(Id::new(102), None).await.unwrap();
        assert_eq!(view.categories.ids(), ids(&[1, 5]));
        assert_eq!(view.tags.ids(), ids(&[10]));
        assert_eq!(view.authors.ids(), ids(&[8]));
        assert_eq!(view.publishers.ids(), ids(&[21]));
        assert_eq!(view.translators.ids(), ids(&[30, 31]));
        assert_eq!(view.authors.records[0].name, "Stanisław Lem");
        assert!(Facet::ALL.iter().all(|facet| !view.get(*facet).incremental));
    }

    #[tokio::test]
    async fn test_view_matches_single_facet_lookups() {
        let catalog = fixture::catalog().await;
        for item in [42, 100, 103].map(Id::new) {
            let view = catalog.attachments(item, None).await.unwrap();
            for facet in Facet::ALL {
                assert_eq!(view.get(facet), &catalog.related(item, facet, None).await.unwrap());
            }
        }
    }

    #[tokio::test]
    async fn test_incremental_view() {
        let catalog = fixture::catalog().await;
        let view = catalog.attachments(Id::new(102), at(2500)).await.unwrap();
        assert_eq!(view.categories.ids(), ids(&[5]));
        assert_eq!(view.tags.ids(), ids(&[10]));
        assert_eq!(view.authors.ids(), ids(&[8]));
        assert_eq!(view.publishers.ids(), ids(&[21]));
        assert!(view.categories.incremental);

        // Translator 30 is older than `since` but still comes back.
        assert_eq!(view.translators.ids(), ids(&[30, 31]));
        assert!(!view.translators.incremental);
    }

    #[tokio::test]
    async fn test_unknown_item_has_an_empty_view() {
        let catalog = fixture::catalog().await;
        let view = catalog.attachments(Id::new(404), None).await.unwrap();
        assert_eq!(view, Attachments::default());
    }

    #[rstest]
    #[case(Fanout::Concurrent)]
    #[case(Fanout::Sequential)]
    #[tokio::test]
    async fn test_one_failed_facet_fails_the_view(#[case] fanout: Fanout) {
        let (catalog, mock) = fixture::mocked(with_fanout(fanout)).await;
        mock.poison("book_authors").await;
        let err = catalog.attachments(Id::new(42), None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Aggregation(Facet::Author)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_related_single_facet() {
        let catalog = fixture::catalog().await;
        let tags = catalog.related(Id::new(42), Facet::Tag, None).await.unwrap();
        assert_eq!(tags.ids(), ids(&[11]));
        let translators = catalog.related(Id::new(42), Facet::Translator, None).await.unwrap();
        assert!(translators.records.is_empty());
    }
}
