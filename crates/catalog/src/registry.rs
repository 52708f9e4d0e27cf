//! Static metadata for every entity type in the catalog.
//!
//! The change-detection engine, the facet filter and the attachment view are
//! all written against these tables instead of against individual entity
//! types. Only identifiers from here are ever formatted into SQL text.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// Which logical store handle serves an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StoreRole {
    #[display("catalog")]
    Catalog,
    #[display("metadata")]
    Metadata,
}

/// Every entity type with its own last-modified timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum EntityKind {
    #[display("item")]
    Item,
    #[display("category")]
    Category,
    #[display("tag")]
    Tag,
    #[display("author")]
    Author,
    #[display("publisher")]
    Publisher,
    #[display("translator")]
    Translator,
}

/// The five attribute dimensions an item can be related to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Facet {
    #[display("category")]
    Category,
    #[display("tag")]
    Tag,
    #[display("author")]
    Author,
    #[display("publisher")]
    Publisher,
    #[display("translator")]
    Translator,
}

/// Table layout of one entity type.
#[derive(Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub table: &'static str,
    pub key: &'static str,
    /// Unix-seconds column compared against `since`.
    pub modified: &'static str,
    /// Human readable column (title or name).
    pub label: &'static str,
    pub store: StoreRole,
}

/// Join table relating a facet entity to items.
#[derive(Debug, PartialEq, Eq)]
pub struct Relation {
    pub facet: Facet,
    pub table: &'static str,
    pub item_key: &'static str,
    pub facet_key: &'static str,
    /// Whether per-item lookups honour `since`. A facet without it returns its
    /// full related set even when a `since` is given.
    pub tracks_changes: bool,
}

static ENTITIES: [Entity; 6] = [
    Entity {
        kind: EntityKind::Item,
        table: "books",
        key: "id",
        modified: "modified_at",
        label: "title",
        store: StoreRole::Catalog,
    },
    Entity {
        kind: EntityKind::Category,
        table: "categories",
        key: "id",
        modified: "modified_at",
        label: "name",
        store: StoreRole::Catalog,
    },
    Entity {
        kind: EntityKind::Tag,
        table: "tags",
        key: "id",
        modified: "modified_at",
        label: "name",
        store: StoreRole::Catalog,
    },
    Entity {
        kind: EntityKind::Author,
        table: "authors",
        key: "id",
        modified: "modified_at",
        label: "name",
        store: StoreRole::Catalog,
    },
    Entity {
        kind: EntityKind::Publisher,
        table: "publishers",
        key: "id",
        modified: "modified_at",
        label: "name",
        store: StoreRole::Catalog,
    },
    Entity {
        kind: EntityKind::Translator,
        table: "translators",
        key: "id",
        modified: "modified_at",
        label: "name",
        store: StoreRole::Catalog,
    },
];

static RELATIONS: [Relation; 5] = [
    Relation {
        facet: Facet::Category,
        table: "book_categories",
        item_key: "book_id",
        facet_key: "category_id",
        tracks_changes: true,
    },
    Relation {
        facet: Facet::Tag,
        table: "book_tags",
        item_key: "book_id",
        facet_key: "tag_id",
        tracks_changes: true,
    },
    Relation {
        facet: Facet::Author,
        table: "book_authors",
        item_key: "book_id",
        facet_key: "author_id",
        tracks_changes: true,
    },
    Relation {
        facet: Facet::Publisher,
        table: "book_publishers",
        item_key: "book_id",
        facet_key: "publisher_id",
        tracks_changes: true,
    },
    // Translator lookups have never been incremental; callers get the full
    // set and `FacetAttachments::incremental` says so.
    Relation {
        facet: Facet::Translator,
        table: "book_translators",
        item_key: "book_id",
        facet_key: "translator_id",
        tracks_changes: false,
    },
];

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Item,
        Self::Category,
        Self::Tag,
        Self::Author,
        Self::Publisher,
        Self::Translator,
    ];

    pub fn entity(self) -> &'static Entity {
        &ENTITIES[self as usize]
    }

    /// The facet this entity type is, if it is one.
    pub fn facet(self) -> Option<Facet> {
        match self {
            Self::Item => None,
            Self::Category => Some(Facet::Category),
            Self::Tag => Some(Facet::Tag),
            Self::Author => Some(Facet::Author),
            Self::Publisher => Some(Facet::Publisher),
            Self::Translator => Some(Facet::Translator),
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    /// Accepts singular and plural names; `book` is an alias for `item`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "item" | "items" | "book" | "books" => Self::Item,
            "category" | "categories" => Self::Category,
            "tag" | "tags" => Self::Tag,
            "author" | "authors" => Self::Author,
            "publisher" | "publishers" => Self::Publisher,
            "translator" | "translators" => Self::Translator,
            _ => exn::bail!(ErrorKind::UnknownEntity(s.to_string())),
        })
    }
}

impl Facet {
    pub const ALL: [Facet; 5] = [Self::Category, Self::Tag, Self::Author, Self::Publisher, Self::Translator];

    pub fn entity(self) -> &'static Entity {
        EntityKind::from(self).entity()
    }

    pub fn relation(self) -> &'static Relation {
        &RELATIONS[self as usize]
    }

    /// Whether attachment lookups for this facet can be restricted to
    /// records modified after a given time.
    pub fn tracks_changes(self) -> bool {
        self.relation().tracks_changes
    }
}

impl From<Facet> for EntityKind {
    fn from(facet: Facet) -> Self {
        match facet {
            Facet::Category => Self::Category,
            Facet::Tag => Self::Tag,
            Facet::Author => Self::Author,
            Facet::Publisher => Self::Publisher,
            Facet::Translator => Self::Translator,
        }
    }
}

impl FromStr for Facet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = s.parse::<EntityKind>()?;
        match kind.facet() {
            Some(facet) => Ok(facet),
            None => exn::bail!(ErrorKind::UnknownEntity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_tables_are_indexed_by_discriminant() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.entity().kind, kind);
        }
        for facet in Facet::ALL {
            assert_eq!(facet.relation().facet, facet);
            assert_eq!(facet.entity().kind, EntityKind::from(facet));
        }
    }

    #[rstest]
    #[case("book", EntityKind::Item)]
    #[case("Items", EntityKind::Item)]
    #[case("categories", EntityKind::Category)]
    #[case(" tag ", EntityKind::Tag)]
    #[case("AUTHOR", EntityKind::Author)]
    #[case("publishers", EntityKind::Publisher)]
    #[case("translator", EntityKind::Translator)]
    fn test_parse_entity_kind(#[case] input: &str, #[case] expected: EntityKind) {
        assert_eq!(input.parse::<EntityKind>().unwrap(), expected);
    }

    #[rstest]
    #[case("subscription")]
    #[case("")]
    #[case("book_tags")]
    fn test_unknown_entity(#[case] input: &str) {
        let err = input.parse::<EntityKind>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownEntity(name) if name == input));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_item_is_not_a_facet() {
        let err = "book".parse::<Facet>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownEntity(_)));
        assert_eq!("authors".parse::<Facet>().unwrap(), Facet::Author);
    }

    #[test]
    fn test_only_translators_ignore_since() {
        let untracked = Facet::ALL.into_iter().filter(|f| !f.tracks_changes()).collect::<Vec<_>>();
        assert_eq!(untracked, vec![Facet::Translator]);
    }
}
