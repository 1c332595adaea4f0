//! Resolved render-time views.
//!
//! A `View` is the explicit value the View Resolver hands to the emitter: the
//! set of entities a response was built from, plus the kind of query that
//! produced it. It is always passed by value, never read from shared mutable
//! context.

use uuid::Uuid;

use crate::domain::ItemSnapshot;

/// Query context that produced a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    /// The main homepage query.
    Home,
    /// The static front page.
    Front,
    /// A single item page, terms displayed.
    Single,
    /// An author's archive listing.
    AuthorArchive { author: Uuid },
    /// A term's archive listing.
    TermArchive { term: Uuid },
    /// A content type's own archive listing.
    TypeArchive { kind: String },
    /// A date-bucketed archive (year, month or day).
    DateArchive,
    /// A REST collection of resources.
    RestCollection,
    /// A single REST resource representation.
    RestItem,
}

/// One entity a response was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEntity {
    Item(ItemSnapshot),
    Term(Uuid),
    User(Uuid),
}

/// Resolved set of entities plus context for one response.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub kind: ViewKind,
    pub entities: Vec<ResolvedEntity>,
}

/// Main-query extraction adapter: one constructor per resolved query shape.
impl View {
    pub fn home(items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::Home,
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }

    pub fn front(items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::Front,
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }

    pub fn single(item: ItemSnapshot) -> Self {
        Self {
            kind: ViewKind::Single,
            entities: vec![ResolvedEntity::Item(item)],
        }
    }

    pub fn author_archive(author: Uuid, items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::AuthorArchive { author },
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }

    pub fn term_archive(term: Uuid, items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::TermArchive { term },
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }

    pub fn type_archive(kind: impl Into<String>, items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::TypeArchive { kind: kind.into() },
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }

    pub fn date_archive(items: Vec<ItemSnapshot>) -> Self {
        Self {
            kind: ViewKind::DateArchive,
            entities: items.into_iter().map(ResolvedEntity::Item).collect(),
        }
    }
}

/// REST extraction adapter: resolved-entity shapes differ from the main
/// query (users and terms appear as first-class resources), but both funnel
/// into the same deriver.
impl View {
    pub fn rest_collection(entities: Vec<ResolvedEntity>) -> Self {
        Self {
            kind: ViewKind::RestCollection,
            entities,
        }
    }

    pub fn rest_item(entity: ResolvedEntity) -> Self {
        Self {
            kind: ViewKind::RestItem,
            entities: vec![entity],
        }
    }
}
