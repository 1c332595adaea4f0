//! Mutation events and the typed publisher/subscriber bus.
//!
//! The content repository publishes one event per durable mutation, carrying
//! the before/after snapshots it captured around the commit. Handlers
//! register per event kind; there is no ambient hook registry.
//!
//! Publishing happens strictly after the mutation is durably committed, so a
//! reader can never re-populate the edge with pre-mutation data after the
//! purge lands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{ItemSnapshot, TermSnapshot};
use crate::keys::SurrogateKey;
use crate::lock::{rw_read, rw_write};

const SOURCE: &str = "events";

/// Monotonic epoch for ordering events within one process.
pub type Epoch = u64;

/// Discriminant of a mutation, used for typed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemCreated,
    ItemUpdated,
    ItemTrashed,
    ItemDeleted,
    TermsReassigned,
    TermCreated,
    TermUpdated,
    TermDeleted,
    UserCacheCleaned,
    AttachmentDeleted,
    ItemCacheCleaned,
    TermCacheCleaned,
}

impl EventKind {
    /// Every kind the engine dispatches on; used by the purger to register
    /// one handler across the board.
    pub const ALL: [EventKind; 12] = [
        EventKind::ItemCreated,
        EventKind::ItemUpdated,
        EventKind::ItemTrashed,
        EventKind::ItemDeleted,
        EventKind::TermsReassigned,
        EventKind::TermCreated,
        EventKind::TermUpdated,
        EventKind::TermDeleted,
        EventKind::UserCacheCleaned,
        EventKind::AttachmentDeleted,
        EventKind::ItemCacheCleaned,
        EventKind::TermCacheCleaned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ItemCreated => "item_created",
            EventKind::ItemUpdated => "item_updated",
            EventKind::ItemTrashed => "item_trashed",
            EventKind::ItemDeleted => "item_deleted",
            EventKind::TermsReassigned => "terms_reassigned",
            EventKind::TermCreated => "term_created",
            EventKind::TermUpdated => "term_updated",
            EventKind::TermDeleted => "term_deleted",
            EventKind::UserCacheCleaned => "user_cache_cleaned",
            EventKind::AttachmentDeleted => "attachment_deleted",
            EventKind::ItemCacheCleaned => "item_cache_cleaned",
            EventKind::TermCacheCleaned => "term_cache_cleaned",
        }
    }
}

/// A content mutation with the snapshots captured around it.
///
/// Before is absent for creates, after is absent for deletes. Marked
/// non-exhaustive so repositories can grow new kinds without breaking
/// subscribers; unknown kinds are ignored and logged downstream.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Mutation {
    ItemCreated { after: ItemSnapshot },
    ItemUpdated { before: ItemSnapshot, after: ItemSnapshot },
    ItemTrashed { before: ItemSnapshot },
    ItemDeleted { before: ItemSnapshot },
    TermsReassigned { before: ItemSnapshot, after: ItemSnapshot },
    TermCreated { term: TermSnapshot },
    TermUpdated { term: TermSnapshot },
    TermDeleted { term: TermSnapshot },
    UserCacheCleaned { user: Uuid },
    AttachmentDeleted { before: ItemSnapshot },
    ItemCacheCleaned { item: Uuid },
    TermCacheCleaned { term: Uuid },
}

impl Mutation {
    pub fn kind(&self) -> EventKind {
        match self {
            Mutation::ItemCreated { .. } => EventKind::ItemCreated,
            Mutation::ItemUpdated { .. } => EventKind::ItemUpdated,
            Mutation::ItemTrashed { .. } => EventKind::ItemTrashed,
            Mutation::ItemDeleted { .. } => EventKind::ItemDeleted,
            Mutation::TermsReassigned { .. } => EventKind::TermsReassigned,
            Mutation::TermCreated { .. } => EventKind::TermCreated,
            Mutation::TermUpdated { .. } => EventKind::TermUpdated,
            Mutation::TermDeleted { .. } => EventKind::TermDeleted,
            Mutation::UserCacheCleaned { .. } => EventKind::UserCacheCleaned,
            Mutation::AttachmentDeleted { .. } => EventKind::AttachmentDeleted,
            Mutation::ItemCacheCleaned { .. } => EventKind::ItemCacheCleaned,
            Mutation::TermCacheCleaned { .. } => EventKind::TermCacheCleaned,
        }
    }

    /// Id of the entity the mutation is about.
    pub fn entity_id(&self) -> Uuid {
        match self {
            Mutation::ItemCreated { after } => after.id,
            Mutation::ItemUpdated { after, .. } => after.id,
            Mutation::ItemTrashed { before }
            | Mutation::ItemDeleted { before }
            | Mutation::AttachmentDeleted { before } => before.id,
            Mutation::TermsReassigned { after, .. } => after.id,
            Mutation::TermCreated { term }
            | Mutation::TermUpdated { term }
            | Mutation::TermDeleted { term } => term.id,
            Mutation::UserCacheCleaned { user } => *user,
            Mutation::ItemCacheCleaned { item } => *item,
            Mutation::TermCacheCleaned { term } => *term,
        }
    }

    /// Narrowest safe key when full derivation is impossible: the entity's
    /// own key alone.
    pub fn fallback_key(&self) -> SurrogateKey {
        match self {
            Mutation::ItemCreated { .. }
            | Mutation::ItemUpdated { .. }
            | Mutation::ItemTrashed { .. }
            | Mutation::ItemDeleted { .. }
            | Mutation::TermsReassigned { .. }
            | Mutation::AttachmentDeleted { .. }
            | Mutation::ItemCacheCleaned { .. } => SurrogateKey::Post(self.entity_id()),
            Mutation::TermCreated { .. }
            | Mutation::TermUpdated { .. }
            | Mutation::TermDeleted { .. }
            | Mutation::TermCacheCleaned { .. } => SurrogateKey::Term(self.entity_id()),
            Mutation::UserCacheCleaned { user } => SurrogateKey::User(*user),
        }
    }
}

/// A published mutation with idempotency and ordering metadata.
#[derive(Debug, Clone)]
pub struct MutationEvent {
    /// Unique identifier for idempotency.
    pub id: Uuid,
    /// Monotonic epoch within this process.
    pub epoch: Epoch,
    pub timestamp: OffsetDateTime,
    pub mutation: Mutation,
}

impl MutationEvent {
    pub fn new(mutation: Mutation, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            timestamp: OffsetDateTime::now_utc(),
            mutation,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.mutation.kind()
    }
}

/// Receives published mutation events.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn handle(&self, event: &MutationEvent);
}

/// Typed publisher/subscriber surface of the content repository.
///
/// Handlers register per event kind and are invoked inline, in registration
/// order, within the publishing call.
#[derive(Default)]
pub struct MutationBus {
    handlers: RwLock<HashMap<EventKind, Vec<Arc<dyn MutationHandler>>>>,
    epoch_counter: AtomicU64,
}

impl MutationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn MutationHandler>) {
        rw_write(&self.handlers, SOURCE, "subscribe")
            .entry(kind)
            .or_default()
            .push(handler);
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish one committed mutation to its subscribers.
    pub async fn publish(&self, mutation: Mutation) {
        let event = MutationEvent::new(mutation, self.next_epoch());

        // Observable: log event publication
        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind().as_str(),
            entity = %event.mutation.entity_id(),
            "mutation published"
        );

        let handlers: Vec<Arc<dyn MutationHandler>> = rw_read(&self.handlers, SOURCE, "publish")
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            debug!(event_kind = event.kind().as_str(), "no subscribers for kind");
            return;
        }

        for handler in handlers {
            handler.handle(&event).await;
        }
    }
}
