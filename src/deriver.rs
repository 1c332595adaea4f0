//! Pure surrogate-key derivation.
//!
//! The single place where key sets are computed, shared by the emitter (tag
//! outgoing responses) and the purger (react to mutations). Because both
//! paths call the same derivation, the key set attached to a response is
//! exactly the set that, if purged, invalidates that response.
//!
//! Derivation is a pure function of snapshot and registry state: identical
//! inputs always yield identical key sets, and nothing is persisted.

use std::collections::BTreeSet;

use tracing::warn;
use uuid::Uuid;

use crate::domain::ItemSnapshot;
use crate::error::EngineError;
use crate::events::Mutation;
use crate::keys::{KeySet, SurrogateKey};
use crate::registry::TypeRegistry;
use crate::view::{ResolvedEntity, View, ViewKind};

/// Keys for a resolved render-time view.
///
/// Fails with [`EngineError::IncompleteEntityState`] when a single-item view
/// carries a snapshot without materialized term assignments; callers should
/// degrade to [`fallback_view_keys`] rather than drop the tag entirely.
pub fn keys_for_view(registry: &TypeRegistry, view: &View) -> Result<KeySet, EngineError> {
    let mut keys = context_keys(view);

    for entity in &view.entities {
        match entity {
            ResolvedEntity::Item(item) => {
                keys.insert(SurrogateKey::Post(item.id));
                if view.kind == ViewKind::Single {
                    item_term_relation_keys(registry, item, &mut keys)?;
                }
            }
            ResolvedEntity::Term(id) => {
                keys.insert(SurrogateKey::Term(*id));
            }
            ResolvedEntity::User(id) => {
                keys.insert(SurrogateKey::User(*id));
            }
        }
    }

    Ok(keys)
}

/// Total fallback for view derivation: context plus direct entity keys,
/// without term-relation expansion. Used when a snapshot is incomplete.
pub fn fallback_view_keys(view: &View) -> KeySet {
    let mut keys = context_keys(view);
    for entity in &view.entities {
        keys.insert(match entity {
            ResolvedEntity::Item(item) => SurrogateKey::Post(item.id),
            ResolvedEntity::Term(id) => SurrogateKey::Term(*id),
            ResolvedEntity::User(id) => SurrogateKey::User(*id),
        });
    }
    keys
}

fn context_keys(view: &View) -> KeySet {
    let mut keys = KeySet::new();
    match &view.kind {
        ViewKind::Home => {
            keys.insert(SurrogateKey::Home);
        }
        ViewKind::Front => {
            keys.insert(SurrogateKey::Front);
        }
        ViewKind::AuthorArchive { author } => {
            keys.insert(SurrogateKey::User(*author));
        }
        ViewKind::TermArchive { term } => {
            keys.insert(SurrogateKey::Term(*term));
        }
        ViewKind::Single
        | ViewKind::TypeArchive { .. }
        | ViewKind::DateArchive
        | ViewKind::RestCollection
        | ViewKind::RestItem => {}
    }
    keys
}

/// Keys to purge for a content-repository mutation.
///
/// Item mutations derive over both the before and after snapshot, so an item
/// leaving a listing and an item entering one are both captured.
pub fn keys_for_mutation(
    registry: &TypeRegistry,
    mutation: &Mutation,
) -> Result<KeySet, EngineError> {
    let mut keys = KeySet::new();

    match mutation {
        Mutation::ItemCreated { after } => {
            item_keys(registry, after, &mut keys)?;
        }
        Mutation::ItemUpdated { before, after } => {
            item_keys(registry, before, &mut keys)?;
            item_keys(registry, after, &mut keys)?;
        }
        Mutation::ItemTrashed { before }
        | Mutation::ItemDeleted { before }
        | Mutation::AttachmentDeleted { before } => {
            item_keys(registry, before, &mut keys)?;
        }
        Mutation::TermsReassigned { before, after } => {
            item_keys(registry, before, &mut keys)?;
            item_keys(registry, after, &mut keys)?;
            for term in changed_terms(before, after)? {
                keys.insert(SurrogateKey::PostTerm(term));
            }
        }
        Mutation::TermCreated { term }
        | Mutation::TermUpdated { term }
        | Mutation::TermDeleted { term } => {
            keys.insert(SurrogateKey::Term(term.id));
            keys.insert(SurrogateKey::PostTerm(term.id));
        }
        Mutation::UserCacheCleaned { user } => {
            keys.insert(SurrogateKey::User(*user));
        }
        Mutation::ItemCacheCleaned { item } => {
            keys.insert(SurrogateKey::Post(*item));
        }
        Mutation::TermCacheCleaned { term } => {
            keys.insert(SurrogateKey::Term(*term));
        }
        // Kinds added by newer repositories on the non-exhaustive enum.
        #[allow(unreachable_patterns)]
        other => {
            return Err(EngineError::unknown_event(other.kind().as_str()));
        }
    }

    Ok(keys)
}

/// Keys contributed by one item snapshot: the item's own key, its term (or
/// default-term) keys, and listing keys when the status makes it publicly
/// listed.
fn item_keys(
    registry: &TypeRegistry,
    item: &ItemSnapshot,
    keys: &mut KeySet,
) -> Result<(), EngineError> {
    keys.insert(SurrogateKey::Post(item.id));

    // Term keys are emitted regardless of publish status: a draft's term
    // listings still count the draft's assignments in admin-facing caches.
    for (taxonomy, terms) in item.assignments()? {
        let Some(config) = registry.taxonomy(taxonomy) else {
            warn!(taxonomy = %taxonomy, item = %item.id, "taxonomy not registered, skipping");
            continue;
        };
        if terms.is_empty() {
            if let Some(default) = config.default_term {
                keys.insert(SurrogateKey::Term(default));
            }
        } else {
            for term in terms {
                keys.insert(SurrogateKey::Term(*term));
            }
        }
    }

    if item.is_published()
        && let Some(config) = registry.content_type(&item.kind)
    {
        if config.public {
            keys.insert(SurrogateKey::Home);
            keys.insert(SurrogateKey::Front);
        }
        if config.author_archives
            && let Some(author) = item.author
        {
            keys.insert(SurrogateKey::User(author));
        }
    }

    Ok(())
}

/// `post-term-` keys for the terms an item page displays, so term edits
/// purge the item pages showing the term. Applies the same default-term
/// fallback as [`item_keys`].
fn item_term_relation_keys(
    registry: &TypeRegistry,
    item: &ItemSnapshot,
    keys: &mut KeySet,
) -> Result<(), EngineError> {
    for (taxonomy, terms) in item.assignments()? {
        let Some(config) = registry.taxonomy(taxonomy) else {
            warn!(taxonomy = %taxonomy, item = %item.id, "taxonomy not registered, skipping");
            continue;
        };
        if terms.is_empty() {
            if let Some(default) = config.default_term {
                keys.insert(SurrogateKey::PostTerm(default));
            }
        } else {
            for term in terms {
                keys.insert(SurrogateKey::PostTerm(*term));
            }
        }
    }
    Ok(())
}

/// Terms entering or leaving the item's assignment between two snapshots.
fn changed_terms(
    before: &ItemSnapshot,
    after: &ItemSnapshot,
) -> Result<BTreeSet<Uuid>, EngineError> {
    let before_terms: BTreeSet<Uuid> = before
        .assignments()?
        .values()
        .flatten()
        .copied()
        .collect();
    let after_terms: BTreeSet<Uuid> = after
        .assignments()?
        .values()
        .flatten()
        .copied()
        .collect();
    Ok(before_terms
        .symmetric_difference(&after_terms)
        .copied()
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::domain::{ItemStatus, TermAssignments, TermSnapshot};
    use crate::registry::{TaxonomyConfig, TypeConfig};

    fn registry(default_category: Uuid) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_type(
            "post",
            TypeConfig {
                rest_base: "posts".to_string(),
                public: true,
                has_archive: false,
                author_archives: true,
            },
        );
        registry.register_type(
            "product",
            TypeConfig {
                rest_base: "products".to_string(),
                public: true,
                has_archive: true,
                author_archives: false,
            },
        );
        registry.register_taxonomy(
            "category",
            TaxonomyConfig {
                rest_base: "categories".to_string(),
                hierarchical: true,
                default_term: Some(default_category),
            },
        );
        registry.register_taxonomy(
            "post_tag",
            TaxonomyConfig {
                rest_base: "tags".to_string(),
                hierarchical: false,
                default_term: None,
            },
        );
        registry
    }

    fn post(status: ItemStatus, author: Uuid, terms: TermAssignments) -> ItemSnapshot {
        ItemSnapshot {
            id: Uuid::new_v4(),
            kind: "post".to_string(),
            status,
            author: Some(author),
            terms: Some(terms),
            published_at: None,
        }
    }

    fn assignments(pairs: &[(&str, &[Uuid])]) -> TermAssignments {
        pairs
            .iter()
            .map(|(taxonomy, terms)| {
                (
                    (*taxonomy).to_string(),
                    terms.iter().copied().collect::<BTreeSet<Uuid>>(),
                )
            })
            .collect()
    }

    #[test]
    fn published_post_yields_listing_keys() {
        let default_category = Uuid::new_v4();
        let tag = Uuid::new_v4();
        let author = Uuid::new_v4();
        let registry = registry(default_category);
        let item = post(
            ItemStatus::Published,
            author,
            assignments(&[("category", &[]), ("post_tag", &[tag])]),
        );

        let keys = keys_for_mutation(
            &registry,
            &Mutation::ItemCreated {
                after: item.clone(),
            },
        )
        .unwrap();

        let expected: KeySet = [
            SurrogateKey::Post(item.id),
            SurrogateKey::User(author),
            SurrogateKey::Home,
            SurrogateKey::Front,
            SurrogateKey::Term(default_category),
            SurrogateKey::Term(tag),
        ]
        .into();
        assert_eq!(keys, expected);
    }

    #[test]
    fn draft_to_draft_update_stays_narrow() {
        let default_category = Uuid::new_v4();
        let author = Uuid::new_v4();
        let registry = registry(default_category);
        let before = post(
            ItemStatus::Draft,
            author,
            assignments(&[("category", &[])]),
        );
        let mut after = before.clone();
        after.published_at = None;

        let keys = keys_for_mutation(&registry, &Mutation::ItemUpdated { before, after })
            .unwrap();

        assert!(!keys.contains(&SurrogateKey::Home));
        assert!(!keys.contains(&SurrogateKey::Front));
        assert!(!keys.contains(&SurrogateKey::User(author)));
        assert!(keys.contains(&SurrogateKey::Term(default_category)));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn unpublish_unions_before_and_after() {
        let default_category = Uuid::new_v4();
        let author = Uuid::new_v4();
        let registry = registry(default_category);
        let before = post(
            ItemStatus::Published,
            author,
            assignments(&[("category", &[])]),
        );
        let mut after = before.clone();
        after.status = ItemStatus::Draft;

        let keys = keys_for_mutation(&registry, &Mutation::ItemUpdated { before, after })
            .unwrap();

        // The before state was listed, so listing keys survive the union.
        assert!(keys.contains(&SurrogateKey::Home));
        assert!(keys.contains(&SurrogateKey::Front));
        assert!(keys.contains(&SurrogateKey::User(author)));
    }

    #[test]
    fn trash_equals_delete() {
        let default_category = Uuid::new_v4();
        let registry = registry(default_category);
        let item = post(
            ItemStatus::Published,
            Uuid::new_v4(),
            assignments(&[("category", &[])]),
        );

        let trashed = keys_for_mutation(
            &registry,
            &Mutation::ItemTrashed {
                before: item.clone(),
            },
        )
        .unwrap();
        let deleted =
            keys_for_mutation(&registry, &Mutation::ItemDeleted { before: item }).unwrap();

        assert_eq!(trashed, deleted);
    }

    #[test]
    fn term_mutation_is_exactly_two_keys() {
        let registry = registry(Uuid::new_v4());
        let term = TermSnapshot {
            id: Uuid::new_v4(),
            taxonomy: "post_tag".to_string(),
        };

        for mutation in [
            Mutation::TermCreated { term: term.clone() },
            Mutation::TermUpdated { term: term.clone() },
            Mutation::TermDeleted { term: term.clone() },
        ] {
            let keys = keys_for_mutation(&registry, &mutation).unwrap();
            let expected: KeySet = [
                SurrogateKey::Term(term.id),
                SurrogateKey::PostTerm(term.id),
            ]
            .into();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn reassignment_covers_both_terms() {
        let default_category = Uuid::new_v4();
        let registry = registry(default_category);
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let author = Uuid::new_v4();
        let before = post(
            ItemStatus::Published,
            author,
            assignments(&[("post_tag", &[t1])]),
        );
        let mut after = before.clone();
        after.terms = Some(assignments(&[("post_tag", &[t2])]));

        let keys =
            keys_for_mutation(&registry, &Mutation::TermsReassigned { before, after }).unwrap();

        assert!(keys.contains(&SurrogateKey::Term(t1)));
        assert!(keys.contains(&SurrogateKey::Term(t2)));
        assert!(keys.contains(&SurrogateKey::PostTerm(t1)));
        assert!(keys.contains(&SurrogateKey::PostTerm(t2)));
        assert!(keys.contains(&SurrogateKey::Home));
    }

    #[test]
    fn author_key_respects_type_config() {
        let registry = registry(Uuid::new_v4());
        let author = Uuid::new_v4();
        let mut item = post(ItemStatus::Published, author, TermAssignments::new());
        item.kind = "product".to_string();

        let keys =
            keys_for_mutation(&registry, &Mutation::ItemCreated { after: item }).unwrap();

        // Products are public but carry no author archives.
        assert!(keys.contains(&SurrogateKey::Home));
        assert!(!keys.contains(&SurrogateKey::User(author)));
    }

    #[test]
    fn unregistered_taxonomy_is_skipped() {
        let registry = registry(Uuid::new_v4());
        let stray = Uuid::new_v4();
        let item = post(
            ItemStatus::Draft,
            Uuid::new_v4(),
            assignments(&[("color", &[stray])]),
        );
        let id = item.id;

        let keys =
            keys_for_mutation(&registry, &Mutation::ItemCreated { after: item }).unwrap();

        let expected: KeySet = [SurrogateKey::Post(id)].into();
        assert_eq!(keys, expected);
    }

    #[test]
    fn missing_assignments_fail_with_incomplete_state() {
        let registry = registry(Uuid::new_v4());
        let mut item = post(ItemStatus::Published, Uuid::new_v4(), TermAssignments::new());
        item.terms = None;

        let err =
            keys_for_mutation(&registry, &Mutation::ItemCreated { after: item }).unwrap_err();
        assert!(matches!(err, EngineError::IncompleteEntityState { .. }));
    }

    #[test]
    fn derivation_is_idempotent() {
        let default_category = Uuid::new_v4();
        let registry = registry(default_category);
        let item = post(
            ItemStatus::Published,
            Uuid::new_v4(),
            assignments(&[("category", &[]), ("post_tag", &[Uuid::new_v4()])]),
        );
        let mutation = Mutation::ItemCreated { after: item };

        let first = keys_for_mutation(&registry, &mutation).unwrap();
        let second = keys_for_mutation(&registry, &mutation).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn user_cache_clean_is_user_key_only() {
        let registry = registry(Uuid::new_v4());
        let user = Uuid::new_v4();

        let keys =
            keys_for_mutation(&registry, &Mutation::UserCacheCleaned { user }).unwrap();
        let expected: KeySet = [SurrogateKey::User(user)].into();
        assert_eq!(keys, expected);
    }

    #[test]
    fn cache_clean_events_stay_narrow() {
        let registry = registry(Uuid::new_v4());
        let id = Uuid::new_v4();

        let item_keys =
            keys_for_mutation(&registry, &Mutation::ItemCacheCleaned { item: id }).unwrap();
        assert_eq!(item_keys, KeySet::from([SurrogateKey::Post(id)]));

        let term_keys =
            keys_for_mutation(&registry, &Mutation::TermCacheCleaned { term: id }).unwrap();
        assert_eq!(term_keys, KeySet::from([SurrogateKey::Term(id)]));
    }

    #[test]
    fn home_view_keys() {
        let registry = registry(Uuid::new_v4());
        let items: Vec<ItemSnapshot> = (0..2)
            .map(|_| {
                post(
                    ItemStatus::Published,
                    Uuid::new_v4(),
                    TermAssignments::new(),
                )
            })
            .collect();
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        let keys = keys_for_view(&registry, &View::home(items)).unwrap();

        assert!(keys.contains(&SurrogateKey::Home));
        for id in ids {
            assert!(keys.contains(&SurrogateKey::Post(id)));
        }
        assert!(!keys.contains(&SurrogateKey::Front));
    }

    #[test]
    fn single_view_expands_term_relations() {
        let default_category = Uuid::new_v4();
        let registry = registry(default_category);
        let tag = Uuid::new_v4();
        let item = post(
            ItemStatus::Published,
            Uuid::new_v4(),
            assignments(&[("category", &[]), ("post_tag", &[tag])]),
        );
        let id = item.id;

        let keys = keys_for_view(&registry, &View::single(item)).unwrap();

        let expected: KeySet = [
            SurrogateKey::Post(id),
            SurrogateKey::PostTerm(tag),
            SurrogateKey::PostTerm(default_category),
        ]
        .into();
        assert_eq!(keys, expected);
    }

    #[test]
    fn rest_item_carries_no_term_relations() {
        let registry = registry(Uuid::new_v4());
        let tag = Uuid::new_v4();
        let item = post(
            ItemStatus::Published,
            Uuid::new_v4(),
            assignments(&[("post_tag", &[tag])]),
        );
        let id = item.id;

        let keys =
            keys_for_view(&registry, &View::rest_item(ResolvedEntity::Item(item))).unwrap();

        let expected: KeySet = [SurrogateKey::Post(id)].into();
        assert_eq!(keys, expected);
    }

    #[test]
    fn fallback_skips_term_expansion() {
        let author = Uuid::new_v4();
        let mut item = post(ItemStatus::Published, author, TermAssignments::new());
        item.terms = None;
        let id = item.id;
        let view = View::single(item);

        let registry = registry(Uuid::new_v4());
        assert!(keys_for_view(&registry, &view).is_err());

        let keys = fallback_view_keys(&view);
        assert_eq!(keys, KeySet::from([SurrogateKey::Post(id)]));
    }
}
