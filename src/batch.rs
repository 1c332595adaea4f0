//! Request-scoped purge batching.
//!
//! Uses `tokio::task_local!` so one outer request causing multiple mutations
//! (bulk operations) accumulates keys in request-scoped state and flushes a
//! single deduplicated purge call at request end, bounding gateway call
//! volume.

use std::cell::RefCell;

use crate::keys::KeySet;

tokio::task_local! {
    static BATCH: RefCell<KeySet>;
}

/// Record keys into the active batch.
///
/// Returns `true` when a batch scope captured the keys (the caller must not
/// dispatch them itself); `false` when no batch is open.
pub fn record(keys: &KeySet) -> bool {
    BATCH
        .try_with(|batch| batch.borrow_mut().extend(keys.iter().copied()))
        .is_ok()
}

/// Whether a batch scope is open on the current task.
pub fn is_open() -> bool {
    BATCH.try_with(|_| ()).is_ok()
}

/// Run an async block with a batch scope.
///
/// Every key set the purger would have dispatched inside `f` is captured
/// instead. Returns the block's result and the deduplicated union, ready for
/// a single gateway flush.
pub async fn with_batch<F, R>(f: F) -> (R, KeySet)
where
    F: Future<Output = R>,
{
    BATCH
        .scope(RefCell::new(KeySet::new()), async move {
            let result = f.await;
            let collected = BATCH.with(|batch| batch.borrow().clone());
            (result, collected)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SurrogateKey;

    #[tokio::test]
    async fn record_without_batch_reports_unbatched() {
        let keys = KeySet::from([SurrogateKey::Home]);
        assert!(!record(&keys));
        assert!(!is_open());
    }

    #[tokio::test]
    async fn batch_captures_and_deduplicates() {
        let ((), collected) = with_batch(async {
            assert!(is_open());
            assert!(record(&KeySet::from([
                SurrogateKey::Home,
                SurrogateKey::Front
            ])));
            assert!(record(&KeySet::from([SurrogateKey::Home])));
        })
        .await;

        assert_eq!(
            collected,
            KeySet::from([SurrogateKey::Home, SurrogateKey::Front])
        );
    }

    #[tokio::test]
    async fn batch_scope_ends_with_future() {
        let ((), collected) = with_batch(async {}).await;
        assert!(collected.is_empty());
        assert!(!is_open());
    }
}
