//! Purge orchestration for content mutations.
//!
//! The purger subscribes to the mutation bus, derives the purge key set for
//! each event, raises an observability notice, and dispatches the purge to
//! the CDN gateway. A purge is a best-effort side effect: no failure here
//! ever blocks or rolls back the content mutation that triggered it.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::batch;
use crate::deriver::keys_for_mutation;
use crate::error::EngineError;
use crate::events::{EventKind, MutationBus, MutationEvent, MutationHandler};
use crate::gateway::CdnGateway;
use crate::keys::KeySet;
use crate::lock::{rw_read, rw_write};
use crate::registry::TypeRegistry;

const SOURCE: &str = "purger";

const METRIC_PURGE_DISPATCH_TOTAL: &str = "raffica_purge_dispatch_total";
const METRIC_PURGE_FAILED_TOTAL: &str = "raffica_purge_failed_total";
const METRIC_PURGE_DEGRADED_TOTAL: &str = "raffica_purge_degraded_total";
const METRIC_PURGE_KEYS: &str = "raffica_purge_keys";

/// Lifecycle of one purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeState {
    Pending,
    KeysComputed,
    Dispatched,
    Acknowledged,
    Failed,
}

impl PurgeState {
    pub fn as_str(self) -> &'static str {
        match self {
            PurgeState::Pending => "pending",
            PurgeState::KeysComputed => "keys_computed",
            PurgeState::Dispatched => "dispatched",
            PurgeState::Acknowledged => "acknowledged",
            PurgeState::Failed => "failed",
        }
    }
}

/// Observability notice raised once per handled mutation, before dispatch,
/// carrying the final deduplicated key set.
#[derive(Debug, Clone)]
pub struct PurgeNotice {
    pub event_id: Uuid,
    pub event_kind: EventKind,
    pub entity_id: Uuid,
    pub keys: KeySet,
    /// True when derivation degraded to the entity's own key.
    pub degraded: bool,
}

/// Consumes purge notices (logging, test assertions).
pub trait PurgeObserver: Send + Sync {
    fn notify(&self, notice: &PurgeNotice);
}

/// Result of handling one mutation, for direct callers.
#[derive(Debug, Clone)]
pub struct PurgeOutcome {
    pub state: PurgeState,
    pub keys: KeySet,
    pub degraded: bool,
}

pub struct Purger {
    registry: Arc<TypeRegistry>,
    gateway: Arc<dyn CdnGateway>,
    observers: RwLock<Vec<Arc<dyn PurgeObserver>>>,
}

impl Purger {
    pub fn new(registry: Arc<TypeRegistry>, gateway: Arc<dyn CdnGateway>) -> Self {
        Self {
            registry,
            gateway,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observability consumer.
    pub fn observe(&self, observer: Arc<dyn PurgeObserver>) {
        rw_write(&self.observers, SOURCE, "observe").push(observer);
    }

    /// Subscribe this purger to every event kind on the bus.
    pub fn register(self: &Arc<Self>, bus: &MutationBus) {
        for kind in EventKind::ALL {
            bus.subscribe(kind, Arc::clone(self) as Arc<dyn MutationHandler>);
        }
    }

    /// Handle one committed mutation end to end.
    ///
    /// On incomplete entity state, degrades to the narrowest safe set (the
    /// entity's own key) instead of dropping the purge. When a request-scoped
    /// batch is open, keys are captured there and dispatch is deferred to the
    /// batch flush.
    #[instrument(
        skip_all,
        fields(event_id = %event.id, event_kind = event.kind().as_str())
    )]
    pub async fn handle_mutation(&self, event: &MutationEvent) -> PurgeOutcome {
        let state = PurgeState::Pending;
        let entity_id = event.mutation.entity_id();

        let (keys, degraded) = match keys_for_mutation(&self.registry, &event.mutation) {
            Ok(keys) => (keys, false),
            Err(err @ EngineError::IncompleteEntityState { .. }) => {
                warn!(
                    entity = %entity_id,
                    error = %err,
                    "incomplete entity state, degrading purge to the entity key"
                );
                counter!(METRIC_PURGE_DEGRADED_TOTAL).increment(1);
                (KeySet::from([event.mutation.fallback_key()]), true)
            }
            Err(err) => {
                warn!(entity = %entity_id, error = %err, "mutation ignored");
                return PurgeOutcome {
                    state,
                    keys: KeySet::new(),
                    degraded: false,
                };
            }
        };

        let state = PurgeState::KeysComputed;
        if keys.is_empty() {
            debug!(entity = %entity_id, "mutation yields no keys");
            return PurgeOutcome {
                state,
                keys,
                degraded,
            };
        }

        histogram!(METRIC_PURGE_KEYS).record(keys.len() as f64);

        // Observable: final key set, raised before dispatch
        let notice = PurgeNotice {
            event_id: event.id,
            event_kind: event.kind(),
            entity_id,
            keys: keys.clone(),
            degraded,
        };
        for observer in rw_read(&self.observers, SOURCE, "handle_mutation").iter() {
            observer.notify(&notice);
        }
        info!(
            entity = %entity_id,
            key_count = notice.keys.len(),
            degraded,
            "purge keys computed"
        );

        if batch::record(&keys) {
            debug!(entity = %entity_id, "keys captured by request-scoped batch");
            return PurgeOutcome {
                state,
                keys,
                degraded,
            };
        }

        let state = self.dispatch(&keys).await;
        PurgeOutcome {
            state,
            keys,
            degraded,
        }
    }

    /// Dispatch a deduplicated key set to the gateway.
    ///
    /// Also the flush half of [`crate::batch::with_batch`]: pass the
    /// collected union here at request end. Gateway failures are logged and
    /// counted, never retried here; retry policy belongs to the gateway.
    pub async fn dispatch(&self, keys: &KeySet) -> PurgeState {
        if keys.is_empty() {
            return PurgeState::KeysComputed;
        }
        match self.gateway.purge(keys).await {
            Ok(ack) => {
                info!(keys_accepted = ack.keys_accepted, "purge acknowledged");
                counter!(METRIC_PURGE_DISPATCH_TOTAL).increment(1);
                PurgeState::Acknowledged
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "purge dispatch failed; content mutation unaffected"
                );
                counter!(METRIC_PURGE_FAILED_TOTAL).increment(1);
                PurgeState::Failed
            }
        }
    }
}

#[async_trait]
impl MutationHandler for Purger {
    async fn handle(&self, event: &MutationEvent) {
        self.handle_mutation(event).await;
    }
}
