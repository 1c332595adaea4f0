//! Raffica — surrogate-key invalidation for edge-cached content.
//!
//! Keeps an edge/CDN cache consistent with an underlying content store by
//! tagging every cached response with stable dependency keys and, on every
//! content mutation, computing the exact set of keys to purge:
//!
//! - mutation → [`MutationBus`] → [`Purger`] → [`keys_for_mutation`] →
//!   [`CdnGateway::purge`]
//! - render → View Resolver → [`surrogate_key_layer`] → [`keys_for_view`] →
//!   `Surrogate-Key` response header
//!
//! Both paths share one deriver, so the key set attached to a response is
//! exactly the set that, if purged, invalidates that response.
//!
//! ## Configuration
//!
//! Settings load from `raffica.toml` plus `RAFFICA_*` environment variables:
//!
//! ```toml
//! [emitter]
//! header_name = "Surrogate-Key"
//!
//! [gateway]
//! endpoint = "http://127.0.0.1:8080/purge"
//! timeout_ms = 2000
//! ```

pub mod batch;
pub mod config;
pub mod deriver;
pub mod domain;
pub mod emitter;
pub mod error;
pub mod events;
pub mod gateway;
pub mod keys;
mod lock;
pub mod purger;
pub mod registry;
pub mod telemetry;
pub mod view;

pub use config::{EmitterSettings, EngineConfig, GatewaySettings, LogFormat, LoggingSettings};
pub use deriver::{fallback_view_keys, keys_for_mutation, keys_for_view};
pub use domain::{ItemSnapshot, ItemStatus, TermAssignments, TermSnapshot};
pub use emitter::{
    DEFAULT_SURROGATE_HEADER, EmitterState, set_cache_tag_header, surrogate_key_layer,
};
pub use error::EngineError;
pub use events::{EventKind, Mutation, MutationBus, MutationEvent, MutationHandler};
pub use gateway::{CdnGateway, GatewayError, HttpGateway, PurgeAck};
pub use keys::{KeySet, SurrogateKey, render_keys};
pub use purger::{PurgeNotice, PurgeObserver, PurgeOutcome, PurgeState, Purger};
pub use registry::{TaxonomyConfig, TypeConfig, TypeRegistry};
pub use view::{ResolvedEntity, View, ViewKind};
