//! Response tagging: derive view keys and inject the cache-tag header.
//!
//! The View Resolver places the resolved [`View`] in request extensions; the
//! middleware derives its key set and attaches the configured header before
//! the response flushes. Because this path and the purger share one deriver,
//! the attached set is exactly the set whose purge invalidates the response.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::config::EmitterSettings;
use crate::deriver::{fallback_view_keys, keys_for_view};
use crate::keys::{KeySet, render_keys};
use crate::registry::TypeRegistry;
use crate::view::View;

const METRIC_RESPONSE_TAGGED_TOTAL: &str = "raffica_response_tagged_total";

/// Header carrying the key set when none is configured.
pub const DEFAULT_SURROGATE_HEADER: &str = "Surrogate-Key";

/// Shared emitter state for the middleware.
#[derive(Clone)]
pub struct EmitterState {
    pub registry: Arc<TypeRegistry>,
    pub settings: EmitterSettings,
}

/// Header injection point, exposed for rendering layers that flush outside
/// the middleware. Keys render space-separated and sorted; an empty set
/// leaves the headers untouched.
pub fn set_cache_tag_header(headers: &mut HeaderMap, keys: &KeySet, header_name: &str) {
    if keys.is_empty() {
        return;
    }
    let rendered = render_keys(keys);
    match (
        HeaderName::from_bytes(header_name.as_bytes()),
        HeaderValue::from_str(&rendered),
    ) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => {
            warn!(header = header_name, "invalid cache tag header, skipping injection");
        }
    }
}

/// Middleware tagging outgoing responses with their surrogate keys.
///
/// Responses without a resolved view pass through untagged. When a snapshot
/// in the view is incomplete, tagging degrades to the view's direct entity
/// keys rather than dropping the header.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn surrogate_key_layer(
    State(emitter): State<EmitterState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !emitter.settings.enabled {
        return next.run(request).await;
    }

    let view = request.extensions().get::<View>().cloned();
    let mut response = next.run(request).await;

    let Some(view) = view else {
        return response;
    };

    let keys = match keys_for_view(&emitter.registry, &view) {
        Ok(keys) => keys,
        Err(err) => {
            warn!(error = %err, "view derivation incomplete, tagging direct keys only");
            fallback_view_keys(&view)
        }
    };

    debug!(key_count = keys.len(), "tagging response");
    counter!(METRIC_RESPONSE_TAGGED_TOTAL).increment(1);
    set_cache_tag_header(
        response.headers_mut(),
        &keys,
        &emitter.settings.header_name,
    );

    response
}
