use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("incomplete entity state for `{entity}`: missing {missing}")]
    IncompleteEntityState { entity: Uuid, missing: &'static str },
    #[error("cdn gateway unavailable: {detail}")]
    GatewayUnavailable { detail: String },
    #[error("unknown event kind `{kind}`")]
    UnknownEventKind { kind: String },
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl EngineError {
    pub fn incomplete(entity: Uuid, missing: &'static str) -> Self {
        Self::IncompleteEntityState { entity, missing }
    }

    pub fn unknown_event(kind: impl Into<String>) -> Self {
        Self::UnknownEventKind { kind: kind.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<GatewayError> for EngineError {
    fn from(err: GatewayError) -> Self {
        Self::GatewayUnavailable {
            detail: err.to_string(),
        }
    }
}
