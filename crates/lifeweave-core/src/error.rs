use lifeweave_schema::{ConversationId, EventId};

/// Errors the engine surfaces to callers. Provider failures never appear
/// here; every provider call site falls back instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    #[error("event {0} not found")]
    EventNotFound(EventId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ConversationNotFound(_) | CoreError::EventNotFound(_)
        )
    }
}
