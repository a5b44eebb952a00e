pub mod conversation;
pub mod event;
pub mod persona;
pub mod relationship;

pub use conversation::{
    Conversation, ConversationStatus, ConversationType, Message, MessageKind,
};
pub use event::{
    ConnectionKind, EmotionalState, EventConnection, EventType, ImpactTimeframe, LifeDomain,
    LifeEvent,
};
pub use persona::PersonaId;
pub use relationship::UserPersonaRelationship;

pub type UserId = i64;
pub type EventId = i64;
pub type ConversationId = i64;
pub type MessageId = i64;
pub type GoalId = i64;

/// Error for parsing the string form of a closed enum (wire/storage values).
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
