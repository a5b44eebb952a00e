//! Repository interfaces for the engine, plus a SQLite-backed implementation.
//!
//! The core crates depend only on the traits here; swapping in a different
//! persistence layer means implementing these four traits and nothing else.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lifeweave_schema::{
    Conversation, ConversationId, ConversationType, EventId, GoalId, LifeEvent, Message,
    MessageId, MessageKind, PersonaId, UserId, UserPersonaRelationship,
};

pub use sqlite::LifeStore;

/// Read side of the event timeline. Events are owned by the event-management
/// collaborator; `insert_event` exists for that collaborator (and tests), the
/// engine itself only reads.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Stores the event and returns it with its assigned id.
    async fn insert_event(&self, event: LifeEvent) -> Result<LifeEvent>;
    async fn event_by_id(&self, id: EventId) -> Result<Option<LifeEvent>>;
    /// All events for a user, ordered by event date ascending.
    async fn events_for_user(&self, user_id: UserId) -> Result<Vec<LifeEvent>>;
}

/// Fields the caller supplies when opening a conversation; the store assigns
/// id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub user_id: UserId,
    pub persona: PersonaId,
    pub session_title: String,
    pub conversation_type: ConversationType,
    pub related_event_id: Option<EventId>,
    pub related_goal_id: Option<GoalId>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, new: NewConversation) -> Result<Conversation>;
    async fn conversation_by_id(&self, id: ConversationId) -> Result<Option<Conversation>>;
    /// Persists the mutable fields of an existing conversation.
    async fn update_conversation(&self, conversation: &Conversation) -> Result<()>;
    /// A user's conversations, most recently active first.
    async fn conversations_for_user(&self, user_id: UserId) -> Result<Vec<Conversation>>;
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub persona: PersonaId,
    pub kind: MessageKind,
    pub content: String,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a message, assigning `order = count + 1` and touching the
    /// conversation's `last_active_at` in one transaction. Concurrent
    /// appends to the same conversation can never duplicate or skip an
    /// order value.
    async fn append_message(&self, new: NewMessage) -> Result<Message>;
    /// Messages in order, ascending.
    async fn messages_for_conversation(&self, id: ConversationId) -> Result<Vec<Message>>;
    async fn message_count(&self, id: ConversationId) -> Result<u32>;
    async fn set_feedback(&self, id: MessageId, feedback: &str) -> Result<()>;
    async fn mark_key_message(&self, id: MessageId, is_key: bool) -> Result<()>;
}

#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn relationship(
        &self,
        user_id: UserId,
        persona: PersonaId,
    ) -> Result<Option<UserPersonaRelationship>>;
    async fn upsert_relationship(&self, relationship: &UserPersonaRelationship) -> Result<()>;
    async fn relationships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserPersonaRelationship>>;
}

/// Convenience for call sites that want "now" consistent with what the
/// store writes.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
