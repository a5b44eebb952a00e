use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{ConversationId, EventId, GoalId, MessageId, ParseEnumError, PersonaId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    General,
    EventAnalysis,
    EmotionalSupport,
    DecisionSupport,
    LifePlanning,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::General => "general",
            ConversationType::EventAnalysis => "event_analysis",
            ConversationType::EmotionalSupport => "emotional_support",
            ConversationType::DecisionSupport => "decision_support",
            ConversationType::LifePlanning => "life_planning",
        }
    }

    /// Session title used when a conversation is opened without an event.
    pub fn default_title(&self) -> &'static str {
        match self {
            ConversationType::General => "Everyday conversation",
            ConversationType::EventAnalysis => "Life event deep dive",
            ConversationType::EmotionalSupport => "Emotional support session",
            ConversationType::DecisionSupport => "Decision consultation",
            ConversationType::LifePlanning => "Life planning discussion",
        }
    }
}

impl FromStr for ConversationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(ConversationType::General),
            "event_analysis" => Ok(ConversationType::EventAnalysis),
            "emotional_support" => Ok(ConversationType::EmotionalSupport),
            "decision_support" => Ok(ConversationType::DecisionSupport),
            "life_planning" => Ok(ConversationType::LifePlanning),
            other => Err(ParseEnumError::new("conversation type", other)),
        }
    }
}

/// Session lifecycle. The manager only ever moves `Active` -> `Completed`;
/// `Archived` is applied by an external curation step and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Completed,
    Archived,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Completed => "completed",
            ConversationStatus::Archived => "archived",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversationStatus::Active)
    }
}

impl FromStr for ConversationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ConversationStatus::Active),
            "completed" => Ok(ConversationStatus::Completed),
            "archived" => Ok(ConversationStatus::Archived),
            other => Err(ParseEnumError::new("conversation status", other)),
        }
    }
}

/// A bounded exchange between one user and one persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub persona: PersonaId,
    pub session_title: String,
    pub conversation_type: ConversationType,
    #[serde(default)]
    pub related_event_id: Option<EventId>,
    #[serde(default)]
    pub related_goal_id: Option<GoalId>,
    pub status: ConversationStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_insights: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn is_active(&self) -> bool {
        self.status == ConversationStatus::Active
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Marks the session completed. Summary and insights are only written
    /// here, never on an open session.
    pub fn complete(&mut self, summary: impl Into<String>, insights: impl Into<String>) {
        self.status = ConversationStatus::Completed;
        self.ended_at = Some(Utc::now());
        self.summary = Some(summary.into());
        self.key_insights = Some(insights.into());
    }

    /// Minutes between start and end; open sessions measure up to now.
    pub fn duration_minutes(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Ai,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Ai => "ai",
            MessageKind::System => "system",
        }
    }
}

impl FromStr for MessageKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageKind::User),
            "ai" => Ok(MessageKind::Ai),
            "system" => Ok(MessageKind::System),
            other => Err(ParseEnumError::new("message kind", other)),
        }
    }
}

/// One turn in a conversation. Append-only; only `feedback` and
/// `is_key_message` may change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub persona: PersonaId,
    pub kind: MessageKind,
    pub content: String,
    /// 1-based, strictly increasing and gap-free within the conversation.
    pub order: u32,
    #[serde(default)]
    pub is_key_message: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_user_message(&self) -> bool {
        self.kind == MessageKind::User
    }
}
