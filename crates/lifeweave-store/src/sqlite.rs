use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tokio::task;
use tracing::debug;

use lifeweave_schema::{
    Conversation, ConversationId, ConversationStatus, EventId, LifeEvent, Message, MessageId,
    PersonaId, UserId, UserPersonaRelationship,
};

use crate::{ConversationStore, EventStore, MessageStore, NewConversation, NewMessage, RelationshipStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS life_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    event_type TEXT NOT NULL,
    event_date TEXT NOT NULL,
    emotional_state TEXT,
    emotional_intensity INTEGER,
    importance_level INTEGER,
    is_milestone INTEGER NOT NULL DEFAULT 0,
    life_domains TEXT NOT NULL DEFAULT '[]',
    impact_timeframe TEXT,
    recommended_personas TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_life_events_user ON life_events(user_id, event_date);

CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    persona TEXT NOT NULL,
    session_title TEXT NOT NULL,
    conversation_type TEXT NOT NULL,
    related_event_id INTEGER,
    related_goal_id INTEGER,
    status TEXT NOT NULL DEFAULT 'active',
    summary TEXT,
    key_insights TEXT,
    started_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL,
    ended_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, last_active_at);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL REFERENCES conversations(id),
    user_id INTEGER NOT NULL,
    persona TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    msg_order INTEGER NOT NULL,
    is_key_message INTEGER NOT NULL DEFAULT 0,
    feedback TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(conversation_id, msg_order)
);

CREATE TABLE IF NOT EXISTS relationships (
    user_id INTEGER NOT NULL,
    persona TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 1,
    total_conversations INTEGER NOT NULL DEFAULT 0,
    last_conversation_at TEXT,
    is_primary_mentor INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, persona)
);
"#;

/// SQLite-backed implementation of every repository trait.
///
/// A single connection behind a mutex serializes writes, which is what makes
/// the transactional order assignment in `append_message` safe.
#[derive(Clone)]
pub struct LifeStore {
    db: Arc<Mutex<Connection>>,
}

impl LifeStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        debug!(path, "life store opened");
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(db: &Arc<Mutex<Connection>>) -> Result<std::sync::MutexGuard<'_, Connection>> {
        db.lock().map_err(|_| anyhow!("sqlite connection poisoned"))
    }
}

#[async_trait]
impl EventStore for LifeStore {
    async fn insert_event(&self, mut event: LifeEvent) -> Result<LifeEvent> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let domains = serde_json::to_string(&event.life_domains)?;
            let personas = serde_json::to_string(&event.recommended_personas)?;
            let conn = Self::lock(&db)?;
            conn.execute(
                r#"
                INSERT INTO life_events (
                    user_id, title, description, event_type, event_date,
                    emotional_state, emotional_intensity, importance_level,
                    is_milestone, life_domains, impact_timeframe,
                    recommended_personas, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    event.user_id,
                    event.title,
                    event.description,
                    event.event_type.as_str(),
                    event.event_date.to_string(),
                    event.emotional_state.map(|s| s.as_str()),
                    event.emotional_intensity,
                    event.importance_level,
                    event.is_milestone,
                    domains,
                    event.impact_timeframe.map(|t| t.as_str()),
                    personas,
                    event.created_at.to_rfc3339(),
                ],
            )?;
            event.id = conn.last_insert_rowid();
            Ok(event)
        })
        .await?
    }

    async fn event_by_id(&self, id: EventId) -> Result<Option<LifeEvent>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let event = conn
                .query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM life_events WHERE id = ?1"),
                    params![id],
                    row_to_event,
                )
                .optional()?;
            Ok(event)
        })
        .await?
    }

    async fn events_for_user(&self, user_id: UserId) -> Result<Vec<LifeEvent>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM life_events WHERE user_id = ?1 ORDER BY event_date ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_event)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await?
    }
}

#[async_trait]
impl ConversationStore for LifeStore {
    async fn create_conversation(&self, new: NewConversation) -> Result<Conversation> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let now = Utc::now();
            let conn = Self::lock(&db)?;
            conn.execute(
                r#"
                INSERT INTO conversations (
                    user_id, persona, session_title, conversation_type,
                    related_event_id, related_goal_id, status,
                    started_at, last_active_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?7)
                "#,
                params![
                    new.user_id,
                    new.persona.as_str(),
                    new.session_title,
                    new.conversation_type.as_str(),
                    new.related_event_id,
                    new.related_goal_id,
                    now.to_rfc3339(),
                ],
            )?;
            Ok(Conversation {
                id: conn.last_insert_rowid(),
                user_id: new.user_id,
                persona: new.persona,
                session_title: new.session_title,
                conversation_type: new.conversation_type,
                related_event_id: new.related_event_id,
                related_goal_id: new.related_goal_id,
                status: ConversationStatus::Active,
                summary: None,
                key_insights: None,
                started_at: now,
                last_active_at: now,
                ended_at: None,
            })
        })
        .await?
    }

    async fn conversation_by_id(&self, id: ConversationId) -> Result<Option<Conversation>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let conversation = conn
                .query_row(
                    &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                    params![id],
                    row_to_conversation,
                )
                .optional()?;
            Ok(conversation)
        })
        .await?
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        let db = Arc::clone(&self.db);
        let conversation = conversation.clone();
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let updated = conn.execute(
                r#"
                UPDATE conversations SET
                    session_title = ?2,
                    related_event_id = ?3,
                    related_goal_id = ?4,
                    status = ?5,
                    summary = ?6,
                    key_insights = ?7,
                    last_active_at = ?8,
                    ended_at = ?9
                WHERE id = ?1
                "#,
                params![
                    conversation.id,
                    conversation.session_title,
                    conversation.related_event_id,
                    conversation.related_goal_id,
                    conversation.status.as_str(),
                    conversation.summary,
                    conversation.key_insights,
                    conversation.last_active_at.to_rfc3339(),
                    conversation.ended_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            if updated == 0 {
                return Err(anyhow!("conversation {} not found", conversation.id));
            }
            Ok(())
        })
        .await?
    }

    async fn conversations_for_user(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_id = ?1 ORDER BY last_active_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await?
    }
}

#[async_trait]
impl MessageStore for LifeStore {
    async fn append_message(&self, new: NewMessage) -> Result<Message> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let now = Utc::now();
            let mut conn = Self::lock(&db)?;
            let tx = conn.transaction()?;
            let order: u32 = tx.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![new.conversation_id],
                |row| row.get::<_, u32>(0),
            )? + 1;
            tx.execute(
                r#"
                INSERT INTO messages (
                    conversation_id, user_id, persona, kind, content,
                    msg_order, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    new.conversation_id,
                    new.user_id,
                    new.persona.as_str(),
                    new.kind.as_str(),
                    new.content,
                    order,
                    now.to_rfc3339(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE conversations SET last_active_at = ?2 WHERE id = ?1",
                params![new.conversation_id, now.to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(Message {
                id,
                conversation_id: new.conversation_id,
                user_id: new.user_id,
                persona: new.persona,
                kind: new.kind,
                content: new.content,
                order,
                is_key_message: false,
                feedback: None,
                created_at: now,
            })
        })
        .await?
    }

    async fn messages_for_conversation(&self, id: ConversationId) -> Result<Vec<Message>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY msg_order ASC"
            ))?;
            let rows = stmt.query_map(params![id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await?
    }

    async fn message_count(&self, id: ConversationId) -> Result<u32> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![id],
                |row| row.get::<_, u32>(0),
            )?;
            Ok(count)
        })
        .await?
    }

    async fn set_feedback(&self, id: MessageId, feedback: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let feedback = feedback.to_owned();
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            conn.execute(
                "UPDATE messages SET feedback = ?2 WHERE id = ?1",
                params![id, feedback],
            )?;
            Ok(())
        })
        .await?
    }

    async fn mark_key_message(&self, id: MessageId, is_key: bool) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            conn.execute(
                "UPDATE messages SET is_key_message = ?2 WHERE id = ?1",
                params![id, is_key],
            )?;
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl RelationshipStore for LifeStore {
    async fn relationship(
        &self,
        user_id: UserId,
        persona: PersonaId,
    ) -> Result<Option<UserPersonaRelationship>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let relationship = conn
                .query_row(
                    &format!(
                        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE user_id = ?1 AND persona = ?2"
                    ),
                    params![user_id, persona.as_str()],
                    row_to_relationship,
                )
                .optional()?;
            Ok(relationship)
        })
        .await?
    }

    async fn upsert_relationship(&self, relationship: &UserPersonaRelationship) -> Result<()> {
        let db = Arc::clone(&self.db);
        let rel = relationship.clone();
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            conn.execute(
                r#"
                INSERT INTO relationships (
                    user_id, persona, level, total_conversations,
                    last_conversation_at, is_primary_mentor, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(user_id, persona) DO UPDATE SET
                    level = excluded.level,
                    total_conversations = excluded.total_conversations,
                    last_conversation_at = excluded.last_conversation_at,
                    is_primary_mentor = excluded.is_primary_mentor,
                    updated_at = excluded.updated_at
                "#,
                params![
                    rel.user_id,
                    rel.persona.as_str(),
                    rel.level,
                    rel.total_conversations,
                    rel.last_conversation_at.map(|t| t.to_rfc3339()),
                    rel.is_primary_mentor,
                    rel.created_at.to_rfc3339(),
                    rel.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    async fn relationships_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserPersonaRelationship>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = Self::lock(&db)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE user_id = ?1 ORDER BY total_conversations DESC, persona ASC"
            ))?;
            let rows = stmt.query_map(params![user_id], row_to_relationship)?;
            let mut relationships = Vec::new();
            for row in rows {
                relationships.push(row?);
            }
            Ok(relationships)
        })
        .await?
    }
}

const EVENT_COLUMNS: &str = "id, user_id, title, description, event_type, event_date, \
     emotional_state, emotional_intensity, importance_level, is_milestone, \
     life_domains, impact_timeframe, recommended_personas, created_at";

const CONVERSATION_COLUMNS: &str = "id, user_id, persona, session_title, conversation_type, \
     related_event_id, related_goal_id, status, summary, key_insights, \
     started_at, last_active_at, ended_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, user_id, persona, kind, content, \
     msg_order, is_key_message, feedback, created_at";

const RELATIONSHIP_COLUMNS: &str = "user_id, persona, level, total_conversations, \
     last_conversation_at, is_primary_mentor, created_at, updated_at";

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<LifeEvent> {
    Ok(LifeEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        event_type: parse_text(4, row.get::<_, String>(4)?)?,
        event_date: parse_date(5, row.get::<_, String>(5)?)?,
        emotional_state: parse_opt_text(6, row.get::<_, Option<String>>(6)?)?,
        emotional_intensity: row.get(7)?,
        importance_level: row.get(8)?,
        is_milestone: row.get(9)?,
        life_domains: parse_json(10, row.get::<_, String>(10)?)?,
        impact_timeframe: parse_opt_text(11, row.get::<_, Option<String>>(11)?)?,
        recommended_personas: parse_json(12, row.get::<_, String>(12)?)?,
        created_at: parse_datetime(13, row.get::<_, String>(13)?)?,
    })
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        persona: parse_text(2, row.get::<_, String>(2)?)?,
        session_title: row.get(3)?,
        conversation_type: parse_text(4, row.get::<_, String>(4)?)?,
        related_event_id: row.get(5)?,
        related_goal_id: row.get(6)?,
        status: parse_text(7, row.get::<_, String>(7)?)?,
        summary: row.get(8)?,
        key_insights: row.get(9)?,
        started_at: parse_datetime(10, row.get::<_, String>(10)?)?,
        last_active_at: parse_datetime(11, row.get::<_, String>(11)?)?,
        ended_at: parse_opt_datetime(12, row.get::<_, Option<String>>(12)?)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        persona: parse_text(3, row.get::<_, String>(3)?)?,
        kind: parse_text(4, row.get::<_, String>(4)?)?,
        content: row.get(5)?,
        order: row.get(6)?,
        is_key_message: row.get(7)?,
        feedback: row.get(8)?,
        created_at: parse_datetime(9, row.get::<_, String>(9)?)?,
    })
}

fn row_to_relationship(row: &Row<'_>) -> rusqlite::Result<UserPersonaRelationship> {
    Ok(UserPersonaRelationship {
        user_id: row.get(0)?,
        persona: parse_text(1, row.get::<_, String>(1)?)?,
        level: row.get(2)?,
        total_conversations: row.get(3)?,
        last_conversation_at: parse_opt_datetime(4, row.get::<_, Option<String>>(4)?)?,
        is_primary_mentor: row.get(5)?,
        created_at: parse_datetime(6, row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(7, row.get::<_, String>(7)?)?,
    })
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_text<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn parse_opt_text<T>(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|s| parse_text(idx, s)).transpose()
}

fn parse_date(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn parse_datetime(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn parse_opt_datetime(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_datetime(idx, s)).transpose()
}

fn parse_json<T: DeserializeOwned>(idx: usize, raw: String) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeweave_schema::{
        ConversationType, EmotionalState, EventType, LifeDomain, MessageKind,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_event(user_id: UserId) -> LifeEvent {
        let mut event = LifeEvent::new(user_id, "Got promoted", EventType::Career, date(2026, 2, 10));
        event.description = "Promoted to staff engineer".into();
        event.emotional_state = Some(EmotionalState::Excited);
        event.emotional_intensity = Some(8);
        event.importance_level = Some(9);
        event.is_milestone = true;
        event.life_domains.insert(LifeDomain::Career);
        event.life_domains.insert(LifeDomain::PersonalGrowth);
        event.recommended_personas = vec![PersonaId::CareerMentor, PersonaId::LifeMentor];
        event
    }

    #[tokio::test]
    async fn event_roundtrip_preserves_sets() {
        let store = LifeStore::open_in_memory().unwrap();
        let stored = store.insert_event(sample_event(1)).await.unwrap();
        assert!(stored.id > 0);

        let loaded = store.event_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Got promoted");
        assert_eq!(loaded.emotional_state, Some(EmotionalState::Excited));
        assert_eq!(loaded.life_domains.len(), 2);
        assert!(loaded.life_domains.contains(&LifeDomain::Career));
        assert_eq!(
            loaded.recommended_personas,
            vec![PersonaId::CareerMentor, PersonaId::LifeMentor]
        );
    }

    #[tokio::test]
    async fn events_for_user_ordered_by_date() {
        let store = LifeStore::open_in_memory().unwrap();
        let mut later = sample_event(1);
        later.event_date = date(2026, 3, 1);
        let mut earlier = sample_event(1);
        earlier.event_date = date(2026, 1, 1);
        store.insert_event(later).await.unwrap();
        store.insert_event(earlier).await.unwrap();
        store.insert_event(sample_event(2)).await.unwrap();

        let events = store.events_for_user(1).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].event_date < events[1].event_date);
    }

    #[tokio::test]
    async fn append_assigns_sequential_orders_and_touches_conversation() {
        let store = LifeStore::open_in_memory().unwrap();
        let conversation = store
            .create_conversation(NewConversation {
                user_id: 1,
                persona: PersonaId::LifeMentor,
                session_title: "test".into(),
                conversation_type: ConversationType::General,
                related_event_id: None,
                related_goal_id: None,
            })
            .await
            .unwrap();

        for i in 0..3 {
            let msg = store
                .append_message(NewMessage {
                    conversation_id: conversation.id,
                    user_id: 1,
                    persona: PersonaId::LifeMentor,
                    kind: if i % 2 == 0 { MessageKind::User } else { MessageKind::Ai },
                    content: format!("message {i}"),
                })
                .await
                .unwrap();
            assert_eq!(msg.order, i + 1);
        }

        let messages = store.messages_for_conversation(conversation.id).await.unwrap();
        let orders: Vec<u32> = messages.iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);

        let reloaded = store
            .conversation_by_id(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.last_active_at >= conversation.last_active_at);
    }

    #[tokio::test]
    async fn update_conversation_persists_completion() {
        let store = LifeStore::open_in_memory().unwrap();
        let mut conversation = store
            .create_conversation(NewConversation {
                user_id: 1,
                persona: PersonaId::Counselor,
                session_title: "support".into(),
                conversation_type: ConversationType::EmotionalSupport,
                related_event_id: Some(42),
                related_goal_id: None,
            })
            .await
            .unwrap();

        conversation.complete("went well", "breathe more");
        store.update_conversation(&conversation).await.unwrap();

        let loaded = store
            .conversation_by_id(conversation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, ConversationStatus::Completed);
        assert_eq!(loaded.summary.as_deref(), Some("went well"));
        assert_eq!(loaded.related_event_id, Some(42));
        assert!(loaded.ended_at.is_some());
    }

    #[tokio::test]
    async fn update_missing_conversation_errors() {
        let store = LifeStore::open_in_memory().unwrap();
        let conversation = store
            .create_conversation(NewConversation {
                user_id: 1,
                persona: PersonaId::LifeCoach,
                session_title: "x".into(),
                conversation_type: ConversationType::General,
                related_event_id: None,
                related_goal_id: None,
            })
            .await
            .unwrap();
        let mut ghost = conversation.clone();
        ghost.id = 9999;
        assert!(store.update_conversation(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn relationship_upsert_and_ordering() {
        let store = LifeStore::open_in_memory().unwrap();
        let mut a = UserPersonaRelationship::new(1, PersonaId::LifeMentor);
        for _ in 0..6 {
            a.increment_conversation();
        }
        let mut b = UserPersonaRelationship::new(1, PersonaId::Counselor);
        b.increment_conversation();

        store.upsert_relationship(&a).await.unwrap();
        store.upsert_relationship(&b).await.unwrap();
        // Second upsert overwrites, not duplicates.
        a.increment_conversation();
        store.upsert_relationship(&a).await.unwrap();

        let all = store.relationships_for_user(1).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].persona, PersonaId::LifeMentor);
        assert_eq!(all[0].total_conversations, 7);

        let single = store
            .relationship(1, PersonaId::Counselor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(single.total_conversations, 1);
    }

    #[tokio::test]
    async fn feedback_and_key_flag_updates() {
        let store = LifeStore::open_in_memory().unwrap();
        let conversation = store
            .create_conversation(NewConversation {
                user_id: 1,
                persona: PersonaId::Philosopher,
                session_title: "deep".into(),
                conversation_type: ConversationType::General,
                related_event_id: None,
                related_goal_id: None,
            })
            .await
            .unwrap();
        let msg = store
            .append_message(NewMessage {
                conversation_id: conversation.id,
                user_id: 1,
                persona: PersonaId::Philosopher,
                kind: MessageKind::Ai,
                content: "what is meaning?".into(),
            })
            .await
            .unwrap();

        store.set_feedback(msg.id, "helpful").await.unwrap();
        store.mark_key_message(msg.id, true).await.unwrap();

        let messages = store.messages_for_conversation(conversation.id).await.unwrap();
        assert_eq!(messages[0].feedback.as_deref(), Some("helpful"));
        assert!(messages[0].is_key_message);
    }

    #[tokio::test]
    async fn open_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("life.db");
        let store = LifeStore::open(path.to_str().unwrap()).unwrap();
        let stored = store.insert_event(sample_event(5)).await.unwrap();
        assert!(store.event_by_id(stored.id).await.unwrap().is_some());
    }
}
