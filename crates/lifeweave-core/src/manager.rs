//! Conversation lifecycle: opening sessions, chat turns (blocking and
//! streaming), persona switches, completion, and per-user aggregates.
//!
//! A whole chat turn holds the conversation's keyed lock so its side
//! effects (user turn, provider call, AI turn, relationship bump) never
//! interleave with another turn on the same conversation. Provider
//! failures never escape: every call site falls back to deterministic
//! text and leaves state consistent.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use lifeweave_provider::{CompletionProvider, CompletionRequest, StreamChunk};
use lifeweave_schema::{
    Conversation, ConversationId, ConversationType, EventId, LifeEvent, Message, MessageKind,
    PersonaId, UserId,
};
use lifeweave_store::{
    ConversationStore, EventStore, MessageStore, NewConversation, NewMessage, RelationshipStore,
};
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::lock::{KeyedLocks, LockKey};
use crate::persona::{PersonaProfile, PersonaRegistry};
use crate::prompts;
use crate::recommend;
use crate::relationship::RelationshipTracker;

pub type ChatStream = Pin<Box<dyn Stream<Item = CoreResult<StreamChunk>> + Send>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub total_messages: u64,
    pub active_conversations: usize,
    pub per_persona: BTreeMap<PersonaId, usize>,
    /// Mean duration over conversations that have ended; 0 when none have.
    pub average_duration_minutes: f64,
}

pub struct ConversationManager {
    events: Arc<dyn EventStore>,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    provider: Arc<dyn CompletionProvider>,
    tracker: RelationshipTracker,
    registry: PersonaRegistry,
    config: CoreConfig,
    turn_locks: KeyedLocks,
}

impl ConversationManager {
    pub fn new(
        events: Arc<dyn EventStore>,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        relationships: Arc<dyn RelationshipStore>,
        provider: Arc<dyn CompletionProvider>,
        config: CoreConfig,
    ) -> Self {
        let turn_locks = match config.max_concurrent_turns {
            Some(limit) => KeyedLocks::with_global_limit(limit),
            None => KeyedLocks::new(),
        };
        Self {
            events,
            conversations,
            messages,
            provider,
            tracker: RelationshipTracker::new(relationships),
            registry: PersonaRegistry::new(),
            config,
            turn_locks,
        }
    }

    pub fn relationships(&self) -> &RelationshipTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    /// Opens a conversation in the active state and counts it toward the
    /// (user, persona) relationship.
    pub async fn start(
        &self,
        user_id: UserId,
        persona: PersonaId,
        conversation_type: ConversationType,
    ) -> CoreResult<Conversation> {
        let conversation = self
            .conversations
            .create_conversation(NewConversation {
                user_id,
                persona,
                session_title: conversation_type.default_title().to_string(),
                conversation_type,
                related_event_id: None,
                related_goal_id: None,
            })
            .await?;
        self.tracker.increment(user_id, persona).await?;
        info!(
            conversation_id = conversation.id,
            user_id,
            persona = %persona,
            conversation_type = conversation_type.as_str(),
            "conversation started"
        );
        Ok(conversation)
    }

    /// Opens an event-analysis conversation with the recommended persona
    /// and an AI opening message. The session always opens; a provider
    /// outage only downgrades the opening to a templated greeting.
    pub async fn start_for_event(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> CoreResult<Conversation> {
        let event = self
            .events
            .event_by_id(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;
        let persona = recommend::recommend_primary(&event);
        let profile = self.registry.get(persona);

        let conversation = self
            .conversations
            .create_conversation(NewConversation {
                user_id,
                persona,
                session_title: format!("Talking through \"{}\"", event.title),
                conversation_type: ConversationType::EventAnalysis,
                related_event_id: Some(event.id),
                related_goal_id: None,
            })
            .await?;
        self.tracker.increment(user_id, persona).await?;

        let opening = self.opening_text(profile, &event).await;
        self.messages
            .append_message(NewMessage {
                conversation_id: conversation.id,
                user_id,
                persona,
                kind: MessageKind::Ai,
                content: opening,
            })
            .await?;

        info!(
            conversation_id = conversation.id,
            user_id,
            event_id = event.id,
            persona = %persona,
            "conversation opened for event"
        );
        Ok(conversation)
    }

    async fn opening_text(&self, profile: &PersonaProfile, event: &LifeEvent) -> String {
        let request = self.request_for(profile, ConversationType::EventAnalysis, prompts::opening_prompt(event));
        match self.provider.complete(request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, persona = %profile.id, "provider failed for opening, using template");
                prompts::opening_fallback(profile, event)
            }
        }
    }

    /// Appends one message. Order assignment happens in the store, inside
    /// a transaction, so concurrent appends can never collide.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        persona: PersonaId,
        kind: MessageKind,
        content: &str,
    ) -> CoreResult<Message> {
        let content = validated(content)?;
        self.require_conversation(conversation_id).await?;
        let message = self
            .messages
            .append_message(NewMessage {
                conversation_id,
                user_id,
                persona,
                kind,
                content,
            })
            .await?;
        Ok(message)
    }

    /// One blocking chat turn: user message in, AI message out. Returns
    /// the AI message (the fallback line when the provider is down).
    pub async fn chat(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        text: &str,
    ) -> CoreResult<Message> {
        let text = validated(text)?;
        let _guard = self.turn_locks.acquire(LockKey::Conversation(conversation_id)).await;

        let conversation = self.require_conversation(conversation_id).await?;
        let profile = self.registry.get(conversation.persona);

        let transcript = self.messages.messages_for_conversation(conversation_id).await?;
        self.messages
            .append_message(NewMessage {
                conversation_id,
                user_id,
                persona: conversation.persona,
                kind: MessageKind::User,
                content: text.clone(),
            })
            .await?;

        let prompt = prompts::chat_prompt(
            &conversation,
            &transcript,
            profile.display_name,
            &text,
            self.config.history_limit,
        );
        let request = self.request_for(profile, conversation.conversation_type, prompt);
        let reply = match self.provider.complete(request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    error = %err,
                    conversation_id,
                    persona = %conversation.persona,
                    "provider failed for chat turn, using fallback"
                );
                prompts::CHAT_FALLBACK.to_string()
            }
        };

        let message = self
            .messages
            .append_message(NewMessage {
                conversation_id,
                user_id,
                persona: conversation.persona,
                kind: MessageKind::Ai,
                content: reply,
            })
            .await?;
        self.tracker.increment(user_id, conversation.persona).await?;
        Ok(message)
    }

    /// Streaming chat turn. Chunks are forwarded as they arrive; the full
    /// concatenation is persisted as one AI message when the provider
    /// reports its final chunk. A mid-stream failure discards the partial
    /// text and persists the fallback line instead (the fallback is also
    /// forwarded, so the caller sees what was stored). Dropping the stream
    /// persists nothing for the AI turn; the user turn, once appended,
    /// stays, and the next order assignment is unaffected.
    pub async fn chat_stream(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        text: &str,
    ) -> CoreResult<ChatStream> {
        let text = validated(text)?;
        let conversation = self.require_conversation(conversation_id).await?;
        let profile = self.registry.get(conversation.persona).clone();

        let messages = Arc::clone(&self.messages);
        let provider = Arc::clone(&self.provider);
        let tracker = self.tracker.clone();
        let locks = self.turn_locks.clone();
        let model = self.config.model.clone();
        let history_limit = self.config.history_limit;
        let persona = conversation.persona;

        let stream = async_stream::try_stream! {
            let _guard = locks.acquire(LockKey::Conversation(conversation_id)).await;

            let transcript = messages.messages_for_conversation(conversation_id).await?;
            messages
                .append_message(NewMessage {
                    conversation_id,
                    user_id,
                    persona,
                    kind: MessageKind::User,
                    content: text.clone(),
                })
                .await?;

            let prompt = prompts::chat_prompt(
                &conversation,
                &transcript,
                profile.display_name,
                &text,
                history_limit,
            );
            let request = CompletionRequest::new(
                model,
                Some(prompts::system_prompt(&profile, conversation.conversation_type)),
                prompt,
            )
            .with_sampling(profile.temperature, profile.max_tokens);

            let mut full = String::new();
            let mut failed = false;
            match provider.stream(request).await {
                Ok(mut chunks) => loop {
                    match chunks.next().await {
                        Some(Ok(chunk)) if chunk.is_final => break,
                        Some(Ok(chunk)) => {
                            full.push_str(&chunk.delta);
                            yield chunk;
                        }
                        Some(Err(err)) => {
                            warn!(
                                error = %err,
                                conversation_id,
                                "provider stream failed mid-flight, using fallback"
                            );
                            failed = true;
                            break;
                        }
                        None => {
                            warn!(conversation_id, "provider stream ended without final chunk");
                            failed = true;
                            break;
                        }
                    }
                },
                Err(err) => {
                    warn!(error = %err, conversation_id, "provider refused stream, using fallback");
                    failed = true;
                }
            }

            if failed {
                full = prompts::CHAT_FALLBACK.to_string();
                yield StreamChunk {
                    delta: full.clone(),
                    is_final: false,
                };
            }

            messages
                .append_message(NewMessage {
                    conversation_id,
                    user_id,
                    persona,
                    kind: MessageKind::Ai,
                    content: full,
                })
                .await?;
            tracker.increment(user_id, persona).await?;

            yield StreamChunk {
                delta: String::new(),
                is_final: true,
            };
        };
        Ok(Box::pin(stream))
    }

    /// Hands the conversation to a different persona: the current session
    /// completes with a "role switch" summary and a fresh session opens
    /// with the same type and related ids. The old session never resumes.
    pub async fn switch_role(
        &self,
        conversation_id: ConversationId,
        new_persona: PersonaId,
        reason: &str,
    ) -> CoreResult<Conversation> {
        let _guard = self.turn_locks.acquire(LockKey::Conversation(conversation_id)).await;

        let mut old = self.require_conversation(conversation_id).await?;
        if old.is_active() {
            old.complete("role switch", reason);
            self.conversations.update_conversation(&old).await?;
        }

        let replacement = self
            .conversations
            .create_conversation(NewConversation {
                user_id: old.user_id,
                persona: new_persona,
                session_title: old.session_title.clone(),
                conversation_type: old.conversation_type,
                related_event_id: old.related_event_id,
                related_goal_id: old.related_goal_id,
            })
            .await?;
        self.tracker.increment(old.user_id, new_persona).await?;

        let profile = self.registry.get(new_persona);
        let request = self.request_for(
            profile,
            replacement.conversation_type,
            prompts::switch_intro_prompt(reason),
        );
        let intro = match self.provider.complete(request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, persona = %new_persona, "provider failed for switch intro, using template");
                prompts::switch_fallback(profile)
            }
        };
        self.messages
            .append_message(NewMessage {
                conversation_id: replacement.id,
                user_id: old.user_id,
                persona: new_persona,
                kind: MessageKind::Ai,
                content: intro,
            })
            .await?;

        info!(
            old_conversation = conversation_id,
            new_conversation = replacement.id,
            persona = %new_persona,
            "role switched"
        );
        Ok(replacement)
    }

    /// Completes the conversation with its summary and insights. A second
    /// call on a terminal conversation is a no-op, not an error.
    pub async fn end(
        &self,
        conversation_id: ConversationId,
        summary: &str,
        insights: &str,
    ) -> CoreResult<Conversation> {
        let mut conversation = self.require_conversation(conversation_id).await?;
        if conversation.status.is_terminal() {
            return Ok(conversation);
        }
        conversation.complete(summary, insights);
        self.conversations.update_conversation(&conversation).await?;
        info!(conversation_id, "conversation completed");
        Ok(conversation)
    }

    /// The most recent `limit` messages, in order.
    pub async fn history(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> CoreResult<Vec<Message>> {
        self.require_conversation(conversation_id).await?;
        let mut messages = self.messages.messages_for_conversation(conversation_id).await?;
        let start = messages.len().saturating_sub(limit);
        Ok(messages.split_off(start))
    }

    pub async fn conversations_for_user(&self, user_id: UserId) -> CoreResult<Vec<Conversation>> {
        Ok(self.conversations.conversations_for_user(user_id).await?)
    }

    pub async fn conversations_with_persona(
        &self,
        user_id: UserId,
        persona: PersonaId,
    ) -> CoreResult<Vec<Conversation>> {
        let mut conversations = self.conversations.conversations_for_user(user_id).await?;
        conversations.retain(|c| c.persona == persona);
        Ok(conversations)
    }

    pub async fn stats(&self, user_id: UserId) -> CoreResult<ConversationStats> {
        let conversations = self.conversations.conversations_for_user(user_id).await?;
        let mut stats = ConversationStats {
            total_conversations: conversations.len(),
            ..Default::default()
        };

        let mut ended_minutes = Vec::new();
        for conversation in &conversations {
            stats.total_messages += u64::from(self.messages.message_count(conversation.id).await?);
            if conversation.is_active() {
                stats.active_conversations += 1;
            }
            *stats.per_persona.entry(conversation.persona).or_default() += 1;
            if conversation.ended_at.is_some() {
                ended_minutes.push(conversation.duration_minutes() as f64);
            }
        }
        if !ended_minutes.is_empty() {
            stats.average_duration_minutes =
                ended_minutes.iter().sum::<f64>() / ended_minutes.len() as f64;
        }
        Ok(stats)
    }

    async fn require_conversation(&self, id: ConversationId) -> CoreResult<Conversation> {
        self.conversations
            .conversation_by_id(id)
            .await?
            .ok_or(CoreError::ConversationNotFound(id))
    }

    fn request_for(
        &self,
        profile: &PersonaProfile,
        conversation_type: ConversationType,
        prompt: String,
    ) -> CompletionRequest {
        CompletionRequest::new(
            self.config.model.clone(),
            Some(prompts::system_prompt(profile, conversation_type)),
            prompt,
        )
        .with_sampling(profile.temperature, profile.max_tokens)
    }
}

fn validated(content: &str) -> CoreResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("message content is empty".into()));
    }
    Ok(trimmed.to_string())
}
