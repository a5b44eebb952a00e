//! Prompt assembly and the deterministic fallback lines used when the
//! completion provider is down.

use lifeweave_schema::{Conversation, ConversationType, LifeEvent, Message, MessageKind};

use crate::persona::PersonaProfile;

/// Appended to the AI turn when the provider fails mid-conversation.
pub const CHAT_FALLBACK: &str = "I'm sorry, I'm having trouble putting my thoughts \
together right now. Give me a moment and ask me again.";

pub fn type_directive(conversation_type: ConversationType) -> &'static str {
    match conversation_type {
        ConversationType::General => {
            "Keep the conversation open and natural; follow the user's lead."
        }
        ConversationType::EventAnalysis => {
            "The user wants to unpack a specific life event. Help them examine what \
             happened, why it matters, and what it connects to."
        }
        ConversationType::EmotionalSupport => {
            "The user needs emotional support. Acknowledge feelings before anything \
             else and keep advice gentle and optional."
        }
        ConversationType::DecisionSupport => {
            "The user is weighing a decision. Lay out the options and trade-offs \
             clearly without making the choice for them."
        }
        ConversationType::LifePlanning => {
            "The user is planning ahead. Help them turn intentions into concrete, \
             ordered steps."
        }
    }
}

pub fn system_prompt(profile: &PersonaProfile, conversation_type: ConversationType) -> String {
    format!("{}\n\n{}", profile.system_prompt, type_directive(conversation_type))
}

/// User-side prompt for an opening message about an event.
pub fn opening_prompt(event: &LifeEvent) -> String {
    let mut prompt = format!(
        "The user just recorded {}: \"{}\" (dated {}).",
        event.event_type.description(),
        event.title,
        event.event_date
    );
    if !event.description.is_empty() {
        prompt.push_str(&format!(" They described it as: {}.", event.description));
    }
    if let Some(state) = event.emotional_state {
        prompt.push_str(&format!(" They feel {}.", state.as_str()));
    }
    prompt.push_str(
        " Open a conversation about this event in two or three sentences, \
         ending with one inviting question.",
    );
    prompt
}

/// Opening used when the provider is unavailable. References the persona
/// and the event so the session still starts in character.
pub fn opening_fallback(profile: &PersonaProfile, event: &LifeEvent) -> String {
    format!(
        "Hi, I'm {}, your {}. I saw you recorded \"{}\", {}. I'd love to hear \
         more about it whenever you're ready.",
        profile.display_name,
        profile.title.to_lowercase(),
        event.title,
        event.event_type.description()
    )
}

pub fn switch_intro_prompt(reason: &str) -> String {
    format!(
        "You are taking over an ongoing conversation from another persona. \
         The stated reason for the handover: {reason}. Introduce yourself in \
         one or two sentences and invite the user to continue."
    )
}

pub fn switch_fallback(profile: &PersonaProfile) -> String {
    format!(
        "Hello, I'm {}, your {}. I'll be continuing this conversation with \
         you from here. Where would you like to pick up?",
        profile.display_name,
        profile.title.to_lowercase()
    )
}

/// Bounded chat context: conversation framing plus the tail of the
/// transcript with speaker tags, then the new user message.
pub fn chat_prompt(
    conversation: &Conversation,
    transcript: &[Message],
    persona_name: &str,
    user_text: &str,
    history_limit: usize,
) -> String {
    let mut prompt = format!(
        "Conversation type: {}.",
        conversation.conversation_type.as_str()
    );
    if let Some(event_id) = conversation.related_event_id {
        prompt.push_str(&format!(" This conversation concerns life event #{event_id}."));
    }
    prompt.push('\n');

    let tail_start = transcript.len().saturating_sub(history_limit);
    for message in &transcript[tail_start..] {
        let speaker = match message.kind {
            MessageKind::User => "User",
            MessageKind::Ai => persona_name,
            MessageKind::System => "System",
        };
        prompt.push_str(&format!("{speaker}: {}\n", message.content));
    }

    prompt.push_str(&format!("User: {user_text}\n"));
    prompt.push_str(&format!("{persona_name}:"));
    prompt
}
