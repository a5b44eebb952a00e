use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PersonaId, UserId};

/// Interaction strength between a user and one persona.
///
/// Keyed by (user_id, persona). `level` only ever moves up; the step rule
/// lives here so every caller applies the same progression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPersonaRelationship {
    pub user_id: UserId,
    pub persona: PersonaId,
    /// 1-10, monotonically increasing.
    pub level: u8,
    pub total_conversations: u32,
    #[serde(default)]
    pub last_conversation_at: Option<DateTime<Utc>>,
    /// At most one persona per user carries this flag; the tracker enforces it.
    #[serde(default)]
    pub is_primary_mentor: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPersonaRelationship {
    pub fn new(user_id: UserId, persona: PersonaId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            persona,
            level: 1,
            total_conversations: 0,
            last_conversation_at: None,
            is_primary_mentor: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records one more conversation and applies the level step function:
    /// 50+ conversations cap the level at 10, 20+ at 5, 5+ at 3. Each call
    /// raises the level by at most one and never lowers it.
    pub fn increment_conversation(&mut self) {
        self.total_conversations += 1;
        let now = Utc::now();
        self.last_conversation_at = Some(now);
        self.updated_at = now;

        if self.total_conversations >= 50 && self.level < 10 {
            self.level = (self.level + 1).min(10);
        } else if self.total_conversations >= 20 && self.level < 5 {
            self.level = (self.level + 1).min(5);
        } else if self.total_conversations >= 5 && self.level < 3 {
            self.level = (self.level + 1).min(3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_increments(n: u32) -> UserPersonaRelationship {
        let mut rel = UserPersonaRelationship::new(1, PersonaId::LifeMentor);
        for _ in 0..n {
            rel.increment_conversation();
        }
        rel
    }

    #[test]
    fn five_increments_cap_level_at_three() {
        let rel = run_increments(5);
        assert_eq!(rel.total_conversations, 5);
        assert!(rel.level <= 3);
    }

    #[test]
    fn twenty_increments_cap_level_at_five() {
        let rel = run_increments(20);
        assert!(rel.level <= 5);
        assert!(rel.level >= 3);
    }

    #[test]
    fn fifty_increments_cap_level_at_ten() {
        let rel = run_increments(50);
        assert!(rel.level <= 10);
        assert!(rel.level >= 5);
    }

    #[test]
    fn level_never_decreases() {
        let mut rel = UserPersonaRelationship::new(1, PersonaId::Counselor);
        let mut previous = rel.level;
        for _ in 0..200 {
            rel.increment_conversation();
            assert!(rel.level >= previous);
            previous = rel.level;
        }
        assert_eq!(rel.level, 10);
    }

    #[test]
    fn increment_touches_timestamps() {
        let mut rel = UserPersonaRelationship::new(1, PersonaId::LifeCoach);
        assert!(rel.last_conversation_at.is_none());
        rel.increment_conversation();
        assert!(rel.last_conversation_at.is_some());
        assert!(rel.updated_at >= rel.created_at);
    }
}
