//! Per-(user, persona) relationship bookkeeping over the relationship store.
//!
//! Read-modify-write on a pair is guarded by a keyed lock so concurrent
//! increments never lose a count. The at-most-one primary-mentor invariant
//! is enforced here, not by storage.

use std::sync::Arc;

use lifeweave_schema::{PersonaId, UserId, UserPersonaRelationship};
use lifeweave_store::RelationshipStore;
use tracing::debug;

use crate::error::CoreResult;
use crate::lock::{KeyedLocks, LockKey};

#[derive(Clone)]
pub struct RelationshipTracker {
    store: Arc<dyn RelationshipStore>,
    locks: KeyedLocks,
}

impl RelationshipTracker {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Records one more conversation for the pair, creating the record on
    /// first contact. Level movement follows the step function on the
    /// record itself.
    pub async fn increment(
        &self,
        user_id: UserId,
        persona: PersonaId,
    ) -> CoreResult<UserPersonaRelationship> {
        let _guard = self.locks.acquire(LockKey::Relationship(user_id, persona)).await;

        let mut relationship = self
            .store
            .relationship(user_id, persona)
            .await?
            .unwrap_or_else(|| UserPersonaRelationship::new(user_id, persona));
        relationship.increment_conversation();
        self.store.upsert_relationship(&relationship).await?;

        debug!(
            user_id,
            persona = %persona,
            total = relationship.total_conversations,
            level = relationship.level,
            "relationship incremented"
        );
        Ok(relationship)
    }

    /// Clears the flag on every other persona before setting it, so a user
    /// ends up with exactly one primary mentor. Idempotent.
    pub async fn set_primary_mentor(&self, user_id: UserId, persona: PersonaId) -> CoreResult<()> {
        let _guard = self.locks.acquire(LockKey::User(user_id)).await;

        for mut other in self.store.relationships_for_user(user_id).await? {
            if other.persona != persona && other.is_primary_mentor {
                other.is_primary_mentor = false;
                self.store.upsert_relationship(&other).await?;
            }
        }

        let mut target = self
            .store
            .relationship(user_id, persona)
            .await?
            .unwrap_or_else(|| UserPersonaRelationship::new(user_id, persona));
        target.is_primary_mentor = true;
        self.store.upsert_relationship(&target).await?;
        Ok(())
    }

    /// The user's primary mentor; `life_mentor` when none was ever chosen.
    pub async fn primary_mentor(&self, user_id: UserId) -> CoreResult<PersonaId> {
        let persona = self
            .store
            .relationships_for_user(user_id)
            .await?
            .into_iter()
            .find(|r| r.is_primary_mentor)
            .map(|r| r.persona)
            .unwrap_or(PersonaId::LifeMentor);
        Ok(persona)
    }

    /// Pairs sorted by conversation count descending, truncated to `limit`.
    pub async fn most_interacted(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> CoreResult<Vec<UserPersonaRelationship>> {
        let mut relationships = self.store.relationships_for_user(user_id).await?;
        relationships.truncate(limit);
        Ok(relationships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifeweave_store::LifeStore;

    fn tracker() -> RelationshipTracker {
        let store = Arc::new(LifeStore::open_in_memory().unwrap());
        RelationshipTracker::new(store)
    }

    #[tokio::test]
    async fn increment_creates_then_counts() {
        let tracker = tracker();
        let first = tracker.increment(1, PersonaId::Counselor).await.unwrap();
        assert_eq!(first.total_conversations, 1);
        assert_eq!(first.level, 1);

        let second = tracker.increment(1, PersonaId::Counselor).await.unwrap();
        assert_eq!(second.total_conversations, 2);
    }

    #[tokio::test]
    async fn concurrent_increments_never_lose_counts() {
        let tracker = tracker();
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.increment(1, PersonaId::LifeCoach).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let pairs = tracker.most_interacted(1, 10).await.unwrap();
        assert_eq!(pairs[0].total_conversations, 20);
    }

    #[tokio::test]
    async fn primary_mentor_is_exclusive_and_idempotent() {
        let tracker = tracker();
        tracker.increment(1, PersonaId::LifeMentor).await.unwrap();
        tracker.increment(1, PersonaId::Counselor).await.unwrap();

        tracker.set_primary_mentor(1, PersonaId::Counselor).await.unwrap();
        tracker.set_primary_mentor(1, PersonaId::Counselor).await.unwrap();
        tracker.set_primary_mentor(1, PersonaId::LifeMentor).await.unwrap();

        let pairs = tracker.most_interacted(1, 10).await.unwrap();
        let primaries: Vec<_> = pairs.iter().filter(|r| r.is_primary_mentor).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].persona, PersonaId::LifeMentor);
        assert_eq!(
            tracker.primary_mentor(1).await.unwrap(),
            PersonaId::LifeMentor
        );
    }

    #[tokio::test]
    async fn primary_mentor_defaults_to_life_mentor() {
        let tracker = tracker();
        assert_eq!(
            tracker.primary_mentor(42).await.unwrap(),
            PersonaId::LifeMentor
        );
    }

    #[tokio::test]
    async fn most_interacted_truncates() {
        let tracker = tracker();
        for persona in PersonaId::ALL {
            tracker.increment(1, persona).await.unwrap();
        }
        tracker.increment(1, PersonaId::Philosopher).await.unwrap();

        let top = tracker.most_interacted(2, 10).await.unwrap();
        assert!(top.is_empty());
        let top = tracker.most_interacted(1, 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].persona, PersonaId::Philosopher);
    }
}
