use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{EventId, ParseEnumError, PersonaId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Achievement,
    Learning,
    Challenge,
    Reflection,
    Relationship,
    Career,
    Health,
    Daily,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Achievement => "achievement",
            EventType::Learning => "learning",
            EventType::Challenge => "challenge",
            EventType::Reflection => "reflection",
            EventType::Relationship => "relationship",
            EventType::Career => "career",
            EventType::Health => "health",
            EventType::Daily => "daily",
        }
    }

    /// Human phrasing used in templated openings.
    pub fn description(&self) -> &'static str {
        match self {
            EventType::Achievement => "an achievement worth celebrating",
            EventType::Learning => "a valuable piece of learning",
            EventType::Challenge => "a challenging experience",
            EventType::Reflection => "a thought-provoking moment",
            EventType::Relationship => "a relationship moment",
            EventType::Career => "a career development",
            EventType::Health => "a health-related experience",
            EventType::Daily => "a slice of everyday life",
        }
    }
}

impl FromStr for EventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "achievement" => Ok(EventType::Achievement),
            "learning" => Ok(EventType::Learning),
            "challenge" => Ok(EventType::Challenge),
            "reflection" => Ok(EventType::Reflection),
            "relationship" => Ok(EventType::Relationship),
            "career" => Ok(EventType::Career),
            "health" => Ok(EventType::Health),
            "daily" => Ok(EventType::Daily),
            other => Err(ParseEnumError::new("event type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalState {
    Excited,
    Happy,
    Calm,
    Thoughtful,
    Worried,
    Sad,
    Angry,
    Confused,
}

impl EmotionalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalState::Excited => "excited",
            EmotionalState::Happy => "happy",
            EmotionalState::Calm => "calm",
            EmotionalState::Thoughtful => "thoughtful",
            EmotionalState::Worried => "worried",
            EmotionalState::Sad => "sad",
            EmotionalState::Angry => "angry",
            EmotionalState::Confused => "confused",
        }
    }

    /// States that route toward emotional support.
    pub fn is_negative(&self) -> bool {
        matches!(self, EmotionalState::Worried | EmotionalState::Sad)
    }
}

impl FromStr for EmotionalState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excited" => Ok(EmotionalState::Excited),
            "happy" => Ok(EmotionalState::Happy),
            "calm" => Ok(EmotionalState::Calm),
            "thoughtful" => Ok(EmotionalState::Thoughtful),
            "worried" => Ok(EmotionalState::Worried),
            "sad" => Ok(EmotionalState::Sad),
            "angry" => Ok(EmotionalState::Angry),
            "confused" => Ok(EmotionalState::Confused),
            other => Err(ParseEnumError::new("emotional state", other)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifeDomain {
    Career,
    Health,
    Relationship,
    Learning,
    Finance,
    PersonalGrowth,
}

impl LifeDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifeDomain::Career => "career",
            LifeDomain::Health => "health",
            LifeDomain::Relationship => "relationship",
            LifeDomain::Learning => "learning",
            LifeDomain::Finance => "finance",
            LifeDomain::PersonalGrowth => "personal_growth",
        }
    }
}

impl fmt::Display for LifeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifeDomain {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "career" => Ok(LifeDomain::Career),
            "health" => Ok(LifeDomain::Health),
            "relationship" => Ok(LifeDomain::Relationship),
            "learning" => Ok(LifeDomain::Learning),
            "finance" => Ok(LifeDomain::Finance),
            "personal_growth" => Ok(LifeDomain::PersonalGrowth),
            other => Err(ParseEnumError::new("life domain", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTimeframe {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl ImpactTimeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactTimeframe::Immediate => "immediate",
            ImpactTimeframe::ShortTerm => "short_term",
            ImpactTimeframe::MediumTerm => "medium_term",
            ImpactTimeframe::LongTerm => "long_term",
        }
    }
}

impl FromStr for ImpactTimeframe {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(ImpactTimeframe::Immediate),
            "short_term" => Ok(ImpactTimeframe::ShortTerm),
            "medium_term" => Ok(ImpactTimeframe::MediumTerm),
            "long_term" => Ok(ImpactTimeframe::LongTerm),
            other => Err(ParseEnumError::new("impact timeframe", other)),
        }
    }
}

/// A recorded life event on the user's timeline.
///
/// Events are owned by the event-management collaborator: the engine reads
/// them for recommendation and analysis but never mutates a stored event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub emotional_state: Option<EmotionalState>,
    /// 1-10 when present.
    #[serde(default)]
    pub emotional_intensity: Option<u8>,
    /// 1-10 when present.
    #[serde(default)]
    pub importance_level: Option<u8>,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub life_domains: BTreeSet<LifeDomain>,
    #[serde(default)]
    pub impact_timeframe: Option<ImpactTimeframe>,
    /// Persona suggestions cached at registration time, primary first.
    #[serde(default)]
    pub recommended_personas: Vec<PersonaId>,
    pub created_at: DateTime<Utc>,
}

impl LifeEvent {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        event_type: EventType,
        event_date: NaiveDate,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            title: title.into(),
            description: String::new(),
            event_type,
            event_date,
            emotional_state: None,
            emotional_intensity: None,
            importance_level: None,
            is_milestone: false,
            life_domains: BTreeSet::new(),
            impact_timeframe: None,
            recommended_personas: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_high_impact(&self) -> bool {
        self.importance_level.is_some_and(|level| level >= 8)
    }
}

/// How two events relate; a single connection can hold several kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    TemporalProximity,
    SharedDomain,
    SimilarEmotion,
    SimilarImportance,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::TemporalProximity => "temporal_proximity",
            ConnectionKind::SharedDomain => "shared_domain",
            ConnectionKind::SimilarEmotion => "similar_emotion",
            ConnectionKind::SimilarImportance => "similar_importance",
        }
    }
}

/// Derived relatedness between two events. Computed on demand, never stored.
///
/// The pair is canonical: `event_a < event_b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConnection {
    pub event_a: EventId,
    pub event_b: EventId,
    pub strength: f32,
    pub kinds: Vec<ConnectionKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn event_serde_roundtrip() {
        let mut event = LifeEvent::new(7, "Shipped the release", EventType::Achievement, date(2026, 3, 1));
        event.importance_level = Some(9);
        event.is_milestone = true;
        event.life_domains.insert(LifeDomain::Career);
        event.recommended_personas = vec![PersonaId::LifeMentor];

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"achievement\""));
        assert!(json.contains("\"career\""));
        let parsed: LifeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.user_id, 7);
        assert!(parsed.is_milestone);
        assert!(parsed.life_domains.contains(&LifeDomain::Career));
    }

    #[test]
    fn event_defaults_on_minimal_json() {
        let json = r#"{
            "id": 1,
            "user_id": 2,
            "title": "Morning run",
            "event_type": "daily",
            "event_date": "2026-05-04",
            "created_at": "2026-05-04T08:00:00Z"
        }"#;
        let event: LifeEvent = serde_json::from_str(json).unwrap();
        assert!(event.description.is_empty());
        assert!(event.emotional_state.is_none());
        assert!(event.life_domains.is_empty());
        assert!(!event.is_milestone);
    }

    #[test]
    fn negative_states() {
        assert!(EmotionalState::Worried.is_negative());
        assert!(EmotionalState::Sad.is_negative());
        assert!(!EmotionalState::Happy.is_negative());
        assert!(!EmotionalState::Angry.is_negative());
    }

    #[test]
    fn high_impact_threshold() {
        let mut event = LifeEvent::new(1, "x", EventType::Daily, date(2026, 1, 1));
        assert!(!event.is_high_impact());
        event.importance_level = Some(7);
        assert!(!event.is_high_impact());
        event.importance_level = Some(8);
        assert!(event.is_high_impact());
    }

    #[test]
    fn enum_str_roundtrips() {
        for raw in ["achievement", "learning", "challenge", "reflection", "relationship", "career", "health", "daily"] {
            assert_eq!(raw.parse::<EventType>().unwrap().as_str(), raw);
        }
        for raw in ["career", "health", "relationship", "learning", "finance", "personal_growth"] {
            assert_eq!(raw.parse::<LifeDomain>().unwrap().as_str(), raw);
        }
        for raw in ["immediate", "short_term", "medium_term", "long_term"] {
            assert_eq!(raw.parse::<ImpactTimeframe>().unwrap().as_str(), raw);
        }
    }
}
