//! Persona recommendation: pure functions over event fields.

use lifeweave_schema::{EventType, LifeDomain, LifeEvent, PersonaId};

/// First-match rule chain. Challenge and negative emotion dominate, then
/// career signals, then everyday topics, then sheer importance.
pub fn recommend_primary(event: &LifeEvent) -> PersonaId {
    let negative = event.emotional_state.is_some_and(|s| s.is_negative());
    if event.event_type == EventType::Challenge || negative {
        return PersonaId::Counselor;
    }
    if event.event_type == EventType::Career || event.life_domains.contains(&LifeDomain::Career) {
        return PersonaId::CareerMentor;
    }
    if matches!(event.event_type, EventType::Daily | EventType::Health) {
        return PersonaId::LifeCoach;
    }
    if event.importance_level.is_some_and(|level| level >= 8) {
        return PersonaId::LifeMentor;
    }
    if event.event_type == EventType::Reflection {
        return PersonaId::Philosopher;
    }
    PersonaId::LifeMentor
}

/// Primary recommendation first, then extra personas for weighty or intense
/// events. Order reflects priority and the list never repeats a persona.
pub fn recommend_multiple(event: &LifeEvent) -> Vec<PersonaId> {
    let mut personas = vec![recommend_primary(event)];

    if event.importance_level.is_some_and(|level| level >= 7)
        && !personas.contains(&PersonaId::LifeMentor)
    {
        personas.push(PersonaId::LifeMentor);
    }
    if event.emotional_intensity.is_some_and(|intensity| intensity >= 7)
        && !personas.contains(&PersonaId::Counselor)
    {
        personas.push(PersonaId::Counselor);
    }
    personas
}
