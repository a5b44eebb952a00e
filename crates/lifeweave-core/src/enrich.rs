//! Fills in the derivable fields of a freshly registered event: life
//! domains from keyword scan, impact timeframe from importance and type,
//! the milestone flag, and the cached persona recommendations.

use lifeweave_schema::{EventType, ImpactTimeframe, LifeDomain, LifeEvent};

use crate::recommend;

const CAREER_KEYWORDS: &[&str] = &[
    "job", "work", "career", "promotion", "promoted", "interview", "offer", "salary",
    "company", "project", "boss", "colleague",
];
const HEALTH_KEYWORDS: &[&str] = &[
    "health", "doctor", "exercise", "gym", "sleep", "diet", "illness", "sick", "run",
    "running", "workout",
];
const RELATIONSHIP_KEYWORDS: &[&str] = &[
    "friend", "family", "partner", "relationship", "marriage", "wedding", "date",
    "parents", "mother", "father", "girlfriend", "boyfriend",
];
const LEARNING_KEYWORDS: &[&str] = &[
    "learn", "learned", "study", "course", "book", "read", "exam", "degree", "skill",
    "class", "lecture",
];
const FINANCE_KEYWORDS: &[&str] = &[
    "money", "invest", "investment", "saving", "savings", "budget", "debt", "bought",
    "finance", "rent", "mortgage",
];
const GROWTH_KEYWORDS: &[&str] = &[
    "growth", "habit", "meditation", "goal", "reflection", "mindset", "journal",
    "gratitude",
];

/// Mutates the event in place. Explicitly supplied fields are never
/// overwritten; only gaps are filled.
pub fn enrich(event: &mut LifeEvent) {
    if event.life_domains.is_empty() {
        event.life_domains = infer_domains(&event.title, &event.description);
    }
    if event.impact_timeframe.is_none() {
        event.impact_timeframe = Some(infer_impact(event));
    }
    if event.is_high_impact() {
        event.is_milestone = true;
    }
    if event.recommended_personas.is_empty() {
        event.recommended_personas = recommend::recommend_multiple(event);
    }
}

fn infer_domains(title: &str, description: &str) -> std::collections::BTreeSet<LifeDomain> {
    let text = format!("{title} {description}").to_lowercase();
    let mut domains = std::collections::BTreeSet::new();

    let tables: [(&[&str], LifeDomain); 6] = [
        (CAREER_KEYWORDS, LifeDomain::Career),
        (HEALTH_KEYWORDS, LifeDomain::Health),
        (RELATIONSHIP_KEYWORDS, LifeDomain::Relationship),
        (LEARNING_KEYWORDS, LifeDomain::Learning),
        (FINANCE_KEYWORDS, LifeDomain::Finance),
        (GROWTH_KEYWORDS, LifeDomain::PersonalGrowth),
    ];
    for (keywords, domain) in tables {
        if keywords.iter().any(|kw| text.contains(kw)) {
            domains.insert(domain);
        }
    }

    if domains.is_empty() {
        domains.insert(LifeDomain::PersonalGrowth);
    }
    domains
}

fn infer_impact(event: &LifeEvent) -> ImpactTimeframe {
    let importance = event.importance_level.unwrap_or(0);
    if importance >= 9 || (event.event_type == EventType::Achievement && importance >= 7) {
        ImpactTimeframe::LongTerm
    } else if importance >= 6 || event.event_type == EventType::Learning {
        ImpactTimeframe::MediumTerm
    } else if importance >= 4 {
        ImpactTimeframe::ShortTerm
    } else {
        ImpactTimeframe::Immediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lifeweave_schema::PersonaId;

    fn event(event_type: EventType, title: &str) -> LifeEvent {
        LifeEvent::new(1, title, event_type, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
    }

    #[test]
    fn infers_domains_from_text() {
        let mut e = event(EventType::Career, "Got a promotion at work");
        e.description = "Also started saving more money".into();
        enrich(&mut e);
        assert!(e.life_domains.contains(&LifeDomain::Career));
        assert!(e.life_domains.contains(&LifeDomain::Finance));
    }

    #[test]
    fn blank_text_falls_back_to_personal_growth() {
        let mut e = event(EventType::Daily, "An ordinary afternoon");
        enrich(&mut e);
        assert_eq!(e.life_domains.len(), 1);
        assert!(e.life_domains.contains(&LifeDomain::PersonalGrowth));
    }

    #[test]
    fn explicit_domains_are_kept() {
        let mut e = event(EventType::Daily, "Got a promotion at work");
        e.life_domains.insert(LifeDomain::Health);
        enrich(&mut e);
        assert_eq!(e.life_domains.len(), 1);
        assert!(e.life_domains.contains(&LifeDomain::Health));
    }

    #[test]
    fn impact_ladder() {
        let mut e = event(EventType::Daily, "x");
        e.importance_level = Some(9);
        assert_eq!(infer_impact(&e), ImpactTimeframe::LongTerm);

        let mut e = event(EventType::Achievement, "x");
        e.importance_level = Some(7);
        assert_eq!(infer_impact(&e), ImpactTimeframe::LongTerm);

        let mut e = event(EventType::Daily, "x");
        e.importance_level = Some(6);
        assert_eq!(infer_impact(&e), ImpactTimeframe::MediumTerm);

        let e = event(EventType::Learning, "x");
        assert_eq!(infer_impact(&e), ImpactTimeframe::MediumTerm);

        let mut e = event(EventType::Daily, "x");
        e.importance_level = Some(4);
        assert_eq!(infer_impact(&e), ImpactTimeframe::ShortTerm);

        let e = event(EventType::Daily, "x");
        assert_eq!(infer_impact(&e), ImpactTimeframe::Immediate);
    }

    #[test]
    fn importance_eight_forces_milestone() {
        let mut e = event(EventType::Reflection, "Turning point");
        e.importance_level = Some(8);
        enrich(&mut e);
        assert!(e.is_milestone);
    }

    #[test]
    fn caches_persona_recommendations() {
        let mut e = event(EventType::Challenge, "Hard week");
        e.emotional_intensity = Some(8);
        enrich(&mut e);
        assert_eq!(e.recommended_personas[0], PersonaId::Counselor);
    }
}
